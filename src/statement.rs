// SPDX-License-Identifier: Apache-2.0

#![warn(missing_docs)]

//! Statement templates, the per-keyword compiler and the executable
//! statement variants.
//!

use crate::{
    MyError,
    cond::Cond,
    ds::{DataResource, DataSourceFactory},
    expr::{Call, E, Field, apply_arith},
    op::Op,
    queryable::Q,
    result::{ResultSet, Row, row_get},
    scope::Scope,
    template::Template,
    token::TokenStream,
};
use std::cmp::Ordering;
use tracing::debug;

const SELECT_TEMPLATE: &str = "SELECT @{fields} FROM @source \
    ?WHERE @<condition> \
    ?GROUP +?BY @(groupBy) \
    ?ORDER +?BY @|orderBy| \
    ?LIMIT @/[0-9]+/ @limit";

const INSERT_TEMPLATE: &str = "INSERT INTO @target ( @(fields) )";
const INSERT_VALUES_TEMPLATE: &str = "VALUES ( @[values] )";
const CREATE_VIEW_TEMPLATE: &str = "CREATE VIEW @name AS";
const DESCRIBE_TEMPLATE: &str = "DESCRIBE @source";

/// A compiled statement, ready to run against a [Scope].
#[derive(Clone, Debug, PartialEq)]
pub enum Statement {
    /// Read, filter, transform.
    Select(Select),
    /// Write rows into a sink.
    Insert(Insert),
    /// Register a named query in the executing scope.
    CreateView(CreateView),
    /// Report the column shape of a source.
    Describe(Describe),
}

/// A compiled SELECT.
#[derive(Clone, Debug, PartialEq)]
pub struct Select {
    pub(crate) fields: Vec<E>,
    pub(crate) source: DataResource,
    pub(crate) condition: Option<Cond>,
    pub(crate) group_by: Option<Vec<Field>>,
    pub(crate) order_by: Option<Vec<(Field, i8)>>,
    pub(crate) limit: Option<usize>,
}

/// A compiled INSERT.
#[derive(Clone, Debug, PartialEq)]
pub struct Insert {
    pub(crate) target: DataResource,
    pub(crate) fields: Vec<Field>,
    pub(crate) source: InsertSource,
}

/// Where an INSERT's rows come from.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum InsertSource {
    /// A single literal `VALUES (...)` row.
    Values(Vec<Q>),
    /// An `INSERT ... SELECT` pipeline.
    Query(Box<Select>),
}

/// A compiled CREATE VIEW.
#[derive(Clone, Debug, PartialEq)]
pub struct CreateView {
    pub(crate) name: String,
    pub(crate) query: Select,
}

/// A compiled DESCRIBE.
#[derive(Clone, Debug, PartialEq)]
pub struct Describe {
    pub(crate) source: DataResource,
}

impl Statement {
    /// Compile a single statement from SQL text. A trailing `;` is
    /// tolerated; anything after it is not.
    pub fn try_from_text(s: &str) -> Result<Self, MyError> {
        let mut ts = TokenStream::new(s)?;
        let statement = compile(&mut ts)?;
        ts.next_if(";");
        if ts.has_next() {
            return Err(ts.syntax_error("Unexpected trailing input"));
        }
        Ok(statement)
    }

    /// Compile a `;`-separated script. Each statement parses all-or-nothing.
    pub fn parse_script(s: &str) -> Result<Vec<Self>, MyError> {
        let mut ts = TokenStream::new(s)?;
        let mut statements = Vec::new();
        loop {
            while ts.next_if(";") {}
            if !ts.has_next() {
                break;
            }
            statements.push(compile(&mut ts)?);
        }
        Ok(statements)
    }

    /// Run this against the given scope. Only CREATE VIEW writes into the
    /// scope; everything else reads it.
    pub fn execute(&self, scope: &mut Scope) -> Result<ResultSet, MyError> {
        match self {
            Statement::Select(x) => x.run(scope),
            Statement::Insert(x) => x.run(scope),
            Statement::CreateView(x) => {
                debug!("Registering view '{}'", x.name);
                scope.register_view(&x.name, x.query.clone());
                Ok(ResultSet::empty())
            }
            Statement::Describe(x) => x.run(scope),
        }
    }
}

// ===== compiler =============================================================

/// Compile the statement starting at the stream cursor, selected by its
/// leading keyword.
pub(crate) fn compile(ts: &mut TokenStream) -> Result<Statement, MyError> {
    if ts.is("SELECT") {
        return Ok(Statement::Select(compile_select(ts)?));
    }
    if ts.is("INSERT") {
        return Ok(Statement::Insert(compile_insert(ts)?));
    }
    if ts.is("CREATE") {
        let bag = Template::extract(CREATE_VIEW_TEMPLATE, ts)?;
        let name = take_identifier(&bag, "name")?;
        let query = compile_select(ts)?;
        return Ok(Statement::CreateView(CreateView { name, query }));
    }
    if ts.is("DESCRIBE") {
        let bag = Template::extract(DESCRIBE_TEMPLATE, ts)?;
        let source = DataResource::new(&take_identifier(&bag, "source")?);
        return Ok(Statement::Describe(Describe { source }));
    }
    Err(ts.syntax_error("Unrecognized statement"))
}

/// Compile a SELECT starting at its leading keyword. Also the entry point
/// for scalar subqueries and view bodies.
pub(crate) fn compile_select(ts: &mut TokenStream) -> Result<Select, MyError> {
    let mut bag = Template::extract(SELECT_TEMPLATE, ts)?;
    let fields = bag
        .field_args
        .remove("fields")
        .ok_or_else(|| MyError::runtime("SELECT template lost its 'fields' slot"))?;
    let source = DataResource::new(&take_identifier(&bag, "source")?);
    let limit = match bag.identifiers.remove("limit") {
        Some(x) => Some(
            x.parse::<usize>()
                .map_err(|_| MyError::runtime(format!("Unusable LIMIT '{x}'")))?,
        ),
        None => None,
    };
    Ok(Select {
        fields,
        source,
        condition: bag.conditions.remove("condition"),
        group_by: bag.field_refs.remove("groupBy"),
        order_by: bag.sort_fields.remove("orderBy"),
        limit,
    })
}

fn compile_insert(ts: &mut TokenStream) -> Result<Insert, MyError> {
    let head = Template::extract(INSERT_TEMPLATE, ts)?;
    let (bag, source) = if ts.is("VALUES") {
        let tail = Template::extract(INSERT_VALUES_TEMPLATE, ts)?;
        let mut bag = head.merge(tail);
        let values = bag
            .insert_values
            .remove("values")
            .ok_or_else(|| MyError::runtime("INSERT template lost its 'values' slot"))?;
        (bag, InsertSource::Values(values))
    } else if ts.is("SELECT") {
        let query = compile_select(ts)?;
        (head, InsertSource::Query(Box::new(query)))
    } else {
        return Err(ts.syntax_error("Expected VALUES or SELECT"));
    };
    let target = DataResource::new(&take_identifier(&bag, "target")?);
    let fields = bag
        .field_refs
        .get("fields")
        .cloned()
        .ok_or_else(|| MyError::runtime("INSERT template lost its 'fields' slot"))?;
    Ok(Insert { target, fields, source })
}

fn take_identifier(bag: &Template, key: &str) -> Result<String, MyError> {
    bag.identifiers
        .get(key)
        .cloned()
        .ok_or_else(|| MyError::runtime(format!("Template bag lost its '{key}' slot")))
}

// ===== execution ============================================================

fn bind_row(scope: &mut Scope, row: &Row) {
    for (name, q) in row {
        scope.bind(name.clone(), q.clone());
    }
}

// rows of a FROM target: a registered view wins over the driver factory.
// `${var}` references expand before the factory dispatches on the path's
// shape...
fn source_rows(resource: &DataResource, scope: &Scope) -> Result<Vec<Row>, MyError> {
    if let Some(view) = scope.lookup_view(&resource.path) {
        debug!("Resolved '{}' as a view", resource.path);
        return Ok(view.run(scope)?.collect());
    }
    let path = scope.expand(&resource.path);
    let source = DataSourceFactory::input_source(&path, None)?;
    Ok(source.execute(scope)?.collect())
}

fn sort_rows(rows: &mut [Row], order: &[(Field, i8)]) {
    rows.sort_by(|a, b| {
        for (field, direction) in order {
            let ord = match (row_get(a, &field.name), row_get(b, &field.name)) {
                (Some(x), Some(y)) => x.cmp_sql(y),
                (None, None) => Ordering::Equal,
                (None, _) => Ordering::Less,
                (_, None) => Ordering::Greater,
            };
            let ord = if *direction < 0 { ord.reverse() } else { ord };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
}

fn is_aggregate_call(call: &Call) -> bool {
    call.params.len() == 1
        && matches!(
            call.name.to_ascii_lowercase().as_str(),
            "count" | "sum" | "avg" | "min" | "max"
        )
}

fn contains_aggregate(e: &E) -> bool {
    match e {
        E::Function(call) => is_aggregate_call(call) || call.params.iter().any(contains_aggregate),
        E::Alias(x, _) | E::Monadic(_, x) => contains_aggregate(x),
        E::Dyadic(_, a, b) => contains_aggregate(a) || contains_aggregate(b),
        _ => false,
    }
}

impl Select {
    /// Read the source, filter, then either project row by row or fold the
    /// aggregate path.
    pub(crate) fn run(&self, scope: &Scope) -> Result<ResultSet, MyError> {
        let rows = source_rows(&self.source, scope)?;
        let mut kept = Vec::with_capacity(rows.len());
        for row in rows {
            if let Some(cond) = &self.condition {
                let mut row_scope = scope.child();
                bind_row(&mut row_scope, &row);
                if !cond.is_satisfied(&row_scope)? {
                    continue;
                }
            }
            kept.push(row);
        }

        if self.group_by.is_some() || self.fields.iter().any(contains_aggregate) {
            return self.run_grouped(kept, scope);
        }

        // sorting happens over source rows, so a sort field need not be
        // projected...
        if let Some(order) = &self.order_by {
            sort_rows(&mut kept, order);
        }
        if let Some(limit) = self.limit {
            kept.truncate(limit);
        }
        let mut out = Vec::with_capacity(kept.len());
        for row in &kept {
            out.push(self.project(row, scope)?);
        }
        Ok(ResultSet::from_rows(out))
    }

    fn project(&self, row: &Row, scope: &Scope) -> Result<Row, MyError> {
        let mut row_scope = scope.child();
        bind_row(&mut row_scope, row);
        let mut out = Row::new();
        for e in &self.fields {
            match e {
                E::Star => out.extend(row.iter().cloned()),
                _ => out.push((e.column_name(), e.eval(&row_scope)?)),
            }
        }
        Ok(out)
    }

    fn run_grouped(&self, rows: Vec<Row>, scope: &Scope) -> Result<ResultSet, MyError> {
        // NOTE (rsn) 20250921 - a linear key scan keeps buckets in first-seen
        // order; `Q` carries an f64 and so cannot be a HashMap key anyway.
        let buckets: Vec<Vec<Row>> = match &self.group_by {
            None => vec![rows],
            Some(fields) => {
                let mut keys: Vec<Vec<Q>> = Vec::new();
                let mut buckets: Vec<Vec<Row>> = Vec::new();
                for row in rows {
                    let key: Vec<Q> = fields
                        .iter()
                        .map(|f| row_get(&row, &f.name).cloned().unwrap_or(Q::Null))
                        .collect();
                    match keys.iter().position(|k| *k == key) {
                        Some(i) => buckets[i].push(row),
                        None => {
                            keys.push(key);
                            buckets.push(vec![row]);
                        }
                    }
                }
                buckets
            }
        };

        let mut out = Vec::with_capacity(buckets.len());
        for bucket in &buckets {
            let mut row = Row::new();
            for e in &self.fields {
                if matches!(e, E::Star) {
                    return Err(MyError::runtime("'*' cannot be projected from an aggregate query"));
                }
                row.push((e.column_name(), eval_aggregate(e, bucket, scope)?));
            }
            out.push(row);
        }
        // aggregate output sorts over its own columns...
        if let Some(order) = &self.order_by {
            sort_rows(&mut out, order);
        }
        if let Some(limit) = self.limit {
            out.truncate(limit);
        }
        Ok(ResultSet::from_rows(out))
    }
}

// Fold one projection expression over a bucket of rows. Aggregate calls
// reduce the bucket; everything else evaluates against its first row.
fn eval_aggregate(e: &E, rows: &[Row], scope: &Scope) -> Result<Q, MyError> {
    match e {
        E::Function(call) if is_aggregate_call(call) => {
            let name = call.name.to_ascii_lowercase();
            let arg = &call.params[0];
            if name == "count" && matches!(arg, E::Star) {
                return Ok(Q::Num(rows.len() as f64));
            }
            // evaluate the argument per row; NULLs never participate...
            let mut values = Vec::with_capacity(rows.len());
            for row in rows {
                let mut row_scope = scope.child();
                bind_row(&mut row_scope, row);
                let q = arg.eval(&row_scope)?;
                if !q.is_null() {
                    values.push(q);
                }
            }
            match name.as_str() {
                "count" => Ok(Q::Num(values.len() as f64)),
                "sum" | "avg" => {
                    if values.is_empty() {
                        return Ok(Q::Null);
                    }
                    let mut total = 0.0;
                    for v in &values {
                        total += v.to_num()?;
                    }
                    if name == "sum" {
                        Ok(Q::Num(total))
                    } else {
                        Ok(Q::Num(total / values.len() as f64))
                    }
                }
                "min" | "max" => {
                    let mut it = values.into_iter();
                    let Some(mut best) = it.next() else {
                        return Ok(Q::Null);
                    };
                    for v in it {
                        let swap = if name == "min" {
                            v.cmp_sql(&best) == Ordering::Less
                        } else {
                            v.cmp_sql(&best) == Ordering::Greater
                        };
                        if swap {
                            best = v;
                        }
                    }
                    Ok(best)
                }
                _ => Err(MyError::runtime(format!("Unknown aggregate '{}'", call.name))),
            }
        }
        E::Alias(x, _) => eval_aggregate(x, rows, scope),
        E::Monadic(Op::Minus, x) => {
            let zx = eval_aggregate(x, rows, scope)?;
            match zx {
                Q::Null => Ok(Q::Null),
                _ => Ok(Q::Num(-zx.to_num()?)),
            }
        }
        E::Dyadic(op, a, b) if op.arithmetic() => {
            let za = eval_aggregate(a, rows, scope)?;
            let zb = eval_aggregate(b, rows, scope)?;
            apply_arith(*op, &za, &zb)
        }
        _ => {
            let mut row_scope = scope.child();
            if let Some(first) = rows.first() {
                bind_row(&mut row_scope, first);
            }
            e.eval(&row_scope)
        }
    }
}

impl Insert {
    /// Materialize the source rows, pair the named fields w/ columns **by
    /// position**, then write under scoped sink acquisition: the sink closes
    /// on every exit path, including a failed write.
    pub(crate) fn run(&self, scope: &Scope) -> Result<ResultSet, MyError> {
        let rows: Vec<Row> = match &self.source {
            InsertSource::Values(values) => {
                if values.len() != self.fields.len() {
                    return Err(MyError::runtime(format!(
                        "INSERT names {} field(s) but carries {} value(s)",
                        self.fields.len(),
                        values.len()
                    )));
                }
                let row: Row = self
                    .fields
                    .iter()
                    .zip(values)
                    .map(|(f, q)| (f.name.clone(), q.clone()))
                    .collect();
                vec![row]
            }
            InsertSource::Query(query) => {
                let mut rows = Vec::new();
                for row in query.run(scope)? {
                    if row.len() < self.fields.len() {
                        return Err(MyError::runtime(format!(
                            "INSERT names {} field(s) but the query yields {}",
                            self.fields.len(),
                            row.len()
                        )));
                    }
                    let projected: Row = self
                        .fields
                        .iter()
                        .zip(row)
                        .map(|(f, (_, q))| (f.name.clone(), q))
                        .collect();
                    rows.push(projected);
                }
                rows
            }
        };

        let path = scope.expand(&self.target.path);
        let mut sink = DataSourceFactory::output_source(&path, self.target.hints.append, None)?;
        sink.open(scope)?;
        let mut count = 0usize;
        let outcome = (|| -> Result<(), MyError> {
            for row in &rows {
                sink.write(row)?;
                count += 1;
            }
            Ok(())
        })();
        let closed = sink.close();
        outcome?;
        closed?;
        debug!("Inserted {count} row(s) into '{}'", self.target.path);
        Ok(ResultSet::inserted(count, sink.statistics()))
    }
}

impl Describe {
    fn run(&self, scope: &Scope) -> Result<ResultSet, MyError> {
        let rows = source_rows(&self.source, scope)?;
        let Some(first) = rows.first() else {
            return Ok(ResultSet::empty());
        };
        let out: Vec<Row> = first
            .iter()
            .map(|(name, q)| {
                vec![
                    ("column".to_string(), Q::Str(name.to_owned())),
                    ("type".to_string(), Q::Str(type_name(q).to_string())),
                ]
            })
            .collect();
        Ok(ResultSet::from_rows(out))
    }
}

fn type_name(q: &Q) -> &'static str {
    match q {
        Q::Null => "null",
        Q::Bool(_) => "boolean",
        Q::Num(_) => "number",
        Q::Str(_) => "string",
    }
}
