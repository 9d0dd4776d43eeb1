// SPDX-License-Identifier: Apache-2.0

#![warn(missing_docs)]

//! Template-driven statement extraction.
//!
//! A template is a whitespace-split string whose tokens are either literal
//! keywords or typed placeholders. Extraction walks the template tags and the
//! [TokenStream] together, strictly left-to-right, in one pass; skipping an
//! absent optional group happens entirely on the template side, the stream
//! cursor never rewinds.
//!
//! Recognized placeholder sigils:
//!
//! | tag | consumes |
//! |---|---|
//! | `@name` | one token, recorded under `identifiers` |
//! | `@(name)` | comma-separated field names |
//! | `@{name}` | comma-separated projection expressions |
//! | `@[name]` | comma-separated literal values, up to the closing `)` |
//! | `@\|name\|` | comma-separated sort fields w/ optional ASC/DESC |
//! | `@<name>` | a condition |
//! | `@/pattern/` | nothing -- gate: fail unless the next token matches |
//! | `?KEYWORD` | the keyword, or skips the group's dependent tail |
//! | `+?KEYWORD` | the keyword, mandatory w/in its optional group |
//! | anything else | itself, as a case-insensitive literal |
//!

use crate::{
    MyError,
    cond::Cond,
    expr::{E, Field},
    parser,
    queryable::Q,
    token::{Kind, TokenStream},
};
use regex::Regex;
use std::collections::HashMap;

/// The typed bag a template extraction produces, one map per placeholder
/// family, each keyed by the placeholder name.
#[derive(Debug, Default)]
pub(crate) struct Template {
    pub(crate) identifiers: HashMap<String, String>,
    pub(crate) field_refs: HashMap<String, Vec<Field>>,
    pub(crate) field_args: HashMap<String, Vec<E>>,
    pub(crate) conditions: HashMap<String, Cond>,
    pub(crate) sort_fields: HashMap<String, Vec<(Field, i8)>>,
    pub(crate) insert_values: HashMap<String, Vec<Q>>,
}

// strip one leading and one trailing delimiter character from a tag;
// e.g. `@(fields)` -> `fields`.
fn bracketed(tag: &str) -> &str {
    &tag[2..tag.len() - 1]
}

impl Template {
    /// Run the given template against the stream, extracting a bag.
    pub(crate) fn extract(template: &str, ts: &mut TokenStream) -> Result<Template, MyError> {
        let mut bag = Template::default();
        let mut tags = template.split_whitespace().peekable();

        while let Some(tag) = tags.next() {
            if tag.starts_with("@(") && tag.ends_with(')') {
                let fields = parse_field_list(ts)?;
                bag.field_refs.insert(bracketed(tag).to_owned(), fields);
            } else if tag.starts_with("@{") && tag.ends_with('}') {
                let items = parser::parse_select_items(ts)?;
                bag.field_args.insert(bracketed(tag).to_owned(), items);
            } else if tag.starts_with("@[") && tag.ends_with(']') {
                let values = parse_value_list(ts)?;
                bag.insert_values.insert(bracketed(tag).to_owned(), values);
            } else if tag.starts_with("@|") && tag.ends_with('|') {
                let fields = parse_sort_fields(ts)?;
                bag.sort_fields.insert(bracketed(tag).to_owned(), fields);
            } else if tag.starts_with("@<") && tag.ends_with('>') {
                let cond = parser::parse_condition(ts)?;
                bag.conditions.insert(bracketed(tag).to_owned(), cond);
            } else if tag.starts_with("@/") && tag.ends_with('/') {
                // a gate: the upcoming token must match, nothing is consumed...
                let pattern = Regex::new(&format!("^(?:{})$", bracketed(tag)))?;
                if !ts.matches(&pattern) {
                    return Err(ts.syntax_error(format!("Expected input matching /{}/", bracketed(tag))));
                }
            } else if let Some(keyword) = tag.strip_prefix("+?") {
                ts.expect(keyword)?;
            } else if let Some(keyword) = tag.strip_prefix('?') {
                if !ts.next_if(keyword) {
                    // group absent: skip its dependent tail on the template
                    // side only...
                    while let Some(next) = tags.peek() {
                        if next.starts_with('@') || next.starts_with("+?") {
                            tags.next();
                        } else {
                            break;
                        }
                    }
                }
            } else if let Some(name) = tag.strip_prefix('@') {
                let t = ts.next()?;
                bag.identifiers.insert(name.to_owned(), t.text);
            } else {
                ts.expect(tag)?;
            }
        }
        Ok(bag)
    }

    /// Disjoint-key union of two bags. A key collision is a mistake in the
    /// colliding templates, not in user input, hence the panic.
    pub(crate) fn merge(mut self, other: Template) -> Template {
        fn union<V>(into: &mut HashMap<String, V>, from: HashMap<String, V>) {
            for (k, v) in from {
                if into.insert(k.clone(), v).is_some() {
                    panic!("duplicate template key '{k}'");
                }
            }
        }
        union(&mut self.identifiers, other.identifiers);
        union(&mut self.field_refs, other.field_refs);
        union(&mut self.field_args, other.field_args);
        union(&mut self.conditions, other.conditions);
        union(&mut self.sort_fields, other.sort_fields);
        union(&mut self.insert_values, other.insert_values);
        self
    }
}

// `Field ( ',' Field )*`
fn parse_field_list(ts: &mut TokenStream) -> Result<Vec<Field>, MyError> {
    let mut fields = Vec::new();
    loop {
        let t = ts.next()?;
        if t.kind != Kind::Identifier {
            return Err(MyError::syntax("Field name expected", t.line, t.column));
        }
        fields.push(Field { name: t.text });
        if !ts.next_if(",") {
            break;
        }
    }
    Ok(fields)
}

// `Field [ASC|DESC] ( ',' Field [ASC|DESC] )*` -- ASC is the default.
fn parse_sort_fields(ts: &mut TokenStream) -> Result<Vec<(Field, i8)>, MyError> {
    let mut fields = Vec::new();
    loop {
        let t = ts.next()?;
        if t.kind != Kind::Identifier {
            return Err(MyError::syntax("Sort field name expected", t.line, t.column));
        }
        let direction = if ts.next_if("DESC") {
            -1
        } else {
            ts.next_if("ASC");
            1
        };
        fields.push((Field { name: t.text }, direction));
        if !ts.next_if(",") {
            break;
        }
    }
    Ok(fields)
}

// literal values up to -- but not consuming -- the closing `)`.
fn parse_value_list(ts: &mut TokenStream) -> Result<Vec<Q>, MyError> {
    let mut values = Vec::new();
    loop {
        if ts.is(")") {
            break;
        }
        let negated = ts.next_if("-");
        let t = ts.next()?;
        let literal = matches!(t.kind, Kind::Number | Kind::Str)
            || matches!(t.kind, Kind::Keyword
                if ["true", "false", "null"].iter().any(|k| t.text.eq_ignore_ascii_case(k)));
        if !literal {
            return Err(MyError::syntax("Literal value expected", t.line, t.column));
        }
        let mut q = t.value()?;
        if negated {
            q = match q {
                Q::Num(n) => Q::Num(-n),
                _ => return Err(MyError::syntax("Number expected after '-'", t.line, t.column)),
            };
        }
        values.push(q);
        if !ts.next_if(",") {
            break;
        }
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    const SELECT_ISH: &str = "SELECT @{fields} FROM @source ?WHERE @<condition> ?ORDER +?BY @|sort| ?LIMIT @limit";

    #[test]
    #[traced_test]
    fn test_full_extraction() {
        let mut ts =
            TokenStream::new("SELECT a, b FROM 't.csv' WHERE a > 1 ORDER BY a DESC, b LIMIT 5")
                .unwrap();
        let bag = Template::extract(SELECT_ISH, &mut ts).unwrap();
        assert_eq!(bag.identifiers["source"], "t.csv");
        assert_eq!(bag.identifiers["limit"], "5");
        assert_eq!(bag.field_args["fields"].len(), 2);
        assert!(bag.conditions.contains_key("condition"));
        assert_eq!(
            bag.sort_fields["sort"],
            vec![(Field { name: "a".into() }, -1), (Field { name: "b".into() }, 1)]
        );
        assert!(!ts.has_next());
    }

    #[test]
    fn test_optional_groups_skip_dependent_tail() {
        let mut ts = TokenStream::new("SELECT a FROM t LIMIT 3").unwrap();
        let bag = Template::extract(SELECT_ISH, &mut ts).unwrap();
        assert!(bag.conditions.is_empty());
        assert!(bag.sort_fields.is_empty());
        assert_eq!(bag.identifiers["limit"], "3");
    }

    #[test]
    fn test_mandatory_follow_on_keyword() {
        let mut ts = TokenStream::new("SELECT a FROM t ORDER a").unwrap();
        // ORDER w/o BY must fail...
        let x = Template::extract(SELECT_ISH, &mut ts);
        assert!(matches!(x, Err(MyError::Syntax { ref message, .. }) if message.contains("BY")));
    }

    #[test]
    fn test_regex_gate_does_not_consume() {
        let mut ts = TokenStream::new("42 END").unwrap();
        let bag = Template::extract("@/[0-9]+/ @n END", &mut ts).unwrap();
        assert_eq!(bag.identifiers["n"], "42");
        assert!(!ts.has_next());
    }

    #[test]
    fn test_regex_gate_failure() {
        let mut ts = TokenStream::new("nope").unwrap();
        let x = Template::extract("@/[0-9]+/ @n", &mut ts);
        assert!(matches!(x, Err(MyError::Syntax { .. })));
    }

    #[test]
    fn test_value_list() {
        let mut ts = TokenStream::new("( 1, 'x', TRUE, -2.5, NULL )").unwrap();
        let bag = Template::extract("( @[values] )", &mut ts).unwrap();
        assert_eq!(
            bag.insert_values["values"],
            vec![Q::Num(1.0), Q::Str("x".into()), Q::Bool(true), Q::Num(-2.5), Q::Null]
        );
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let run = || {
            let mut ts =
                TokenStream::new("SELECT a, b FROM t WHERE a = 1 ORDER BY b LIMIT 9").unwrap();
            Template::extract(SELECT_ISH, &mut ts).unwrap()
        };
        let (x, y) = (run(), run());
        assert_eq!(format!("{:?}", x.field_args["fields"]), format!("{:?}", y.field_args["fields"]));
        assert_eq!(x.identifiers, y.identifiers);
        assert_eq!(x.sort_fields, y.sort_fields);
    }

    #[test]
    fn test_merge_disjoint() {
        let mut ts1 = TokenStream::new("INSERT INTO t").unwrap();
        let head = Template::extract("INSERT INTO @target", &mut ts1).unwrap();
        let mut ts2 = TokenStream::new("( 1, 2 )").unwrap();
        let tail = Template::extract("( @[values] )", &mut ts2).unwrap();
        let merged = head.merge(tail);
        assert_eq!(merged.identifiers["target"], "t");
        assert_eq!(merged.insert_values["values"].len(), 2);
    }

    #[test]
    #[should_panic(expected = "duplicate template key")]
    fn test_merge_collision_panics() {
        let mut ts1 = TokenStream::new("a").unwrap();
        let x = Template::extract("@name", &mut ts1).unwrap();
        let mut ts2 = TokenStream::new("b").unwrap();
        let y = Template::extract("@name", &mut ts2).unwrap();
        let _ = x.merge(y);
    }

    #[test]
    fn test_literal_keywords_are_case_insensitive() {
        let mut ts = TokenStream::new("select a from t").unwrap();
        let bag = Template::extract("SELECT @{fields} FROM @source", &mut ts).unwrap();
        assert_eq!(bag.identifiers["source"], "t");
    }
}
