// SPDX-License-Identifier: Apache-2.0

#![warn(missing_docs)]

//! Value-producing expression tree the Pratt parser targets.
//!

use crate::{MyError, config::config, op::Op, queryable::Q, scope::Scope, statement::Select};
use core::fmt;
use tracing::debug;

/// Expression variants...
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) enum E {
    #[default]
    Null,
    Bool(bool),
    Num(f64),
    Str(String),
    /// A reference to a row column or a bound variable.
    Field(String),
    /// Sanctioned only as the sole argument of `COUNT(*)` and as a whole-row
    /// projection; evaluating it on its own is an error.
    Star,
    Function(Call),
    /// A projected expression w/ an `AS` name.
    Alias(Box<E>, String),
    Monadic(Op, Box<E>),
    Dyadic(Op, Box<E>, Box<E>),
    /// A scalar `(SELECT ...)`: first column of its first row, NULL when the
    /// result is empty.
    Subquery(Box<Select>),
}

/// An unresolved call by name; resolved against the [Scope] function registry
/// at evaluation time.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Call {
    pub(crate) name: String,
    pub(crate) params: Vec<E>,
}

/// A projected or referenced column.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Field {
    pub(crate) name: String,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl fmt::Display for E {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            E::Null => write!(f, "NULL"),
            E::Bool(x) => write!(f, "{}", if *x { "TRUE" } else { "FALSE" }),
            E::Num(x) => write!(f, "{x}"),
            E::Str(x) => write!(f, "'{x}'"),
            E::Field(x) => write!(f, "{x}"),
            E::Star => write!(f, "*"),
            E::Function(x) => {
                let params: Vec<_> = x.params.iter().map(|p| p.to_string()).collect();
                write!(f, "{}({})", x.name, params.join(", "))
            }
            E::Alias(x, name) => write!(f, "{x} AS {name}"),
            E::Monadic(op, x) => write!(f, "{op}{x}"),
            E::Dyadic(op, a, b) => write!(f, "{a} {op} {b}"),
            E::Subquery(_) => write!(f, "(SELECT ...)"),
        }
    }
}

// Apply an arithmetic operator to two payloads. NULL on either side
// propagates; so does division by zero unless strict math is configured.
pub(crate) fn apply_arith(op: Op, a: &Q, b: &Q) -> Result<Q, MyError> {
    if a.is_null() || b.is_null() {
        return Ok(Q::Null);
    }
    let (x, y) = (a.to_num()?, b.to_num()?);
    match op {
        Op::Plus => Ok(Q::Num(x + y)),
        Op::Minus => Ok(Q::Num(x - y)),
        Op::Mult => Ok(Q::Num(x * y)),
        Op::Div if y == 0.0 => {
            if config().strict_math() {
                Err(MyError::runtime(format!("Division by zero: {x} / 0")))
            } else {
                Ok(Q::Null)
            }
        }
        Op::Div => Ok(Q::Num(x / y)),
        _ => Err(MyError::runtime(format!("'{op}' is not an arithmetic operator"))),
    }
}

impl E {
    /// Reduce this to a payload w/in the given scope. A field that resolves
    /// to nothing yields NULL, as does an unregistered function unless the
    /// strict-functions switch is on.
    pub(crate) fn eval(&self, scope: &Scope) -> Result<Q, MyError> {
        match self {
            E::Null => Ok(Q::Null),
            E::Bool(x) => Ok(Q::Bool(*x)),
            E::Num(x) => Ok(Q::Num(*x)),
            // string literals participate in `${var}` interpolation...
            E::Str(x) => Ok(Q::Str(scope.expand(x))),
            E::Field(x) => match scope.lookup(x) {
                Some(q) => Ok(q.clone()),
                None => {
                    debug!("No column or variable named '{x}' in scope");
                    Ok(Q::Null)
                }
            },
            E::Star => Err(MyError::runtime("'*' is only valid in COUNT(*) or as a projection")),
            E::Function(call) => {
                // arguments evaluate left-to-right before the call resolves...
                let mut args = Vec::with_capacity(call.params.len());
                for p in &call.params {
                    args.push(p.eval(scope)?);
                }
                match scope.lookup_function(&call.name) {
                    Some(info) => info.invoke(&call.name, &args),
                    None if config().strict_functions() => {
                        Err(MyError::Resolution(format!("No function named '{}'", call.name)))
                    }
                    None => {
                        debug!("No function named '{}' in scope", call.name);
                        Ok(Q::Null)
                    }
                }
            }
            E::Alias(x, _) => x.eval(scope),
            E::Monadic(op, x) => {
                let zx = x.eval(scope)?;
                match op {
                    Op::Minus => match zx {
                        Q::Null => Ok(Q::Null),
                        _ => Ok(Q::Num(-zx.to_num()?)),
                    },
                    _ => Err(MyError::runtime(format!("Unexpected unary operator '{op}'"))),
                }
            }
            E::Dyadic(op, a, b) if op.arithmetic() => {
                let za = a.eval(scope)?;
                let zb = b.eval(scope)?;
                apply_arith(*op, &za, &zb)
            }
            E::Dyadic(op, _, _) => {
                Err(MyError::runtime(format!("Unexpected binary operator '{op}'")))
            }
            E::Subquery(x) => {
                let mut rs = x.run(scope)?;
                match rs.next() {
                    Some(row) => Ok(row.into_iter().next().map(|(_, q)| q).unwrap_or(Q::Null)),
                    None => Ok(Q::Null),
                }
            }
        }
    }

    /// Lift the payload ordering over two expressions evaluated w/in the same
    /// scope.
    pub(crate) fn compare(&self, other: &E, scope: &Scope) -> Result<std::cmp::Ordering, MyError> {
        let a = self.eval(scope)?;
        let b = other.eval(scope)?;
        Ok(a.cmp_sql(&b))
    }

    /// The column name this projects as: an alias wins, a bare field keeps
    /// its name, anything else displays itself.
    pub(crate) fn column_name(&self) -> String {
        match self {
            E::Alias(_, name) => name.to_owned(),
            E::Field(name) => name.to_owned(),
            _ => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_eval() {
        let scope = Scope::root();
        assert_eq!(E::Num(2.5).eval(&scope).unwrap(), Q::Num(2.5));
        assert_eq!(E::Null.eval(&scope).unwrap(), Q::Null);
    }

    #[test]
    fn test_unresolved_field_is_null() {
        let scope = Scope::root();
        assert_eq!(E::Field("ghost".into()).eval(&scope).unwrap(), Q::Null);
    }

    #[test]
    fn test_arithmetic() {
        let mut scope = Scope::root();
        scope.bind("a", Q::Num(6.0));
        let e = E::Dyadic(
            Op::Plus,
            Box::new(E::Field("a".into())),
            Box::new(E::Dyadic(Op::Mult, Box::new(E::Num(2.0)), Box::new(E::Num(3.0)))),
        );
        assert_eq!(e.eval(&scope).unwrap(), Q::Num(12.0));
    }

    #[test]
    fn test_null_propagates_through_arithmetic() {
        let scope = Scope::root();
        let e = E::Dyadic(Op::Plus, Box::new(E::Null), Box::new(E::Num(1.0)));
        assert_eq!(e.eval(&scope).unwrap(), Q::Null);
    }

    #[test]
    fn test_division_by_zero_yields_null() {
        let scope = Scope::root();
        let e = E::Dyadic(Op::Div, Box::new(E::Num(1.0)), Box::new(E::Num(0.0)));
        assert_eq!(e.eval(&scope).unwrap(), Q::Null);
    }

    #[test]
    fn test_missing_function_yields_null() {
        let scope = Scope::root();
        let e = E::Function(Call { name: "no_such_fn".into(), params: vec![] });
        assert_eq!(e.eval(&scope).unwrap(), Q::Null);
    }

    #[test]
    fn test_column_name() {
        let aliased = E::Alias(Box::new(E::Field("a".into())), "total".into());
        assert_eq!(aliased.column_name(), "total");
        assert_eq!(E::Field("Symbol".into()).column_name(), "Symbol");
        let call = E::Function(Call { name: "COUNT".into(), params: vec![E::Star] });
        assert_eq!(call.column_name(), "COUNT(*)");
    }
}
