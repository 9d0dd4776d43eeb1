// SPDX-License-Identifier: Apache-2.0

#![warn(missing_docs)]

//! Boolean-producing condition tree the conditional parser targets.
//!

use crate::{
    MyError,
    expr::E,
    op::Op,
    queryable::{Q, like},
    scope::Scope,
};
use core::fmt;
use std::cmp::Ordering;

/// Condition variants...
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Cond {
    /// `a <op> b` where `<op>` is one of `= <> < <= > >=`.
    Compare(Op, E, E),
    /// `x [NOT] LIKE pattern`.
    Like { expr: E, pattern: E, negated: bool },
    /// `x [NOT] IN ( v1, v2, ... )`.
    In { expr: E, list: Vec<E>, negated: bool },
    /// `x [NOT] BETWEEN lo AND hi`.
    Between { expr: E, lo: E, hi: E, negated: bool },
    /// `x IS [NOT] NULL`.
    IsNull { expr: E, negated: bool },
    And(Box<Cond>, Box<Cond>),
    Or(Box<Cond>, Box<Cond>),
    Not(Box<Cond>),
    /// A bare expression used as a predicate; satisfied iff it evaluates to
    /// TRUE. NULL is unsatisfied, anything non-boolean is an error.
    Test(E),
}

impl fmt::Display for Cond {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Cond::Compare(op, a, b) => write!(f, "{a} {op} {b}"),
            Cond::Like { expr, pattern, negated } => {
                write!(f, "{expr} {}LIKE {pattern}", if *negated { "NOT " } else { "" })
            }
            Cond::In { expr, list, negated } => {
                let items: Vec<_> = list.iter().map(|x| x.to_string()).collect();
                write!(f, "{expr} {}IN ({})", if *negated { "NOT " } else { "" }, items.join(", "))
            }
            Cond::Between { expr, lo, hi, negated } => {
                write!(f, "{expr} {}BETWEEN {lo} AND {hi}", if *negated { "NOT " } else { "" })
            }
            Cond::IsNull { expr, negated } => {
                write!(f, "{expr} IS {}NULL", if *negated { "NOT " } else { "" })
            }
            Cond::And(a, b) => write!(f, "({a} AND {b})"),
            Cond::Or(a, b) => write!(f, "({a} OR {b})"),
            Cond::Not(x) => write!(f, "NOT ({x})"),
            Cond::Test(x) => write!(f, "{x}"),
        }
    }
}

impl Cond {
    /// Whether the given scope satisfies this condition. Conjunction and
    /// disjunction short-circuit: the right side is never evaluated when the
    /// left decides the outcome.
    pub(crate) fn is_satisfied(&self, scope: &Scope) -> Result<bool, MyError> {
        match self {
            Cond::Compare(op, a, b) => {
                let ord = a.compare(b, scope)?;
                let x = match op {
                    Op::Eq => ord == Ordering::Equal,
                    Op::Neq => ord != Ordering::Equal,
                    Op::Lt => ord == Ordering::Less,
                    Op::Lte => ord != Ordering::Greater,
                    Op::Gt => ord == Ordering::Greater,
                    Op::Gte => ord != Ordering::Less,
                    _ => {
                        return Err(MyError::runtime(format!(
                            "'{op}' is not a comparison operator"
                        )));
                    }
                };
                Ok(x)
            }
            Cond::Like { expr, pattern, negated } => {
                let input = expr.eval(scope)?;
                let pattern = pattern.eval(scope)?;
                if input.is_null() || pattern.is_null() {
                    return Ok(false);
                }
                let x = like(&input.to_text(), &pattern.to_text());
                Ok(x != *negated)
            }
            Cond::In { expr, list, negated } => {
                let x = expr.eval(scope)?;
                let mut contained = false;
                for item in list {
                    let y = item.eval(scope)?;
                    if Q::same_type(&x, &y) && x.cmp_sql(&y) == Ordering::Equal {
                        contained = true;
                        break;
                    }
                }
                Ok(contained != *negated)
            }
            Cond::Between { expr, lo, hi, negated } => {
                let x = expr.eval(scope)?;
                let lo = lo.eval(scope)?;
                let hi = hi.eval(scope)?;
                // tolerate reversed bounds...
                let (lo, hi) = if lo.cmp_sql(&hi) == Ordering::Greater { (hi, lo) } else { (lo, hi) };
                let x = x.cmp_sql(&lo) != Ordering::Less && x.cmp_sql(&hi) != Ordering::Greater;
                Ok(x != *negated)
            }
            Cond::IsNull { expr, negated } => {
                let x = expr.eval(scope)?.is_null();
                Ok(x != *negated)
            }
            Cond::And(a, b) => {
                if !a.is_satisfied(scope)? {
                    return Ok(false);
                }
                b.is_satisfied(scope)
            }
            Cond::Or(a, b) => {
                if a.is_satisfied(scope)? {
                    return Ok(true);
                }
                b.is_satisfied(scope)
            }
            Cond::Not(x) => Ok(!x.is_satisfied(scope)?),
            Cond::Test(x) => match x.eval(scope)? {
                Q::Bool(b) => Ok(b),
                Q::Null => Ok(false),
                other => Err(MyError::runtime(format!("{other} is not a boolean predicate"))),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering as AtomicOrdering},
    };

    fn eq(a: E, b: E) -> Cond {
        Cond::Compare(Op::Eq, a, b)
    }

    #[test]
    fn test_comparisons() {
        let mut scope = Scope::root();
        scope.bind("price", Q::Num(0.75));
        let c = Cond::Compare(Op::Lt, E::Field("price".into()), E::Num(1.0));
        assert!(c.is_satisfied(&scope).unwrap());
        let c = Cond::Compare(Op::Gte, E::Field("price".into()), E::Num(1.0));
        assert!(!c.is_satisfied(&scope).unwrap());
    }

    #[test]
    fn test_null_compares_low() {
        let scope = Scope::root();
        // an unbound field evaluates to NULL which sorts below 1...
        let c = Cond::Compare(Op::Lt, E::Field("ghost".into()), E::Num(1.0));
        assert!(c.is_satisfied(&scope).unwrap());
    }

    #[test]
    fn test_like_and_not_like() {
        let mut scope = Scope::root();
        scope.bind("owner", Q::Str("Mike Smith".into()));
        let c = Cond::Like {
            expr: E::Field("owner".into()),
            pattern: E::Str("%Mike%".into()),
            negated: false,
        };
        assert!(c.is_satisfied(&scope).unwrap());
        let c = Cond::Like {
            expr: E::Field("owner".into()),
            pattern: E::Str("%Mike%".into()),
            negated: true,
        };
        assert!(!c.is_satisfied(&scope).unwrap());
    }

    #[test]
    fn test_in_requires_same_type() {
        let mut scope = Scope::root();
        scope.bind("n", Q::Num(1.0));
        let c = Cond::In {
            expr: E::Field("n".into()),
            list: vec![E::Str("1".into()), E::Num(2.0)],
            negated: false,
        };
        // the string '1' does not match the number 1...
        assert!(!c.is_satisfied(&scope).unwrap());
    }

    #[test]
    fn test_between_reversed_bounds() {
        let mut scope = Scope::root();
        scope.bind("n", Q::Num(15.0));
        let c = Cond::Between {
            expr: E::Field("n".into()),
            lo: E::Num(20.0),
            hi: E::Num(10.0),
            negated: false,
        };
        assert!(c.is_satisfied(&scope).unwrap());
    }

    #[test]
    fn test_and_short_circuits() {
        let mut scope = Scope::root();
        let hits = Arc::new(AtomicUsize::new(0));
        let probe = Arc::clone(&hits);
        scope.register("bump", Some(0), move |_| {
            probe.fetch_add(1, AtomicOrdering::SeqCst);
            Ok(Q::Bool(true))
        });
        let c = Cond::And(
            Box::new(eq(E::Num(1.0), E::Num(2.0))),
            Box::new(Cond::Test(E::Function(crate::expr::Call {
                name: "bump".into(),
                params: vec![],
            }))),
        );
        assert!(!c.is_satisfied(&scope).unwrap());
        assert_eq!(hits.load(AtomicOrdering::SeqCst), 0);
    }

    #[test]
    fn test_or_short_circuits() {
        let mut scope = Scope::root();
        let hits = Arc::new(AtomicUsize::new(0));
        let probe = Arc::clone(&hits);
        scope.register("bump", Some(0), move |_| {
            probe.fetch_add(1, AtomicOrdering::SeqCst);
            Ok(Q::Bool(true))
        });
        let c = Cond::Or(
            Box::new(eq(E::Num(1.0), E::Num(1.0))),
            Box::new(Cond::Test(E::Function(crate::expr::Call {
                name: "bump".into(),
                params: vec![],
            }))),
        );
        assert!(c.is_satisfied(&scope).unwrap());
        assert_eq!(hits.load(AtomicOrdering::SeqCst), 0);
    }
}
