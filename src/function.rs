// SPDX-License-Identifier: Apache-2.0

#![warn(missing_docs)]

//! Function registry and the builtin scalar functions.
//!

use crate::{MyError, queryable::Q, scope::Scope};
use core::fmt;
use jiff::Zoned;

/// Type alias for a generic function that may be invoked in the process of
/// evaluating an expression.
type GenericFn = Box<dyn Fn(&[Q]) -> Result<Q, MyError> + Send + Sync + 'static>;

/// A struct that holds a registered function and its calling convention.
pub struct FnInfo {
    closure: GenericFn,
    /// Expected argument count; `None` means variadic.
    arity: Option<usize>,
}

impl fmt::Debug for FnInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnInfo").field("arity", &self.arity).finish()
    }
}

impl FnInfo {
    pub(crate) fn new<F>(closure: F, arity: Option<usize>) -> Self
    where
        F: Fn(&[Q]) -> Result<Q, MyError> + Send + Sync + 'static,
    {
        Self { closure: Box::new(closure), arity }
    }

    /// Invoke the underlying closure after checking the argument count.
    pub fn invoke(&self, name: &str, args: &[Q]) -> Result<Q, MyError> {
        if let Some(n) = self.arity {
            if args.len() != n {
                return Err(MyError::runtime(format!(
                    "{name}() takes {n} argument(s), got {}",
                    args.len()
                )));
            }
        }
        (self.closure)(args)
    }
}

// a scalar helper: NULL in, NULL out...
fn str_fn(args: &[Q], f: impl Fn(&str) -> String) -> Result<Q, MyError> {
    match &args[0] {
        Q::Null => Ok(Q::Null),
        x => Ok(Q::Str(f(&x.to_text()))),
    }
}

fn num_fn(args: &[Q], f: impl Fn(f64) -> f64) -> Result<Q, MyError> {
    match &args[0] {
        Q::Null => Ok(Q::Null),
        x => Ok(Q::Num(f(x.to_num()?))),
    }
}

pub(crate) fn add_builtins(scope: &mut Scope) {
    // date + time...
    scope.register("now", Some(0), |_| Ok(Q::Str(Zoned::now().to_string())));

    scope.register("today", Some(0), |_| Ok(Q::Str(Zoned::now().date().to_string())));

    // character stuff...
    scope.register("upper", Some(1), |args| str_fn(args, |s| s.to_uppercase()));

    scope.register("lower", Some(1), |args| str_fn(args, |s| s.to_lowercase()));

    scope.register("trim", Some(1), |args| str_fn(args, |s| s.trim().to_owned()));

    scope.register("length", Some(1), |args| match &args[0] {
        Q::Null => Ok(Q::Null),
        x => Ok(Q::Num(x.to_text().chars().count() as f64)),
    });

    scope.register("concat", None, |args| {
        let mut s = String::new();
        for x in args {
            s.push_str(&x.to_text());
        }
        Ok(Q::Str(s))
    });

    // numeric functions...
    scope.register("abs", Some(1), |args| num_fn(args, |x| x.abs()));

    scope.register("round", Some(1), |args| num_fn(args, |x| x.round()));

    scope.register("min", Some(2), |args| {
        if args[0].is_null() || args[1].is_null() {
            return Ok(Q::Null);
        }
        let x = if args[0].cmp_sql(&args[1]).is_le() { &args[0] } else { &args[1] };
        Ok(x.clone())
    });

    scope.register("max", Some(2), |args| {
        if args[0].is_null() || args[1].is_null() {
            return Ok(Q::Null);
        }
        let x = if args[0].cmp_sql(&args[1]).is_ge() { &args[0] } else { &args[1] };
        Ok(x.clone())
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builtin_scope() -> Scope<'static> {
        let mut scope = Scope::root();
        scope.register_builtins();
        scope
    }

    fn call(scope: &Scope, name: &str, args: &[Q]) -> Result<Q, MyError> {
        let info = scope
            .lookup_function(name)
            .unwrap_or_else(|| panic!("builtin '{name}' not registered"));
        info.invoke(name, args)
    }

    #[test]
    fn test_character_builtins() {
        let scope = builtin_scope();
        assert_eq!(call(&scope, "upper", &[Q::Str("abc".into())]).unwrap(), Q::Str("ABC".into()));
        assert_eq!(call(&scope, "trim", &[Q::Str("  x ".into())]).unwrap(), Q::Str("x".into()));
        assert_eq!(call(&scope, "length", &[Q::Str("abc".into())]).unwrap(), Q::Num(3.0));
        assert_eq!(call(&scope, "upper", &[Q::Null]).unwrap(), Q::Null);
    }

    #[test]
    fn test_numeric_builtins() {
        let scope = builtin_scope();
        assert_eq!(call(&scope, "abs", &[Q::Num(-2.5)]).unwrap(), Q::Num(2.5));
        assert_eq!(call(&scope, "round", &[Q::Num(2.4)]).unwrap(), Q::Num(2.0));
        assert_eq!(
            call(&scope, "min", &[Q::Num(2.0), Q::Num(3.0)]).unwrap(),
            Q::Num(2.0)
        );
        assert_eq!(
            call(&scope, "max", &[Q::Str("a".into()), Q::Str("b".into())]).unwrap(),
            Q::Str("b".into())
        );
    }

    #[test]
    fn test_concat_is_variadic() {
        let scope = builtin_scope();
        assert_eq!(
            call(&scope, "concat", &[Q::Str("a".into()), Q::Num(1.0), Q::Null]).unwrap(),
            Q::Str("a1".into())
        );
    }

    #[test]
    fn test_arity_check() {
        let scope = builtin_scope();
        assert!(call(&scope, "abs", &[]).is_err());
        assert!(call(&scope, "now", &[Q::Num(1.0)]).is_err());
    }

    #[test]
    fn test_now_looks_like_a_timestamp() {
        let scope = builtin_scope();
        let x = call(&scope, "now", &[]).unwrap();
        match x {
            Q::Str(s) => assert!(s.contains('T'), "unexpected timestamp shape: {s}"),
            other => panic!("expected a string, got {other:?}"),
        }
    }
}
