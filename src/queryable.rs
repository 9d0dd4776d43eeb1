// SPDX-License-Identifier: Apache-2.0

#![warn(missing_docs)]

//! A [Queryable][Q] is the dynamically typed payload a row column, a bound
//! variable or an evaluated expression carries.
//!

use core::fmt;
use serde::ser::{Serialize, Serializer};
use std::cmp::Ordering;

/// A row column, variable or expression-result possible concrete value
/// variants.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Q {
    /// Unknown or undefined w/in the current context; i.e. SQL NULL.
    #[default]
    Null,
    /// A known boolean value.
    Bool(bool),
    /// A known numeric literal. Integers and floating points share this
    /// variant.
    Num(f64),
    /// A known UTF-8 character string literal.
    Str(String),
}

impl fmt::Display for Q {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Q::Null => write!(f, "NULL"),
            Q::Bool(x) => write!(f, "{}", if *x { "TRUE" } else { "FALSE" }),
            Q::Num(x) => write!(f, "{x}"),
            Q::Str(x) => write!(f, "{x}"),
        }
    }
}

impl Serialize for Q {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Q::Null => serializer.serialize_unit(),
            Q::Bool(x) => serializer.serialize_bool(*x),
            Q::Num(x) => serializer.serialize_f64(*x),
            Q::Str(x) => serializer.serialize_str(x),
        }
    }
}

impl Q {
    /// Create a new instance from the raw text of an external cell --e.g. a
    /// CSV field, **after trimming it**. An empty cell maps to `Null`,
    /// anything that reads as a number to `Num`, TRUE/FALSE (any case) to
    /// `Bool`, and the rest to `Str`.
    pub fn from_text(value: &str) -> Self {
        let x = value.trim();
        if x.is_empty() {
            return Q::Null;
        }
        if let Ok(n) = x.parse::<f64>() {
            return Q::Num(n);
        }
        if x.eq_ignore_ascii_case("true") {
            return Q::Bool(true);
        }
        if x.eq_ignore_ascii_case("false") {
            return Q::Bool(false);
        }
        Q::Str(x.to_owned())
    }

    /// Return TRUE if this is `Null`; FALSE otherwise.
    pub fn is_null(&self) -> bool {
        matches!(self, Q::Null)
    }

    /// Return the current value of this if it's a boolean value.
    pub fn to_bool(&self) -> Result<bool, crate::MyError> {
        match self {
            Q::Bool(x) => Ok(*x),
            _ => Err(crate::MyError::runtime(format!("{self} is not a boolean"))),
        }
    }

    /// Return the current value of this if it's a number, coercing a string
    /// that reads as one.
    pub fn to_num(&self) -> Result<f64, crate::MyError> {
        match self {
            Q::Num(x) => Ok(*x),
            Q::Str(x) => x
                .trim()
                .parse::<f64>()
                .map_err(|_| crate::MyError::runtime(format!("'{x}' is not a number"))),
            _ => Err(crate::MyError::runtime(format!("{self} is not a number"))),
        }
    }

    /// Render this as the text an output sink should carry. `Null` maps to
    /// an empty cell, everything else to its display form.
    pub fn to_text(&self) -> String {
        match self {
            Q::Null => String::new(),
            _ => self.to_string(),
        }
    }

    /// Return TRUE if both arguments carry the same variant; FALSE otherwise.
    pub(crate) fn same_type(a: &Q, b: &Q) -> bool {
        std::mem::discriminant(a) == std::mem::discriminant(b)
    }

    /// Total ordering used by both comparison predicates and ORDER BY.
    ///
    /// `Null` sorts below every non-null payload. Numbers and strings order
    /// naturally. A mixed number/string pair is compared numerically when the
    /// string side reads as a number, and by display text otherwise.
    pub fn cmp_sql(&self, other: &Q) -> Ordering {
        match (self, other) {
            (Q::Null, Q::Null) => Ordering::Equal,
            (Q::Null, _) => Ordering::Less,
            (_, Q::Null) => Ordering::Greater,
            (Q::Bool(a), Q::Bool(b)) => a.cmp(b),
            (Q::Num(a), Q::Num(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            (Q::Str(a), Q::Str(b)) => a.cmp(b),
            (Q::Num(a), Q::Str(s)) => match s.trim().parse::<f64>() {
                Ok(b) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
                Err(_) => self.to_string().cmp(&other.to_string()),
            },
            (Q::Str(_), Q::Num(_)) => other.cmp_sql(self).reverse(),
            _ => self.to_string().cmp(&other.to_string()),
        }
    }
}

/// Whether `input` matches the SQL LIKE `pattern`, where `%` matches any run
/// of characters, `_` matches exactly one, and `\` escapes the next pattern
/// character.
pub(crate) fn like(input: &str, pattern: &str) -> bool {
    // recursively compare 2 sub-strings, 1 char at a time...
    fn recursive(input: &[char], pattern: &[char]) -> bool {
        // w/ an empty pattern, only empty input matches...
        if pattern.is_empty() {
            return input.is_empty();
        }

        if input.is_empty() {
            return pattern.iter().all(|&x| x == '%');
        }

        if pattern[0] == '\\' && pattern.len() > 1 {
            return (input[0] == pattern[1]) && recursive(&input[1..], &pattern[2..]);
        }

        if pattern[0] == '%' {
            return recursive(&input[1..], pattern) || recursive(input, &pattern[1..]);
        }

        if pattern[0] == '_' {
            return recursive(&input[1..], &pattern[1..]);
        }

        (input[0] == pattern[0]) && recursive(&input[1..], &pattern[1..])
    }

    // reduce runs of unescaped '%' wildcards to just one occurrence...
    fn reduce_wildcards(pattern: &str) -> Vec<char> {
        let mut result: Vec<char> = Vec::with_capacity(pattern.len());
        let mut chars = pattern.chars();
        let mut saw_wc = false;
        while let Some(c) = chars.next() {
            if c == '\\' {
                result.push('\\');
                if let Some(n) = chars.next() {
                    result.push(n);
                }
                saw_wc = false;
            } else if c == '%' {
                if !saw_wc {
                    result.push('%');
                }
                saw_wc = true;
            } else {
                result.push(c);
                saw_wc = false;
            }
        }
        result
    }

    let input: Vec<char> = input.chars().collect();
    let pattern = reduce_wildcards(pattern);
    recursive(&input, &pattern)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_text() {
        assert_eq!(Q::from_text(""), Q::Null);
        assert_eq!(Q::from_text("  "), Q::Null);
        assert_eq!(Q::from_text("150.25"), Q::Num(150.25));
        assert_eq!(Q::from_text("1e3"), Q::Num(1000.0));
        assert_eq!(Q::from_text("True"), Q::Bool(true));
        assert_eq!(Q::from_text("AAPL"), Q::Str("AAPL".into()));
    }

    #[test]
    fn test_null_sorts_low() {
        assert_eq!(Q::Null.cmp_sql(&Q::Num(-1e9)), Ordering::Less);
        assert_eq!(Q::Num(-1e9).cmp_sql(&Q::Null), Ordering::Greater);
        assert_eq!(Q::Null.cmp_sql(&Q::Null), Ordering::Equal);
    }

    #[test]
    fn test_mixed_comparisons() {
        assert_eq!(Q::Num(2.0).cmp_sql(&Q::Str("10".into())), Ordering::Less);
        assert_eq!(Q::Str("10".into()).cmp_sql(&Q::Num(2.0)), Ordering::Greater);
        assert_eq!(Q::Str("b".into()).cmp_sql(&Q::Str("a".into())), Ordering::Greater);
    }

    #[test]
    fn test_to_num_coercion() {
        assert_eq!(Q::Str(" 42 ".into()).to_num().unwrap(), 42.0);
        assert!(Q::Str("forty-two".into()).to_num().is_err());
        assert!(Q::Bool(true).to_num().is_err());
    }

    #[test]
    fn test_like() {
        assert!(like("Mike Smith", "%Mike%"));
        assert!(like("hello", "h_llo"));
        assert!(!like("hello", "h_go"));
        assert!(like("100%", "100\\%"));
        assert!(like("", "%%"));
        assert!(!like("x", ""));
        assert!(like("aXbXc", "a%c"));
    }

    #[test]
    fn test_display() {
        assert_eq!(Q::Num(5.0).to_string(), "5");
        assert_eq!(Q::Num(150.25).to_string(), "150.25");
        assert_eq!(Q::Null.to_text(), "");
        assert_eq!(Q::Bool(false).to_string(), "FALSE");
    }
}
