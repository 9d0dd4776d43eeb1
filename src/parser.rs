// SPDX-License-Identifier: Apache-2.0

#![warn(missing_docs)]

//! Precedence-climbing parsers for value expressions and conditions.
//!
//! Both drive the one [TokenStream] cursor the template extractor also
//! drives; nothing here buffers or rewinds, and lookahead never exceeds a
//! single token.
//!

use crate::{
    MyError,
    cond::Cond,
    expr::{Call, E},
    op::Op,
    statement,
    token::{Kind, TokenStream},
};

// ===== value expressions ====================================================

/// Parse a single comma-free expression. Precedence, low to high: `+ -`,
/// `* /`, unary `-`, primary.
pub(crate) fn parse_expression(ts: &mut TokenStream) -> Result<E, MyError> {
    let lhs = parse_term(ts)?;
    continue_binary(ts, lhs)
}

// resume additive/multiplicative chaining after an already-parsed left side.
// also the hook the conditional parser uses when a parenthesized group turns
// out to be an arithmetic operand...
pub(crate) fn continue_binary(ts: &mut TokenStream, mut lhs: E) -> Result<E, MyError> {
    loop {
        let op = match ts.peek() {
            Some(t) if t.kind == Kind::Operator => match t.text.as_str() {
                "+" => Op::Plus,
                "-" => Op::Minus,
                "*" => Op::Mult,
                "/" => Op::Div,
                _ => break,
            },
            _ => break,
        };
        ts.next()?;
        let rhs = if matches!(op, Op::Mult | Op::Div) {
            parse_unary(ts)?
        } else {
            parse_term(ts)?
        };
        lhs = E::Dyadic(op, Box::new(lhs), Box::new(rhs));
    }
    Ok(lhs)
}

fn parse_term(ts: &mut TokenStream) -> Result<E, MyError> {
    let mut lhs = parse_unary(ts)?;
    loop {
        let op = match ts.peek() {
            Some(t) if t.kind == Kind::Operator && t.text == "*" => Op::Mult,
            Some(t) if t.kind == Kind::Operator && t.text == "/" => Op::Div,
            _ => break,
        };
        ts.next()?;
        let rhs = parse_unary(ts)?;
        lhs = E::Dyadic(op, Box::new(lhs), Box::new(rhs));
    }
    Ok(lhs)
}

fn parse_unary(ts: &mut TokenStream) -> Result<E, MyError> {
    if ts.peek().is_some_and(|t| t.kind == Kind::Operator && t.text == "-") {
        ts.next()?;
        let x = parse_unary(ts)?;
        // fold a negated numeric literal in place...
        return Ok(match x {
            E::Num(n) => E::Num(-n),
            other => E::Monadic(Op::Minus, Box::new(other)),
        });
    }
    parse_primary(ts)
}

fn parse_primary(ts: &mut TokenStream) -> Result<E, MyError> {
    let Some(t) = ts.peek() else {
        return Err(ts.syntax_error("Expression expected"));
    };
    match t.kind {
        Kind::Number => {
            let t = ts.next()?;
            let n = t
                .text
                .parse::<f64>()
                .map_err(|_| MyError::syntax("Malformed number", t.line, t.column))?;
            Ok(E::Num(n))
        }
        Kind::Str => {
            let t = ts.next()?;
            Ok(E::Str(t.text))
        }
        Kind::Keyword if t.text.eq_ignore_ascii_case("true") => {
            ts.next()?;
            Ok(E::Bool(true))
        }
        Kind::Keyword if t.text.eq_ignore_ascii_case("false") => {
            ts.next()?;
            Ok(E::Bool(false))
        }
        Kind::Keyword if t.text.eq_ignore_ascii_case("null") => {
            ts.next()?;
            Ok(E::Null)
        }
        Kind::Identifier => {
            let t = ts.next()?;
            if ts.next_if("(") {
                let params = parse_call_params(ts)?;
                Ok(E::Function(Call { name: t.text, params }))
            } else {
                Ok(E::Field(t.text))
            }
        }
        Kind::Punctuation if t.text == "(" => {
            ts.next()?;
            if ts.is("SELECT") {
                let select = statement::compile_select(ts)?;
                ts.expect(")")?;
                return Ok(E::Subquery(Box::new(select)));
            }
            let inner = parse_expression(ts)?;
            ts.expect(")")?;
            Ok(inner)
        }
        _ => Err(ts.syntax_error("Expression expected")),
    }
}

// arguments of a call whose opening paren was already consumed...
fn parse_call_params(ts: &mut TokenStream) -> Result<Vec<E>, MyError> {
    let mut params = Vec::new();
    if ts.next_if(")") {
        return Ok(params);
    }
    // `count(*)` and friends...
    if ts.next_if("*") {
        ts.expect(")")?;
        params.push(E::Star);
        return Ok(params);
    }
    loop {
        params.push(parse_expression(ts)?);
        if !ts.next_if(",") {
            break;
        }
    }
    ts.expect(")")?;
    Ok(params)
}

/// Parse the comma-separated projection of a SELECT: `*`, expressions, and
/// `expr AS alias` forms.
pub(crate) fn parse_select_items(ts: &mut TokenStream) -> Result<Vec<E>, MyError> {
    let mut items = Vec::new();
    loop {
        let e = if ts.next_if("*") {
            E::Star
        } else {
            let e = parse_expression(ts)?;
            if ts.next_if("AS") {
                let alias = ts.next()?;
                if alias.kind != Kind::Identifier {
                    return Err(MyError::syntax("Alias name expected", alias.line, alias.column));
                }
                E::Alias(Box::new(e), alias.text)
            } else {
                e
            }
        };
        items.push(e);
        if !ts.next_if(",") {
            break;
        }
    }
    Ok(items)
}

// ===== conditions ===========================================================

/// Parse a condition. Precedence, low to high: `OR`, `AND`, `NOT`,
/// predicate. OR/AND associate left, NOT associates right.
pub(crate) fn parse_condition(ts: &mut TokenStream) -> Result<Cond, MyError> {
    let mut lhs = parse_and(ts)?;
    while ts.next_if("OR") {
        let rhs = parse_and(ts)?;
        lhs = Cond::Or(Box::new(lhs), Box::new(rhs));
    }
    Ok(lhs)
}

fn parse_and(ts: &mut TokenStream) -> Result<Cond, MyError> {
    let mut lhs = parse_predicate(ts)?;
    while ts.next_if("AND") {
        let rhs = parse_predicate(ts)?;
        lhs = Cond::And(Box::new(lhs), Box::new(rhs));
    }
    Ok(lhs)
}

fn parse_predicate(ts: &mut TokenStream) -> Result<Cond, MyError> {
    if ts.next_if("NOT") {
        let inner = parse_predicate(ts)?;
        return Ok(Cond::Not(Box::new(inner)));
    }

    // a leading paren may group a condition OR parenthesize the left side of
    // a comparison; parse the inside as a condition and decide once the
    // closing paren is consumed. the stream never rewinds either way...
    if ts.peek().is_some_and(|t| t.kind == Kind::Punctuation && t.text == "(") {
        ts.next()?;
        if ts.is("SELECT") {
            let select = statement::compile_select(ts)?;
            ts.expect(")")?;
            let lhs = continue_binary(ts, E::Subquery(Box::new(select)))?;
            return parse_predicate_tail(ts, lhs);
        }
        let inner = parse_condition(ts)?;
        ts.expect(")")?;
        if let Cond::Test(e) = inner {
            // it was a plain expression after all; it may extend into
            // arithmetic and then a comparison...
            let lhs = continue_binary(ts, e)?;
            return parse_predicate_tail(ts, lhs);
        }
        return Ok(inner);
    }

    let lhs = parse_expression(ts)?;
    parse_predicate_tail(ts, lhs)
}

fn parse_predicate_tail(ts: &mut TokenStream, lhs: E) -> Result<Cond, MyError> {
    // binary comparison?
    if let Some(t) = ts.peek() {
        if t.kind == Kind::Operator {
            if let Some(op) = Op::comparison_from(&t.text) {
                ts.next()?;
                let rhs = parse_expression(ts)?;
                return Ok(Cond::Compare(op, lhs, rhs));
            }
        }
    }

    if ts.next_if("IS") {
        let negated = ts.next_if("NOT");
        ts.expect("NULL")?;
        return Ok(Cond::IsNull { expr: lhs, negated });
    }

    let negated = ts.next_if("NOT");
    if ts.next_if("LIKE") {
        let pattern = parse_expression(ts)?;
        return Ok(Cond::Like { expr: lhs, pattern, negated });
    }
    if ts.next_if("IN") {
        ts.expect("(")?;
        let mut list = Vec::new();
        loop {
            list.push(parse_expression(ts)?);
            if !ts.next_if(",") {
                break;
            }
        }
        ts.expect(")")?;
        return Ok(Cond::In { expr: lhs, list, negated });
    }
    if ts.next_if("BETWEEN") {
        let lo = parse_expression(ts)?;
        ts.expect("AND")?;
        let hi = parse_expression(ts)?;
        return Ok(Cond::Between { expr: lhs, lo, hi, negated });
    }
    if negated {
        return Err(ts.syntax_error("Expected LIKE, IN or BETWEEN after NOT"));
    }

    Ok(Cond::Test(lhs))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expr(input: &str) -> E {
        let mut ts = TokenStream::new(input).unwrap();
        parse_expression(&mut ts).unwrap()
    }

    fn cond(input: &str) -> Cond {
        let mut ts = TokenStream::new(input).unwrap();
        parse_condition(&mut ts).unwrap()
    }

    #[test]
    fn test_precedence() {
        // 1 + 2 * 3 parses as 1 + (2 * 3)...
        let e = expr("1 + 2 * 3");
        match e {
            E::Dyadic(Op::Plus, a, b) => {
                assert_eq!(*a, E::Num(1.0));
                assert!(matches!(*b, E::Dyadic(Op::Mult, _, _)));
            }
            other => panic!("unexpected tree: {other}"),
        }
    }

    #[test]
    fn test_parens_override_precedence() {
        let e = expr("(1 + 2) * 3");
        assert!(matches!(e, E::Dyadic(Op::Mult, _, _)));
    }

    #[test]
    fn test_unary_minus_folds_literals() {
        assert_eq!(expr("-5"), E::Num(-5.0));
        assert!(matches!(expr("-x"), E::Monadic(Op::Minus, _)));
    }

    #[test]
    fn test_count_star() {
        let e = expr("count(*)");
        match e {
            E::Function(Call { name, params }) => {
                assert_eq!(name, "count");
                assert_eq!(params, vec![E::Star]);
            }
            other => panic!("unexpected tree: {other}"),
        }
    }

    #[test]
    fn test_empty_call() {
        let e = expr("now()");
        assert!(matches!(e, E::Function(Call { ref params, .. }) if params.is_empty()));
    }

    #[test]
    fn test_expression_expected() {
        let mut ts = TokenStream::new("").unwrap();
        let x = parse_expression(&mut ts);
        assert!(matches!(x, Err(MyError::Syntax { ref message, .. }) if message.contains("Expression expected")));
    }

    #[test]
    fn test_condition_precedence() {
        // a = 1 OR b = 2 AND c = 3 parses as a = 1 OR (b = 2 AND c = 3)...
        let c = cond("a = 1 OR b = 2 AND c = 3");
        match c {
            Cond::Or(l, r) => {
                assert!(matches!(*l, Cond::Compare(Op::Eq, _, _)));
                assert!(matches!(*r, Cond::And(_, _)));
            }
            other => panic!("unexpected tree: {other}"),
        }
    }

    #[test]
    fn test_grouped_condition() {
        let c = cond("(a = 1 OR b = 2) AND c = 3");
        assert!(matches!(c, Cond::And(_, _)));
    }

    #[test]
    fn test_parenthesized_expression_as_lhs() {
        let c = cond("(a + b) > 10");
        match c {
            Cond::Compare(Op::Gt, lhs, rhs) => {
                assert!(matches!(lhs, E::Dyadic(Op::Plus, _, _)));
                assert_eq!(rhs, E::Num(10.0));
            }
            other => panic!("unexpected tree: {other}"),
        }
    }

    #[test]
    fn test_grouped_lhs_extends_into_arithmetic() {
        let c = cond("(a + b) * 2 > 10");
        match c {
            Cond::Compare(Op::Gt, lhs, _) => assert!(matches!(lhs, E::Dyadic(Op::Mult, _, _))),
            other => panic!("unexpected tree: {other}"),
        }
    }

    #[test]
    fn test_not_binds_tighter_than_and() {
        let c = cond("NOT a = 1 AND b = 2");
        assert!(matches!(c, Cond::And(_, _)));
    }

    #[test]
    fn test_predicates() {
        assert!(matches!(cond("x LIKE 'a%'"), Cond::Like { negated: false, .. }));
        assert!(matches!(cond("x NOT LIKE 'a%'"), Cond::Like { negated: true, .. }));
        assert!(matches!(cond("x IN (1, 2, 3)"), Cond::In { ref list, .. } if list.len() == 3));
        assert!(matches!(cond("x NOT IN (1)"), Cond::In { negated: true, .. }));
        assert!(matches!(cond("x BETWEEN 1 AND 10"), Cond::Between { negated: false, .. }));
        assert!(matches!(cond("x IS NULL"), Cond::IsNull { negated: false, .. }));
        assert!(matches!(cond("x IS NOT NULL"), Cond::IsNull { negated: true, .. }));
    }

    #[test]
    fn test_between_stops_at_and() {
        // the AND separating the bounds must not be folded into `lo`...
        let c = cond("x BETWEEN 1 AND 10 AND y = 2");
        assert!(matches!(c, Cond::And(_, _)));
    }

    #[test]
    fn test_keyword_matching_is_case_insensitive() {
        assert_eq!(cond("x like 'a%'"), cond("x LIKE 'a%'"));
        assert_eq!(expr("COUNT(*)").column_name(), "COUNT(*)");
    }

    #[test]
    fn test_select_items() {
        let mut ts = TokenStream::new("Symbol, LastSale * 2 AS Doubled, * FROM").unwrap();
        let items = parse_select_items(&mut ts).unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0], E::Field("Symbol".into()));
        assert_eq!(items[1].column_name(), "Doubled");
        assert_eq!(items[2], E::Star);
        assert!(ts.is("FROM"));
    }
}
