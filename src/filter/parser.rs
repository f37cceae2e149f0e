//! Filter and ordering parser using pest

use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;
use serde_json::{Number, Value};

use super::expr::{CompareOp, Expr, Operand, StringMethod};
use super::order::OrderKey;
use super::FilterError;

#[derive(Parser)]
#[grammar = "filter/grammar.pest"]
struct FilterParser;

type Result<T> = std::result::Result<T, FilterError>;

/// Parse a dynamic filter string into an expression tree.
pub fn parse_filter(source: &str) -> Result<Expr> {
    let mut pairs = FilterParser::parse(Rule::filter, source)
        .map_err(|e| FilterError::Parse(format!("Parse error: {}", e)))?;

    let filter = pairs
        .next()
        .ok_or_else(|| FilterError::Parse("Expected filter".to_string()))?;
    let expr = filter
        .into_inner()
        .next()
        .ok_or_else(|| FilterError::Parse("Expected expression".to_string()))?;

    parse_expr(expr)
}

/// Parse a dynamic ordering string (`"Name asc, Price desc"`).
pub fn parse_ordering(source: &str) -> Result<Vec<OrderKey>> {
    let mut pairs = FilterParser::parse(Rule::ordering, source)
        .map_err(|e| FilterError::Parse(format!("Parse error: {}", e)))?;

    let ordering = pairs
        .next()
        .ok_or_else(|| FilterError::Parse("Expected ordering".to_string()))?;

    let mut keys = Vec::new();
    for item in ordering.into_inner() {
        match item.as_rule() {
            Rule::order_item => keys.push(parse_order_item(item)?),
            Rule::EOI => {}
            _ => {
                return Err(FilterError::Parse(format!(
                    "Unexpected rule: {:?}",
                    item.as_rule()
                )))
            }
        }
    }
    Ok(keys)
}

fn parse_order_item(pair: Pair<Rule>) -> Result<OrderKey> {
    let mut inner = pair.into_inner();

    let path = parse_member(
        inner
            .next()
            .ok_or_else(|| FilterError::Parse("Expected order member".to_string()))?,
    );

    let descending = match inner.next() {
        Some(direction) => direction
            .into_inner()
            .next()
            .map(|d| d.as_rule() == Rule::descending)
            .unwrap_or(false),
        None => false,
    };

    Ok(OrderKey { path, descending })
}

fn parse_expr(pair: Pair<Rule>) -> Result<Expr> {
    let mut exprs = Vec::new();
    for inner in pair.into_inner() {
        if inner.as_rule() == Rule::and_expr {
            exprs.push(parse_and_expr(inner)?);
        }
    }

    match exprs.len() {
        0 => Err(FilterError::Parse("Expected expression".to_string())),
        1 => Ok(exprs.remove(0)),
        _ => Ok(Expr::Or(exprs)),
    }
}

fn parse_and_expr(pair: Pair<Rule>) -> Result<Expr> {
    let mut exprs = Vec::new();
    for inner in pair.into_inner() {
        if inner.as_rule() == Rule::unary_expr {
            exprs.push(parse_unary_expr(inner)?);
        }
    }

    match exprs.len() {
        0 => Err(FilterError::Parse("Expected expression".to_string())),
        1 => Ok(exprs.remove(0)),
        _ => Ok(Expr::And(exprs)),
    }
}

fn parse_unary_expr(pair: Pair<Rule>) -> Result<Expr> {
    let mut inner = pair.into_inner();
    let first = inner
        .next()
        .ok_or_else(|| FilterError::Parse("Expected unary expression".to_string()))?;

    match first.as_rule() {
        Rule::not_op => {
            let operand = inner
                .next()
                .ok_or_else(|| FilterError::Parse("Expected expression after not".to_string()))?;
            Ok(Expr::Not(Box::new(parse_unary_expr(operand)?)))
        }
        Rule::primary => parse_primary(first),
        rule => Err(FilterError::Parse(format!("Unexpected rule: {:?}", rule))),
    }
}

fn parse_primary(pair: Pair<Rule>) -> Result<Expr> {
    let inner = pair
        .into_inner()
        .next()
        .ok_or_else(|| FilterError::Parse("Expected primary expression".to_string()))?;

    match inner.as_rule() {
        Rule::expr => parse_expr(inner),
        Rule::method_call => parse_method_call(inner),
        Rule::comparison => parse_comparison(inner),
        rule => Err(FilterError::Parse(format!(
            "Unexpected primary expression: {:?}",
            rule
        ))),
    }
}

fn parse_comparison(pair: Pair<Rule>) -> Result<Expr> {
    let mut inner = pair.into_inner();

    let left = parse_operand(
        inner
            .next()
            .ok_or_else(|| FilterError::Parse("Expected operand".to_string()))?,
    )?;

    let Some(op_pair) = inner.next() else {
        return Ok(Expr::Operand(left));
    };
    let op = parse_compare_op(op_pair)?;

    let right = parse_operand(
        inner
            .next()
            .ok_or_else(|| FilterError::Parse("Expected right operand".to_string()))?,
    )?;

    Ok(Expr::Compare { left, op, right })
}

fn parse_compare_op(pair: Pair<Rule>) -> Result<CompareOp> {
    let inner = pair
        .into_inner()
        .next()
        .ok_or_else(|| FilterError::Parse("Expected comparison operator".to_string()))?;

    match inner.as_rule() {
        Rule::eq => Ok(CompareOp::Eq),
        Rule::ne => Ok(CompareOp::Ne),
        Rule::lt => Ok(CompareOp::Lt),
        Rule::le => Ok(CompareOp::Le),
        Rule::gt => Ok(CompareOp::Gt),
        Rule::ge => Ok(CompareOp::Ge),
        rule => Err(FilterError::Parse(format!("Unexpected operator: {:?}", rule))),
    }
}

fn parse_method_call(pair: Pair<Rule>) -> Result<Expr> {
    let mut inner = pair.into_inner();

    let target = Operand::Member(parse_member(
        inner
            .next()
            .ok_or_else(|| FilterError::Parse("Expected method target".to_string()))?,
    ));

    let method_pair = inner
        .next()
        .and_then(|m| m.into_inner().next())
        .ok_or_else(|| FilterError::Parse("Expected method name".to_string()))?;
    let method = match method_pair.as_rule() {
        Rule::contains => StringMethod::Contains,
        Rule::starts_with => StringMethod::StartsWith,
        Rule::ends_with => StringMethod::EndsWith,
        rule => return Err(FilterError::Parse(format!("Unexpected method: {:?}", rule))),
    };

    let argument = parse_operand(
        inner
            .next()
            .ok_or_else(|| FilterError::Parse("Expected method argument".to_string()))?,
    )?;

    Ok(Expr::Method {
        target,
        method,
        argument,
    })
}

fn parse_operand(pair: Pair<Rule>) -> Result<Operand> {
    let inner = pair
        .into_inner()
        .next()
        .ok_or_else(|| FilterError::Parse("Expected operand".to_string()))?;

    match inner.as_rule() {
        Rule::literal => Ok(Operand::Literal(parse_literal(inner)?)),
        Rule::member => Ok(Operand::Member(parse_member(inner))),
        rule => Err(FilterError::Parse(format!("Unexpected operand: {:?}", rule))),
    }
}

fn parse_member(pair: Pair<Rule>) -> Vec<String> {
    pair.into_inner()
        .filter(|p| p.as_rule() == Rule::ident)
        .map(|p| p.as_str().to_string())
        .collect()
}

fn parse_literal(pair: Pair<Rule>) -> Result<Value> {
    let inner = pair
        .into_inner()
        .next()
        .ok_or_else(|| FilterError::Parse("Expected literal".to_string()))?;

    match inner.as_rule() {
        Rule::null_lit => Ok(Value::Null),
        Rule::boolean => Ok(Value::Bool(inner.as_str().eq_ignore_ascii_case("true"))),
        Rule::number => parse_number(inner.as_str()),
        Rule::string => {
            let raw = inner
                .into_inner()
                .next()
                .map(|p| p.as_str())
                .unwrap_or("");
            Ok(Value::String(unescape(raw)))
        }
        rule => Err(FilterError::Parse(format!("Unexpected literal: {:?}", rule))),
    }
}

fn parse_number(text: &str) -> Result<Value> {
    let is_integer = !text.contains(['.', 'e', 'E']);
    if is_integer {
        if let Ok(i) = text.parse::<i64>() {
            return Ok(Value::Number(Number::from(i)));
        }
        if let Ok(u) = text.parse::<u64>() {
            return Ok(Value::Number(Number::from(u)));
        }
    }

    text.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .ok_or_else(|| FilterError::Parse(format!("Invalid number literal: {}", text)))
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
