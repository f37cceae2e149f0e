//! Filter AST and evaluation against dynamic records.

use std::cmp::Ordering;
use std::fmt;

use serde_json::{Number, Value};

use super::FilterError;
use crate::convert::describe;

static NULL: Value = Value::Null;

/// A parsed filter expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Or(Vec<Expr>),
    And(Vec<Expr>),
    Not(Box<Expr>),
    Compare {
        left: Operand,
        op: CompareOp,
        right: Operand,
    },
    Method {
        target: Operand,
        method: StringMethod,
        argument: Operand,
    },
    /// A bare operand used as a predicate, e.g. `IsActive`.
    Operand(Operand),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Literal(Value),
    /// Member path; the first segment names a field of the record.
    Member(Vec<String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }

    fn accepts(&self, ordering: Ordering) -> bool {
        match self {
            CompareOp::Eq => ordering == Ordering::Equal,
            CompareOp::Ne => ordering != Ordering::Equal,
            CompareOp::Lt => ordering == Ordering::Less,
            CompareOp::Le => ordering != Ordering::Greater,
            CompareOp::Gt => ordering == Ordering::Greater,
            CompareOp::Ge => ordering != Ordering::Less,
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringMethod {
    Contains,
    StartsWith,
    EndsWith,
}

impl StringMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            StringMethod::Contains => "Contains",
            StringMethod::StartsWith => "StartsWith",
            StringMethod::EndsWith => "EndsWith",
        }
    }
}

impl Expr {
    /// Resolve member names against a type's fields, ignoring ASCII case.
    ///
    /// Only the first path segment is checked here; nested segments are
    /// looked up per record and resolve to `null` when absent.
    pub fn bind(&mut self, fields: &[&'static str], type_name: &str) -> Result<(), FilterError> {
        match self {
            Expr::Or(exprs) | Expr::And(exprs) => {
                for expr in exprs {
                    expr.bind(fields, type_name)?;
                }
                Ok(())
            }
            Expr::Not(inner) => inner.bind(fields, type_name),
            Expr::Compare { left, right, .. } => {
                left.bind(fields, type_name)?;
                right.bind(fields, type_name)
            }
            Expr::Method {
                target, argument, ..
            } => {
                target.bind(fields, type_name)?;
                argument.bind(fields, type_name)
            }
            Expr::Operand(operand) => operand.bind(fields, type_name),
        }
    }

    /// Evaluate the predicate against one record.
    pub fn evaluate(&self, record: &Value) -> Result<bool, FilterError> {
        match self {
            Expr::Or(exprs) => {
                for expr in exprs {
                    if expr.evaluate(record)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Expr::And(exprs) => {
                for expr in exprs {
                    if !expr.evaluate(record)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Expr::Not(inner) => Ok(!inner.evaluate(record)?),
            Expr::Compare { left, op, right } => {
                let left = left.resolve(record);
                let right = right.resolve(record);
                compare(left, *op, right)
            }
            Expr::Method {
                target,
                method,
                argument,
            } => {
                let target = target.resolve(record);
                let argument = argument.resolve(record);
                match (target, argument) {
                    (Value::Null, _) => Ok(false),
                    (Value::String(haystack), Value::String(needle)) => Ok(match method {
                        StringMethod::Contains => haystack.contains(needle.as_str()),
                        StringMethod::StartsWith => haystack.starts_with(needle.as_str()),
                        StringMethod::EndsWith => haystack.ends_with(needle.as_str()),
                    }),
                    (target, argument) => Err(FilterError::TypeMismatch {
                        op: method.as_str().to_string(),
                        left: describe(target),
                        right: describe(argument),
                    }),
                }
            }
            Expr::Operand(operand) => match operand.resolve(record) {
                Value::Bool(b) => Ok(*b),
                Value::Null => Ok(false),
                other => Err(FilterError::NotBoolean(describe(other))),
            },
        }
    }

    /// Conjunction of two expressions, flattening nested `And`s.
    pub fn and(self, other: Expr) -> Expr {
        match (self, other) {
            (Expr::And(mut left), Expr::And(right)) => {
                left.extend(right);
                Expr::And(left)
            }
            (Expr::And(mut left), right) => {
                left.push(right);
                Expr::And(left)
            }
            (left, right) => Expr::And(vec![left, right]),
        }
    }
}

impl Operand {
    fn bind(&mut self, fields: &[&'static str], type_name: &str) -> Result<(), FilterError> {
        let Operand::Member(path) = self else {
            return Ok(());
        };
        let Some(first) = path.first_mut() else {
            return Ok(());
        };
        match fields.iter().find(|f| f.eq_ignore_ascii_case(first)) {
            Some(field) => {
                *first = field.to_string();
                Ok(())
            }
            None => Err(FilterError::UnknownMember {
                member: first.clone(),
                type_name: type_name.to_string(),
            }),
        }
    }

    fn resolve<'a>(&'a self, record: &'a Value) -> &'a Value {
        match self {
            Operand::Literal(value) => value,
            Operand::Member(path) => resolve_path(record, path),
        }
    }
}

/// Follow a member path through nested objects. Missing members are `null`.
pub(crate) fn resolve_path<'a>(record: &'a Value, path: &[String]) -> &'a Value {
    let mut current = record;
    for segment in path {
        let Value::Object(map) = current else {
            return &NULL;
        };
        current = match map.get(segment.as_str()) {
            Some(value) => value,
            None => match map.iter().find(|(k, _)| k.eq_ignore_ascii_case(segment)) {
                Some((_, value)) => value,
                None => return &NULL,
            },
        };
    }
    current
}

/// Compare two dynamic values of the same kind.
///
/// Returns `None` when the kinds differ (other than equal values).
pub(crate) fn compare_values(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Number(a), Value::Number(b)) => compare_numbers(a, b),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (a, b) if a == b => Some(Ordering::Equal),
        _ => None,
    }
}

// Integers compare exactly against each other and against floats, so the
// ordering stays total past 2^53.
fn compare_numbers(a: &Number, b: &Number) -> Option<Ordering> {
    match (as_integer(a), as_integer(b)) {
        (Some(x), Some(y)) => Some(x.cmp(&y)),
        (Some(x), None) => compare_integer_float(x, b.as_f64()?),
        (None, Some(y)) => compare_integer_float(y, a.as_f64()?).map(Ordering::reverse),
        (None, None) => a.as_f64()?.partial_cmp(&b.as_f64()?),
    }
}

fn as_integer(n: &Number) -> Option<i128> {
    n.as_i64()
        .map(i128::from)
        .or_else(|| n.as_u64().map(i128::from))
}

fn compare_integer_float(integer: i128, float: f64) -> Option<Ordering> {
    const BOUND: f64 = 170_141_183_460_469_231_731_687_303_715_884_105_728.0; // 2^127
    if float.is_nan() {
        return None;
    }
    if float >= BOUND {
        return Some(Ordering::Less);
    }
    if float < -BOUND {
        return Some(Ordering::Greater);
    }

    let whole = float.trunc();
    let fraction = float - whole;
    Some(integer.cmp(&(whole as i128)).then_with(|| {
        if fraction > 0.0 {
            Ordering::Less
        } else if fraction < 0.0 {
            Ordering::Greater
        } else {
            Ordering::Equal
        }
    }))
}

fn compare(left: &Value, op: CompareOp, right: &Value) -> Result<bool, FilterError> {
    match compare_values(left, right) {
        Some(ordering) => Ok(op.accepts(ordering)),
        None => match op {
            CompareOp::Eq => Ok(false),
            CompareOp::Ne => Ok(true),
            // Ordered comparisons against null never match.
            _ if left.is_null() || right.is_null() => Ok(false),
            _ => Err(FilterError::TypeMismatch {
                op: op.to_string(),
                left: describe(left),
                right: describe(right),
            }),
        },
    }
}
