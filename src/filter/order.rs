//! Ordering keys and record sorting.

use std::cmp::Ordering;

use serde_json::Value;

use super::expr::{compare_values, resolve_path};
use super::FilterError;

/// One `Member [asc|desc]` item of an ordering string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderKey {
    pub path: Vec<String>,
    pub descending: bool,
}

impl OrderKey {
    /// Resolve the first path segment against a type's fields.
    pub fn bind(&mut self, fields: &[&'static str], type_name: &str) -> Result<(), FilterError> {
        let Some(first) = self.path.first_mut() else {
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
}

/// Stable sort of records by the given keys, first key most significant.
pub fn sort_records(records: &mut [Value], keys: &[OrderKey]) {
    if keys.is_empty() {
        return;
    }
    records.sort_by(|a, b| {
        for key in keys {
            let left = resolve_path(a, &key.path);
            let right = resolve_path(b, &key.path);
            let ordering = total_order(left, right);
            let ordering = if key.descending {
                ordering.reverse()
            } else {
                ordering
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
}

// Values of different kinds order by kind, nulls first.
fn total_order(left: &Value, right: &Value) -> Ordering {
    compare_values(left, right).unwrap_or_else(|| kind_rank(left).cmp(&kind_rank(right)))
}

fn kind_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}
