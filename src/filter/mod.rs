//! Dynamic filter and ordering strings.
//!
//! Filters are boolean expressions over a record's fields:
//!
//! ```text
//! Price > 5 && (Name.Contains("lamp") || not Discontinued)
//! Id == 1 and Sku == 'A-1'
//! ```
//!
//! Orderings are comma-separated members with an optional direction:
//!
//! ```text
//! Category.Name asc, Price desc
//! ```
//!
//! Parsing only checks syntax. [`Expr::bind`] and [`OrderKey::bind`] check
//! member names against an entity type's fields before evaluation.

mod expr;
mod order;
mod parser;

use thiserror::Error;

pub use expr::{CompareOp, Expr, Operand, StringMethod};
pub use order::{sort_records, OrderKey};
pub use parser::{parse_filter, parse_ordering};

/// Errors from parsing or evaluating filters and orderings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    /// The string is not a valid filter or ordering.
    #[error("{0}")]
    Parse(String),

    /// A member does not name a field of the entity type.
    #[error("no field `{member}` exists on {type_name}")]
    UnknownMember { member: String, type_name: String },

    /// An operator was applied to values of incompatible kinds.
    #[error("cannot apply `{op}` to {left} and {right}")]
    TypeMismatch {
        op: String,
        left: String,
        right: String,
    },

    /// A bare operand used as a predicate is not a boolean.
    #[error("expected a boolean predicate, got {0}")]
    NotBoolean(String),
}
