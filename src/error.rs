use thiserror::Error;

use crate::convert::ConversionError;
use crate::filter::FilterError;
use crate::store::StoreError;

/// Errors from context operations.
#[derive(Debug, Error)]
pub enum ContextError {
    /// No entity set is registered under this name.
    #[error("entity set not found: {0}")]
    SetNotFound(String),

    /// The entity type was never registered with the context.
    #[error("entity type {type_name} is not registered (set {set})")]
    TypeNotRegistered {
        type_name: &'static str,
        set: &'static str,
    },

    /// A record addressed by key or filter does not exist.
    #[error("record not found in {set}: {detail}")]
    RecordNotFound { set: String, detail: String },

    /// A value could not be coerced into the entity type.
    #[error(transparent)]
    Conversion(#[from] ConversionError),

    /// A value could not be coerced into one field.
    #[error("field `{field}`: {source}")]
    FieldConversion {
        field: String,
        #[source]
        source: ConversionError,
    },

    /// A field name does not belong to the entity type.
    #[error("field `{field}` does not belong to {type_name}")]
    UnknownField {
        type_name: &'static str,
        field: String,
    },

    /// A key field is missing from a source document.
    #[error("source document has no value for key `{key}`")]
    MissingKeyValue { key: String },

    /// An update would change the primary key of the record it located.
    #[error("update of {set} record {from} would change its key to {to}")]
    KeyChanged {
        set: String,
        from: String,
        to: String,
    },

    /// Wrong number of primary key values.
    #[error("{set} has {expected} key fields, got {actual} values")]
    KeyArity {
        set: String,
        expected: usize,
        actual: usize,
    },

    /// A single-record operation matched more than one record.
    #[error("expected exactly one {set} record, found {found}")]
    Cardinality { set: String, found: usize },

    /// A dynamic record was expected to be a JSON object.
    #[error("expected a JSON object, got {0}")]
    NotAnObject(String),

    /// Malformed JSON document.
    #[error("invalid JSON document: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
