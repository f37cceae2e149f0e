//! Store - the mapped entity store behind a context.
//!
//! A store holds JSON records grouped by entity set and addressed by
//! [`EntityKey`]. It knows nothing about entity types; the context coerces
//! records before they reach the store and after they leave it.

mod in_memory;

use serde_json::Value;
use thiserror::Error;

use crate::entity::EntityKey;

pub use in_memory::InMemoryStore;

/// A single write handed to [`Store::apply`].
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    Insert {
        set: String,
        key: EntityKey,
        record: Value,
    },
    Update {
        set: String,
        key: EntityKey,
        record: Value,
    },
    Delete {
        set: String,
        key: EntityKey,
    },
}

impl Change {
    pub fn set(&self) -> &str {
        match self {
            Change::Insert { set, .. } | Change::Update { set, .. } | Change::Delete { set, .. } => {
                set
            }
        }
    }

    pub fn key(&self) -> &EntityKey {
        match self {
            Change::Insert { key, .. } | Change::Update { key, .. } | Change::Delete { key, .. } => {
                key
            }
        }
    }
}

/// Error type for store operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("store lock poisoned during {0}")]
    LockPoisoned(&'static str),

    #[error("duplicate key {key} in {set}")]
    DuplicateKey { set: String, key: String },

    #[error("no record with key {key} in {set}")]
    Missing { set: String, key: String },

    #[error("record serialization error: {0}")]
    Serde(String),
}

/// Abstract storage of entity records.
pub trait Store: Send + Sync {
    /// Get one record by key. Returns None if not found.
    fn get(&self, set: &str, key: &EntityKey) -> Result<Option<Value>, StoreError>;

    /// All records of a set, in store order.
    fn scan(&self, set: &str) -> Result<Vec<Value>, StoreError>;

    /// Apply a batch of changes atomically. Either every change is applied
    /// or none is. Returns the number of applied changes.
    fn apply(&self, changes: &[Change]) -> Result<usize, StoreError>;
}
