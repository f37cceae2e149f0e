//! InMemoryStore - HashMap-backed entity store for testing and development.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, RwLock};

use serde_json::Value;

use super::{Change, Store, StoreError};
use crate::entity::EntityKey;

type Sets = HashMap<String, BTreeMap<String, Vec<u8>>>;

/// In-memory entity store backed by a HashMap of sets.
///
/// Records are kept as JSON bytes under their encoded key. Clone-friendly
/// via Arc; clones share storage.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    sets: Arc<RwLock<Sets>>,
}

impl InMemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records in a set.
    pub fn len(&self, set: &str) -> Result<usize, StoreError> {
        let sets = self
            .sets
            .read()
            .map_err(|_| StoreError::LockPoisoned("read"))?;
        Ok(sets.get(set).map(BTreeMap::len).unwrap_or(0))
    }

    fn encode(record: &Value) -> Result<Vec<u8>, StoreError> {
        serde_json::to_vec(record).map_err(|e| StoreError::Serde(e.to_string()))
    }

    fn decode(bytes: &[u8]) -> Result<Value, StoreError> {
        serde_json::from_slice(bytes).map_err(|e| StoreError::Serde(e.to_string()))
    }

    // Checks every change against the current state plus the changes before it.
    fn validate(sets: &Sets, changes: &[Change]) -> Result<(), StoreError> {
        let mut inserted: HashSet<(&str, String)> = HashSet::new();
        let mut deleted: HashSet<(&str, String)> = HashSet::new();

        for change in changes {
            let set = change.set();
            let key = change.key().encode();
            let stored = sets
                .get(set)
                .map(|records| records.contains_key(&key))
                .unwrap_or(false);
            let id = (set, key);
            let exists = (stored && !deleted.contains(&id)) || inserted.contains(&id);

            match change {
                Change::Insert { .. } => {
                    if exists {
                        return Err(StoreError::DuplicateKey {
                            set: set.to_string(),
                            key: change.key().to_string(),
                        });
                    }
                    deleted.remove(&id);
                    inserted.insert(id);
                }
                Change::Update { .. } => {
                    if !exists {
                        return Err(StoreError::Missing {
                            set: set.to_string(),
                            key: change.key().to_string(),
                        });
                    }
                }
                Change::Delete { .. } => {
                    if !exists {
                        return Err(StoreError::Missing {
                            set: set.to_string(),
                            key: change.key().to_string(),
                        });
                    }
                    inserted.remove(&id);
                    deleted.insert(id);
                }
            }
        }
        Ok(())
    }
}

impl Store for InMemoryStore {
    fn get(&self, set: &str, key: &EntityKey) -> Result<Option<Value>, StoreError> {
        let sets = self
            .sets
            .read()
            .map_err(|_| StoreError::LockPoisoned("read"))?;

        match sets.get(set).and_then(|records| records.get(&key.encode())) {
            Some(bytes) => Ok(Some(Self::decode(bytes)?)),
            None => Ok(None),
        }
    }

    fn scan(&self, set: &str) -> Result<Vec<Value>, StoreError> {
        let sets = self
            .sets
            .read()
            .map_err(|_| StoreError::LockPoisoned("read"))?;

        match sets.get(set) {
            Some(records) => records.values().map(|bytes| Self::decode(bytes)).collect(),
            None => Ok(Vec::new()),
        }
    }

    fn apply(&self, changes: &[Change]) -> Result<usize, StoreError> {
        // Encode before taking the lock so a bad record leaves the store untouched.
        let mut encoded = Vec::with_capacity(changes.len());
        for change in changes {
            let bytes = match change {
                Change::Insert { record, .. } | Change::Update { record, .. } => {
                    Some(Self::encode(record)?)
                }
                Change::Delete { .. } => None,
            };
            encoded.push(bytes);
        }

        let mut sets = self
            .sets
            .write()
            .map_err(|_| StoreError::LockPoisoned("write"))?;

        Self::validate(&sets, changes)?;

        for (change, bytes) in changes.iter().zip(encoded) {
            let records = sets.entry(change.set().to_string()).or_default();
            let key = change.key().encode();
            match bytes {
                Some(bytes) => {
                    records.insert(key, bytes);
                }
                None => {
                    records.remove(&key);
                }
            }
        }

        Ok(changes.len())
    }
}
