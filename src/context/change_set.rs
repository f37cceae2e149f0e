//! Pending changes tracked by a context until `save_changes`.

use serde_json::Value;

use crate::entity::EntityKey;
use crate::error::ContextError;
use crate::store::{Change, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeState {
    Added,
    Modified,
    Deleted,
}

impl ChangeState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeState::Added => "added",
            ChangeState::Modified => "modified",
            ChangeState::Deleted => "deleted",
        }
    }
}

/// One tracked record with its pending state.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedChange {
    pub set: String,
    pub key: EntityKey,
    pub state: ChangeState,
    pub record: Value,
}

impl TrackedChange {
    fn to_change(&self) -> Change {
        match self.state {
            ChangeState::Added => Change::Insert {
                set: self.set.clone(),
                key: self.key.clone(),
                record: self.record.clone(),
            },
            ChangeState::Modified => Change::Update {
                set: self.set.clone(),
                key: self.key.clone(),
                record: self.record.clone(),
            },
            ChangeState::Deleted => Change::Delete {
                set: self.set.clone(),
                key: self.key.clone(),
            },
        }
    }
}

/// Tracked changes in the order they were first tracked. One entry per record.
#[derive(Debug, Default)]
pub(crate) struct ChangeSet {
    entries: Vec<TrackedChange>,
}

impl ChangeSet {
    pub fn track(
        &mut self,
        set: &str,
        key: EntityKey,
        state: ChangeState,
        record: Value,
    ) -> Result<(), ContextError> {
        let Some(position) = self
            .entries
            .iter()
            .position(|entry| entry.set == set && entry.key == key)
        else {
            self.entries.push(TrackedChange {
                set: set.to_string(),
                key,
                state,
                record,
            });
            return Ok(());
        };

        let current = self.entries[position].state;
        let next = match (current, state) {
            // Inserting and then deleting a record never reaches the store.
            (ChangeState::Added, ChangeState::Deleted) => {
                self.entries.remove(position);
                return Ok(());
            }
            (ChangeState::Added, ChangeState::Modified) => ChangeState::Added,
            (ChangeState::Deleted, ChangeState::Added) => ChangeState::Modified,
            (_, ChangeState::Added) => {
                return Err(ContextError::Store(StoreError::DuplicateKey {
                    set: set.to_string(),
                    key: key.to_string(),
                }))
            }
            (_, state) => state,
        };

        let entry = &mut self.entries[position];
        entry.state = next;
        entry.record = record;
        Ok(())
    }

    pub fn lookup(&self, set: &str, key: &EntityKey) -> Option<&TrackedChange> {
        self.entries
            .iter()
            .find(|entry| entry.set == set && &entry.key == key)
    }

    pub fn entries(&self) -> &[TrackedChange] {
        &self.entries
    }

    pub fn to_changes(&self) -> Vec<Change> {
        self.entries.iter().map(TrackedChange::to_change).collect()
    }

    pub fn take(&mut self) -> Vec<TrackedChange> {
        std::mem::take(&mut self.entries)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
