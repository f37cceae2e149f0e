//! Operations shared by named and typed entity set handles.
//!
//! Everything here works on dynamic records and an [`EntityType`]; the typed
//! handle converts to and from `E` around these calls.

use serde_json::{Map, Value};

use super::change_set::{ChangeSet, ChangeState};
use super::query::Query;
use crate::convert::render_literal;
use crate::entity::EntityKey;
use crate::error::ContextError;
use crate::options::ContextOptions;
use crate::registry::{as_object, EntityType};
use crate::store::Store;

pub(crate) struct Session<'a, S> {
    store: &'a S,
    options: &'a ContextOptions,
    changes: &'a mut ChangeSet,
}

impl<'a, S: Store> Session<'a, S> {
    pub fn new(store: &'a S, options: &'a ContextOptions, changes: &'a mut ChangeSet) -> Self {
        Self {
            store,
            options,
            changes,
        }
    }

    pub fn query(&self, entity_type: &'a EntityType) -> Query<'a, S> {
        Query::new(self.store, entity_type)
    }

    pub fn find(
        &self,
        entity_type: &EntityType,
        keys: &[Value],
    ) -> Result<Option<Value>, ContextError> {
        let key = entity_type.normalize_key(keys)?;
        self.find_key(entity_type, &key)
    }

    // Tracked changes win over the store.
    fn find_key(
        &self,
        entity_type: &EntityType,
        key: &EntityKey,
    ) -> Result<Option<Value>, ContextError> {
        if let Some(tracked) = self.changes.lookup(entity_type.set_name(), key) {
            return Ok(match tracked.state {
                ChangeState::Deleted => None,
                _ => Some(tracked.record.clone()),
            });
        }
        Ok(self.store.get(entity_type.set_name(), key)?)
    }

    pub fn track(
        &mut self,
        entity_type: &EntityType,
        key: EntityKey,
        state: ChangeState,
        record: Value,
    ) -> Result<(), ContextError> {
        tracing::debug!(
            set = entity_type.set_name(),
            key = %key,
            state = state.as_str(),
            "tracked change"
        );
        self.changes
            .track(entity_type.set_name(), key, state, record)
    }

    fn track_record(
        &mut self,
        entity_type: &EntityType,
        state: ChangeState,
        record: Value,
    ) -> Result<Value, ContextError> {
        let key = entity_type.key_of(&record)?;
        self.track(entity_type, key, state, record.clone())?;
        Ok(record)
    }

    pub fn add(&mut self, entity_type: &EntityType, record: Value) -> Result<Value, ContextError> {
        let record = entity_type.coerce(record)?;
        self.track_record(entity_type, ChangeState::Added, record)
    }

    pub fn remove(
        &mut self,
        entity_type: &EntityType,
        record: Value,
    ) -> Result<Value, ContextError> {
        let record = entity_type.coerce(record)?;
        self.track_record(entity_type, ChangeState::Deleted, record)
    }

    pub fn remove_where(
        &mut self,
        entity_type: &'a EntityType,
        filter: &str,
    ) -> Result<Vec<Value>, ContextError> {
        let matches = self.query(entity_type).filter(filter)?.to_vec()?;
        for record in &matches {
            self.track_record(entity_type, ChangeState::Deleted, record.clone())?;
        }
        Ok(matches)
    }

    /// Copy `source` into `target` except the key fields, then track it as
    /// modified. Fails with [`ContextError::KeyChanged`] when the copy would
    /// move the record to another primary key.
    pub fn update(
        &mut self,
        entity_type: &EntityType,
        target: Value,
        source: &Map<String, Value>,
        key_names: &[&str],
    ) -> Result<Value, ContextError> {
        let located = entity_type.key_of(&target)?;
        let updated = entity_type.copy_into(target, source, key_names)?;
        let key = entity_type.key_of(&updated)?;
        check_key_unchanged(entity_type.set_name(), &located, &key)?;

        self.track(entity_type, key, ChangeState::Modified, updated.clone())?;
        Ok(updated)
    }

    /// Locate the existing record from the key values embedded in `source`,
    /// then update it.
    pub fn update_by_keys(
        &mut self,
        entity_type: &'a EntityType,
        source: &Value,
        key_names: &[&str],
    ) -> Result<Value, ContextError> {
        let source = as_object(source)?;
        let key_names = effective_key_names(entity_type, key_names)?;
        let target = self.locate(entity_type, source, &key_names)?;
        self.update(entity_type, target, source, &key_names)
    }

    /// Parse `json`, find the unique record whose key fields equal the
    /// document's, then update it.
    pub fn update_from_json(
        &mut self,
        entity_type: &'a EntityType,
        json: &str,
        key_names: &[&str],
    ) -> Result<Value, ContextError> {
        let document: Value = serde_json::from_str(json)?;
        let source = as_object(&document)?;
        let key_names = effective_key_names(entity_type, key_names)?;

        let filter = key_filter(entity_type, source, &key_names)?;
        let target = self
            .query(entity_type)
            .filter(&filter)?
            .single_required()?;

        self.update(entity_type, target, source, &key_names)
    }

    pub fn get_all(
        &self,
        entity_type: &'a EntityType,
        filter: Option<&str>,
        order_by: &str,
        page: usize,
        count: usize,
        descending: bool,
    ) -> Result<Vec<Value>, ContextError> {
        let direction = if descending { "desc" } else { "asc" };
        let count = self.options.page_size(count);

        let mut query = self.query(entity_type);
        if let Some(filter) = filter {
            query = query.filter(filter)?;
        }
        query
            .order_by(&format!("{} {}", order_by, direction))?
            .skip(page.saturating_sub(1).saturating_mul(count))
            .take(count)
            .to_vec()
    }

    fn locate(
        &self,
        entity_type: &'a EntityType,
        source: &Map<String, Value>,
        key_names: &[&str],
    ) -> Result<Value, ContextError> {
        if entity_type.is_primary_key(key_names) {
            let values = entity_type
                .key_names()
                .iter()
                .map(|name| source_value(source, name).cloned())
                .collect::<Result<Vec<_>, _>>()?;
            let key = entity_type.normalize_key(&values)?;

            return self
                .find_key(entity_type, &key)?
                .ok_or_else(|| ContextError::RecordNotFound {
                    set: entity_type.set_name().to_string(),
                    detail: format!("no record with key {}", key),
                });
        }

        let filter = key_filter(entity_type, source, key_names)?;
        self.query(entity_type).filter(&filter)?.single_required()
    }
}

/// The primary key of a located record never changes through an update.
pub(crate) fn check_key_unchanged(
    set: &str,
    located: &EntityKey,
    updated: &EntityKey,
) -> Result<(), ContextError> {
    if located == updated {
        return Ok(());
    }
    Err(ContextError::KeyChanged {
        set: set.to_string(),
        from: located.to_string(),
        to: updated.to_string(),
    })
}

/// Caller key names checked against the type; empty means the primary key.
fn effective_key_names<'k>(
    entity_type: &EntityType,
    key_names: &[&'k str],
) -> Result<Vec<&'k str>, ContextError> {
    if key_names.is_empty() {
        return Ok(entity_type.key_names().to_vec());
    }

    for name in key_names {
        if entity_type.field_name(name).is_none() {
            return Err(ContextError::UnknownField {
                type_name: entity_type.type_name(),
                field: name.to_string(),
            });
        }
    }
    Ok(key_names.to_vec())
}

fn source_value<'s>(source: &'s Map<String, Value>, name: &str) -> Result<&'s Value, ContextError> {
    source
        .get(name)
        .or_else(|| {
            source
                .iter()
                .find(|(field, _)| field.eq_ignore_ascii_case(name))
                .map(|(_, value)| value)
        })
        .ok_or_else(|| ContextError::MissingKeyValue {
            key: name.to_string(),
        })
}

/// `K1 == v1 && K2 == v2` from the key values in `source`, each value
/// coerced to its field's type first.
fn key_filter(
    entity_type: &EntityType,
    source: &Map<String, Value>,
    key_names: &[&str],
) -> Result<String, ContextError> {
    let mut clauses = Vec::with_capacity(key_names.len());
    for name in key_names {
        let value = entity_type.normalize_field(name, source_value(source, name)?.clone())?;
        clauses.push(format!("{} == {}", name, render_literal(&value)));
    }
    Ok(clauses.join(" && "))
}
