use serde_json::Value;

use super::query::Query;
use super::session::Session;
use crate::error::ContextError;
use crate::registry::{as_object, EntityType};
use crate::store::Store;

/// An entity set addressed by name, working on dynamic records.
///
/// Records are JSON objects keyed by the entity's serialized field names.
/// Every record passed in is coerced through the registered type first, so a
/// record that does not fit the type is rejected before anything is tracked.
pub struct NamedSet<'a, S> {
    session: Session<'a, S>,
    entity_type: &'a EntityType,
}

impl<'a, S: Store> NamedSet<'a, S> {
    pub(crate) fn new(session: Session<'a, S>, entity_type: &'a EntityType) -> Self {
        Self {
            session,
            entity_type,
        }
    }

    pub fn entity_type(&self) -> &EntityType {
        self.entity_type
    }

    /// Track `record` for insertion. Returns the coerced record.
    pub fn add(&mut self, record: Value) -> Result<Value, ContextError> {
        self.session.add(self.entity_type, record)
    }

    /// Async form of [`add`](Self::add). Tracking never blocks, so this
    /// completes on first poll.
    pub async fn add_async(&mut self, record: Value) -> Result<Value, ContextError> {
        self.add(record)
    }

    /// Track `record` for deletion.
    pub fn remove(&mut self, record: Value) -> Result<Value, ContextError> {
        self.session.remove(self.entity_type, record)
    }

    /// Track every record matching `filter` for deletion. Returns the matches.
    pub fn remove_where(&mut self, filter: &str) -> Result<Vec<Value>, ContextError> {
        self.session.remove_where(self.entity_type, filter)
    }

    /// The single record matching `filter`, or None. More than one match is
    /// [`ContextError::Cardinality`].
    pub fn get(&self, filter: &str) -> Result<Option<Value>, ContextError> {
        self.query(filter)?.single()
    }

    /// Find a record by its primary key values, in key order.
    pub fn find(&self, keys: &[Value]) -> Result<Option<Value>, ContextError> {
        self.session.find(self.entity_type, keys)
    }

    /// Copy the fields of `source` into `target`, leaving the `key_names`
    /// fields of `target` untouched, and track the result as modified.
    pub fn update(
        &mut self,
        target: Value,
        source: &Value,
        key_names: &[&str],
    ) -> Result<Value, ContextError> {
        let source = as_object(source)?;
        self.session
            .update(self.entity_type, target, source, key_names)
    }

    /// Locate the record whose `key_names` fields equal those of `source`
    /// and update it from `source`. Empty `key_names` means the primary key.
    pub fn update_by_keys(
        &mut self,
        source: &Value,
        key_names: &[&str],
    ) -> Result<Value, ContextError> {
        self.session
            .update_by_keys(self.entity_type, source, key_names)
    }

    /// Like [`update_by_keys`](Self::update_by_keys), taking the source as
    /// JSON text.
    pub fn update_from_json(
        &mut self,
        json: &str,
        key_names: &[&str],
    ) -> Result<Value, ContextError> {
        self.session
            .update_from_json(self.entity_type, json, key_names)
    }

    /// One page of records ordered by `order_by`. Pages start at 1.
    pub fn get_all(
        &self,
        order_by: &str,
        page: usize,
        count: usize,
        descending: bool,
    ) -> Result<Vec<Value>, ContextError> {
        self.session
            .get_all(self.entity_type, None, order_by, page, count, descending)
    }

    /// [`get_all`](Self::get_all) restricted to records matching `filter`.
    pub fn get_all_where(
        &self,
        filter: &str,
        order_by: &str,
        page: usize,
        count: usize,
        descending: bool,
    ) -> Result<Vec<Value>, ContextError> {
        self.session.get_all(
            self.entity_type,
            Some(filter),
            order_by,
            page,
            count,
            descending,
        )
    }

    pub fn query(&self, filter: &str) -> Result<Query<'a, S>, ContextError> {
        self.all().filter(filter)
    }

    pub fn all(&self) -> Query<'a, S> {
        self.session.query(self.entity_type)
    }
}
