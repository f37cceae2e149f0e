use std::marker::PhantomData;

use serde::Serialize;
use serde_json::Value;

use super::change_set::ChangeState;
use super::query::TypedQuery;
use super::session::{check_key_unchanged, Session};
use crate::convert::{self, to_value};
use crate::entity::{copy_fields, Entity};
use crate::error::ContextError;
use crate::registry::{as_object, EntityType};
use crate::store::Store;

/// An entity set addressed by its type `E`.
pub struct TypedSet<'a, S, E> {
    session: Session<'a, S>,
    entity_type: &'a EntityType,
    _marker: PhantomData<E>,
}

impl<'a, S: Store, E: Entity> TypedSet<'a, S, E> {
    pub(crate) fn new(session: Session<'a, S>, entity_type: &'a EntityType) -> Self {
        Self {
            session,
            entity_type,
            _marker: PhantomData,
        }
    }

    fn track(&mut self, entity: &E, state: ChangeState) -> Result<(), ContextError> {
        let key = entity.key()?;
        let record = to_value(entity)?;
        self.session.track(self.entity_type, key, state, record)
    }

    pub fn add(&mut self, entity: E) -> Result<E, ContextError> {
        self.track(&entity, ChangeState::Added)?;
        Ok(entity)
    }

    pub async fn add_async(&mut self, entity: E) -> Result<E, ContextError> {
        self.add(entity)
    }

    pub fn remove(&mut self, entity: E) -> Result<E, ContextError> {
        self.track(&entity, ChangeState::Deleted)?;
        Ok(entity)
    }

    /// Track every entity satisfying `predicate` for deletion. Returns them.
    pub fn remove_where<P>(&mut self, predicate: P) -> Result<Vec<E>, ContextError>
    where
        P: Fn(&E) -> bool,
    {
        let matches: Vec<E> = self
            .all()
            .to_vec()?
            .into_iter()
            .filter(|entity| predicate(entity))
            .collect();
        for entity in &matches {
            self.track(entity, ChangeState::Deleted)?;
        }
        Ok(matches)
    }

    /// Filter-string form of [`remove_where`](Self::remove_where).
    pub fn remove_matching(&mut self, filter: &str) -> Result<Vec<E>, ContextError> {
        self.session
            .remove_where(self.entity_type, filter)?
            .into_iter()
            .map(|record| convert::convert(record).map_err(ContextError::from))
            .collect()
    }

    /// The single entity satisfying `predicate`, or None. More than one is
    /// [`ContextError::Cardinality`].
    pub fn get<P>(&self, predicate: P) -> Result<Option<E>, ContextError>
    where
        P: Fn(&E) -> bool,
    {
        let mut matches: Vec<E> = self
            .all()
            .to_vec()?
            .into_iter()
            .filter(|entity| predicate(entity))
            .collect();
        match matches.len() {
            0 => Ok(None),
            1 => Ok(matches.pop()),
            found => Err(ContextError::Cardinality {
                set: self.entity_type.set_name().to_string(),
                found,
            }),
        }
    }

    /// Filter-string form of [`get`](Self::get).
    pub fn get_by(&self, filter: &str) -> Result<Option<E>, ContextError> {
        self.query(filter)?.single()
    }

    pub fn find(&self, keys: &[Value]) -> Result<Option<E>, ContextError> {
        self.session
            .find(self.entity_type, keys)?
            .map(|record| convert::convert(record).map_err(ContextError::from))
            .transpose()
    }

    /// Track a whole entity as modified.
    pub fn update(&mut self, entity: E) -> Result<E, ContextError> {
        self.track(&entity, ChangeState::Modified)?;
        Ok(entity)
    }

    /// Copy the fields of `source` into `target` except `key_names`, then
    /// track `target` as modified.
    ///
    /// Nothing is tracked when a field fails to convert or the copy would
    /// change the primary key ([`ContextError::KeyChanged`]).
    pub fn update_with<T>(
        &mut self,
        mut target: E,
        source: &T,
        key_names: &[&str],
    ) -> Result<E, ContextError>
    where
        T: Serialize + ?Sized,
    {
        let source = to_value(source)?;
        let located = target.key()?;
        copy_fields(&mut target, as_object(&source)?, key_names)?;
        let key = target.key()?;
        check_key_unchanged(self.entity_type.set_name(), &located, &key)?;

        self.session
            .track(self.entity_type, key, ChangeState::Modified, to_value(&target)?)?;
        Ok(target)
    }

    /// Locate the entity whose `key_names` fields equal those of `source`
    /// and update it from `source`. Empty `key_names` means the primary key.
    pub fn update_by_keys<T>(&mut self, source: &T, key_names: &[&str]) -> Result<E, ContextError>
    where
        T: Serialize + ?Sized,
    {
        let source = to_value(source)?;
        let updated = self
            .session
            .update_by_keys(self.entity_type, &source, key_names)?;
        Ok(convert::convert(updated)?)
    }

    pub fn update_from_json(&mut self, json: &str, key_names: &[&str]) -> Result<E, ContextError> {
        let updated = self
            .session
            .update_from_json(self.entity_type, json, key_names)?;
        Ok(convert::convert(updated)?)
    }

    /// One page of entities ordered by `order_by`. Pages start at 1.
    pub fn get_all(
        &self,
        order_by: &str,
        page: usize,
        count: usize,
        descending: bool,
    ) -> Result<Vec<E>, ContextError> {
        self.session
            .get_all(self.entity_type, None, order_by, page, count, descending)?
            .into_iter()
            .map(|record| convert::convert(record).map_err(ContextError::from))
            .collect()
    }

    pub fn get_all_where(
        &self,
        filter: &str,
        order_by: &str,
        page: usize,
        count: usize,
        descending: bool,
    ) -> Result<Vec<E>, ContextError> {
        self.session
            .get_all(
                self.entity_type,
                Some(filter),
                order_by,
                page,
                count,
                descending,
            )?
            .into_iter()
            .map(|record| convert::convert(record).map_err(ContextError::from))
            .collect()
    }

    pub fn query(&self, filter: &str) -> Result<TypedQuery<'a, S, E>, ContextError> {
        self.all().filter(filter)
    }

    pub fn all(&self) -> TypedQuery<'a, S, E> {
        TypedQuery::new(self.session.query(self.entity_type))
    }
}
