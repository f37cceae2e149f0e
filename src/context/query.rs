//! Query - a lazy, composable view over one entity set.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::convert;
use crate::entity::Entity;
use crate::error::ContextError;
use crate::filter::{parse_filter, parse_ordering, sort_records, Expr, OrderKey};
use crate::registry::EntityType;
use crate::store::Store;

/// A filtered, ordered, windowed view of an entity set.
///
/// Nothing is read from the store until a materializing call (`to_vec`,
/// `fetch`, `single`, `first`, `count`).
pub struct Query<'a, S> {
    store: &'a S,
    entity_type: &'a EntityType,
    filter: Option<Expr>,
    filter_text: Vec<String>,
    ordering: Vec<OrderKey>,
    skip: usize,
    take: Option<usize>,
}

impl<'a, S: Store> Query<'a, S> {
    pub(crate) fn new(store: &'a S, entity_type: &'a EntityType) -> Self {
        Self {
            store,
            entity_type,
            filter: None,
            filter_text: Vec::new(),
            ordering: Vec::new(),
            skip: 0,
            take: None,
        }
    }

    pub fn entity_type(&self) -> &EntityType {
        self.entity_type
    }

    /// Narrow the query with a filter string; combined with earlier filters by AND.
    pub fn filter(mut self, filter: &str) -> Result<Self, ContextError> {
        let mut expr = parse_filter(filter)?;
        expr.bind(self.entity_type.field_names(), self.entity_type.type_name())?;

        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and(expr),
            None => expr,
        });
        self.filter_text.push(filter.to_string());
        Ok(self)
    }

    /// Order by an ordering string, replacing any earlier ordering.
    pub fn order_by(mut self, ordering: &str) -> Result<Self, ContextError> {
        let mut keys = parse_ordering(ordering)?;
        for key in &mut keys {
            key.bind(self.entity_type.field_names(), self.entity_type.type_name())?;
        }
        self.ordering = keys;
        Ok(self)
    }

    /// Skip `count` records of the current window.
    pub fn skip(mut self, count: usize) -> Self {
        self.skip = self.skip.saturating_add(count);
        self.take = self.take.map(|take| take.saturating_sub(count));
        self
    }

    /// Limit the current window to `count` records.
    pub fn take(mut self, count: usize) -> Self {
        self.take = Some(match self.take {
            Some(existing) => existing.min(count),
            None => count,
        });
        self
    }

    /// Materialize the matching records.
    pub fn to_vec(&self) -> Result<Vec<Value>, ContextError> {
        let mut records = self.matching()?;
        sort_records(&mut records, &self.ordering);

        let window = records.into_iter().skip(self.skip);
        Ok(match self.take {
            Some(take) => window.take(take).collect(),
            None => window.collect(),
        })
    }

    /// Materialize the matching records as typed values.
    pub fn fetch<T: DeserializeOwned>(&self) -> Result<Vec<T>, ContextError> {
        self.to_vec()?
            .into_iter()
            .map(|record| convert::convert(record).map_err(ContextError::from))
            .collect()
    }

    /// Number of records in the window.
    pub fn count(&self) -> Result<usize, ContextError> {
        Ok(self.to_vec()?.len())
    }

    /// First record of the window, if any.
    pub fn first(&self) -> Result<Option<Value>, ContextError> {
        Ok(self.to_vec()?.into_iter().next())
    }

    /// The only record of the window. None when empty; more than one is
    /// [`ContextError::Cardinality`].
    pub fn single(&self) -> Result<Option<Value>, ContextError> {
        let mut records = self.to_vec()?;
        match records.len() {
            0 => Ok(None),
            1 => Ok(records.pop()),
            found => Err(ContextError::Cardinality {
                set: self.entity_type.set_name().to_string(),
                found,
            }),
        }
    }

    /// Like [`single`](Self::single), but an empty window is an error.
    pub(crate) fn single_required(&self) -> Result<Value, ContextError> {
        self.single()?.ok_or_else(|| ContextError::RecordNotFound {
            set: self.entity_type.set_name().to_string(),
            detail: self.describe_filter(),
        })
    }

    fn matching(&self) -> Result<Vec<Value>, ContextError> {
        let records = self.store.scan(self.entity_type.set_name())?;
        let Some(filter) = &self.filter else {
            return Ok(records);
        };

        let mut matched = Vec::new();
        for record in records {
            if filter.evaluate(&record)? {
                matched.push(record);
            }
        }
        Ok(matched)
    }

    fn describe_filter(&self) -> String {
        if self.filter_text.is_empty() {
            "no records".to_string()
        } else {
            format!("no record matches `{}`", self.filter_text.join(" && "))
        }
    }
}

/// A [`Query`] that materializes as entities of type `E`.
pub struct TypedQuery<'a, S, E> {
    inner: Query<'a, S>,
    _marker: PhantomData<E>,
}

impl<'a, S: Store, E: Entity> TypedQuery<'a, S, E> {
    pub(crate) fn new(inner: Query<'a, S>) -> Self {
        Self {
            inner,
            _marker: PhantomData,
        }
    }

    pub fn filter(self, filter: &str) -> Result<Self, ContextError> {
        Ok(Self::new(self.inner.filter(filter)?))
    }

    pub fn order_by(self, ordering: &str) -> Result<Self, ContextError> {
        Ok(Self::new(self.inner.order_by(ordering)?))
    }

    pub fn skip(self, count: usize) -> Self {
        Self::new(self.inner.skip(count))
    }

    pub fn take(self, count: usize) -> Self {
        Self::new(self.inner.take(count))
    }

    pub fn to_vec(&self) -> Result<Vec<E>, ContextError> {
        self.inner.fetch()
    }

    pub fn count(&self) -> Result<usize, ContextError> {
        self.inner.count()
    }

    pub fn first(&self) -> Result<Option<E>, ContextError> {
        self.inner
            .first()?
            .map(|record| convert::convert(record).map_err(ContextError::from))
            .transpose()
    }

    pub fn single(&self) -> Result<Option<E>, ContextError> {
        self.inner
            .single()?
            .map(|record| convert::convert(record).map_err(ContextError::from))
            .transpose()
    }

    /// The untyped query underneath.
    pub fn into_inner(self) -> Query<'a, S> {
        self.inner
    }
}
