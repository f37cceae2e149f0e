//! UniversalContext - the unit of work over a [`Store`].
//!
//! Mutations made through [`NamedSet`] and [`TypedSet`] handles are tracked
//! in memory and reach the store only on [`UniversalContext::save_changes`],
//! which applies them as one atomic batch.

mod change_set;
mod named;
mod query;
mod session;
mod typed;

use serde_json::Value;

use crate::entity::Entity;
use crate::error::ContextError;
use crate::options::ContextOptions;
use crate::registry::Registry;
use crate::store::Store;

#[cfg(feature = "emitter")]
use crate::emitter::ChangeEmitter;

pub use change_set::{ChangeState, TrackedChange};
pub use named::NamedSet;
pub use query::{Query, TypedQuery};
pub use typed::TypedSet;

use change_set::ChangeSet;
use session::Session;

/// Generic CRUD context over a set of registered entity types.
pub struct UniversalContext<S> {
    store: S,
    registry: Registry,
    options: ContextOptions,
    changes: ChangeSet,
    #[cfg(feature = "emitter")]
    emitter: ChangeEmitter,
}

impl<S: Store> UniversalContext<S> {
    pub fn new(store: S, registry: Registry, options: ContextOptions) -> Self {
        Self {
            store,
            registry,
            options,
            changes: ChangeSet::default(),
            #[cfg(feature = "emitter")]
            emitter: ChangeEmitter::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn options(&self) -> &ContextOptions {
        &self.options
    }

    /// Handle on the entity set registered under `set`.
    pub fn entities(&mut self, set: &str) -> Result<NamedSet<'_, S>, ContextError> {
        let entity_type = self.registry.resolve(set, self.options.ignore_set_case)?;
        let session = Session::new(&self.store, &self.options, &mut self.changes);
        Ok(NamedSet::new(session, entity_type))
    }

    /// Handle on the entity set of type `E`.
    pub fn entities_of<E: Entity>(&mut self) -> Result<TypedSet<'_, S, E>, ContextError> {
        let entity_type = self.registry.resolve_type::<E>()?;
        let session = Session::new(&self.store, &self.options, &mut self.changes);
        Ok(TypedSet::new(session, entity_type))
    }

    /// Query the entity set `set` with a filter string.
    pub fn query(&self, set: &str, filter: &str) -> Result<Query<'_, S>, ContextError> {
        self.all(set)?.filter(filter)
    }

    /// Unfiltered query over the entity set `set`.
    pub fn all(&self, set: &str) -> Result<Query<'_, S>, ContextError> {
        let entity_type = self.registry.resolve(set, self.options.ignore_set_case)?;
        Ok(Query::new(&self.store, entity_type))
    }

    /// Records read by key through `set`, seeing pending changes.
    pub fn find(&mut self, set: &str, keys: &[Value]) -> Result<Option<Value>, ContextError> {
        self.entities(set)?.find(keys)
    }

    /// Apply every tracked change to the store in one batch. Returns the
    /// number of records written. On failure nothing is written and the
    /// changes stay tracked.
    pub fn save_changes(&mut self) -> Result<usize, ContextError> {
        let batch = self.changes.to_changes();
        if batch.is_empty() {
            return Ok(0);
        }

        let written = self.store.apply(&batch).map_err(|e| {
            tracing::warn!(error = %e, changes = batch.len(), "save failed");
            e
        })?;
        let saved = self.changes.take();
        tracing::debug!(written, "changes saved");

        #[cfg(feature = "emitter")]
        self.emitter.emit_saved(&saved);
        #[cfg(not(feature = "emitter"))]
        drop(saved);

        Ok(written)
    }

    /// Drop every tracked change without saving.
    pub fn discard_changes(&mut self) {
        self.changes.clear();
    }

    /// Changes waiting for `save_changes`, in tracking order.
    pub fn pending_changes(&self) -> &[TrackedChange] {
        self.changes.entries()
    }

    /// Run `listener` for every saved change of `event`, named
    /// `"{set}:{added|modified|deleted}"`. The payload is the record's JSON text.
    #[cfg(feature = "emitter")]
    pub fn on<F>(&mut self, event: &str, listener: F)
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        self.emitter.on(event, listener);
    }
}

/// Builds a [`UniversalContext`] from entity registrations and options.
///
/// ```ignore
/// let ctx = ContextBuilder::new()
///     .register::<Product>()
///     .register::<OrderLine>()
///     .options(ContextOptions::new().ignore_set_case(true))
///     .build(InMemoryStore::new());
/// ```
#[derive(Debug, Default)]
pub struct ContextBuilder {
    registry: Registry,
    options: ContextOptions,
}

impl ContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<E: Entity>(mut self) -> Self {
        self.registry.register::<E>();
        self
    }

    pub fn options(mut self, options: ContextOptions) -> Self {
        self.options = options;
        self
    }

    pub fn build<S: Store>(self, store: S) -> UniversalContext<S> {
        tracing::debug!(sets = ?self.registry.set_names(), "context built");
        UniversalContext::new(store, self.registry, self.options)
    }
}
