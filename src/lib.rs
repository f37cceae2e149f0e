//! Generic, name-addressed CRUD over registered entity sets.
//!
//! A [`UniversalContext`] wraps a [`Store`] and a registry of entity types.
//! Callers address entity sets by name (`"Products"`) or by type
//! (`Product`), filter with dynamic predicate strings, page and order with
//! dynamic ordering strings, and apply partial updates from JSON documents.
//!
//! ## Example
//!
//! ```ignore
//! use serde::{Deserialize, Serialize};
//! use universal_context::{ContextBuilder, Entity, InMemoryStore};
//!
//! #[derive(Clone, Serialize, Deserialize, Entity)]
//! #[serde(rename_all = "PascalCase")]
//! #[entity(set = "Products")]
//! struct Product {
//!     id: i64,
//!     price: f64,
//! }
//!
//! let mut ctx = ContextBuilder::new()
//!     .register::<Product>()
//!     .build(InMemoryStore::new());
//!
//! ctx.entities("Products")?.add(serde_json::json!({ "Id": 1, "Price": 4.5 }))?;
//! ctx.save_changes()?;
//!
//! ctx.entities("Products")?
//!     .update_from_json(r#"{ "Id": 1, "Price": 9.99 }"#, &["Id"])?;
//! ctx.save_changes()?;
//! ```

extern crate self as universal_context;

mod context;
pub mod convert;
mod entity;
mod error;
pub mod filter;
mod options;
mod registry;
mod store;

#[cfg(feature = "emitter")]
mod emitter;

pub use context::{
    ChangeState, ContextBuilder, NamedSet, Query, TrackedChange, TypedQuery, TypedSet,
    UniversalContext,
};
pub use convert::ConversionError;
pub use entity::{copy_fields, Entity, EntityKey, Field};
pub use error::ContextError;
pub use filter::FilterError;
pub use options::ContextOptions;
pub use registry::{EntityType, Registry};
pub use store::{Change, InMemoryStore, Store, StoreError};

pub use serde_json::{Map, Value};
pub use universal_context_macros::Entity;

