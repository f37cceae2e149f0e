mod entity;

use proc_macro::TokenStream;

// ============================================================================
// #[derive(Entity)]
// ============================================================================

/// Derive macro that registers a struct as a mapped entity.
///
/// Generates the `universal_context::Entity` impl: the entity set name, the
/// key field list and a static field-setter table used for name-addressed
/// filters, key lookups and partial updates.
///
/// # Usage
///
/// ```ignore
/// #[derive(Clone, Serialize, Deserialize, Entity)]
/// #[serde(rename_all = "PascalCase")]
/// #[entity(set = "Products")]
/// struct Product {
///     #[entity(key)]
///     id: i64,
///     name: String,
///     price: f64,
///     #[entity(skip)]
///     #[serde(skip)]
///     cached_label: Option<String>,
/// }
/// ```
///
/// Struct attributes:
/// - `#[entity(set = "...")]`: entity set name (default: struct name + `s`)
///
/// Field attributes:
/// - `#[entity(key)]`: part of the primary key, in declaration order
///   (default: the field named `id`)
/// - `#[entity(skip)]`: left out of the field table (`#[serde(skip)]` too)
///
/// Field names in the table follow `#[serde(rename)]` and
/// `#[serde(rename_all)]` so they match the serialized record.
#[proc_macro_derive(Entity, attributes(entity))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    entity::derive_entity(input)
}
