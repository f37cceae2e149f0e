//! Field copy for partial updates.

use std::any::type_name;

use serde_json::{Map, Value};

use super::Entity;
use crate::error::ContextError;

/// Copy every field of `source` into `target`, except the fields named in
/// `key_names`.
///
/// Field names match case-insensitively and values are coerced to the
/// field's type. Fails with [`ContextError::UnknownField`] when a key name or
/// source field does not belong to `E`.
///
/// Not atomic: fields copied before a failing one stay assigned on `target`.
pub fn copy_fields<E: Entity>(
    target: &mut E,
    source: &Map<String, Value>,
    key_names: &[&str],
) -> Result<(), ContextError> {
    for key in key_names {
        if E::field(key).is_none() {
            return Err(ContextError::UnknownField {
                type_name: type_name::<E>(),
                field: key.to_string(),
            });
        }
    }

    for (name, value) in source {
        if key_names.iter().any(|key| key.eq_ignore_ascii_case(name)) {
            continue;
        }

        let field = E::field(name).ok_or_else(|| ContextError::UnknownField {
            type_name: type_name::<E>(),
            field: name.clone(),
        })?;

        field
            .set(target, value.clone())
            .map_err(|source| ContextError::FieldConversion {
                field: field.name().to_string(),
                source,
            })?;
    }

    Ok(())
}
