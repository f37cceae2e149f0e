//! Registry - entity set names mapped to type descriptors.
//!
//! Built once at startup from `register::<E>()` calls. Each [`EntityType`]
//! carries monomorphized functions for its entity type, so name-addressed
//! operations work on dynamic records without knowing `E` statically.

use std::any::type_name;
use std::collections::HashMap;
use std::fmt;

use serde_json::{Map, Value};

use crate::convert::{self, describe};
use crate::entity::{copy_fields, Entity, EntityKey};
use crate::error::ContextError;

/// Type-erased descriptor of one registered entity type.
pub struct EntityType {
    set_name: &'static str,
    type_name: &'static str,
    key_names: &'static [&'static str],
    field_names: Vec<&'static str>,
    coerce: fn(Value) -> Result<Value, ContextError>,
    key_of: fn(&Value) -> Result<EntityKey, ContextError>,
    normalize_key: fn(&[Value]) -> Result<EntityKey, ContextError>,
    normalize_field: fn(&str, Value) -> Result<Value, ContextError>,
    copy_into: fn(Value, &Map<String, Value>, &[&str]) -> Result<Value, ContextError>,
}

impl EntityType {
    pub fn of<E: Entity>() -> Self {
        Self {
            set_name: E::SET,
            type_name: type_name::<E>(),
            key_names: E::KEYS,
            field_names: E::fields().iter().map(|f| f.name()).collect(),
            coerce: coerce_record::<E>,
            key_of: key_of_record::<E>,
            normalize_key: normalize_key::<E>,
            normalize_field: normalize_field::<E>,
            copy_into: copy_into_record::<E>,
        }
    }

    pub fn set_name(&self) -> &'static str {
        self.set_name
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn key_names(&self) -> &'static [&'static str] {
        self.key_names
    }

    pub fn field_names(&self) -> &[&'static str] {
        &self.field_names
    }

    /// Resolve a field name, ignoring ASCII case.
    pub fn field_name(&self, name: &str) -> Option<&'static str> {
        self.field_names
            .iter()
            .copied()
            .find(|field| field.eq_ignore_ascii_case(name))
    }

    /// True when `names` is exactly the primary key, in any order and case.
    pub fn is_primary_key(&self, names: &[&str]) -> bool {
        names.len() == self.key_names.len()
            && self
                .key_names
                .iter()
                .all(|key| names.iter().any(|name| name.eq_ignore_ascii_case(key)))
    }

    /// Coerce a dynamic record into this type and back.
    pub fn coerce(&self, record: Value) -> Result<Value, ContextError> {
        (self.coerce)(record)
    }

    /// Primary key of a (coerced) record.
    pub fn key_of(&self, record: &Value) -> Result<EntityKey, ContextError> {
        (self.key_of)(record)
    }

    /// Normalize raw key values through the key fields' types.
    pub fn normalize_key(&self, values: &[Value]) -> Result<EntityKey, ContextError> {
        (self.normalize_key)(values)
    }

    /// Coerce one value to the type of the field `name`.
    pub fn normalize_field(&self, name: &str, value: Value) -> Result<Value, ContextError> {
        (self.normalize_field)(name, value)
    }

    /// Coerce `target`, copy `source` into it except `key_names`, and return it.
    pub fn copy_into(
        &self,
        target: Value,
        source: &Map<String, Value>,
        key_names: &[&str],
    ) -> Result<Value, ContextError> {
        (self.copy_into)(target, source, key_names)
    }
}

impl fmt::Debug for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityType")
            .field("set_name", &self.set_name)
            .field("type_name", &self.type_name)
            .field("key_names", &self.key_names)
            .field("field_names", &self.field_names)
            .finish()
    }
}

fn coerce_record<E: Entity>(record: Value) -> Result<Value, ContextError> {
    let entity: E = convert::convert(record)?;
    Ok(convert::to_value(&entity)?)
}

fn key_of_record<E: Entity>(record: &Value) -> Result<EntityKey, ContextError> {
    let entity: E = convert::convert(record.clone())?;
    entity.key()
}

fn normalize_key<E: Entity>(values: &[Value]) -> Result<EntityKey, ContextError> {
    if values.len() != E::KEYS.len() {
        return Err(ContextError::KeyArity {
            set: E::SET.to_string(),
            expected: E::KEYS.len(),
            actual: values.len(),
        });
    }

    let normalized = E::KEYS
        .iter()
        .zip(values)
        .map(|(name, value)| normalize_field::<E>(name, value.clone()))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(EntityKey::new(normalized))
}

fn normalize_field<E: Entity>(name: &str, value: Value) -> Result<Value, ContextError> {
    let field = E::field(name).ok_or_else(|| ContextError::UnknownField {
        type_name: type_name::<E>(),
        field: name.to_string(),
    })?;
    field
        .normalize(value)
        .map_err(|source| ContextError::FieldConversion {
            field: field.name().to_string(),
            source,
        })
}

fn copy_into_record<E: Entity>(
    target: Value,
    source: &Map<String, Value>,
    key_names: &[&str],
) -> Result<Value, ContextError> {
    let mut entity: E = convert::convert(target)?;
    copy_fields(&mut entity, source, key_names)?;
    Ok(convert::to_value(&entity)?)
}

/// Name → entity type table.
#[derive(Debug, Default)]
pub struct Registry {
    types: HashMap<&'static str, EntityType>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `E` under its set name. A second registration of the same
    /// set name replaces the first.
    pub fn register<E: Entity>(&mut self) {
        let entity_type = EntityType::of::<E>();
        if let Some(previous) = self.types.insert(E::SET, entity_type) {
            tracing::warn!(
                set = E::SET,
                previous = previous.type_name,
                replacement = type_name::<E>(),
                "entity set registered twice"
            );
        }
    }

    /// Look up a set by exact name, or by ASCII case-insensitive name.
    pub fn resolve(&self, name: &str, ignore_case: bool) -> Result<&EntityType, ContextError> {
        if let Some(entity_type) = self.types.get(name) {
            return Ok(entity_type);
        }
        if ignore_case {
            if let Some(entity_type) = self
                .types
                .values()
                .find(|t| t.set_name.eq_ignore_ascii_case(name))
            {
                return Ok(entity_type);
            }
        }
        Err(ContextError::SetNotFound(name.to_string()))
    }

    /// Look up the descriptor registered for `E`.
    pub fn resolve_type<E: Entity>(&self) -> Result<&EntityType, ContextError> {
        match self.types.get(E::SET) {
            Some(entity_type) if entity_type.type_name == type_name::<E>() => Ok(entity_type),
            _ => Err(ContextError::TypeNotRegistered {
                type_name: type_name::<E>(),
                set: E::SET,
            }),
        }
    }

    /// Registered set names, sorted.
    pub fn set_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.types.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

/// Require a dynamic record to be a JSON object.
pub(crate) fn as_object(value: &Value) -> Result<&Map<String, Value>, ContextError> {
    value
        .as_object()
        .ok_or_else(|| ContextError::NotAnObject(describe(value)))
}
