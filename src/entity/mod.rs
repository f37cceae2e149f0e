//! Entities - mapped record types and their field-setter tables.
//!
//! An entity is a plain struct that serializes to a JSON object. The
//! `#[derive(Entity)]` macro generates a static [`Field`] table for it, which
//! the context uses in place of runtime reflection: case-insensitive field
//! lookup, key extraction and per-field coercing assignment.

mod copy;

use std::fmt;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::convert::ConversionError;
use crate::error::ContextError;

pub use copy::copy_fields;

/// Trait for types stored in an entity set.
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// The entity set name this type is registered under (e.g. "Products").
    const SET: &'static str;

    /// Field names forming the primary key, in key order.
    const KEYS: &'static [&'static str];

    /// The field-setter table for this type.
    fn fields() -> &'static [Field<Self>];

    /// Look up a field by name, ignoring ASCII case.
    fn field(name: &str) -> Option<&'static Field<Self>> {
        Self::fields()
            .iter()
            .find(|field| field.name().eq_ignore_ascii_case(name))
    }

    /// The primary key of this instance.
    fn key(&self) -> Result<EntityKey, ContextError> {
        let mut values = Vec::with_capacity(Self::KEYS.len());
        for key in Self::KEYS {
            let field = Self::field(key).ok_or_else(|| ContextError::UnknownField {
                type_name: std::any::type_name::<Self>(),
                field: key.to_string(),
            })?;
            values.push(field.get(self)?);
        }
        Ok(EntityKey::new(values))
    }
}

/// One entry of an entity's field-setter table.
pub struct Field<E> {
    name: &'static str,
    get: fn(&E) -> Result<Value, ConversionError>,
    set: fn(&mut E, Value) -> Result<(), ConversionError>,
    normalize: fn(Value) -> Result<Value, ConversionError>,
}

impl<E> Field<E> {
    pub const fn new(
        name: &'static str,
        get: fn(&E) -> Result<Value, ConversionError>,
        set: fn(&mut E, Value) -> Result<(), ConversionError>,
        normalize: fn(Value) -> Result<Value, ConversionError>,
    ) -> Self {
        Self {
            name,
            get,
            set,
            normalize,
        }
    }

    /// The serialized field name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Read the field as a dynamic value.
    pub fn get(&self, entity: &E) -> Result<Value, ConversionError> {
        (self.get)(entity)
    }

    /// Coerce `value` to the field's type and assign it.
    pub fn set(&self, entity: &mut E, value: Value) -> Result<(), ConversionError> {
        (self.set)(entity, value)
    }

    /// Coerce `value` to the field's type and return its canonical form.
    pub fn normalize(&self, value: Value) -> Result<Value, ConversionError> {
        (self.normalize)(value)
    }
}

impl<E> Clone for Field<E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for Field<E> {}

impl<E> fmt::Debug for Field<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field").field("name", &self.name).finish()
    }
}

/// Ordered primary key values of one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityKey(Vec<Value>);

impl EntityKey {
    pub fn new(values: Vec<Value>) -> Self {
        EntityKey(values)
    }

    pub fn values(&self) -> &[Value] {
        &self.0
    }

    /// Canonical text form, used as the storage key.
    pub fn encode(&self) -> String {
        Value::Array(self.0.clone()).to_string()
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.as_slice() {
            [single] => write!(f, "{}", single),
            values => {
                write!(f, "(")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", value)?;
                }
                write!(f, ")")
            }
        }
    }
}
