use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::AppDataStorageError;

/// A document: named JSON properties addressed by an
/// [`EntityKey`](crate::EntityKey).
///
/// Properties are kept in key order, so the serialized form of an entity is
/// canonical and can be hashed to derive an [`Edition`](crate::Edition).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Entity(Map<String, Value>);

impl Entity {
    /// Read a property by name
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Set a property, returning the value it replaced
    pub fn set(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(name.into(), value)
    }

    /// Remove a property, returning it if it was present
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.0.remove(name)
    }

    /// Whether the entity has no properties
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of properties
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Copy every property of `other` into this entity, overwriting
    /// properties that share a name
    pub fn merge(&mut self, other: Map<String, Value>) {
        for (name, value) in other {
            self.0.insert(name, value);
        }
    }

    /// Canonical JSON encoding
    pub fn to_bytes(&self) -> Result<Vec<u8>, AppDataStorageError> {
        serde_json::to_vec(&self.0)
            .map_err(|error| AppDataStorageError::EncodeFailed(format!("{error}")))
    }

    /// The entity as a JSON object
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for Entity {
    fn from(properties: Map<String, Value>) -> Self {
        Entity(properties)
    }
}

impl From<Entity> for Value {
    fn from(entity: Entity) -> Self {
        entity.into_value()
    }
}

impl TryFrom<Value> for Entity {
    type Error = AppDataStorageError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(properties) => Ok(Entity(properties)),
            other => Err(AppDataStorageError::DecodeFailed(format!(
                "expected a JSON object for an entity, got {other}"
            ))),
        }
    }
}
