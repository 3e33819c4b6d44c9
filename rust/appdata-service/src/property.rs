use appdata_storage::{DocumentStore, Entity, EntityKey, TransactionalDocumentBackend};
use serde_json::{Map, Value};

use crate::{AppDataError, Method};

/// A stored property value, split by whether it already accumulates
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    /// Any JSON value other than an array
    Scalar(Value),
    /// An array, grown by appends
    List(Vec<Value>),
}

impl PropertyValue {
    /// Appends `value`, turning a scalar into a two-element list
    pub fn append(self, value: Value) -> PropertyValue {
        match self {
            PropertyValue::Scalar(scalar) => PropertyValue::List(vec![scalar, value]),
            PropertyValue::List(mut list) => {
                list.push(value);
                PropertyValue::List(list)
            }
        }
    }

    /// Appends `value` to `current`; an absent property becomes a
    /// one-element list
    pub fn accumulate(current: Option<PropertyValue>, value: Value) -> PropertyValue {
        match current {
            Some(current) => current.append(value),
            None => PropertyValue::List(vec![value]),
        }
    }
}

impl From<Value> for PropertyValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Array(list) => PropertyValue::List(list),
            scalar => PropertyValue::Scalar(scalar),
        }
    }
}

impl From<PropertyValue> for Value {
    fn from(value: PropertyValue) -> Self {
        match value {
            PropertyValue::Scalar(scalar) => scalar,
            PropertyValue::List(list) => Value::Array(list),
        }
    }
}

/// Reads and writes single named properties on keyed entities.
///
/// Every write is a transactional read-modify-write of the whole entity, so
/// concurrent writers to different properties of one entity never lose each
/// other's changes.
#[derive(Clone)]
pub struct PropertyAccessor<Backend>
where
    Backend: TransactionalDocumentBackend,
{
    store: DocumentStore<Backend>,
}

impl<Backend> PropertyAccessor<Backend>
where
    Backend: TransactionalDocumentBackend,
{
    /// An accessor writing through `store`
    pub fn new(store: DocumentStore<Backend>) -> Self {
        Self { store }
    }

    /// The value of property `name` on the entity at `key`; an absent entity
    /// or property reads as an empty object
    pub async fn get(&self, key: &EntityKey, name: &str) -> Result<Value, AppDataError> {
        Ok(self
            .store
            .get(key)
            .await?
            .and_then(|mut entity| entity.remove(name))
            .unwrap_or_else(|| Value::Object(Map::new())))
    }

    /// Applies `method` to property `name` on the entity at `key`:
    ///
    /// - `PUT` overwrites the property with `value`
    /// - `POST` appends `value` (see [PropertyValue::accumulate])
    /// - `DELETE` removes the property, if present
    ///
    /// `PUT` and `POST` require a value.
    pub async fn set(
        &self,
        key: &EntityKey,
        name: &str,
        value: Option<Value>,
        method: Method,
    ) -> Result<(), AppDataError> {
        match method {
            Method::Get => {
                return Err(AppDataError::MethodNotAllowed {
                    method,
                    resource: name.to_owned(),
                });
            }
            Method::Put | Method::Post if value.is_none() => {
                return Err(AppDataError::InvalidBody(format!(
                    "{method} to '{name}' requires a body"
                )));
            }
            _ => (),
        }

        self.store
            .update::<_, AppDataError>(key, |current| {
                let mut entity = match (current, method) {
                    (Some(entity), _) => entity.clone(),
                    // Nothing to delete from; leave the entity absent
                    (None, Method::Delete) => return Ok(None),
                    (None, _) => Entity::default(),
                };

                match (method, value.clone()) {
                    (Method::Put, Some(value)) => {
                        entity.set(name, value);
                    }
                    (Method::Post, Some(value)) => {
                        let current = entity.remove(name).map(PropertyValue::from);
                        entity.set(name, PropertyValue::accumulate(current, value).into());
                    }
                    _ => {
                        entity.remove(name);
                    }
                }

                Ok(Some(entity))
            })
            .await?;

        Ok(())
    }
}
