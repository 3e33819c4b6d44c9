use appdata_storage::{DocumentStore, EntityKey, TransactionalDocumentBackend};
use serde_json::{Map, Value};

use crate::AppDataError;

/// The name of the single registry entity within the group
pub const USERS_REGISTRY: &str = "users";

/// The registry of users, stored as one entity whose properties map user
/// names to their authorization metadata
#[derive(Clone)]
pub struct UsersRegistry<Backend>
where
    Backend: TransactionalDocumentBackend,
{
    store: DocumentStore<Backend>,
    key: EntityKey,
}

fn names_from(body: Value) -> Result<Vec<String>, AppDataError> {
    match body {
        Value::Object(map) => Ok(map.into_iter().map(|(name, _)| name).collect()),
        Value::Array(list) => list
            .into_iter()
            .map(|name| match name {
                Value::String(name) => Ok(name),
                other => Err(AppDataError::InvalidBody(format!(
                    "expected a user name, got {other}"
                ))),
            })
            .collect(),
        other => Err(AppDataError::InvalidBody(format!(
            "expected a list of user names, got {other}"
        ))),
    }
}

impl<Backend> UsersRegistry<Backend>
where
    Backend: TransactionalDocumentBackend,
{
    /// The registry of `group`
    pub fn new(store: DocumentStore<Backend>, group: &str) -> Self {
        Self {
            store,
            key: EntityKey::named(group, USERS_REGISTRY),
        }
    }

    /// The whole registry, or an empty object when none exists
    pub async fn get(&self) -> Result<Value, AppDataError> {
        Ok(self
            .store
            .get(&self.key)
            .await?
            .map(|entity| entity.into_value())
            .unwrap_or_else(|| Value::Object(Map::new())))
    }

    /// Inserts or overwrites each user named in `body`, which must be an
    /// object mapping user names to metadata
    pub async fn merge(&self, body: Option<Value>) -> Result<(), AppDataError> {
        let Some(Value::Object(users)) = body else {
            return Err(AppDataError::InvalidBody(
                "expected an object mapping user names to metadata".into(),
            ));
        };

        self.store
            .upsert::<_, AppDataError>(&self.key, move |registry| {
                registry.merge(users.clone());
                Ok(())
            })
            .await?;

        Ok(())
    }

    /// Removes each user named in `body`: either a list of names or an
    /// object whose keys are names. Names that are not registered are
    /// ignored, but the registry itself must exist.
    pub async fn remove(&self, body: Option<Value>) -> Result<(), AppDataError> {
        let names = names_from(body.unwrap_or(Value::Null))?;

        self.store
            .update::<_, AppDataError>(&self.key, |current| {
                let mut registry = current.cloned().ok_or(AppDataError::MissingRegistry)?;
                for name in &names {
                    registry.remove(name);
                }
                Ok(Some(registry))
            })
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use appdata_storage::MemoryDocumentBackend;
    use serde_json::json;

    use super::*;

    fn make_registry() -> UsersRegistry<MemoryDocumentBackend> {
        UsersRegistry::new(DocumentStore::new(MemoryDocumentBackend::default()), "acme")
    }

    #[tokio::test]
    async fn it_merges_and_removes_users() -> Result<()> {
        let registry = make_registry();
        assert_eq!(registry.get().await?, json!({}));

        registry
            .merge(Some(json!({ "alice": { "level": "admin" } })))
            .await?;
        registry
            .merge(Some(json!({ "bob": { "level": "readonly" } })))
            .await?;
        assert_eq!(
            registry.get().await?,
            json!({ "alice": { "level": "admin" }, "bob": { "level": "readonly" } })
        );

        registry.remove(Some(json!(["alice", "carol"]))).await?;
        registry.remove(Some(json!({ "bob": null }))).await?;
        assert_eq!(registry.get().await?, json!({}));
        Ok(())
    }

    #[tokio::test]
    async fn it_refuses_to_remove_from_a_missing_registry() -> Result<()> {
        let registry = make_registry();

        assert_eq!(
            registry.remove(Some(json!(["alice"]))).await,
            Err(AppDataError::MissingRegistry)
        );
        Ok(())
    }

    #[tokio::test]
    async fn it_rejects_malformed_bodies() -> Result<()> {
        let registry = make_registry();
        registry.merge(Some(json!({ "alice": {} }))).await?;

        assert!(matches!(
            registry.merge(Some(json!(["alice"]))).await,
            Err(AppDataError::InvalidBody(_))
        ));
        assert!(matches!(
            registry.merge(None).await,
            Err(AppDataError::InvalidBody(_))
        ));
        assert!(matches!(
            registry.remove(Some(json!([1, 2]))).await,
            Err(AppDataError::InvalidBody(_))
        ));
        assert!(matches!(
            registry.remove(Some(json!("alice"))).await,
            Err(AppDataError::InvalidBody(_))
        ));
        Ok(())
    }
}
