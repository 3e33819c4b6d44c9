use appdata_storage::{DocumentStore, Entity, EntityKey, KeyId, TransactionalDocumentBackend};
use futures_util::TryStreamExt;
use serde_json::{Map, Value};

use crate::{AppDataError, Method, Response};

fn item_body(body: Option<Value>) -> Result<Entity, AppDataError> {
    match body {
        Some(Value::Object(fields)) => Ok(Entity::from(fields)),
        Some(other) => Err(AppDataError::InvalidBody(format!(
            "expected an object, got {other}"
        ))),
        None => Err(AppDataError::InvalidBody("a body is required".into())),
    }
}

fn id_value(id: KeyId) -> Value {
    match id {
        KeyId::Id(id) => Value::from(id),
        KeyId::Name(name) => Value::from(name),
    }
}

/// Serves the sub-collections a user owns: `kind` names the collection,
/// and an optional positive integer id addresses one item in it.
///
/// | method | collection (no id)        | item (id)                   |
/// |--------|---------------------------|-----------------------------|
/// | GET    | list of `{id, value}`     | the item, or not found      |
/// | POST   | create under a fresh id   | conflict                    |
/// | PUT    | method not allowed        | overwrite, or not found     |
/// | DELETE | method not allowed        | remove (idempotent)         |
#[derive(Clone)]
pub struct CollectionHandler<Backend>
where
    Backend: TransactionalDocumentBackend,
{
    store: DocumentStore<Backend>,
}

impl<Backend> CollectionHandler<Backend>
where
    Backend: TransactionalDocumentBackend,
{
    /// A handler persisting through `store`
    pub fn new(store: DocumentStore<Backend>) -> Self {
        Self { store }
    }

    /// Applies `method` to the `kind` collection under `owner`, or to its
    /// item `id`
    pub async fn handle(
        &self,
        owner: &EntityKey,
        kind: &str,
        id: Option<u64>,
        method: Method,
        body: Option<Value>,
    ) -> Result<Response, AppDataError> {
        match (method, id) {
            (Method::Get, None) => self.list(owner, kind).await,
            (Method::Get, Some(id)) => {
                let key = owner.child(kind, id);
                match self.store.get(&key).await? {
                    Some(entity) => Ok(Response::json(entity.into_value())),
                    None => Err(AppDataError::NotFound(key.to_string())),
                }
            }
            (Method::Post, None) => {
                let entity = item_body(body)?;
                let key = self.store.insert_child(owner, kind, entity).await?;
                tracing::debug!(%key, "created collection item");
                Ok(Response::empty())
            }
            (Method::Post, Some(id)) => Err(AppDataError::Conflict(format!(
                "cannot create {kind} item {id}; POST to the collection instead"
            ))),
            (Method::Put, Some(id)) => {
                let key = owner.child(kind, id);
                let entity = item_body(body)?;
                self.store
                    .update::<_, AppDataError>(&key, |current| match current {
                        Some(_) => Ok(Some(entity.clone())),
                        None => Err(AppDataError::NotFound(key.to_string())),
                    })
                    .await?;
                Ok(Response::empty())
            }
            (Method::Delete, Some(id)) => {
                self.store.delete(&owner.child(kind, id)).await?;
                Ok(Response::empty())
            }
            (Method::Put | Method::Delete, None) => Err(AppDataError::MethodNotAllowed {
                method,
                resource: kind.to_owned(),
            }),
        }
    }

    async fn list(&self, owner: &EntityKey, kind: &str) -> Result<Response, AppDataError> {
        let items: Vec<Value> = self
            .store
            .query_descendants(owner, kind)
            .map_ok(|(id, entity)| {
                let mut item = Map::new();
                item.insert("id".into(), id_value(id));
                item.insert("value".into(), entity.into_value());
                Value::Object(item)
            })
            .try_collect()
            .await?;

        Ok(Response::json(Value::Array(items)))
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use appdata_storage::MemoryDocumentBackend;
    use serde_json::json;

    use super::*;

    fn setup() -> (CollectionHandler<MemoryDocumentBackend>, EntityKey) {
        let handler = CollectionHandler::new(DocumentStore::new(MemoryDocumentBackend::default()));
        (handler, EntityKey::named("acme", "alice@example.com"))
    }

    #[tokio::test]
    async fn it_lists_an_absent_collection_as_empty() -> Result<()> {
        let (handler, owner) = setup();

        let response = handler
            .handle(&owner, "favorites", None, Method::Get, None)
            .await?;

        assert_eq!(response.body, Some(json!([])));
        Ok(())
    }

    #[tokio::test]
    async fn it_creates_and_lists_items() -> Result<()> {
        let (handler, owner) = setup();

        let created = handler
            .handle(
                &owner,
                "favorites",
                None,
                Method::Post,
                Some(json!({ "title": "x" })),
            )
            .await?;
        assert_eq!(created, Response::empty());

        let listed = handler
            .handle(&owner, "favorites", None, Method::Get, None)
            .await?;
        let Some(Value::Array(items)) = listed.body else {
            panic!("expected a list, got {:?}", listed.body);
        };
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["value"], json!({ "title": "x" }));

        let id = items[0]["id"].as_u64().unwrap_or_default();
        assert!(id > 0);

        let item = handler
            .handle(&owner, "favorites", Some(id), Method::Get, None)
            .await?;
        assert_eq!(item.body, Some(json!({ "title": "x" })));
        Ok(())
    }

    #[tokio::test]
    async fn it_overwrites_existing_items_only() -> Result<()> {
        let (handler, owner) = setup();

        assert!(matches!(
            handler
                .handle(&owner, "favorites", Some(7), Method::Put, Some(json!({ "a": 1 })))
                .await,
            Err(AppDataError::NotFound(_))
        ));
        assert!(matches!(
            handler
                .handle(&owner, "favorites", Some(7), Method::Get, None)
                .await,
            Err(AppDataError::NotFound(_))
        ));

        handler
            .handle(&owner, "favorites", None, Method::Post, Some(json!({ "a": 1, "b": 2 })))
            .await?;
        let listed = handler
            .handle(&owner, "favorites", None, Method::Get, None)
            .await?;
        let id = listed
            .body
            .as_ref()
            .and_then(|body| body[0]["id"].as_u64())
            .unwrap_or_default();

        handler
            .handle(&owner, "favorites", Some(id), Method::Put, Some(json!({ "c": 3 })))
            .await?;
        let item = handler
            .handle(&owner, "favorites", Some(id), Method::Get, None)
            .await?;
        assert_eq!(item.body, Some(json!({ "c": 3 })));
        Ok(())
    }

    #[tokio::test]
    async fn it_enforces_method_shape() -> Result<()> {
        let (handler, owner) = setup();

        assert!(matches!(
            handler
                .handle(&owner, "favorites", Some(3), Method::Post, Some(json!({})))
                .await,
            Err(AppDataError::Conflict(_))
        ));
        for method in [Method::Put, Method::Delete] {
            assert!(matches!(
                handler
                    .handle(&owner, "favorites", None, method, Some(json!({})))
                    .await,
                Err(AppDataError::MethodNotAllowed { .. })
            ));
        }
        assert!(matches!(
            handler
                .handle(&owner, "favorites", None, Method::Post, Some(json!(["x"])))
                .await,
            Err(AppDataError::InvalidBody(_))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn it_deletes_idempotently() -> Result<()> {
        let (handler, owner) = setup();

        for _ in 0..2 {
            let response = handler
                .handle(&owner, "searches", Some(11), Method::Delete, None)
                .await?;
            assert_eq!(response, Response::empty());
        }
        Ok(())
    }
}
