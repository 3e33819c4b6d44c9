use std::{collections::BTreeMap, sync::Arc};

use async_stream::try_stream;
use async_trait::async_trait;
use futures_util::Stream;
use tokio::sync::RwLock;

use crate::{AppDataStorageError, Entity, EntityKey};

use super::{DocumentBackend, Edition, TransactionalDocumentBackend, check_edition};

/// A trivial implementation of [DocumentBackend] - backed by a [BTreeMap] -
/// where all entities are kept in memory and never persisted.
///
/// Clones share the same entries. Compare-and-swap runs under the write lock,
/// so concurrent replacements of one key serialize.
#[derive(Clone, Default)]
pub struct MemoryDocumentBackend {
    entries: Arc<RwLock<BTreeMap<EntityKey, Entity>>>,
}

impl MemoryDocumentBackend {
    /// Number of stored entities
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether nothing is stored
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl DocumentBackend for MemoryDocumentBackend {
    async fn get(&self, key: &EntityKey) -> Result<Option<Entity>, AppDataStorageError> {
        let entries = self.entries.read().await;
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &EntityKey, entity: Entity) -> Result<(), AppDataStorageError> {
        let mut entries = self.entries.write().await;
        entries.insert(key.clone(), entity);
        Ok(())
    }

    async fn remove(&self, key: &EntityKey) -> Result<(), AppDataStorageError> {
        let mut entries = self.entries.write().await;
        entries.remove(key);
        Ok(())
    }

    fn children<'a>(
        &'a self,
        ancestor: &'a EntityKey,
        kind: &'a str,
    ) -> impl Stream<Item = Result<(EntityKey, Entity), AppDataStorageError>> + Send + 'a {
        try_stream! {
            let entries = self.entries.read().await;
            let descendants = entries
                .range(ancestor.clone()..)
                .take_while(|(key, _)| key.starts_with(ancestor));

            for (key, entity) in descendants {
                if key.is_child_of(ancestor) && key.kind() == kind {
                    yield (key.clone(), entity.clone());
                }
            }
        }
    }
}

#[async_trait]
impl TransactionalDocumentBackend for MemoryDocumentBackend {
    async fn resolve(
        &self,
        key: &EntityKey,
    ) -> Result<Option<(Entity, Edition)>, AppDataStorageError> {
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some(entity) => Ok(Some((entity.clone(), Edition::of(entity)?))),
            None => Ok(None),
        }
    }

    async fn replace(
        &self,
        key: &EntityKey,
        edition: Option<&Edition>,
        content: Option<Entity>,
    ) -> Result<Option<Edition>, AppDataStorageError> {
        let mut entries = self.entries.write().await;

        let current = entries.get(key).map(Edition::of).transpose()?;
        let next = content.as_ref().map(Edition::of).transpose()?;

        // If the stored value already matches the desired value, succeed
        // without writing
        if current == next {
            return Ok(next);
        }

        check_edition(edition, current.as_ref())?;

        match content {
            Some(entity) => {
                entries.insert(key.clone(), entity);
            }
            None => {
                entries.remove(key);
            }
        }

        Ok(next)
    }
}
