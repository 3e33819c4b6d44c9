use async_stream::try_stream;
use futures_util::{Stream, TryStreamExt};

use crate::{
    AppDataStorageError, DocumentBackend, Entity, EntityKey, KeyId, Transaction,
    TransactionalDocumentBackend, UpdatePolicy,
};

/// Largest id handed out by [`DocumentStore::insert_child`]; ids stay exact
/// when carried through JSON numbers.
pub const MAX_ALLOCATED_ID: u64 = (1 << 53) - 1;

/// The gateway through which every entity is read and written: point reads,
/// transactional read-modify-write, deletion and ancestor queries over a
/// [`TransactionalDocumentBackend`].
///
/// ```rust
/// # async fn example() -> Result<(), appdata_storage::AppDataStorageError> {
/// use appdata_storage::{DocumentStore, EntityKey, MemoryDocumentBackend};
/// use serde_json::json;
///
/// let store = DocumentStore::new(MemoryDocumentBackend::default());
/// let key = EntityKey::named("tenant", "alice@example.com");
///
/// store
///     .upsert(&key, |entity| {
///         entity.set("theme", json!("dark"));
///         Ok::<_, appdata_storage::AppDataStorageError>(())
///     })
///     .await?;
///
/// let entity = store.get(&key).await?;
/// assert_eq!(entity.and_then(|e| e.get("theme").cloned()), Some(json!("dark")));
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct DocumentStore<Backend>
where
    Backend: TransactionalDocumentBackend,
{
    backend: Backend,
    policy: UpdatePolicy,
}

fn complete(key: &EntityKey) -> Result<(), AppDataStorageError> {
    if key.is_partial() {
        Err(AppDataStorageError::PartialKey(key.to_string()))
    } else {
        Ok(())
    }
}

impl<Backend> DocumentStore<Backend>
where
    Backend: TransactionalDocumentBackend,
{
    /// Wrap a backend with the default [`UpdatePolicy`]
    pub fn new(backend: Backend) -> Self {
        Self {
            backend,
            policy: UpdatePolicy::default(),
        }
    }

    /// Use `policy` for every read-modify-write issued through this store
    pub fn with_policy(mut self, policy: UpdatePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Point lookup. An absent entity is not an error.
    pub async fn get(&self, key: &EntityKey) -> Result<Option<Entity>, AppDataStorageError> {
        complete(key)?;
        self.backend.get(key).await
    }

    /// Overwrite the entity at `key` without reading it first
    pub async fn put(&self, key: &EntityKey, entity: Entity) -> Result<(), AppDataStorageError> {
        complete(key)?;
        self.backend.set(key, entity).await
    }

    /// Remove the entity at `key`; removing an absent entity succeeds
    pub async fn delete(&self, key: &EntityKey) -> Result<(), AppDataStorageError> {
        complete(key)?;
        self.backend.remove(key).await
    }

    /// Atomic read-modify-write of the entity at `key`.
    ///
    /// `f` receives the current entity (or `None`) and returns the entity to
    /// store (`None` removes it). No other transactional writer to the same
    /// key can interleave: if one commits first, `f` runs again against the
    /// fresh content. Returns what was written.
    pub async fn update<F, E>(&self, key: &EntityKey, f: F) -> Result<Option<Entity>, E>
    where
        F: Fn(Option<&Entity>) -> Result<Option<Entity>, E> + Send,
        E: From<AppDataStorageError> + Send,
    {
        complete(key)?;
        let mut transaction = Transaction::open(key.clone(), &self.backend).await?;
        transaction.replace_with(f, &self.policy).await
    }

    /// Transactional upsert: `mutator` edits the current entity, or a fresh
    /// empty one if none is stored, and the result is written back.
    pub async fn upsert<F, E>(&self, key: &EntityKey, mutator: F) -> Result<Entity, E>
    where
        F: Fn(&mut Entity) -> Result<(), E> + Send,
        E: From<AppDataStorageError> + Send,
    {
        let written = self
            .update::<_, E>(key, move |current| {
                let mut entity = current.cloned().unwrap_or_default();
                mutator(&mut entity)?;
                Ok(Some(entity))
            })
            .await?;

        Ok(written.unwrap_or_default())
    }

    /// Create a new child of `ancestor` of the given `kind` under a freshly
    /// allocated positive integer id, never overwriting an existing entity.
    /// Returns the key of the created entity.
    pub async fn insert_child(
        &self,
        ancestor: &EntityKey,
        kind: &str,
        entity: Entity,
    ) -> Result<EntityKey, AppDataStorageError> {
        complete(ancestor)?;
        let UpdatePolicy::MaxRetries(max_retries) = self.policy;

        for attempt in 0..=max_retries {
            let id = rand::random::<u64>() % MAX_ALLOCATED_ID + 1;
            let key = ancestor.child(kind, id);

            if self.backend.get(&key).await?.is_some() {
                tracing::debug!(%key, attempt, "allocated id already taken");
                continue;
            }

            match self.backend.replace(&key, None, Some(entity.clone())).await {
                Ok(_) => return Ok(key),
                Err(error) if error.is_conflict() => {
                    tracing::debug!(%key, attempt, "allocated id claimed concurrently");
                }
                Err(error) => return Err(error),
            }
        }

        Err(AppDataStorageError::StorageBackend(format!(
            "could not allocate an id for {kind} under {ancestor}"
        )))
    }

    /// Lazily enumerate the direct descendants of `ancestor` that have the
    /// given `kind`, yielding each one's identifier and entity. Every call
    /// re-executes the query.
    pub fn query_descendants<'a>(
        &'a self,
        ancestor: &'a EntityKey,
        kind: &'a str,
    ) -> impl Stream<Item = Result<(KeyId, Entity), AppDataStorageError>> + Send + 'a {
        try_stream! {
            complete(ancestor)?;

            let children = self.backend.children(ancestor, kind);
            futures_util::pin_mut!(children);

            while let Some((key, entity)) = children.try_next().await? {
                if let Some(id) = key.id() {
                    yield (id.clone(), entity);
                }
            }
        }
    }
}
