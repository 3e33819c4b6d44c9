use crate::{AppDataStorageError, Edition, Entity, EntityKey, TransactionalDocumentBackend};

/// How many times a read-modify-write is re-attempted after losing a
/// compare-and-swap race.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdatePolicy {
    /// Re-read and re-apply the mutation at most this many times
    MaxRetries(usize),
}

impl Default for UpdatePolicy {
    fn default() -> Self {
        UpdatePolicy::MaxRetries(16)
    }
}

/// A cursor-like handle positioned at one key of a
/// [`TransactionalDocumentBackend`], caching the entity found there and its
/// [`Edition`].
///
/// Writes go through compare-and-swap against the cached edition, so a
/// writer that read stale content can never overwrite a newer entity; it
/// observes [`AppDataStorageError::EditionMismatch`] instead and may
/// [`reload`](Transaction::reload) and try again.
/// [`replace_with`](Transaction::replace_with) packages that loop.
pub struct Transaction<'a, Backend>
where
    Backend: TransactionalDocumentBackend,
{
    key: EntityKey,
    backend: &'a Backend,
    state: Option<(Entity, Edition)>,
}

impl<'a, Backend> Transaction<'a, Backend>
where
    Backend: TransactionalDocumentBackend,
{
    /// Opens the entity at `key`, loading its content and edition into cache
    pub async fn open(key: EntityKey, backend: &'a Backend) -> Result<Self, AppDataStorageError> {
        let state = backend.resolve(&key).await?;
        Ok(Self {
            key,
            backend,
            state,
        })
    }

    /// The cached entity, if one was stored when last read
    pub fn read(&self) -> Option<&Entity> {
        self.state.as_ref().map(|(entity, _)| entity)
    }

    /// Reloads content from the backend into cache
    pub async fn reload(&mut self) -> Result<(), AppDataStorageError> {
        self.state = self.backend.resolve(&self.key).await?;
        Ok(())
    }

    /// Replaces content using CAS semantics against the cached edition.
    /// `None` removes the entity.
    pub async fn replace(&mut self, content: Option<Entity>) -> Result<(), AppDataStorageError> {
        let edition = self.state.as_ref().map(|(_, edition)| *edition);
        let next = self
            .backend
            .replace(&self.key, edition.as_ref(), content.clone())
            .await?;

        self.state = match (content, next) {
            (Some(entity), Some(edition)) => Some((entity, edition)),
            _ => None,
        };

        Ok(())
    }

    /// Replaces content with a value computed from the cached content,
    /// reloading and recomputing after each lost CAS race, up to the limit
    /// set by `policy`. Returns the content that was written.
    ///
    /// `f` may abort the transaction by returning an error, in which case
    /// nothing is written.
    pub async fn replace_with<F, E>(
        &mut self,
        f: F,
        policy: &UpdatePolicy,
    ) -> Result<Option<Entity>, E>
    where
        F: Fn(Option<&Entity>) -> Result<Option<Entity>, E> + Send,
        E: From<AppDataStorageError> + Send,
    {
        let UpdatePolicy::MaxRetries(max_retries) = *policy;
        let mut attempt = 0;

        loop {
            let next = f(self.read())?;

            match self.replace(next.clone()).await {
                Ok(()) => return Ok(next),
                Err(error) if error.is_conflict() && attempt < max_retries => {
                    attempt += 1;
                    tracing::debug!(key = %self.key, attempt, "lost CAS race, retrying");
                    self.reload().await?;
                }
                Err(error) => return Err(error.into()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use serde_json::json;

    use super::*;
    use crate::{DocumentBackend, MemoryDocumentBackend};

    #[tokio::test]
    async fn it_detects_a_concurrent_write() -> Result<()> {
        let backend = MemoryDocumentBackend::default();
        let key = EntityKey::named("group", "app1");

        let mut transaction = Transaction::open(key.clone(), &backend).await?;
        backend
            .set(&key, Entity::try_from(json!({ "data": "elsewhere" }))?)
            .await?;

        let result = transaction
            .replace(Some(Entity::try_from(json!({ "data": "here" }))?))
            .await;

        assert!(matches!(
            result,
            Err(AppDataStorageError::EditionMismatch { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn it_recomputes_after_losing_a_race() -> Result<()> {
        let backend = MemoryDocumentBackend::default();
        let key = EntityKey::named("group", "counter");
        backend
            .set(&key, Entity::try_from(json!({ "count": 1 }))?)
            .await?;

        let mut transaction = Transaction::open(key.clone(), &backend).await?;
        backend
            .set(&key, Entity::try_from(json!({ "count": 5 }))?)
            .await?;

        let written = transaction
            .replace_with(
                |current| {
                    let count = current
                        .and_then(|entity| entity.get("count"))
                        .and_then(|count| count.as_u64())
                        .unwrap_or_default();
                    let mut next = Entity::default();
                    next.set("count", json!(count + 1));
                    Ok::<_, AppDataStorageError>(Some(next))
                },
                &UpdatePolicy::default(),
            )
            .await?;

        assert_eq!(written, Some(Entity::try_from(json!({ "count": 6 }))?));
        assert_eq!(
            backend.get(&key).await?,
            Some(Entity::try_from(json!({ "count": 6 }))?)
        );
        Ok(())
    }

    #[tokio::test]
    async fn it_gives_up_when_retries_are_exhausted() -> Result<()> {
        let backend = MemoryDocumentBackend::default();
        let key = EntityKey::named("group", "app1");

        let mut transaction = Transaction::open(key.clone(), &backend).await?;
        backend.set(&key, Entity::try_from(json!({ "v": 0 }))?).await?;

        let result = transaction
            .replace_with(
                |_| Ok::<_, AppDataStorageError>(Some(Entity::try_from(json!({ "v": 1 }))?)),
                &UpdatePolicy::MaxRetries(0),
            )
            .await;

        assert!(matches!(
            result,
            Err(AppDataStorageError::EditionMismatch { .. })
        ));
        Ok(())
    }
}
