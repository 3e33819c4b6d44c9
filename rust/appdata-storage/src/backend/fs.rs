use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use async_stream::try_stream;
use async_trait::async_trait;
use futures_util::Stream;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::{AppDataStorageError, Entity, EntityKey, KeySegment};

use super::{DocumentBackend, Edition, TransactionalDocumentBackend, check_edition};

const ENTITY_EXTENSION: &str = "json";

/// What one entity file holds: the entity together with the key it is
/// stored under, since file names are digests and cannot be decoded.
#[derive(Serialize, Deserialize)]
struct StoredEntity {
    key: EntityKey,
    entity: Entity,
}

fn digest(segments: &[KeySegment]) -> Result<String, AppDataStorageError> {
    let bytes = serde_json::to_vec(segments)
        .map_err(|error| AppDataStorageError::EncodeFailed(format!("{error}")))?;
    Ok(blake3::hash(&bytes).to_hex().to_string())
}

/// A basic file-system-based [DocumentBackend] implementation.
///
/// Every entity is a JSON file named by the BLAKE3 digest of its key, inside
/// a directory named by the digest of its parent's key. Names stay the same
/// length however long the key is, and the children of a key share one
/// directory.
///
/// Files are replaced by writing a temporary file and renaming it over the
/// old one, so readers see either the old or the new entity. Replacements
/// are serialized through a lock shared by clones, so CAS holds for every
/// writer that goes through the same backend instance.
#[derive(Clone)]
pub struct FileSystemDocumentBackend {
    root_dir: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl FileSystemDocumentBackend {
    /// Creates a new [`FileSystemDocumentBackend`] that stores files in
    /// `root_dir`.
    pub async fn new<Pathlike>(root_dir: Pathlike) -> Result<Self, AppDataStorageError>
    where
        Pathlike: AsRef<Path>,
    {
        let root_dir = root_dir.as_ref().to_owned();
        tokio::fs::create_dir_all(&root_dir).await?;
        Ok(Self {
            root_dir,
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    fn children_dir(&self, segments: &[KeySegment]) -> Result<PathBuf, AppDataStorageError> {
        Ok(self.root_dir.join(digest(segments)?))
    }

    fn make_path(&self, key: &EntityKey) -> Result<PathBuf, AppDataStorageError> {
        let segments = key.segments();
        let parent = &segments[..segments.len().saturating_sub(1)];
        Ok(self
            .children_dir(parent)?
            .join(digest(segments)?)
            .with_extension(ENTITY_EXTENSION))
    }

    async fn read_file(path: &Path) -> Result<Option<StoredEntity>, AppDataStorageError> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(error.into()),
        }
    }

    async fn write_file(
        path: &Path,
        key: &EntityKey,
        entity: Entity,
        edition: &Edition,
    ) -> Result<(), AppDataStorageError> {
        let bytes = serde_json::to_vec(&StoredEntity {
            key: key.clone(),
            entity,
        })
        .map_err(|error| AppDataStorageError::EncodeFailed(format!("{error}")))?;

        if let Some(directory) = path.parent() {
            tokio::fs::create_dir_all(directory).await?;
        }

        let temp_path = path.with_extension(format!("{edition}.tmp"));
        tokio::fs::write(&temp_path, bytes).await?;
        tokio::fs::rename(&temp_path, path).await?;
        Ok(())
    }

    async fn remove_file(path: &Path) -> Result<(), AppDataStorageError> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(error.into()),
        }
    }
}

#[async_trait]
impl DocumentBackend for FileSystemDocumentBackend {
    async fn get(&self, key: &EntityKey) -> Result<Option<Entity>, AppDataStorageError> {
        let path = self.make_path(key)?;
        Ok(Self::read_file(&path).await?.map(|stored| stored.entity))
    }

    async fn set(&self, key: &EntityKey, entity: Entity) -> Result<(), AppDataStorageError> {
        let path = self.make_path(key)?;
        let edition = Edition::of(&entity)?;
        let _guard = self.write_lock.lock().await;
        Self::write_file(&path, key, entity, &edition).await
    }

    async fn remove(&self, key: &EntityKey) -> Result<(), AppDataStorageError> {
        let path = self.make_path(key)?;
        let _guard = self.write_lock.lock().await;
        Self::remove_file(&path).await
    }

    fn children<'a>(
        &'a self,
        ancestor: &'a EntityKey,
        kind: &'a str,
    ) -> impl Stream<Item = Result<(EntityKey, Entity), AppDataStorageError>> + Send + 'a {
        try_stream! {
            let directory = self.children_dir(ancestor.segments())?;
            let mut entries = match tokio::fs::read_dir(&directory).await {
                Ok(entries) => Some(entries),
                Err(error) if error.kind() == std::io::ErrorKind::NotFound => None,
                Err(error) => Err(error)?,
            };

            let mut paths = Vec::new();
            if let Some(entries) = entries.as_mut() {
                while let Some(entry) = entries.next_entry().await? {
                    let path = entry.path();
                    if path.extension().and_then(|extension| extension.to_str())
                        == Some(ENTITY_EXTENSION)
                    {
                        paths.push(path);
                    } else {
                        tracing::warn!(file = ?path, "skipping file that is not an entity");
                    }
                }
            }

            let mut matches = Vec::new();
            for path in paths {
                match Self::read_file(&path).await {
                    Ok(Some(stored)) => {
                        if stored.key.is_child_of(ancestor) && stored.key.kind() == kind {
                            matches.push((stored.key, stored.entity));
                        }
                    }
                    // Removed since the directory was read
                    Ok(None) => (),
                    Err(AppDataStorageError::DecodeFailed(error)) => {
                        tracing::warn!(file = ?path, %error, "skipping undecodable entity file");
                    }
                    Err(error) => Err(error)?,
                }
            }

            // Directory order is unspecified; key order keeps one query stable
            matches.sort_by(|(left, _), (right, _)| left.cmp(right));

            for item in matches {
                yield item;
            }
        }
    }
}

#[async_trait]
impl TransactionalDocumentBackend for FileSystemDocumentBackend {
    async fn resolve(
        &self,
        key: &EntityKey,
    ) -> Result<Option<(Entity, Edition)>, AppDataStorageError> {
        let path = self.make_path(key)?;
        match Self::read_file(&path).await? {
            Some(stored) => {
                let edition = Edition::of(&stored.entity)?;
                Ok(Some((stored.entity, edition)))
            }
            None => Ok(None),
        }
    }

    async fn replace(
        &self,
        key: &EntityKey,
        edition: Option<&Edition>,
        content: Option<Entity>,
    ) -> Result<Option<Edition>, AppDataStorageError> {
        let path = self.make_path(key)?;
        let next = content.as_ref().map(Edition::of).transpose()?;

        let _guard = self.write_lock.lock().await;

        let current = Self::read_file(&path)
            .await?
            .map(|stored| Edition::of(&stored.entity))
            .transpose()?;

        if current == next {
            return Ok(next);
        }

        check_edition(edition, current.as_ref())?;

        match (content, &next) {
            (Some(entity), Some(next)) => Self::write_file(&path, key, entity, next).await?,
            _ => Self::remove_file(&path).await?,
        }

        Ok(next)
    }
}
