use std::fmt::{Display, Formatter};

use async_trait::async_trait;
use base58::ToBase58;
use futures_util::Stream;

use crate::{AppDataStorageError, Entity, EntityKey};

mod memory;
pub use memory::*;

mod fs;
pub use fs::*;

/// A version identifier for the content stored at a key: the BLAKE3 hash of
/// the entity's canonical encoding. Two writers holding the same edition
/// observed the same content.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Edition([u8; 32]);

impl Edition {
    /// Derive the edition of an entity
    pub fn of(entity: &Entity) -> Result<Self, AppDataStorageError> {
        Ok(Self::of_bytes(&entity.to_bytes()?))
    }

    /// Derive the edition of an already-encoded entity
    pub fn of_bytes(bytes: &[u8]) -> Self {
        Edition(*blake3::hash(bytes).as_bytes())
    }

    /// The raw hash bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl Display for Edition {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_base58())
    }
}

/// Check a compare-and-swap expectation against the current edition.
///
/// `None` on either side means "no entity stored".
pub(crate) fn check_edition(
    expected: Option<&Edition>,
    actual: Option<&Edition>,
) -> Result<(), AppDataStorageError> {
    if expected == actual {
        Ok(())
    } else {
        Err(AppDataStorageError::EditionMismatch {
            expected: expected.map(Edition::to_string),
            actual: actual.map(Edition::to_string),
        })
    }
}

/// A [DocumentBackend] is a facade over some storage substrate that can
/// store entities by key and enumerate the direct children of a key.
///
/// Plain `set` and `remove` are last-writer-wins; read-modify-write sequences
/// go through [TransactionalDocumentBackend::replace].
#[async_trait]
pub trait DocumentBackend: Clone + Send + Sync + 'static {
    /// Retrieve the entity (if any) stored against the given key
    async fn get(&self, key: &EntityKey) -> Result<Option<Entity>, AppDataStorageError>;

    /// Store the given entity against the given key, replacing any content
    async fn set(&self, key: &EntityKey, entity: Entity) -> Result<(), AppDataStorageError>;

    /// Remove the entity stored against the given key. Removing a key that
    /// holds nothing succeeds.
    async fn remove(&self, key: &EntityKey) -> Result<(), AppDataStorageError>;

    /// Lazily enumerate every stored entity whose key extends `ancestor` by
    /// exactly one segment of the given `kind`
    fn children<'a>(
        &'a self,
        ancestor: &'a EntityKey,
        kind: &'a str,
    ) -> impl Stream<Item = Result<(EntityKey, Entity), AppDataStorageError>> + Send + 'a;
}

/// A [DocumentBackend] that supports compare-and-swap replacement.
#[async_trait]
pub trait TransactionalDocumentBackend: DocumentBackend {
    /// Read the entity stored against `key` together with its edition
    async fn resolve(
        &self,
        key: &EntityKey,
    ) -> Result<Option<(Entity, Edition)>, AppDataStorageError>;

    /// Replace the content stored against `key`, provided its current
    /// edition equals `edition` (`None` meaning "nothing stored"). Passing
    /// `None` as content removes the entity. Returns the new edition.
    ///
    /// Fails with [AppDataStorageError::EditionMismatch] when the expectation
    /// does not hold, unless the stored content already equals `content`.
    async fn replace(
        &self,
        key: &EntityKey,
        edition: Option<&Edition>,
        content: Option<Entity>,
    ) -> Result<Option<Edition>, AppDataStorageError>;
}
