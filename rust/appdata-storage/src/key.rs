use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::AppDataStorageError;

/// The identifier part of a [`KeySegment`]: either a caller-chosen name or a
/// positive integer allocated by the store.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeyId {
    /// A named identifier, e.g. a user email or an app id
    Name(String),
    /// A numeric identifier, as used by sub-collection items
    Id(u64),
}

impl From<&str> for KeyId {
    fn from(value: &str) -> Self {
        KeyId::Name(value.to_owned())
    }
}

impl From<String> for KeyId {
    fn from(value: String) -> Self {
        KeyId::Name(value)
    }
}

impl From<u64> for KeyId {
    fn from(value: u64) -> Self {
        KeyId::Id(value)
    }
}

impl Display for KeyId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyId::Name(name) => write!(f, "{name:?}"),
            KeyId::Id(id) => write!(f, "{id}"),
        }
    }
}

/// One `(kind, identifier)` step of an [`EntityKey`]. A segment without an
/// identifier denotes every entity of that kind under the preceding segments.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct KeySegment {
    /// The kind of the entity at this step
    pub kind: String,
    /// The identifier, if this step addresses a single entity
    pub id: Option<KeyId>,
}

/// A hierarchical entity address made of ordered [`KeySegment`]s.
///
/// Keys order lexicographically by segment, so every descendant of a key
/// sorts after it and all descendants of a key are contiguous. Backends rely
/// on this to answer ancestor queries with a range scan.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityKey {
    segments: Vec<KeySegment>,
}

impl EntityKey {
    /// Construct a single-segment key addressing a named entity
    pub fn named(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            segments: vec![KeySegment {
                kind: kind.into(),
                id: Some(KeyId::Name(name.into())),
            }],
        }
    }

    /// Construct a key from raw segments. Only the final segment may lack an
    /// identifier, and kinds must not be empty.
    pub fn from_segments(segments: Vec<KeySegment>) -> Result<Self, AppDataStorageError> {
        if segments.is_empty() {
            return Err(AppDataStorageError::InvalidKey(
                "a key needs at least one segment".into(),
            ));
        }

        let last = segments.len() - 1;
        for (index, segment) in segments.iter().enumerate() {
            if segment.kind.is_empty() {
                return Err(AppDataStorageError::InvalidKey(format!(
                    "segment {index} has an empty kind"
                )));
            }
            if segment.id.is_none() && index != last {
                return Err(AppDataStorageError::InvalidKey(format!(
                    "segment {index} has no identifier but is not the last segment"
                )));
            }
        }

        Ok(Self { segments })
    }

    /// Extend this key with a child addressing a single entity
    pub fn child(&self, kind: impl Into<String>, id: impl Into<KeyId>) -> Self {
        let mut segments = self.complete_segments();
        segments.push(KeySegment {
            kind: kind.into(),
            id: Some(id.into()),
        });
        Self { segments }
    }

    /// Extend this key with a partial child denoting the whole collection of
    /// `kind` under this key
    pub fn collection(&self, kind: impl Into<String>) -> Self {
        let mut segments = self.complete_segments();
        segments.push(KeySegment {
            kind: kind.into(),
            id: None,
        });
        Self { segments }
    }

    fn complete_segments(&self) -> Vec<KeySegment> {
        let mut segments = self.segments.clone();
        if self.is_partial() {
            segments.pop();
        }
        segments
    }

    /// A key is partial iff its final segment has no identifier
    pub fn is_partial(&self) -> bool {
        self.segments
            .last()
            .map(|segment| segment.id.is_none())
            .unwrap_or(true)
    }

    /// The segments of this key, root first
    pub fn segments(&self) -> &[KeySegment] {
        &self.segments
    }

    /// The kind of the final segment
    pub fn kind(&self) -> &str {
        self.segments
            .last()
            .map(|segment| segment.kind.as_str())
            .unwrap_or_default()
    }

    /// The identifier of the final segment, if any
    pub fn id(&self) -> Option<&KeyId> {
        self.segments.last().and_then(|segment| segment.id.as_ref())
    }

    /// The key one level up, if this is not a root key
    pub fn parent(&self) -> Option<EntityKey> {
        if self.segments.len() < 2 {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// Whether `ancestor`'s segments are a prefix of this key's segments
    /// (a key starts with itself)
    pub fn starts_with(&self, ancestor: &EntityKey) -> bool {
        self.segments.starts_with(&ancestor.segments)
    }

    /// Whether `ancestor`'s segments are a strict prefix of this key's
    pub fn is_descendant_of(&self, ancestor: &EntityKey) -> bool {
        self.segments.len() > ancestor.segments.len() && self.starts_with(ancestor)
    }

    /// Whether this key extends `ancestor` by exactly one segment
    pub fn is_child_of(&self, ancestor: &EntityKey) -> bool {
        self.segments.len() == ancestor.segments.len() + 1 && self.starts_with(ancestor)
    }
}

impl Display for EntityKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (index, segment) in self.segments.iter().enumerate() {
            if index > 0 {
                write!(f, "/")?;
            }
            match &segment.id {
                Some(id) => write!(f, "{}:{id}", segment.kind)?,
                None => write!(f, "{}:*", segment.kind)?,
            }
        }
        Ok(())
    }
}
