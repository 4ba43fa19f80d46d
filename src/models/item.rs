//! Library items, notes, and collection identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Remote identifier of a collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollectionKey(String);

impl CollectionKey {
    /// Creates a key from a remote identifier string.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CollectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A collection as listed by the remote library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionSummary {
    /// Remote identifier.
    pub key: CollectionKey,
    /// Human-readable name.
    pub name: String,
    /// Parent collection, `None` for top-level collections.
    pub parent: Option<CollectionKey>,
}

/// An entry in the reference-manager library.
///
/// Owned by the remote service; refiler only reads it and appends tags and
/// collection memberships.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryItem {
    /// Unique item key.
    pub key: String,
    /// Remote object version, required for write operations.
    pub version: i64,
    /// Item type name, e.g. `journalArticle`.
    pub item_type: String,
    /// Title, empty when the remote record has none.
    pub title: String,
    /// Tag names currently on the item.
    pub tags: Vec<String>,
    /// Collections the item already belongs to.
    pub collections: Vec<CollectionKey>,
}

impl LibraryItem {
    /// Whether the item carries the given tag.
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Whether the item is already a member of the collection.
    #[must_use]
    pub fn in_collection(&self, key: &CollectionKey) -> bool {
        self.collections.contains(key)
    }
}

/// A note attached to a library item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemNote {
    /// Key of the note child item.
    pub key: String,
    /// Note body, typically HTML.
    pub content: String,
}
