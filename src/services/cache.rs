//! Persisted collection-key cache.

use crate::models::{CollectionKey, CollectionPath};
use std::collections::BTreeMap;
use std::path::Path;

/// Mapping from serialized collection paths to remote collection keys.
///
/// Loaded at process start, mutated in memory as paths are resolved, and
/// flushed after each new resolution. The file is safe to delete at any
/// time; the next run rebuilds it from remote listings. Staleness after
/// out-of-band changes to the remote collection tree is the operator's to
/// repair by deleting the file.
#[derive(Debug, Clone, Default)]
pub struct CollectionCache {
    entries: BTreeMap<String, CollectionKey>,
}

impl CollectionCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the cache from a JSON file.
    ///
    /// A missing or unparsable file yields an empty cache; a corrupt cache
    /// is an inconvenience, never a failure.
    #[must_use]
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<BTreeMap<String, CollectionKey>>(&contents)
            {
                Ok(entries) => {
                    tracing::debug!(entries = entries.len(), path = %path.display(), "loaded collection cache");
                    Self { entries }
                },
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "collection cache unparsable, rebuilding");
                    Self::new()
                },
            },
            Err(_) => Self::new(),
        }
    }

    /// Flushes the cache to a JSON file.
    ///
    /// Failures are logged, not raised: losing the cache only costs extra
    /// remote lookups on the next run.
    pub fn save(&self, path: &Path) {
        let serialized = match serde_json::to_string_pretty(&self.entries) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(error = %e, "failed to serialize collection cache");
                return;
            },
        };
        if let Err(e) = std::fs::write(path, serialized) {
            tracing::warn!(path = %path.display(), error = %e, "failed to write collection cache");
        }
    }

    /// Looks up the key cached for a path.
    #[must_use]
    pub fn get(&self, path: &CollectionPath) -> Option<&CollectionKey> {
        self.entries.get(&path.cache_key())
    }

    /// Records a resolved path.
    pub fn insert(&mut self, path: &CollectionPath, key: CollectionKey) {
        self.entries.insert(path.cache_key(), key);
    }

    /// Iterates over cached `(path, key)` entries in path order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &CollectionKey)> {
        self.entries.iter().map(|(path, key)| (path.as_str(), key))
    }

    /// Number of cached paths.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
