//! Hierarchical collection path resolution.

use super::CollectionCache;
use crate::library::LibraryClient;
use crate::models::{CollectionKey, CollectionPath};
use crate::{Error, Result};
use std::path::PathBuf;

/// Resolves collection paths to remote keys, creating missing segments and
/// memoizing results.
#[derive(Debug, Default)]
pub struct PathResolver {
    cache: CollectionCache,
    /// Where to flush the cache after new resolutions, if anywhere.
    cache_file: Option<PathBuf>,
}

impl PathResolver {
    /// Creates a resolver over a preloaded cache.
    #[must_use]
    pub const fn new(cache: CollectionCache, cache_file: Option<PathBuf>) -> Self {
        Self { cache, cache_file }
    }

    /// Creates a resolver whose cache is loaded from (and flushed to) `file`.
    #[must_use]
    pub fn from_file(file: PathBuf) -> Self {
        Self {
            cache: CollectionCache::load(&file),
            cache_file: Some(file),
        }
    }

    /// Read access to the cache, for reporting.
    #[must_use]
    pub const fn cache(&self) -> &CollectionCache {
        &self.cache
    }

    /// Resolves a path to its remote collection key.
    ///
    /// On a cache hit no remote call is made. On a miss the path is walked
    /// segment by segment from the library root: an existing child with the
    /// matching name is descended into, a missing one is created. The full
    /// path and every visited prefix are memoized, and the cache file is
    /// flushed whenever anything new was learned.
    ///
    /// When duplicate sibling names exist remotely, the first match in
    /// listing order wins.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPath` if the path is empty or any segment is empty,
    /// and `RemoteUnavailable`/`RateLimited` if a listing or creation call
    /// fails after its retry budget.
    pub fn resolve<L: LibraryClient>(
        &mut self,
        library: &L,
        path: &CollectionPath,
    ) -> Result<CollectionKey> {
        if path.is_empty() {
            return Err(Error::InvalidPath("path has no segments".to_string()));
        }
        if let Some(empty_idx) = path.segments().iter().position(|s| s.trim().is_empty()) {
            return Err(Error::InvalidPath(format!(
                "segment {empty_idx} of '{path}' is empty"
            )));
        }

        if let Some(key) = self.cache.get(path) {
            return Ok(key.clone());
        }

        let mut parent: Option<CollectionKey> = None;
        let mut learned = false;

        for depth in 1..=path.len() {
            let prefix = path.prefix(depth);
            if let Some(key) = self.cache.get(&prefix) {
                parent = Some(key.clone());
                continue;
            }

            let name = &path.segments()[depth - 1];
            let children = library.child_collections(parent.as_ref())?;
            // First match in listing order; duplicate sibling names are a
            // known ambiguity of the remote system.
            let key = match children.into_iter().find(|c| c.name == *name) {
                Some(existing) => existing.key,
                None => library.create_collection(name, parent.as_ref())?,
            };

            self.cache.insert(&prefix, key.clone());
            learned = true;
            parent = Some(key);
        }

        if learned && let Some(file) = &self.cache_file {
            self.cache.save(file);
        }

        parent.ok_or_else(|| Error::InvalidPath(format!("could not resolve '{path}'")))
    }
}
