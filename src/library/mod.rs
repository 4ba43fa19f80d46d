//! Reference-manager client abstraction.
//!
//! Provides the trait the resolver and organizer call, plus the Zotero Web
//! API implementation. The trait seam exists so tests can count remote calls
//! against an in-memory fake.

mod zotero;

pub use zotero::{LibraryType, ZoteroClient};

use crate::Result;
use crate::models::{CollectionKey, CollectionSummary, ItemNote, LibraryItem};

/// Trait for reference-manager backends.
///
/// All operations are blocking and synchronous; retry behavior lives inside
/// the implementation, not the callers.
pub trait LibraryClient {
    /// Performs a cheap read to confirm credentials and reachability.
    ///
    /// # Errors
    ///
    /// Returns an error when the remote cannot be reached; the binary treats
    /// this as a configuration failure before the run starts.
    fn verify_connectivity(&self) -> Result<()>;

    /// Lists the collections directly under `parent`, or the top-level
    /// collections when `parent` is `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing call fails after retries.
    fn child_collections(&self, parent: Option<&CollectionKey>) -> Result<Vec<CollectionSummary>>;

    /// Creates a collection named `name` under `parent` (or at top level)
    /// and returns its key.
    ///
    /// # Errors
    ///
    /// Returns an error if the creation call fails after retries.
    fn create_collection(&self, name: &str, parent: Option<&CollectionKey>)
    -> Result<CollectionKey>;

    /// Fetches items carrying `tag`, scoped to one collection subtree when
    /// `scope` is set, otherwise the whole library.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing call fails after retries.
    fn tagged_items(
        &self,
        scope: Option<&CollectionKey>,
        tag: &str,
        limit: usize,
    ) -> Result<Vec<LibraryItem>>;

    /// Fetches the notes attached to an item.
    ///
    /// # Errors
    ///
    /// Returns an error if the children call fails after retries.
    fn item_notes(&self, item_key: &str) -> Result<Vec<ItemNote>>;

    /// Adds the item to each collection and appends the completion tag in a
    /// single write.
    ///
    /// Memberships the item already has are preserved, not duplicated.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails after retries.
    fn commit_placement(
        &self,
        item: &LibraryItem,
        collections: &[CollectionKey],
        completion_tag: &str,
    ) -> Result<()>;
}
