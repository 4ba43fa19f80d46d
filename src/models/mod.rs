//! Data models for refiler.
//!
//! This module contains all the core data structures used throughout the system.

mod classify;
mod item;
mod path;
mod profile;
mod taxonomy;

pub use classify::{ClassificationRequest, ClassificationResult, PlannedMove, RunSummary};
pub use item::{CollectionKey, CollectionSummary, ItemNote, LibraryItem};
pub use path::CollectionPath;
pub use profile::UserProfile;
pub use taxonomy::{Taxonomy, TrackDefinition};
