//! Pipeline services: caching, path resolution, profile loading, and the
//! batch orchestrator.

mod cache;
mod notes;
mod organizer;
mod profile;
mod resolver;

pub use cache::CollectionCache;
pub use notes::extract_note_digest;
pub use organizer::{Organizer, RunOptions};
pub use profile::load_profile;
pub use resolver::PathResolver;
