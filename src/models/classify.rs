//! Classification requests, results, and run reporting.

use super::{CollectionPath, Taxonomy, UserProfile};

/// Input to a single classification call.
///
/// Carries a condensed representation of the item, never the full note, to
/// bound request size.
#[derive(Debug, Clone)]
pub struct ClassificationRequest<'a> {
    /// Item title.
    pub title: &'a str,
    /// Keyword digest extracted from the item's analysis note.
    pub keywords: &'a str,
    /// The dual-track taxonomy to classify against.
    pub taxonomy: &'a Taxonomy,
    /// Optional user profile for personalization context.
    pub profile: Option<&'a UserProfile>,
}

/// Target paths produced by the classifier for one item.
///
/// Transient; consumed immediately to mutate the item's collection
/// membership and never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationResult {
    /// Track A (Archive) placement. `None` when the classifier answered
    /// `Unclassified` for the disciplinary track.
    pub archive: Option<CollectionPath>,
    /// Track B (Idea Lab) placement, optional by design.
    pub idea: Option<CollectionPath>,
}

impl ClassificationResult {
    /// The target paths in track order, skipping unplaced tracks.
    #[must_use]
    pub fn paths(&self) -> Vec<&CollectionPath> {
        self.archive.iter().chain(self.idea.iter()).collect()
    }
}

/// An intended mutation recorded during a preview run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedMove {
    /// Key of the item that would move.
    pub item_key: String,
    /// Item title, for operator review.
    pub title: String,
    /// Collections the item would be added to.
    pub paths: Vec<CollectionPath>,
}

/// Final tally of an organizer run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Items for which the classifier produced a usable result.
    pub classified: usize,
    /// Items whose mutations were applied (commit mode only).
    pub committed: usize,
    /// Items skipped due to per-item errors or missing note digests.
    pub skipped: usize,
    /// Items excluded up front because they already bore the completion tag.
    pub already_done: usize,
    /// Intended mutations, populated in preview mode for operator review.
    pub planned: Vec<PlannedMove>,
}
