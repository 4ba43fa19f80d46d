//! Batch orchestrator for the organize sweep.
//!
//! Drives the end-to-end pass over candidate items: enumerate, filter by
//! completion tag, digest notes, classify in fixed-size batches, resolve
//! target paths, and preview or commit the placements. Per-item failures of
//! any class are contained here; this is a best-effort sweep, not a
//! transaction.

use super::{PathResolver, extract_note_digest};
use crate::library::LibraryClient;
use crate::llm::Classifier;
use crate::models::{
    ClassificationRequest, CollectionKey, CollectionPath, LibraryItem, PlannedMove, RunSummary,
    Taxonomy, UserProfile,
};
use crate::{Error, Result};
use std::time::Duration;

/// Options for a single organize run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Collection subtree to process; `None` sweeps the whole library.
    pub scope: Option<CollectionPath>,
    /// Tag marking items with an AI-generated analysis note.
    pub source_tag: String,
    /// Tag written after a successful placement; the sole idempotence and
    /// resumption mechanism.
    pub completion_tag: String,
    /// Item types to process; `None` accepts all types.
    pub item_types: Option<Vec<String>>,
    /// Items classified per batch.
    pub batch_size: usize,
    /// Upper bound on items fetched per run.
    pub item_limit: usize,
    /// `false` previews intended mutations without applying them.
    pub commit: bool,
    /// Inter-call delay to respect remote rate limits. A deliberate
    /// throttle, not a correctness requirement.
    pub throttle: Duration,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            scope: None,
            source_tag: "gemini_read".to_string(),
            completion_tag: "auto_organized".to_string(),
            item_types: None,
            batch_size: 5,
            item_limit: 100,
            commit: false,
            throttle: Duration::from_secs(2),
        }
    }
}

/// An item that survived filtering, with its note digest.
struct Candidate {
    item: LibraryItem,
    digest: String,
}

/// The batch orchestrator.
pub struct Organizer<'a, L, C> {
    library: &'a L,
    classifier: &'a C,
    resolver: PathResolver,
    taxonomy: Taxonomy,
    profile: Option<UserProfile>,
    options: RunOptions,
}

impl<'a, L: LibraryClient, C: Classifier> Organizer<'a, L, C> {
    /// Creates an organizer over the given clients and state.
    #[must_use]
    pub const fn new(
        library: &'a L,
        classifier: &'a C,
        resolver: PathResolver,
        taxonomy: Taxonomy,
        profile: Option<UserProfile>,
        options: RunOptions,
    ) -> Self {
        Self {
            library,
            classifier,
            resolver,
            taxonomy,
            profile,
            options,
        }
    }

    /// Runs the sweep and returns the final tally.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` when the run cannot start (invalid taxonomy,
    /// batch size of zero, target collection not found) and a transient
    /// error when the initial enumeration fails after retries. Everything
    /// that happens after enumeration is contained per item.
    pub fn run(&mut self) -> Result<RunSummary> {
        self.taxonomy.validate()?;
        if self.options.batch_size == 0 {
            return Err(Error::Configuration(
                "batch size must be a positive integer".to_string(),
            ));
        }

        let scope_key = self.find_scope_key()?;
        let mut summary = RunSummary::default();
        let candidates = self.collect_candidates(scope_key.as_ref(), &mut summary)?;

        tracing::info!(
            candidates = candidates.len(),
            already_done = summary.already_done,
            commit = self.options.commit,
            "starting organize sweep"
        );

        let batch_count = candidates.len().div_ceil(self.options.batch_size);
        for (batch_idx, batch) in candidates.chunks(self.options.batch_size).enumerate() {
            tracing::info!(
                batch = batch_idx + 1,
                of = batch_count,
                items = batch.len(),
                "processing batch"
            );
            for candidate in batch {
                match self.process_item(candidate) {
                    Ok(planned) => {
                        summary.classified += 1;
                        if self.options.commit {
                            summary.committed += 1;
                        } else {
                            summary.planned.push(planned);
                        }
                    },
                    Err(err) => {
                        summary.skipped += 1;
                        tracing::warn!(
                            item = %candidate.item.key,
                            title = %candidate.item.title,
                            error = %err,
                            "item skipped, flagged for manual follow-up"
                        );
                    },
                }
            }
            if batch_idx + 1 < batch_count {
                self.pause();
            }
        }

        tracing::info!(
            classified = summary.classified,
            committed = summary.committed,
            skipped = summary.skipped,
            already_done = summary.already_done,
            "organize sweep finished"
        );
        Ok(summary)
    }

    /// Looks up the configured target collection without creating anything.
    fn find_scope_key(&self) -> Result<Option<CollectionKey>> {
        let Some(scope) = &self.options.scope else {
            return Ok(None);
        };
        let mut parent: Option<CollectionKey> = None;
        for name in scope.segments() {
            let children = self.library.child_collections(parent.as_ref())?;
            let Some(found) = children.into_iter().find(|c| c.name == *name) else {
                return Err(Error::Configuration(format!(
                    "target collection '{scope}' not found (missing '{name}')"
                )));
            };
            parent = Some(found.key);
        }
        Ok(parent)
    }

    /// Enumerates and filters items, building note digests.
    fn collect_candidates(
        &self,
        scope_key: Option<&CollectionKey>,
        summary: &mut RunSummary,
    ) -> Result<Vec<Candidate>> {
        let items = self.library.tagged_items(
            scope_key,
            &self.options.source_tag,
            self.options.item_limit,
        )?;

        let mut candidates = Vec::new();
        for item in items {
            if item.has_tag(&self.options.completion_tag) {
                summary.already_done += 1;
                continue;
            }
            if let Some(types) = &self.options.item_types
                && !types.iter().any(|t| *t == item.item_type)
            {
                continue;
            }

            let digest = match self.digest_for(&item) {
                Ok(Some(digest)) => digest,
                Ok(None) => {
                    summary.skipped += 1;
                    tracing::debug!(item = %item.key, "no usable note digest, skipping");
                    continue;
                },
                Err(err) => {
                    summary.skipped += 1;
                    tracing::warn!(item = %item.key, error = %err, "could not fetch notes, skipping");
                    continue;
                },
            };
            candidates.push(Candidate { item, digest });
        }
        Ok(candidates)
    }

    /// Finds the first note on the item that yields a digest.
    fn digest_for(&self, item: &LibraryItem) -> Result<Option<String>> {
        let notes = self.library.item_notes(&item.key)?;
        Ok(notes
            .iter()
            .find_map(|note| extract_note_digest(&note.content)))
    }

    /// Classifies one item and previews or commits its placement.
    fn process_item(&mut self, candidate: &Candidate) -> Result<PlannedMove> {
        let request = ClassificationRequest {
            title: &candidate.item.title,
            keywords: &candidate.digest,
            taxonomy: &self.taxonomy,
            profile: self.profile.as_ref(),
        };
        let result = self.classifier.classify(&request)?;
        let paths: Vec<CollectionPath> = result.paths().into_iter().cloned().collect();

        let planned = PlannedMove {
            item_key: candidate.item.key.clone(),
            title: candidate.item.title.clone(),
            paths: paths.clone(),
        };

        if !self.options.commit {
            // Preview stops before any remote mutation; paths are not even
            // resolved, since resolution may create collections.
            return Ok(planned);
        }

        let mut keys = Vec::new();
        for path in &paths {
            keys.push(self.resolver.resolve(self.library, path)?);
        }
        // The completion tag is written even when both tracks came back
        // unplaced, otherwise the item would be re-sent every run.
        self.library
            .commit_placement(&candidate.item, &keys, &self.options.completion_tag)?;
        self.pause();
        Ok(planned)
    }

    fn pause(&self) {
        if !self.options.throttle.is_zero() {
            std::thread::sleep(self.options.throttle);
        }
    }
}
