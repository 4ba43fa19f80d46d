//! End-to-end organizer tests against in-memory fakes of both remote APIs.

// Integration tests use expect/unwrap for simplicity - panics are acceptable in tests
#![allow(clippy::expect_used, clippy::unwrap_used)]

use refiler::library::LibraryClient;
use refiler::llm::Classifier;
use refiler::models::{
    ClassificationRequest, ClassificationResult, CollectionKey, CollectionPath, CollectionSummary,
    ItemNote, LibraryItem, Taxonomy,
};
use refiler::services::{Organizer, PathResolver, RunOptions};
use refiler::{Error, Result};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::time::Duration;

/// In-memory reference manager that records every call and mutation.
#[derive(Default)]
struct FakeLibrary {
    items: RefCell<Vec<LibraryItem>>,
    notes: RefCell<BTreeMap<String, Vec<ItemNote>>>,
    /// (parent key or "", name) -> key
    collections: RefCell<BTreeMap<(String, String), CollectionKey>>,
    names: RefCell<BTreeMap<CollectionKey, String>>,
    next_id: RefCell<usize>,
    list_calls: RefCell<usize>,
    create_calls: RefCell<usize>,
    commits: RefCell<Vec<(String, Vec<CollectionKey>)>>,
}

impl FakeLibrary {
    fn add_item(&self, key: &str, title: &str, tags: &[&str], note: &str) {
        self.items.borrow_mut().push(LibraryItem {
            key: key.to_string(),
            version: 1,
            item_type: "journalArticle".to_string(),
            title: title.to_string(),
            tags: tags.iter().map(ToString::to_string).collect(),
            collections: Vec::new(),
        });
        if !note.is_empty() {
            self.notes.borrow_mut().insert(
                key.to_string(),
                vec![ItemNote {
                    key: format!("{key}-note"),
                    content: note.to_string(),
                }],
            );
        }
    }

    fn seed_collection(&self, parent: Option<&CollectionKey>, name: &str) -> CollectionKey {
        let mut id = self.next_id.borrow_mut();
        *id += 1;
        let key = CollectionKey::new(format!("K{:04}", *id));
        self.collections.borrow_mut().insert(
            (
                parent.map(|k| k.as_str().to_string()).unwrap_or_default(),
                name.to_string(),
            ),
            key.clone(),
        );
        self.names.borrow_mut().insert(key.clone(), name.to_string());
        key
    }

    fn collection_name(&self, key: &CollectionKey) -> String {
        self.names.borrow().get(key).cloned().unwrap_or_default()
    }
}

impl LibraryClient for FakeLibrary {
    fn verify_connectivity(&self) -> Result<()> {
        Ok(())
    }

    fn child_collections(&self, parent: Option<&CollectionKey>) -> Result<Vec<CollectionSummary>> {
        *self.list_calls.borrow_mut() += 1;
        let parent_key = parent.map(|k| k.as_str().to_string()).unwrap_or_default();
        Ok(self
            .collections
            .borrow()
            .iter()
            .filter(|((p, _), _)| *p == parent_key)
            .map(|((_, name), key)| CollectionSummary {
                key: key.clone(),
                name: name.clone(),
                parent: parent.cloned(),
            })
            .collect())
    }

    fn create_collection(
        &self,
        name: &str,
        parent: Option<&CollectionKey>,
    ) -> Result<CollectionKey> {
        *self.create_calls.borrow_mut() += 1;
        Ok(self.seed_collection(parent, name))
    }

    fn tagged_items(
        &self,
        _scope: Option<&CollectionKey>,
        tag: &str,
        limit: usize,
    ) -> Result<Vec<LibraryItem>> {
        Ok(self
            .items
            .borrow()
            .iter()
            .filter(|i| i.has_tag(tag))
            .take(limit)
            .cloned()
            .collect())
    }

    fn item_notes(&self, item_key: &str) -> Result<Vec<ItemNote>> {
        Ok(self.notes.borrow().get(item_key).cloned().unwrap_or_default())
    }

    fn commit_placement(
        &self,
        item: &LibraryItem,
        collections: &[CollectionKey],
        completion_tag: &str,
    ) -> Result<()> {
        self.commits
            .borrow_mut()
            .push((item.key.clone(), collections.to_vec()));
        let mut items = self.items.borrow_mut();
        if let Some(stored) = items.iter_mut().find(|i| i.key == item.key) {
            for key in collections {
                if !stored.collections.contains(key) {
                    stored.collections.push(key.clone());
                }
            }
            if !stored.has_tag(completion_tag) {
                stored.tags.push(completion_tag.to_string());
            }
            stored.version += 1;
        }
        Ok(())
    }
}

/// Classifier scripted by item title.
#[derive(Default)]
struct ScriptedClassifier {
    answers: BTreeMap<String, (Option<&'static str>, Option<&'static str>)>,
    failures: Vec<String>,
    calls: RefCell<usize>,
}

impl ScriptedClassifier {
    fn answer(mut self, title: &str, archive: Option<&'static str>, idea: Option<&'static str>) -> Self {
        self.answers.insert(title.to_string(), (archive, idea));
        self
    }

    fn failing_on(mut self, title: &str) -> Self {
        self.failures.push(title.to_string());
        self
    }
}

impl Classifier for ScriptedClassifier {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn classify(&self, request: &ClassificationRequest<'_>) -> Result<ClassificationResult> {
        *self.calls.borrow_mut() += 1;
        if self.failures.iter().any(|t| t == request.title) {
            return Err(Error::MalformedResponse {
                cause: "scripted failure".to_string(),
                response: String::new(),
            });
        }
        let (archive, idea) = self
            .answers
            .get(request.title)
            .copied()
            .unwrap_or((Some("Archive/Hazards/Flood"), None));
        Ok(ClassificationResult {
            archive: archive.map(CollectionPath::parse),
            idea: idea.map(CollectionPath::parse),
        })
    }
}

fn options(commit: bool) -> RunOptions {
    RunOptions {
        commit,
        throttle: Duration::ZERO,
        batch_size: 2,
        ..RunOptions::default()
    }
}

fn flash_drought_note() -> &'static str {
    "<p>Summary: onset analysis.</p><p>Keywords: Flash drought onset mechanisms; land-atmosphere coupling</p>"
}

#[test]
fn idempotence_second_commit_run_mutates_nothing() {
    let library = FakeLibrary::default();
    library.add_item("I1", "Paper one", &["gemini_read"], flash_drought_note());
    library.add_item("I2", "Paper two", &["gemini_read"], flash_drought_note());
    let classifier = ScriptedClassifier::default()
        .answer("Paper one", Some("Archive/Hazards/Flood"), None)
        .answer("Paper two", Some("Archive/Hazards/Flood"), None);

    let mut organizer = Organizer::new(
        &library,
        &classifier,
        PathResolver::default(),
        Taxonomy::default(),
        None,
        options(true),
    );
    let first = organizer.run().unwrap();
    assert_eq!(first.committed, 2);
    assert_eq!(library.commits.borrow().len(), 2);

    let mut organizer = Organizer::new(
        &library,
        &classifier,
        PathResolver::default(),
        Taxonomy::default(),
        None,
        options(true),
    );
    let second = organizer.run().unwrap();
    assert_eq!(second.committed, 0);
    assert_eq!(second.classified, 0);
    assert_eq!(second.already_done, 2);
    // No new mutations on the second pass.
    assert_eq!(library.commits.borrow().len(), 2);
}

#[test]
fn preview_records_plan_without_mutating() {
    let library = FakeLibrary::default();
    library.add_item("I1", "Paper one", &["gemini_read"], flash_drought_note());
    let classifier = ScriptedClassifier::default().answer(
        "Paper one",
        Some("Archive/Hazards/Flood"),
        Some("Idea Lab/Mechanism/Abrupt Transitions"),
    );

    let mut organizer = Organizer::new(
        &library,
        &classifier,
        PathResolver::default(),
        Taxonomy::default(),
        None,
        options(false),
    );
    let summary = organizer.run().unwrap();

    assert_eq!(summary.classified, 1);
    assert_eq!(summary.committed, 0);
    assert_eq!(summary.planned.len(), 1);
    assert_eq!(summary.planned[0].paths.len(), 2);
    // Preview touches nothing remotely: no collection creation, no commits.
    assert_eq!(*library.create_calls.borrow(), 0);
    assert!(library.commits.borrow().is_empty());
}

#[test]
fn preview_and_commit_agree_on_placements() {
    let build = || {
        let library = FakeLibrary::default();
        library.add_item("I1", "Paper one", &["gemini_read"], flash_drought_note());
        library.add_item("I2", "Paper two", &["gemini_read"], flash_drought_note());
        let classifier = ScriptedClassifier::default()
            .answer(
                "Paper one",
                Some("Archive/Hazards/Flood"),
                Some("Idea Lab/Modeling/Causal Inference"),
            )
            .answer("Paper two", Some("Archive/Methodology/Deep Learning"), None);
        (library, classifier)
    };

    let (library, classifier) = build();
    let mut organizer = Organizer::new(
        &library,
        &classifier,
        PathResolver::default(),
        Taxonomy::default(),
        None,
        options(false),
    );
    let preview = organizer.run().unwrap();

    let (library, classifier) = build();
    let mut organizer = Organizer::new(
        &library,
        &classifier,
        PathResolver::default(),
        Taxonomy::default(),
        None,
        options(true),
    );
    organizer.run().unwrap();

    let commits = library.commits.borrow();
    assert_eq!(preview.planned.len(), commits.len());
    for planned in &preview.planned {
        let (_, committed_keys) = commits
            .iter()
            .find(|(key, _)| *key == planned.item_key)
            .unwrap();
        let committed_leaves: Vec<String> = committed_keys
            .iter()
            .map(|k| library.collection_name(k))
            .collect();
        let planned_leaves: Vec<String> = planned
            .paths
            .iter()
            .map(|p| p.leaf().unwrap_or_default().to_string())
            .collect();
        assert_eq!(committed_leaves, planned_leaves);
    }
}

#[test]
fn one_malformed_item_does_not_abort_the_batch() {
    let library = FakeLibrary::default();
    library.add_item("I1", "Good one", &["gemini_read"], flash_drought_note());
    library.add_item("I2", "Bad apple", &["gemini_read"], flash_drought_note());
    library.add_item("I3", "Good two", &["gemini_read"], flash_drought_note());
    let classifier = ScriptedClassifier::default()
        .answer("Good one", Some("Archive/Hazards/Flood"), None)
        .answer("Good two", Some("Archive/Hazards/Flood"), None)
        .failing_on("Bad apple");

    let mut organizer = Organizer::new(
        &library,
        &classifier,
        PathResolver::default(),
        Taxonomy::default(),
        None,
        options(true),
    );
    let summary = organizer.run().unwrap();

    assert_eq!(summary.classified, 2);
    assert_eq!(summary.skipped, 1);
    // Items after the failure were still processed.
    assert!(library.commits.borrow().iter().any(|(k, _)| k == "I3"));
}

#[test]
fn completed_items_are_excluded_regardless_of_notes() {
    let library = FakeLibrary::default();
    library.add_item(
        "I1",
        "Already organized",
        &["gemini_read", "auto_organized"],
        flash_drought_note(),
    );
    let classifier = ScriptedClassifier::default();

    let mut organizer = Organizer::new(
        &library,
        &classifier,
        PathResolver::default(),
        Taxonomy::default(),
        None,
        options(true),
    );
    let summary = organizer.run().unwrap();

    assert_eq!(summary.already_done, 1);
    assert_eq!(summary.classified, 0);
    assert_eq!(*classifier.calls.borrow(), 0);
    assert!(library.commits.borrow().is_empty());
}

#[test]
fn track_a_only_commit_applies_one_membership_and_the_tag() {
    let library = FakeLibrary::default();
    library.add_item("I1", "Flash drought paper", &["gemini_read"], flash_drought_note());
    // Classifier places Track A only; no taxonomy match for Track B.
    let classifier = ScriptedClassifier::default().answer(
        "Flash drought paper",
        Some("Archive/Hazards/Drought (Flash Drought)"),
        None,
    );

    let mut organizer = Organizer::new(
        &library,
        &classifier,
        PathResolver::default(),
        Taxonomy::default(),
        None,
        options(true),
    );
    let summary = organizer.run().unwrap();
    assert_eq!(summary.committed, 1);

    let commits = library.commits.borrow();
    let (_, keys) = &commits[0];
    assert_eq!(keys.len(), 1);
    assert_eq!(
        library.collection_name(&keys[0]),
        "Drought (Flash Drought)"
    );

    let items = library.items.borrow();
    let item = items.iter().find(|i| i.key == "I1").unwrap();
    assert!(item.has_tag("auto_organized"));
    assert_eq!(item.collections.len(), 1);
}

#[test]
fn items_without_usable_notes_are_skipped() {
    let library = FakeLibrary::default();
    library.add_item("I1", "No note", &["gemini_read"], "");
    library.add_item("I2", "Plain note", &["gemini_read"], "<p>nothing structured</p>");
    let classifier = ScriptedClassifier::default();

    let mut organizer = Organizer::new(
        &library,
        &classifier,
        PathResolver::default(),
        Taxonomy::default(),
        None,
        options(false),
    );
    let summary = organizer.run().unwrap();

    assert_eq!(summary.skipped, 2);
    assert_eq!(summary.classified, 0);
    assert_eq!(*classifier.calls.borrow(), 0);
}

#[test]
fn item_type_filter_narrows_candidates() {
    let library = FakeLibrary::default();
    library.add_item("I1", "Article", &["gemini_read"], flash_drought_note());
    {
        let mut items = library.items.borrow_mut();
        items[0].item_type = "thesis".to_string();
    }
    let classifier = ScriptedClassifier::default();

    let mut opts = options(false);
    opts.item_types = Some(vec!["journalArticle".to_string()]);
    let mut organizer = Organizer::new(
        &library,
        &classifier,
        PathResolver::default(),
        Taxonomy::default(),
        None,
        opts,
    );
    let summary = organizer.run().unwrap();
    assert_eq!(summary.classified, 0);
    assert_eq!(summary.skipped, 0);
    assert_eq!(*classifier.calls.borrow(), 0);
}

#[test]
fn missing_target_collection_is_a_configuration_error() {
    let library = FakeLibrary::default();
    let classifier = ScriptedClassifier::default();

    let mut opts = options(false);
    opts.scope = Some(CollectionPath::parse("Does/Not/Exist"));
    let mut organizer = Organizer::new(
        &library,
        &classifier,
        PathResolver::default(),
        Taxonomy::default(),
        None,
        opts,
    );
    assert!(matches!(
        organizer.run(),
        Err(Error::Configuration(_))
    ));
}

#[test]
fn resolver_reuses_collections_across_items() {
    let library = FakeLibrary::default();
    library.add_item("I1", "Paper one", &["gemini_read"], flash_drought_note());
    library.add_item("I2", "Paper two", &["gemini_read"], flash_drought_note());
    // Both items target the same path; the second must hit the cache.
    let classifier = ScriptedClassifier::default()
        .answer("Paper one", Some("Archive/Hazards/Flood"), None)
        .answer("Paper two", Some("Archive/Hazards/Flood"), None);

    let mut organizer = Organizer::new(
        &library,
        &classifier,
        PathResolver::default(),
        Taxonomy::default(),
        None,
        options(true),
    );
    organizer.run().unwrap();

    // Three segments created exactly once: Archive, Hazards, Flood.
    assert_eq!(*library.create_calls.borrow(), 3);
}
