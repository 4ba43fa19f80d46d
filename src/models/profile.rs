//! User research-taste profile.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A previously computed user-interest summary.
///
/// Regenerated by an external profiling pass on the operator's cadence;
/// consumed read-only by the classifier. Every field defaults to empty so a
/// partial profile file still loads.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserProfile {
    /// Short free-text summary of current research taste.
    #[serde(default)]
    pub summary: String,
    /// Stable core interests.
    #[serde(default)]
    pub core_interests: BTreeSet<String>,
    /// Current focus areas, most important first.
    #[serde(default)]
    pub focus_areas: Vec<String>,
    /// Suggested question-driven categories for the Idea Lab track.
    #[serde(default, alias = "idea_lab_suggestions")]
    pub suggestions: Vec<String>,
}

impl UserProfile {
    /// Renders the profile as prompt context, or `None` when it adds nothing.
    ///
    /// Only the summary, focus areas, and suggestions go into prompts; core
    /// interests are background material for the profiling pass itself.
    #[must_use]
    pub fn prompt_context(&self) -> Option<String> {
        let mut sections = Vec::new();
        if !self.summary.is_empty() {
            sections.push(self.summary.clone());
        }
        if !self.focus_areas.is_empty() {
            sections.push(format!("Current focus: {}", self.focus_areas.join(", ")));
        }
        if !self.suggestions.is_empty() {
            sections.push(format!(
                "Suggested Idea Lab categories: {}",
                self.suggestions.join(", ")
            ));
        }
        if sections.is_empty() {
            None
        } else {
            Some(sections.join("\n"))
        }
    }
}
