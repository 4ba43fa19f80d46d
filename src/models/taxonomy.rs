//! Dual-track classification taxonomy.

use super::CollectionPath;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// One classification track: a set of defined collection paths plus a flag
/// allowing the classifier to propose novel leaves under defined categories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackDefinition {
    /// Human-readable description, included in classification prompts.
    #[serde(default)]
    pub description: String,
    /// Defined collection paths, `/`-separated.
    pub structure: Vec<String>,
    /// Whether novel leaves under an existing category are acceptable.
    #[serde(default = "default_open_leaves")]
    pub open_leaves: bool,
}

const fn default_open_leaves() -> bool {
    true
}

impl TrackDefinition {
    /// Whether a classifier-proposed path is acceptable for this track.
    ///
    /// A path is permitted when it matches a defined path or names an
    /// intermediate category of one, or, with open leaves, when its parent
    /// is itself a permitted category.
    #[must_use]
    pub fn permits(&self, path: &CollectionPath) -> bool {
        let defined: Vec<CollectionPath> = self
            .structure
            .iter()
            .map(|s| CollectionPath::parse(s))
            .collect();

        if defined.iter().any(|d| path.is_prefix_of(d) || *d == *path) {
            return true;
        }
        if self.open_leaves
            && let Some(parent) = path.parent()
        {
            return defined.iter().any(|d| parent.is_prefix_of(d));
        }
        false
    }
}

/// The dual taxonomy: a disciplinary "Archive" track (Track A, mandatory)
/// and a question-driven "Idea Lab" track (Track B, optional).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Taxonomy {
    /// Track A: standard disciplinary classification for retrieval.
    pub archive: TrackDefinition,
    /// Track B: scientific-question-driven classification. `None` disables
    /// the second track entirely.
    #[serde(default)]
    pub idea: Option<TrackDefinition>,
}

impl Taxonomy {
    /// Validates the taxonomy before a run starts.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if a track has no defined paths or a defined
    /// path has no usable segments.
    pub fn validate(&self) -> Result<()> {
        Self::validate_track("archive", &self.archive)?;
        if let Some(idea) = &self.idea {
            Self::validate_track("idea", idea)?;
        }
        Ok(())
    }

    fn validate_track(name: &str, track: &TrackDefinition) -> Result<()> {
        if track.structure.is_empty() {
            return Err(Error::Configuration(format!(
                "taxonomy track '{name}' defines no collection paths"
            )));
        }
        for raw in &track.structure {
            if CollectionPath::parse(raw).is_empty() {
                return Err(Error::Configuration(format!(
                    "taxonomy track '{name}' contains unusable path '{raw}'"
                )));
            }
        }
        Ok(())
    }

    /// Renders the taxonomy as compact JSON for inclusion in prompts.
    #[must_use]
    pub fn prompt_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}

impl Default for Taxonomy {
    /// The built-in dual-track structure for a hydrology research library.
    fn default() -> Self {
        Self {
            archive: TrackDefinition {
                description: "Standard disciplinary classification for retrieval.".to_string(),
                structure: [
                    "Archive/Processes/Evapotranspiration",
                    "Archive/Processes/Runoff & Streamflow",
                    "Archive/Processes/Cryosphere",
                    "Archive/Hazards/Drought (Flash Drought)",
                    "Archive/Hazards/Flood",
                    "Archive/Hazards/Compound Events",
                    "Archive/Methodology/Remote Sensing",
                    "Archive/Methodology/Deep Learning",
                    "Archive/Methodology/Data Fusion",
                ]
                .iter()
                .map(ToString::to_string)
                .collect(),
                open_leaves: true,
            },
            idea: Some(TrackDefinition {
                description:
                    "Taste-driven classification based on scientific questions and mechanisms."
                        .to_string(),
                structure: [
                    "Idea Lab/Mechanism/Abrupt Transitions",
                    "Idea Lab/Mechanism/Land-Atmosphere Coupling",
                    "Idea Lab/Data Philosophy/Signal Purification",
                    "Idea Lab/Data Philosophy/Scale Issues",
                    "Idea Lab/Modeling/Physics-AI Fusion",
                    "Idea Lab/Modeling/Causal Inference",
                ]
                .iter()
                .map(ToString::to_string)
                .collect(),
                open_leaves: true,
            }),
        }
    }
}
