//! Classifier client abstraction.
//!
//! Provides the trait the organizer calls plus the shared response-parsing
//! logic. The LLM is asked for a small fixed JSON object naming one leaf
//! path per taxonomy track; everything else it says is tolerated but
//! ignored.

mod gemini;

pub use gemini::GeminiClient;

use crate::models::{ClassificationRequest, ClassificationResult, CollectionPath, Taxonomy};
use crate::{Error, Result};
use serde::Deserialize;

/// Sentinel path the classifier returns when it cannot place an item.
pub const UNCLASSIFIED: &str = "Unclassified";

/// Trait for classification backends.
pub trait Classifier {
    /// The backend name, used in logs and metrics.
    fn name(&self) -> &'static str;

    /// Classifies one item into the dual taxonomy.
    ///
    /// # Errors
    ///
    /// Returns `MalformedResponse` when the model output cannot be parsed
    /// into the expected path structure, or a transient error when the
    /// backend is unreachable after its retry budget.
    fn classify(&self, request: &ClassificationRequest<'_>) -> Result<ClassificationResult>;
}

/// Raw shape of the model's JSON answer.
#[derive(Debug, Deserialize)]
struct RawClassification {
    #[serde(alias = "archive")]
    archive_path: Option<String>,
    #[serde(default, alias = "idea")]
    idea_path: Option<String>,
}

/// Parses a model response into a validated classification result.
///
/// Parsing is lenient about formatting (markdown fences, surrounding prose)
/// but strict about content: the `archive_path` field must be present, and
/// each returned path must be permitted by its taxonomy track.
///
/// # Errors
///
/// Returns `MalformedResponse` when the two required path fields cannot be
/// located or a path falls outside the taxonomy.
pub fn parse_classification(response: &str, taxonomy: &Taxonomy) -> Result<ClassificationResult> {
    let json_str = extract_json_from_response(response);
    let raw: RawClassification =
        serde_json::from_str(json_str).map_err(|e| Error::MalformedResponse {
            cause: format!("invalid JSON: {e}"),
            response: response.to_string(),
        })?;

    let Some(archive_raw) = raw.archive_path else {
        return Err(Error::MalformedResponse {
            cause: "required field 'archive_path' missing".to_string(),
            response: response.to_string(),
        });
    };

    let archive = validate_track_path(&archive_raw, response, |p| taxonomy.archive.permits(p))?;
    let idea = match (&taxonomy.idea, raw.idea_path) {
        (Some(track), Some(idea_raw)) => {
            validate_track_path(&idea_raw, response, |p| track.permits(p))?
        },
        // A Track B answer with no Track B configured is ignored, not an error.
        _ => None,
    };

    Ok(ClassificationResult { archive, idea })
}

/// Validates one track's raw path string.
///
/// `Unclassified` (alone or as any segment) means "no placement" for the
/// track and is not an error.
fn validate_track_path(
    raw: &str,
    response: &str,
    permitted: impl Fn(&CollectionPath) -> bool,
) -> Result<Option<CollectionPath>> {
    let path = CollectionPath::parse(raw);
    if path
        .segments()
        .iter()
        .any(|s| s.eq_ignore_ascii_case(UNCLASSIFIED))
    {
        return Ok(None);
    }
    if path.is_empty() {
        return Err(Error::MalformedResponse {
            cause: format!("path '{raw}' has no usable segments"),
            response: response.to_string(),
        });
    }
    if !permitted(&path) {
        return Err(Error::MalformedResponse {
            cause: format!("path '{path}' is outside the taxonomy"),
            response: response.to_string(),
        });
    }
    Ok(Some(path))
}

/// Extracts JSON from an LLM response, handling markdown code blocks.
fn extract_json_from_response(response: &str) -> &str {
    let trimmed = response.trim();

    // Handle ```json ... ``` blocks
    if let Some(start) = trimmed.find("```json") {
        let json_start = start + 7;
        if let Some(end) = trimmed[json_start..].find("```") {
            return trimmed[json_start..json_start + end].trim();
        }
    }

    // Handle ``` ... ``` blocks (without json marker)
    if let Some(start) = trimmed.find("```") {
        let content_start = start + 3;
        // Skip language identifier if present (e.g., "json\n")
        let after_marker = &trimmed[content_start..];
        let json_start = after_marker
            .find('{')
            .map_or(content_start, |pos| content_start + pos);
        if let Some(end) = trimmed[json_start..].find("```") {
            return trimmed[json_start..json_start + end].trim();
        }
    }

    // Handle raw JSON (find first { to last })
    if let Some(start) = trimmed.find('{')
        && let Some(end) = trimmed.rfind('}')
    {
        return &trimmed[start..=end];
    }

    trimmed
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::TrackDefinition;

    fn taxonomy() -> Taxonomy {
        Taxonomy {
            archive: TrackDefinition {
                description: String::new(),
                structure: vec!["Archive/Hazards/Flash Drought".to_string()],
                open_leaves: true,
            },
            idea: Some(TrackDefinition {
                description: String::new(),
                structure: vec!["Idea Lab/Mechanism/Abrupt Transitions".to_string()],
                open_leaves: false,
            }),
        }
    }

    #[test]
    fn test_extract_json_raw() {
        let response = r#"{"key": "value"}"#;
        assert_eq!(extract_json_from_response(response), r#"{"key": "value"}"#);
    }

    #[test]
    fn test_extract_json_markdown() {
        let response = "```json\n{\"archive_path\": \"x\"}\n```";
        assert!(extract_json_from_response(response).contains("archive_path"));
    }

    #[test]
    fn test_extract_json_with_prefix() {
        let response = "Here is the result: {\"key\": \"value\"} hope this helps";
        assert_eq!(extract_json_from_response(response), r#"{"key": "value"}"#);
    }

    #[test]
    fn test_parse_both_tracks() {
        let response = r#"{
            "archive_path": "Archive/Hazards/Flash Drought",
            "idea_path": "Idea Lab/Mechanism/Abrupt Transitions"
        }"#;
        let result = parse_classification(response, &taxonomy()).unwrap();
        assert_eq!(
            result.archive,
            Some(CollectionPath::parse("Archive/Hazards/Flash Drought"))
        );
        assert_eq!(
            result.idea,
            Some(CollectionPath::parse("Idea Lab/Mechanism/Abrupt Transitions"))
        );
    }

    #[test]
    fn test_parse_track_b_optional() {
        let response = r#"{"archive_path": "Archive/Hazards/Flash Drought"}"#;
        let result = parse_classification(response, &taxonomy()).unwrap();
        assert!(result.archive.is_some());
        assert!(result.idea.is_none());
    }

    #[test]
    fn test_parse_missing_archive_is_malformed() {
        let response = r#"{"idea_path": "Idea Lab/Mechanism/Abrupt Transitions"}"#;
        let result = parse_classification(response, &taxonomy());
        assert!(matches!(result, Err(Error::MalformedResponse { .. })));
    }

    #[test]
    fn test_parse_unclassified_means_no_placement() {
        let response = r#"{"archive_path": "Unclassified", "idea_path": "unclassified"}"#;
        let result = parse_classification(response, &taxonomy()).unwrap();
        assert!(result.archive.is_none());
        assert!(result.idea.is_none());
    }

    #[test]
    fn test_parse_novel_leaf_under_open_category() {
        let response = r#"{"archive_path": "Archive/Hazards/Heatwave"}"#;
        let result = parse_classification(response, &taxonomy()).unwrap();
        assert_eq!(
            result.archive,
            Some(CollectionPath::parse("Archive/Hazards/Heatwave"))
        );
    }

    #[test]
    fn test_parse_path_outside_taxonomy_is_malformed() {
        let response = r#"{"archive_path": "Somewhere/Else"}"#;
        assert!(matches!(
            parse_classification(response, &taxonomy()),
            Err(Error::MalformedResponse { .. })
        ));

        // Closed track rejects novel leaves.
        let response = r#"{
            "archive_path": "Archive/Hazards/Flash Drought",
            "idea_path": "Idea Lab/Mechanism/Novel Leaf"
        }"#;
        assert!(matches!(
            parse_classification(response, &taxonomy()),
            Err(Error::MalformedResponse { .. })
        ));
    }

    #[test]
    fn test_parse_garbage_is_malformed() {
        assert!(matches!(
            parse_classification("no json here at all", &taxonomy()),
            Err(Error::MalformedResponse { .. })
        ));
    }

    #[test]
    fn test_parse_idea_ignored_when_track_b_disabled() {
        let mut tax = taxonomy();
        tax.idea = None;
        let response = r#"{
            "archive_path": "Archive/Hazards/Flash Drought",
            "idea_path": "Idea Lab/Mechanism/Abrupt Transitions"
        }"#;
        let result = parse_classification(response, &tax).unwrap();
        assert!(result.idea.is_none());
    }
}
