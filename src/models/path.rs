//! Hierarchical collection paths.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An ordered sequence of collection names identifying a location in the
/// library's collection tree, e.g. `Archive/Hazards/Flash Drought`.
///
/// Immutable once constructed; used as a cache key in its serialized form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollectionPath(Vec<String>);

impl CollectionPath {
    /// Creates a path from owned segments.
    ///
    /// Segments are taken as-is; emptiness is checked at resolution time so
    /// a malformed path surfaces as `InvalidPath`, not a construction panic.
    #[must_use]
    pub const fn new(segments: Vec<String>) -> Self {
        Self(segments)
    }

    /// Parses a `/`-separated path string, trimming whitespace and dropping
    /// empty segments.
    ///
    /// `"Archive / Hazards /"` parses to `["Archive", "Hazards"]`. An input
    /// with no usable segments parses to an empty path, which later fails
    /// resolution with `InvalidPath`.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        Self(
            s.split('/')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(ToString::to_string)
                .collect(),
        )
    }

    /// The path segments in root-to-leaf order.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Whether the path has no segments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of segments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// The leaf segment, if any.
    #[must_use]
    pub fn leaf(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// The path truncated to its first `n` segments.
    #[must_use]
    pub fn prefix(&self, n: usize) -> Self {
        Self(self.0.iter().take(n).cloned().collect())
    }

    /// The parent path (all segments but the leaf), if any.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.0.len() < 2 {
            None
        } else {
            Some(self.prefix(self.0.len() - 1))
        }
    }

    /// Whether `other` starts with every segment of this path.
    #[must_use]
    pub fn is_prefix_of(&self, other: &Self) -> bool {
        other.0.len() >= self.0.len() && other.0[..self.0.len()] == self.0[..]
    }

    /// The serialized cache-key form, segments joined with `/`.
    #[must_use]
    pub fn cache_key(&self) -> String {
        self.0.join("/")
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("/"))
    }
}
