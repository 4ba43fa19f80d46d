//! # Refiler
//!
//! AI-assisted organizer for Zotero-style reference libraries.
//!
//! Refiler reads the AI-generated analysis notes attached to library items,
//! asks an LLM to classify each item into a dual taxonomy of collections
//! (a disciplinary "Archive" track and a question-driven "Idea Lab" track),
//! and files the item into the resolved collections, marking it with a
//! completion tag so later runs skip it.
//!
//! ## Example
//!
//! ```rust,ignore
//! use refiler::{Organizer, RunOptions};
//!
//! let mut organizer = Organizer::new(
//!     &library,
//!     &classifier,
//!     resolver,
//!     taxonomy,
//!     profile,
//!     RunOptions::default(),
//! );
//! let summary = organizer.run()?;
//! println!("classified {}, skipped {}", summary.classified, summary.skipped);
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

// Module declarations
pub mod config;
pub mod http;
pub mod library;
pub mod llm;
pub mod models;
pub mod retry;
pub mod services;

// Re-exports for convenience
pub use config::RefilerConfig;
pub use library::{LibraryClient, ZoteroClient};
pub use llm::{Classifier, GeminiClient};
pub use models::{
    ClassificationRequest, ClassificationResult, CollectionKey, CollectionPath, LibraryItem,
    PlannedMove, RunSummary, Taxonomy, UserProfile,
};
pub use retry::RetryPolicy;
pub use services::{CollectionCache, Organizer, PathResolver, RunOptions, load_profile};

/// Error type for refiler operations.
///
/// Uses `thiserror` for automatic `Display` and `Error` trait implementations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `Configuration` | Missing credentials, malformed taxonomy, unreachable remote at startup |
/// | `RemoteUnavailable` | Transport failures or 5xx responses after the retry budget |
/// | `RateLimited` | HTTP 429-class responses from either remote API |
/// | `MalformedResponse` | Classifier output that cannot be parsed into target paths |
/// | `InvalidPath` | Empty collection paths or empty path segments |
///
/// Only `Configuration` surfaces as a process-level failure. Every other
/// variant is contained at the per-item level inside the organizer and
/// reported in the run summary.
#[derive(Debug, ThisError)]
pub enum Error {
    /// Configuration is missing or invalid.
    ///
    /// Raised when:
    /// - Library or LLM credentials are absent
    /// - The taxonomy has no usable track definitions
    /// - The remote library cannot be reached before the run starts
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A remote service could not complete a call.
    ///
    /// Raised when:
    /// - The HTTP transport fails (connect, timeout)
    /// - The remote returns a 5xx status
    /// - The retry budget for a transient failure is exhausted
    #[error("remote unavailable during '{operation}': {cause}")]
    RemoteUnavailable {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// A remote service rejected the call with a rate-limit response.
    ///
    /// Carries the server-suggested delay when a `Retry-After` header or
    /// `Backoff` hint was present.
    #[error("rate limited during '{operation}'")]
    RateLimited {
        /// The operation that was throttled.
        operation: String,
        /// Server-suggested delay in seconds, if any.
        retry_after_secs: Option<u64>,
    },

    /// The classifier response could not be parsed into target paths.
    ///
    /// Always results in a per-item skip, never a run abort.
    #[error("malformed classifier response: {cause}")]
    MalformedResponse {
        /// Why parsing failed.
        cause: String,
        /// The raw response text, kept for manual follow-up.
        response: String,
    },

    /// A collection path was empty or contained an empty segment.
    #[error("invalid collection path: {0}")]
    InvalidPath(String),
}

impl Error {
    /// Whether this error is transient and worth retrying.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RemoteUnavailable { .. } | Self::RateLimited { .. }
        )
    }
}

/// Result type alias for refiler operations.
pub type Result<T> = std::result::Result<T, Error>;
