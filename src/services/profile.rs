//! User profile loading.

use crate::models::UserProfile;
use std::path::Path;

/// Loads the persisted user profile, if one exists.
///
/// The profile is produced by a separate profiling pass on the operator's
/// cadence; absence or an unparsable file means the classifier proceeds
/// without personalization context. This is never a fatal condition.
#[must_use]
pub fn load_profile(path: &Path) -> Option<UserProfile> {
    let contents = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(_) => {
            tracing::debug!(path = %path.display(), "no user profile, classifying without personalization");
            return None;
        },
    };
    match serde_json::from_str(&contents) {
        Ok(profile) => {
            tracing::debug!(path = %path.display(), "loaded user profile");
            Some(profile)
        },
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "user profile unparsable, ignoring");
            None
        },
    }
}
