//! Type-safe job identifier.
//!
//! [`JobId`] is a newtype wrapper around [`uuid::Uuid`] (v4). Snapshot and
//! restore jobs are both keyed by it. Only the first
//! [`JobId::PREFIX_LEN`] characters are ever written to disk, so the
//! prefix is the identity a snapshot keeps once its creation call returns.

use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Unique identifier for a snapshot or restore job.
///
/// Generated once at job creation time and immutable thereafter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct JobId(uuid::Uuid);

impl JobId {
    /// Number of leading characters of the hyphenated UUID encoded into
    /// snapshot filenames.
    pub const PREFIX_LEN: usize = 8;

    /// Creates a new random `JobId` (UUID v4).
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Creates a `JobId` from an existing [`uuid::Uuid`].
    #[must_use]
    pub const fn from_uuid(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the short, externally visible form of this id.
    #[must_use]
    pub fn prefix(&self) -> String {
        self.0.to_string().chars().take(Self::PREFIX_LEN).collect()
    }
}

/// Reduces a caller-supplied snapshot id (full UUID or short form) to the
/// prefix stored in filenames.
///
/// Returns `None` when the id is too short to carry a full prefix.
#[must_use]
pub fn id_prefix(id: &str) -> Option<&str> {
    id.get(..JobId::PREFIX_LEN)
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<uuid::Uuid> for JobId {
    fn from(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn new_generates_unique_ids() {
        let a = JobId::new();
        let b = JobId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn prefix_is_leading_eight_chars() {
        let Ok(uuid) = uuid::Uuid::parse_str("3f2a9c1e-0b7d-4e55-8a61-2c9d0e4f7b13") else {
            panic!("valid uuid");
        };
        let id = JobId::from_uuid(uuid);
        assert_eq!(id.prefix(), "3f2a9c1e");
        assert!(id.to_string().starts_with(&id.prefix()));
    }

    #[test]
    fn id_prefix_accepts_full_and_short_forms() {
        assert_eq!(
            id_prefix("3f2a9c1e-0b7d-4e55-8a61-2c9d0e4f7b13"),
            Some("3f2a9c1e")
        );
        assert_eq!(id_prefix("3f2a9c1e"), Some("3f2a9c1e"));
        assert_eq!(id_prefix("3f2a"), None);
        assert_eq!(id_prefix(""), None);
    }

    #[test]
    fn serde_is_transparent() {
        let id = JobId::new();
        let Ok(json) = serde_json::to_string(&id) else {
            panic!("serialization failed");
        };
        assert_eq!(json, format!("\"{id}\""));
    }
}
