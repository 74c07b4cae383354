//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`UserName`] - Validated guestbook user name (store key name)
//! - [`ProjectId`] - Validated project identifier (scopes store data on disk)
//! - [`UtcTimestamp`] - RFC3339 timestamp carried by comments
//!
//! # Validation
//!
//! These types enforce validity at construction time. Invalid values
//! cannot be represented, preventing entire classes of bugs.
//!
//! # Examples
//!
//! ```
//! use guestbook::core::types::{ProjectId, UserName};
//!
//! // Valid constructions
//! let user = UserName::new("alice").unwrap();
//! let project = ProjectId::new("demo-project").unwrap();
//!
//! // Invalid constructions fail at creation time
//! assert!(UserName::new("").is_err());
//! assert!(ProjectId::new("../escape").is_err());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid user name: {0}")]
    InvalidUserName(String),

    #[error("invalid project id: {0}")]
    InvalidProjectId(String),
}

/// Longest user name accepted as a store key name.
const MAX_USER_NAME_BYTES: usize = 512;

/// Longest project id accepted.
const MAX_PROJECT_ID_BYTES: usize = 64;

/// A validated guestbook user name.
///
/// User names become store key names, so they must be:
/// - non-empty and at most 512 bytes
/// - free of ASCII control characters
///
/// # Example
///
/// ```
/// use guestbook::core::types::UserName;
///
/// let name = UserName::new("alice").unwrap();
/// assert_eq!(name.as_str(), "alice");
///
/// assert!(UserName::new("").is_err());
/// assert!(UserName::new("line\nbreak").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserName(String);

impl UserName {
    /// Create a new validated user name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidUserName` if the name is empty, too long,
    /// or contains control characters.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        if name.is_empty() {
            return Err(TypeError::InvalidUserName(
                "user name cannot be empty".into(),
            ));
        }
        if name.len() > MAX_USER_NAME_BYTES {
            return Err(TypeError::InvalidUserName(format!(
                "user name cannot exceed {MAX_USER_NAME_BYTES} bytes"
            )));
        }
        if name.chars().any(|c| c.is_ascii_control()) {
            return Err(TypeError::InvalidUserName(
                "user name cannot contain control characters".into(),
            ));
        }
        Ok(Self(name))
    }

    /// Get the user name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for UserName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<UserName> for String {
    fn from(name: UserName) -> Self {
        name.0
    }
}

impl AsRef<str> for UserName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validated project identifier.
///
/// Project ids scope guestbook data on disk (one directory per project), so
/// they are restricted to a filesystem-safe alphabet:
/// - non-empty, at most 64 bytes
/// - ASCII letters, digits, `-` and `_`
/// - must start with a letter or digit
///
/// # Example
///
/// ```
/// use guestbook::core::types::ProjectId;
///
/// let id = ProjectId::new("demo-project").unwrap();
/// assert_eq!(id.as_str(), "demo-project");
///
/// assert!(ProjectId::new("has space").is_err());
/// assert!(ProjectId::new("-leading").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProjectId(String);

impl ProjectId {
    /// Create a new validated project id.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidProjectId` if the id is empty, too long,
    /// or contains characters outside the filesystem-safe alphabet.
    pub fn new(id: impl Into<String>) -> Result<Self, TypeError> {
        let id = id.into();
        if id.is_empty() {
            return Err(TypeError::InvalidProjectId(
                "project id cannot be empty".into(),
            ));
        }
        if id.len() > MAX_PROJECT_ID_BYTES {
            return Err(TypeError::InvalidProjectId(format!(
                "project id cannot exceed {MAX_PROJECT_ID_BYTES} bytes"
            )));
        }
        if !id.chars().next().is_some_and(|c| c.is_ascii_alphanumeric()) {
            return Err(TypeError::InvalidProjectId(
                "project id must start with a letter or digit".into(),
            ));
        }
        for c in id.chars() {
            if !(c.is_ascii_alphanumeric() || c == '-' || c == '_') {
                return Err(TypeError::InvalidProjectId(format!(
                    "project id cannot contain '{c}'"
                )));
            }
        }
        Ok(Self(id))
    }

    /// Get the project id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ProjectId {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<ProjectId> for String {
    fn from(id: ProjectId) -> Self {
        id.0
    }
}

impl AsRef<str> for ProjectId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An RFC3339 UTC timestamp.
///
/// Comments carry the instant the writer created them; display ordering
/// is chronological by this value.
///
/// # Example
///
/// ```
/// use guestbook::core::types::UtcTimestamp;
///
/// let now = UtcTimestamp::now();
/// let earlier = UtcTimestamp::from_unix_seconds(0);
/// assert!(earlier < now);
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UtcTimestamp(chrono::DateTime<chrono::Utc>);

impl UtcTimestamp {
    /// The current instant.
    pub fn now() -> Self {
        Self(chrono::Utc::now())
    }

    /// Build a timestamp from seconds since the Unix epoch.
    ///
    /// Out-of-range values clamp to the epoch; this is a convenience for
    /// constructing deterministic fixtures, not a parser.
    pub fn from_unix_seconds(secs: i64) -> Self {
        Self(chrono::DateTime::from_timestamp(secs, 0).unwrap_or(chrono::DateTime::UNIX_EPOCH))
    }
}

impl std::fmt::Display for UtcTimestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_name_accepts_reasonable_names() {
        for name in ["alice", "bob smith", "Ünïcode", "a.b@example.com"] {
            assert!(UserName::new(name).is_ok(), "rejected {name:?}");
        }
    }

    #[test]
    fn user_name_rejects_empty_and_control() {
        assert!(UserName::new("").is_err());
        assert!(UserName::new("tab\there").is_err());
        assert!(UserName::new("line\nbreak").is_err());
        assert!(UserName::new("x".repeat(513)).is_err());
    }

    #[test]
    fn user_name_serde_roundtrip() {
        let name = UserName::new("alice").unwrap();
        let json = serde_json::to_string(&name).unwrap();
        let parsed: UserName = serde_json::from_str(&json).unwrap();
        assert_eq!(name, parsed);
    }

    #[test]
    fn user_name_serde_rejects_invalid() {
        let result: Result<UserName, _> = serde_json::from_str("\"\"");
        assert!(result.is_err());
    }

    #[test]
    fn project_id_accepts_safe_alphabet() {
        for id in ["default", "demo-project", "p_1", "42"] {
            assert!(ProjectId::new(id).is_ok(), "rejected {id:?}");
        }
    }

    #[test]
    fn project_id_rejects_path_unsafe_values() {
        for id in ["", "has space", "../escape", "a/b", "-leading", "_leading"] {
            assert!(ProjectId::new(id).is_err(), "accepted {id:?}");
        }
    }

    #[test]
    fn timestamp_ordering_is_chronological() {
        let a = UtcTimestamp::from_unix_seconds(100);
        let b = UtcTimestamp::from_unix_seconds(200);
        assert!(a < b);
        assert_eq!(a, UtcTimestamp::from_unix_seconds(100));
    }

    #[test]
    fn timestamp_serde_roundtrip() {
        let ts = UtcTimestamp::from_unix_seconds(1_700_000_000);
        let json = serde_json::to_string(&ts).unwrap();
        let parsed: UtcTimestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(ts, parsed);
    }
}
