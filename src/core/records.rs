//! core::records
//!
//! Persisted record shapes and the guestbook's key layout.
//!
//! # Layout
//!
//! Two kinds live in the fixed [`NAMESPACE`]:
//!
//! - `User` - key named by the user, carrying the comment `count` and an
//!   optional embedded [`Contact`]
//! - `Comment` - child of exactly one `User` (ancestor key), carrying
//!   `content` and the writer-assigned `timestamp`
//!
//! The contact is an embedded value record, not a separately keyed entity:
//! it lives and dies with its user and is always replaced wholesale.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::core::types::{UserName, UtcTimestamp};
use crate::store::{Entity, IncompleteKey, Key};

/// Logical namespace isolating guestbook data from anything else sharing the
/// data directory.
pub const NAMESPACE: &str = "guestbook";

/// Kind of the user aggregate root.
pub const USER_KIND: &str = "User";

/// Kind of the comment child entities.
pub const COMMENT_KIND: &str = "Comment";

/// Errors converting between records and stored entities.
#[derive(Debug, Error)]
pub enum RecordError {
    /// Stored properties do not match the expected record shape.
    #[error("malformed {kind} record at {key}: {message}")]
    Malformed {
        kind: &'static str,
        key: String,
        message: String,
    },

    /// A record failed to serialize into properties.
    #[error("failed to serialize {kind} record: {message}")]
    Serialize {
        kind: &'static str,
        message: String,
    },
}

/// Key of a user's aggregate root.
pub fn user_key(name: &UserName) -> Key {
    Key::named(USER_KIND, name.as_str())
}

/// Incomplete key for a new comment under `user`; the store assigns the id.
pub fn comment_key(user: &Key) -> IncompleteKey {
    IncompleteKey::new(user.clone(), COMMENT_KIND)
}

/// Contact details embedded in a user record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub email: String,
    pub phone: String,
}

/// The user aggregate root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Number of live comment children once consistent.
    pub count: i64,
    /// Embedded contact details, replaced wholesale by `set`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<Contact>,
}

impl UserRecord {
    /// A fresh user with `count` comments and no contact.
    pub fn with_count(count: i64) -> Self {
        Self {
            count,
            contact: None,
        }
    }

    /// Parse a user record out of a stored entity.
    pub fn from_entity(entity: &Entity) -> Result<Self, RecordError> {
        from_properties(USER_KIND, entity)
    }

    /// Serialize into store properties.
    pub fn to_properties(&self) -> Result<Map<String, Value>, RecordError> {
        to_properties(USER_KIND, self)
    }
}

/// One timestamped comment under a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentRecord {
    pub content: String,
    pub timestamp: UtcTimestamp,
}

impl CommentRecord {
    /// Parse a comment record out of a stored entity.
    pub fn from_entity(entity: &Entity) -> Result<Self, RecordError> {
        from_properties(COMMENT_KIND, entity)
    }

    /// Serialize into store properties.
    pub fn to_properties(&self) -> Result<Map<String, Value>, RecordError> {
        to_properties(COMMENT_KIND, self)
    }
}

fn from_properties<T: serde::de::DeserializeOwned>(
    kind: &'static str,
    entity: &Entity,
) -> Result<T, RecordError> {
    serde_json::from_value(Value::Object(entity.properties().clone())).map_err(|err| {
        RecordError::Malformed {
            kind,
            key: entity.key().to_string(),
            message: err.to_string(),
        }
    })
}

fn to_properties<T: Serialize>(
    kind: &'static str,
    record: &T,
) -> Result<Map<String, Value>, RecordError> {
    match serde_json::to_value(record) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(RecordError::Serialize {
            kind,
            message: format!("expected an object, got {other}"),
        }),
        Err(err) => Err(RecordError::Serialize {
            kind,
            message: err.to_string(),
        }),
    }
}
