//! store::query
//!
//! Ancestor-filtered, cursor-paginated queries.
//!
//! # Design
//!
//! A query selects every entity of one kind, optionally restricted to the
//! descendants of an ancestor key. Results come back in key order, bounded
//! by `limit`, together with a [`Cursor`] marking where the next page should
//! resume. The store never sorts by property values; callers wanting
//! chronological output sort client-side.
//!
//! Queries run against the transaction's snapshot, so successive pages of
//! one transaction observe a single consistent state.
//!
//! # Example
//!
//! ```
//! use guestbook::store::{Key, Query};
//!
//! let user = Key::named("User", "alice");
//! let query = Query::new("Comment").ancestor(user).keys_only().limit(200);
//! assert_eq!(query.kind(), "Comment");
//! ```

use super::entity::Entity;
use super::key::Key;
use super::traits::EntityMap;
use serde_json::Map;

/// An opaque continuation token for resuming a paginated query.
///
/// Holds the position of the last entity a page returned; the next page
/// resumes strictly after it. Treat it as opaque: obtain one from a
/// [`QueryPage`] and feed it back via [`Query::start_cursor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor {
    after: Key,
}

impl Cursor {
    pub(crate) fn after(key: Key) -> Self {
        Self { after: key }
    }

    pub(crate) fn position(&self) -> &Key {
        &self.after
    }
}

/// A query over one entity kind.
#[derive(Debug, Clone)]
pub struct Query {
    kind: String,
    ancestor: Option<Key>,
    keys_only: bool,
    limit: Option<usize>,
    start_cursor: Option<Cursor>,
}

impl Query {
    /// Create a query matching every entity of `kind`.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ancestor: None,
            keys_only: false,
            limit: None,
            start_cursor: None,
        }
    }

    /// Restrict results to descendants of `ancestor`.
    pub fn ancestor(mut self, ancestor: Key) -> Self {
        self.ancestor = Some(ancestor);
        self
    }

    /// Return keys only; matched entities carry empty properties.
    pub fn keys_only(mut self) -> Self {
        self.keys_only = true;
        self
    }

    /// Bound the number of entities one page returns.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Resume strictly after a previous page's cursor.
    pub fn start_cursor(mut self, cursor: Cursor) -> Self {
        self.start_cursor = Some(cursor);
        self
    }

    /// The kind this query matches.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Execute against a snapshot, in key order.
    pub(crate) fn execute(&self, snapshot: &EntityMap) -> QueryPage {
        let mut entities = Vec::new();
        for (key, properties) in snapshot {
            if key.kind() != self.kind {
                continue;
            }
            if let Some(ancestor) = &self.ancestor {
                if !ancestor.is_ancestor_of(key) {
                    continue;
                }
            }
            if let Some(cursor) = &self.start_cursor {
                if key <= cursor.position() {
                    continue;
                }
            }
            let properties = if self.keys_only {
                Map::new()
            } else {
                properties.clone()
            };
            entities.push(Entity::new(key.clone(), properties));
            if self.limit.is_some_and(|limit| entities.len() >= limit) {
                break;
            }
        }
        let cursor_after = entities.last().map(|e| Cursor::after(e.key().clone()));
        QueryPage {
            entities,
            cursor_after,
        }
    }
}

/// One page of query results.
#[derive(Debug, Clone)]
pub struct QueryPage {
    /// Matched entities, in key order. Empty properties under keys-only.
    pub entities: Vec<Entity>,
    /// Continuation cursor after the last entity, `None` for an empty page.
    pub cursor_after: Option<Cursor>,
}
