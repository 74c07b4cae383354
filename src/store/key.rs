//! store::key
//!
//! Hierarchical entity keys.
//!
//! # Design
//!
//! A [`Key`] is a non-empty path of `(kind, id)` elements. A child entity's
//! key extends its parent's key by one element, so ancestry is a path-prefix
//! relationship and no foreign-key indirection exists anywhere in the store.
//!
//! Keys order lexicographically by path, which gives two properties the
//! query layer relies on:
//!
//! - all descendants of a key sort in one contiguous run after it
//! - iteration order is stable, so continuation cursors are just "resume
//!   strictly after this key"
//!
//! # Example
//!
//! ```
//! use guestbook::store::key::{IncompleteKey, Key, PathId};
//!
//! let user = Key::named("User", "alice");
//! let comment = user.child("Comment", PathId::Id(7));
//! assert!(user.is_ancestor_of(&comment));
//! assert_eq!(comment.parent().as_ref(), Some(&user));
//!
//! // Ids for new children are assigned by the store at commit time.
//! let pending = IncompleteKey::new(user.clone(), "Comment");
//! assert_eq!(pending.complete(8), user.child("Comment", PathId::Id(8)));
//! ```

use serde::{Deserialize, Serialize};

/// The id component of one path element: caller-supplied name or
/// store-assigned numeric id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PathId {
    /// Caller-supplied name (aggregate roots).
    Name(String),
    /// Store-assigned numeric id (children created with deferred ids).
    Id(u64),
}

impl std::fmt::Display for PathId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathId::Name(name) => write!(f, "{name}"),
            PathId::Id(id) => write!(f, "{id}"),
        }
    }
}

/// One `(kind, id)` element of a key path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PathElement {
    /// Entity kind, e.g. `"User"` or `"Comment"`.
    pub kind: String,
    /// Identifier within the kind.
    pub id: PathId,
}

/// A complete hierarchical entity key.
///
/// The path is never empty. The last element names the entity itself; any
/// leading elements name its ancestors, root first.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Key {
    path: Vec<PathElement>,
}

impl Key {
    /// Create a root key with a caller-supplied name.
    pub fn named(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            path: vec![PathElement {
                kind: kind.into(),
                id: PathId::Name(name.into()),
            }],
        }
    }

    /// Create a child key one level under this one.
    pub fn child(&self, kind: impl Into<String>, id: PathId) -> Self {
        let mut path = self.path.clone();
        path.push(PathElement {
            kind: kind.into(),
            id,
        });
        Self { path }
    }

    /// The kind of the entity this key names (last path element).
    pub fn kind(&self) -> &str {
        &self.last().kind
    }

    /// The name of this key, if its id component is a name.
    pub fn name(&self) -> Option<&str> {
        match &self.last().id {
            PathId::Name(name) => Some(name),
            PathId::Id(_) => None,
        }
    }

    /// The numeric id of this key, if its id component is store-assigned.
    pub fn id(&self) -> Option<u64> {
        match &self.last().id {
            PathId::Name(_) => None,
            PathId::Id(id) => Some(*id),
        }
    }

    /// The parent key, or `None` for a root key.
    pub fn parent(&self) -> Option<Key> {
        if self.path.len() < 2 {
            return None;
        }
        Some(Self {
            path: self.path[..self.path.len() - 1].to_vec(),
        })
    }

    /// Whether this key is a strict ancestor of `other`.
    ///
    /// A key is never an ancestor of itself.
    pub fn is_ancestor_of(&self, other: &Key) -> bool {
        other.path.len() > self.path.len() && other.path[..self.path.len()] == self.path[..]
    }

    fn last(&self) -> &PathElement {
        self.path.last().expect("key path is non-empty")
    }
}

impl std::fmt::Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, element) in self.path.iter().enumerate() {
            if i > 0 {
                write!(f, "/")?;
            }
            write!(f, "{}:{}", element.kind, element.id)?;
        }
        Ok(())
    }
}

/// A key whose final id the store assigns at commit time.
///
/// Pairs a parent [`Key`] with the kind of the child to create. The store
/// turns it into a complete key with [`IncompleteKey::complete`] while
/// applying the transaction's mutations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IncompleteKey {
    parent: Key,
    kind: String,
}

impl IncompleteKey {
    /// Create an incomplete key for a new child of `parent`.
    pub fn new(parent: Key, kind: impl Into<String>) -> Self {
        Self {
            parent,
            kind: kind.into(),
        }
    }

    /// The parent key the new child will live under.
    pub fn parent(&self) -> &Key {
        &self.parent
    }

    /// The kind of the child to create.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Complete the key with a store-assigned numeric id.
    pub fn complete(&self, id: u64) -> Key {
        self.parent.child(self.kind.clone(), PathId::Id(id))
    }
}
