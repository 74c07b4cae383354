//! store::entity
//!
//! A keyed bag of JSON properties.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::key::Key;

/// A stored entity: a [`Key`] plus its properties.
///
/// Properties are an open JSON object; the domain layer
/// (`core::records`) owns the shapes that go in and out of it.
///
/// # Example
///
/// ```
/// use guestbook::store::{Entity, Key};
/// use serde_json::{json, Map};
///
/// let mut properties = Map::new();
/// properties.insert("count".into(), json!(3));
/// let entity = Entity::new(Key::named("User", "alice"), properties);
/// assert_eq!(entity.properties()["count"], json!(3));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    key: Key,
    properties: Map<String, Value>,
}

impl Entity {
    /// Create an entity from a key and its properties.
    pub fn new(key: Key, properties: Map<String, Value>) -> Self {
        Self { key, properties }
    }

    /// The entity's key.
    pub fn key(&self) -> &Key {
        &self.key
    }

    /// The entity's properties.
    pub fn properties(&self) -> &Map<String, Value> {
        &self.properties
    }

    /// Split the entity into its key and properties.
    pub fn into_parts(self) -> (Key, Map<String, Value>) {
        (self.key, self.properties)
    }
}
