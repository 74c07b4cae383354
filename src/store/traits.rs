//! store::traits
//!
//! The `Datastore` and `Transaction` traits plus shared commit machinery.
//!
//! # Design
//!
//! Handlers never talk to a backend directly; they receive a
//! `&mut dyn Transaction` and perform reads, buffered writes, and queries
//! through it. Reads observe the snapshot taken when the transaction began
//! (a transaction does not see its own buffered writes). Writes are checked
//! and applied together at commit:
//!
//! - `insert` fails if the key already exists
//! - `update` fails if the key does not exist
//! - `delete` is idempotent
//! - deferred-id inserts receive their numeric id during commit
//!
//! Mutations are validated against a working copy and applied all-or-nothing.
//!
//! # Lifecycle
//!
//! A transaction moves `Active -> Committed` or `Active -> RolledBack` exactly
//! once. Backends roll back on drop as a backstop; the dispatcher's scoped
//! guard makes the transition explicit on every exit path.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use thiserror::Error;

use super::entity::Entity;
use super::key::{IncompleteKey, Key};
use super::query::{Query, QueryPage};

/// Committed entity state: properties by key, in key order.
pub(crate) type EntityMap = BTreeMap<Key, Map<String, Value>>;

/// Errors from store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// `update` targeted a key that does not exist.
    #[error("entity not found: {0}")]
    NotFound(String),

    /// `insert` targeted a key that already exists.
    #[error("entity already exists: {0}")]
    AlreadyExists(String),

    /// The transaction was already committed or rolled back.
    #[error("transaction is no longer active")]
    TransactionFinished,

    /// Another commit landed first; the read snapshot is stale.
    #[error("commit conflict: store version moved from {expected} to {actual}")]
    Conflict {
        /// Version the transaction's snapshot was taken at.
        expected: u64,
        /// Version found at commit time.
        actual: u64,
    },

    /// Persisted data failed to parse.
    #[error("store data is corrupt: {0}")]
    Corrupt(String),

    /// Data failed to serialize for persistence.
    #[error("serialization failed: {0}")]
    Serialize(String),

    /// Underlying filesystem failure.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Transaction lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxState {
    /// Open; reads and buffered writes are accepted.
    Active,
    /// Commit succeeded; all buffered mutations applied.
    Committed,
    /// Rolled back; no buffered mutation applied.
    RolledBack,
}

/// One unit of atomic work against the store.
pub trait Transaction {
    /// Read one entity by key from the transaction's snapshot.
    ///
    /// Returns `Ok(None)` when the entity does not exist; absence is not
    /// an error.
    fn get(&self, key: &Key) -> Result<Option<Entity>, StoreError>;

    /// Run a query against the transaction's snapshot.
    fn run_query(&self, query: &Query) -> Result<QueryPage, StoreError>;

    /// Buffer an insert of a new entity. Fails at commit if the key exists.
    fn insert(&mut self, entity: Entity) -> Result<(), StoreError>;

    /// Buffer an insert whose numeric id the store assigns at commit time.
    fn insert_with_deferred_id(
        &mut self,
        key: IncompleteKey,
        properties: Map<String, Value>,
    ) -> Result<(), StoreError>;

    /// Buffer an update of an existing entity. Fails at commit if absent.
    fn update(&mut self, entity: Entity) -> Result<(), StoreError>;

    /// Buffer a delete. Deleting an absent key is a no-op at commit.
    fn delete(&mut self, key: &Key) -> Result<(), StoreError>;

    /// Apply every buffered mutation atomically.
    ///
    /// On success the transaction is `Committed`. On failure (conflict,
    /// constraint violation, i/o) the transaction stays `Active` so the
    /// caller's cleanup path can roll it back.
    fn commit(&mut self) -> Result<(), StoreError>;

    /// Discard every buffered mutation and finish the transaction.
    fn rollback(&mut self) -> Result<(), StoreError>;

    /// Current lifecycle state.
    fn state(&self) -> TxState;
}

/// A store that can open transactions.
pub trait Datastore {
    /// Open a transaction over the current committed state.
    fn transaction(&self) -> Result<Box<dyn Transaction>, StoreError>;
}

/// A buffered write.
#[derive(Debug, Clone)]
pub(crate) enum Mutation {
    Insert(Entity),
    Update(Entity),
    Delete(Key),
    InsertDeferred {
        key: IncompleteKey,
        properties: Map<String, Value>,
    },
}

/// Apply buffered mutations in order to a working copy of committed state.
///
/// Callers clone their committed state, apply into the clone, and swap it in
/// only on `Ok` so a failed commit leaves nothing half-applied. Mutations see
/// the effects of earlier mutations in the same transaction, so
/// insert-then-update of one key is valid.
pub(crate) fn apply_mutations(
    state: &mut EntityMap,
    next_id: &mut u64,
    mutations: &[Mutation],
) -> Result<(), StoreError> {
    for mutation in mutations {
        match mutation {
            Mutation::Insert(entity) => {
                if state.contains_key(entity.key()) {
                    return Err(StoreError::AlreadyExists(entity.key().to_string()));
                }
                state.insert(entity.key().clone(), entity.properties().clone());
            }
            Mutation::Update(entity) => {
                if !state.contains_key(entity.key()) {
                    return Err(StoreError::NotFound(entity.key().to_string()));
                }
                state.insert(entity.key().clone(), entity.properties().clone());
            }
            Mutation::Delete(key) => {
                state.remove(key);
            }
            Mutation::InsertDeferred { key, properties } => {
                let id = *next_id;
                *next_id += 1;
                state.insert(key.complete(id), properties.clone());
            }
        }
    }
    Ok(())
}
