//! store
//!
//! Hierarchical entity store: keys, entities, queries, and transactions.
//!
//! # Architecture
//!
//! The store is the single doorway for all persisted state. Entities are
//! addressed by hierarchical [`key::Key`]s, so a child's key embeds its
//! parent's key as a path prefix and "delete the subtree" is a key-prefix
//! operation. All reads and writes flow through a [`traits::Transaction`]:
//! reads observe the snapshot taken when the transaction began, writes are
//! buffered and applied atomically at commit.
//!
//! # Backends
//!
//! - [`file::FileDatastore`] - durable backend; one JSON document per
//!   namespace, commits are version-checked (compare-and-swap) under an
//!   OS-level file lock.
//! - [`memory::MemoryDatastore`] - deterministic in-memory backend for tests,
//!   with operation recording and failure injection.
//!
//! # Invariants
//!
//! - A transaction ends `Committed` or `RolledBack`, never `Active`
//! - Commit applies all buffered mutations or none of them
//! - Deferred ids are assigned at commit time, uniquely and monotonically

pub mod entity;
pub mod file;
pub mod key;
pub mod memory;
pub mod query;
pub mod traits;

pub use entity::Entity;
pub use key::{IncompleteKey, Key, PathId};
pub use query::{Cursor, Query, QueryPage};
pub use traits::{Datastore, StoreError, Transaction, TxState};
