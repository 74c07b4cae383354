//! store::memory
//!
//! In-memory datastore for deterministic testing.
//!
//! # Design
//!
//! The memory store implements the [`Datastore`] and [`Transaction`] traits
//! entirely in process. It records every operation for verification and
//! allows configuring failure scenarios, so tests can drive handlers through
//! error paths without a filesystem.
//!
//! # Example
//!
//! ```
//! use guestbook::store::memory::MemoryDatastore;
//! use guestbook::store::{Datastore, Entity, Key, TxState};
//! use serde_json::{json, Map};
//!
//! let store = MemoryDatastore::new();
//!
//! let mut properties = Map::new();
//! properties.insert("count".into(), json!(0));
//! let mut tx = store.transaction().unwrap();
//! tx.insert(Entity::new(Key::named("User", "alice"), properties)).unwrap();
//! tx.commit().unwrap();
//! assert_eq!(tx.state(), TxState::Committed);
//!
//! let tx = store.transaction().unwrap();
//! assert!(tx.get(&Key::named("User", "alice")).unwrap().is_some());
//! ```

use std::sync::{Arc, Mutex};

use serde_json::{Map, Value};

use super::entity::Entity;
use super::key::{IncompleteKey, Key};
use super::query::{Query, QueryPage};
use super::traits::{
    apply_mutations, Datastore, EntityMap, Mutation, StoreError, Transaction, TxState,
};

/// In-memory datastore for testing.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping; clones share state.
#[derive(Debug, Clone)]
pub struct MemoryDatastore {
    inner: Arc<Mutex<MemoryInner>>,
}

/// Internal mutable state.
#[derive(Debug)]
struct MemoryInner {
    /// Committed entities, in key order.
    entities: EntityMap,
    /// Next deferred id to assign.
    next_id: u64,
    /// Bumped on every committed write transaction.
    version: u64,
    /// Operation to fail (for testing error paths).
    fail_on: Option<FailOn>,
    /// Recorded events for verification.
    events: Vec<StoreEvent>,
}

/// Configuration for which operation should fail.
#[derive(Debug)]
pub enum FailOn {
    /// Fail `get` with the given error.
    Get(StoreError),
    /// Fail `run_query` with the given error.
    Query(StoreError),
    /// Fail `insert` with the given error.
    Insert(StoreError),
    /// Fail `insert_with_deferred_id` with the given error.
    InsertDeferred(StoreError),
    /// Fail `update` with the given error.
    Update(StoreError),
    /// Fail `delete` with the given error.
    Delete(StoreError),
    /// Fail `commit` with the given error.
    Commit(StoreError),
}

/// Recorded event for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    TransactionOpened,
    Get { key: Key },
    Query { kind: String },
    Insert { key: Key },
    InsertDeferred { kind: String },
    Update { key: Key },
    Delete { key: Key },
    Committed { mutations: usize },
    RolledBack,
}

impl MemoryDatastore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MemoryInner {
                entities: EntityMap::new(),
                next_id: 1,
                version: 0,
                fail_on: None,
                events: Vec::new(),
            })),
        }
    }

    /// Create a store seeded with pre-existing entities.
    ///
    /// The deferred-id counter starts after the largest numeric id present,
    /// so ids never collide with seeded entities.
    pub fn with_entities(entities: Vec<Entity>) -> Self {
        let max_id = entities.iter().filter_map(|e| e.key().id()).max().unwrap_or(0);
        let map: EntityMap = entities.into_iter().map(Entity::into_parts).collect();
        Self {
            inner: Arc::new(Mutex::new(MemoryInner {
                entities: map,
                next_id: max_id + 1,
                version: 0,
                fail_on: None,
                events: Vec::new(),
            })),
        }
    }

    /// Configure the store to fail on a specific operation.
    pub fn fail_on(self, fail_on: FailOn) -> Self {
        {
            let mut inner = self.lock();
            inner.fail_on = Some(fail_on);
        }
        self
    }

    /// Clear the failure configuration.
    pub fn clear_fail_on(&self) {
        self.lock().fail_on = None;
    }

    /// Get all recorded events.
    pub fn events(&self) -> Vec<StoreEvent> {
        self.lock().events.clone()
    }

    /// Clear recorded events.
    pub fn clear_events(&self) {
        self.lock().events.clear();
    }

    /// Read one committed entity directly (for test verification).
    pub fn entity(&self, key: &Key) -> Option<Entity> {
        self.lock()
            .entities
            .get(key)
            .map(|properties| Entity::new(key.clone(), properties.clone()))
    }

    /// Count of committed entities.
    pub fn entity_count(&self) -> usize {
        self.lock().entities.len()
    }

    /// The committed store version.
    pub fn version(&self) -> u64 {
        self.lock().version
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record(&self, event: StoreEvent) {
        self.lock().events.push(event);
    }
}

impl Default for MemoryDatastore {
    fn default() -> Self {
        Self::new()
    }
}

impl Datastore for MemoryDatastore {
    fn transaction(&self) -> Result<Box<dyn Transaction>, StoreError> {
        let (snapshot, base_version) = {
            let inner = self.lock();
            (inner.entities.clone(), inner.version)
        };
        self.record(StoreEvent::TransactionOpened);
        Ok(Box::new(MemoryTransaction {
            store: self.clone(),
            snapshot,
            base_version,
            mutations: Vec::new(),
            state: TxState::Active,
        }))
    }
}

/// Clone a StoreError (error types aren't Clone; reconstruct by variant).
fn clone_error(e: &StoreError) -> StoreError {
    match e {
        StoreError::NotFound(s) => StoreError::NotFound(s.clone()),
        StoreError::AlreadyExists(s) => StoreError::AlreadyExists(s.clone()),
        StoreError::TransactionFinished => StoreError::TransactionFinished,
        StoreError::Conflict { expected, actual } => StoreError::Conflict {
            expected: *expected,
            actual: *actual,
        },
        StoreError::Corrupt(s) => StoreError::Corrupt(s.clone()),
        StoreError::Serialize(s) => StoreError::Serialize(s.clone()),
        StoreError::Io(source) => {
            StoreError::Io(std::io::Error::new(source.kind(), source.to_string()))
        }
    }
}

/// A transaction over the memory store.
struct MemoryTransaction {
    store: MemoryDatastore,
    snapshot: EntityMap,
    base_version: u64,
    mutations: Vec<Mutation>,
    state: TxState,
}

impl MemoryTransaction {
    fn ensure_active(&self) -> Result<(), StoreError> {
        match self.state {
            TxState::Active => Ok(()),
            _ => Err(StoreError::TransactionFinished),
        }
    }

    /// Check if the configured failure applies to `op` and return the error.
    fn check_fail(&self, op: &str) -> Result<(), StoreError> {
        let inner = self.store.lock();
        let fail = match &inner.fail_on {
            Some(FailOn::Get(e)) if op == "get" => Some(clone_error(e)),
            Some(FailOn::Query(e)) if op == "run_query" => Some(clone_error(e)),
            Some(FailOn::Insert(e)) if op == "insert" => Some(clone_error(e)),
            Some(FailOn::InsertDeferred(e)) if op == "insert_with_deferred_id" => {
                Some(clone_error(e))
            }
            Some(FailOn::Update(e)) if op == "update" => Some(clone_error(e)),
            Some(FailOn::Delete(e)) if op == "delete" => Some(clone_error(e)),
            Some(FailOn::Commit(e)) if op == "commit" => Some(clone_error(e)),
            _ => None,
        };
        match fail {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl Transaction for MemoryTransaction {
    fn get(&self, key: &Key) -> Result<Option<Entity>, StoreError> {
        self.ensure_active()?;
        self.store.record(StoreEvent::Get { key: key.clone() });
        self.check_fail("get")?;
        Ok(self
            .snapshot
            .get(key)
            .map(|properties| Entity::new(key.clone(), properties.clone())))
    }

    fn run_query(&self, query: &Query) -> Result<QueryPage, StoreError> {
        self.ensure_active()?;
        self.store.record(StoreEvent::Query {
            kind: query.kind().to_string(),
        });
        self.check_fail("run_query")?;
        Ok(query.execute(&self.snapshot))
    }

    fn insert(&mut self, entity: Entity) -> Result<(), StoreError> {
        self.ensure_active()?;
        self.store.record(StoreEvent::Insert {
            key: entity.key().clone(),
        });
        self.check_fail("insert")?;
        self.mutations.push(Mutation::Insert(entity));
        Ok(())
    }

    fn insert_with_deferred_id(
        &mut self,
        key: IncompleteKey,
        properties: Map<String, Value>,
    ) -> Result<(), StoreError> {
        self.ensure_active()?;
        self.store.record(StoreEvent::InsertDeferred {
            kind: key.kind().to_string(),
        });
        self.check_fail("insert_with_deferred_id")?;
        self.mutations.push(Mutation::InsertDeferred { key, properties });
        Ok(())
    }

    fn update(&mut self, entity: Entity) -> Result<(), StoreError> {
        self.ensure_active()?;
        self.store.record(StoreEvent::Update {
            key: entity.key().clone(),
        });
        self.check_fail("update")?;
        self.mutations.push(Mutation::Update(entity));
        Ok(())
    }

    fn delete(&mut self, key: &Key) -> Result<(), StoreError> {
        self.ensure_active()?;
        self.store.record(StoreEvent::Delete { key: key.clone() });
        self.check_fail("delete")?;
        self.mutations.push(Mutation::Delete(key.clone()));
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        self.ensure_active()?;
        self.check_fail("commit")?;

        let mut inner = self.store.lock();
        if !self.mutations.is_empty() && inner.version != self.base_version {
            return Err(StoreError::Conflict {
                expected: self.base_version,
                actual: inner.version,
            });
        }

        let mut working = inner.entities.clone();
        let mut next_id = inner.next_id;
        apply_mutations(&mut working, &mut next_id, &self.mutations)?;

        if !self.mutations.is_empty() {
            inner.entities = working;
            inner.next_id = next_id;
            inner.version += 1;
        }
        inner.events.push(StoreEvent::Committed {
            mutations: self.mutations.len(),
        });
        self.state = TxState::Committed;
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), StoreError> {
        self.ensure_active()?;
        self.mutations.clear();
        self.state = TxState::RolledBack;
        self.store.record(StoreEvent::RolledBack);
        Ok(())
    }

    fn state(&self) -> TxState {
        self.state
    }
}

impl Drop for MemoryTransaction {
    fn drop(&mut self) {
        // Backstop: a transaction abandoned while active rolls back.
        if self.state == TxState::Active {
            let _ = self.rollback();
        }
    }
}
