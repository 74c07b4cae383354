//! store::file
//!
//! Durable file-backed datastore.
//!
//! # Architecture
//!
//! Each (project, namespace) pair persists as one JSON document at
//! `<data_dir>/<project>/<namespace>.json`, holding a version counter, the
//! deferred-id counter, and every entity. A transaction loads the document
//! once as its snapshot; commit re-reads the document under an OS-level file
//! lock, compares versions (compare-and-swap), applies the buffered
//! mutations, and replaces the document via write-temp-then-rename.
//!
//! # CAS Semantics
//!
//! A commit with buffered writes fails with [`StoreError::Conflict`] when
//! another process committed after this transaction's snapshot was taken.
//! Conflicts are surfaced to the caller, never retried here.
//!
//! # Storage
//!
//! - `<data_dir>/<project>/<namespace>.json` - the namespace document
//! - `<data_dir>/<project>/<namespace>.lock` - lock file guarding load/commit
//!
//! # Invariants
//!
//! - The lock is held only for the load and commit critical sections
//! - The document on disk is always a complete, parseable snapshot
//! - Lock release on drop (RAII); rollback on drop for abandoned transactions

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::entity::Entity;
use super::key::{IncompleteKey, Key};
use super::query::{Query, QueryPage};
use super::traits::{
    apply_mutations, Datastore, EntityMap, Mutation, StoreError, Transaction, TxState,
};
use crate::core::types::ProjectId;

/// Durable datastore scoped to one (project, namespace) pair.
#[derive(Debug, Clone)]
pub struct FileDatastore {
    doc_path: PathBuf,
    lock_path: PathBuf,
}

impl FileDatastore {
    /// Open (creating directories as needed) the store for a namespace.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` if the project directory cannot be created,
    /// and `StoreError::Corrupt` for a namespace that is not filesystem-safe.
    pub fn open(
        data_dir: &Path,
        project: &ProjectId,
        namespace: &str,
    ) -> Result<Self, StoreError> {
        if namespace.is_empty()
            || !namespace
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(StoreError::Corrupt(format!(
                "namespace '{namespace}' is not filesystem-safe"
            )));
        }
        let project_dir = data_dir.join(project.as_str());
        fs::create_dir_all(&project_dir)?;
        Ok(Self {
            doc_path: project_dir.join(format!("{namespace}.json")),
            lock_path: project_dir.join(format!("{namespace}.lock")),
        })
    }

    /// Path of the namespace document (for diagnostics and tests).
    pub fn doc_path(&self) -> &Path {
        &self.doc_path
    }
}

impl Datastore for FileDatastore {
    fn transaction(&self) -> Result<Box<dyn Transaction>, StoreError> {
        let doc = {
            let _lock = FileLock::acquire(&self.lock_path)?;
            NamespaceDoc::load(&self.doc_path)?
        };
        tracing::debug!(
            path = %self.doc_path.display(),
            version = doc.version,
            entities = doc.entities.len(),
            "opened transaction"
        );
        Ok(Box::new(FileTransaction {
            doc_path: self.doc_path.clone(),
            lock_path: self.lock_path.clone(),
            base_version: doc.version,
            snapshot: doc.into_map(),
            mutations: Vec::new(),
            state: TxState::Active,
        }))
    }
}

/// The persisted shape of one namespace.
#[derive(Debug, Serialize, Deserialize)]
struct NamespaceDoc {
    version: u64,
    next_id: u64,
    entities: Vec<Entity>,
}

impl NamespaceDoc {
    fn empty() -> Self {
        Self {
            version: 0,
            next_id: 1,
            entities: Vec::new(),
        }
    }

    /// Load the document, treating a missing file as an empty namespace.
    fn load(path: &Path) -> Result<Self, StoreError> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::empty());
            }
            Err(err) => return Err(StoreError::Io(err)),
        };
        serde_json::from_slice(&bytes).map_err(|err| {
            StoreError::Corrupt(format!("{}: {err}", path.display()))
        })
    }

    /// Persist atomically: write a sibling temp file, then rename over.
    fn persist(&self, path: &Path) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(self)
            .map_err(|err| StoreError::Serialize(err.to_string()))?;
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, bytes)?;
        fs::rename(&tmp_path, path)?;
        Ok(())
    }

    fn into_map(self) -> EntityMap {
        self.entities.into_iter().map(Entity::into_parts).collect()
    }

    fn from_map(version: u64, next_id: u64, map: EntityMap) -> Self {
        Self {
            version,
            next_id,
            entities: map
                .into_iter()
                .map(|(key, properties)| Entity::new(key, properties))
                .collect(),
        }
    }
}

/// An exclusive lock over the namespace document.
///
/// Held only for the short load/commit critical sections; blocks until the
/// current holder releases. Released on drop (RAII).
#[derive(Debug)]
struct FileLock {
    file: File,
}

impl FileLock {
    fn acquire(path: &Path) -> Result<Self, StoreError> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
        file.lock_exclusive()?;
        Ok(Self { file })
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = fs2::FileExt::unlock(&self.file);
    }
}

/// A transaction over the file store.
struct FileTransaction {
    doc_path: PathBuf,
    lock_path: PathBuf,
    base_version: u64,
    snapshot: EntityMap,
    mutations: Vec<Mutation>,
    state: TxState,
}

impl FileTransaction {
    fn ensure_active(&self) -> Result<(), StoreError> {
        match self.state {
            TxState::Active => Ok(()),
            _ => Err(StoreError::TransactionFinished),
        }
    }
}

impl Transaction for FileTransaction {
    fn get(&self, key: &Key) -> Result<Option<Entity>, StoreError> {
        self.ensure_active()?;
        Ok(self
            .snapshot
            .get(key)
            .map(|properties| Entity::new(key.clone(), properties.clone())))
    }

    fn run_query(&self, query: &Query) -> Result<QueryPage, StoreError> {
        self.ensure_active()?;
        Ok(query.execute(&self.snapshot))
    }

    fn insert(&mut self, entity: Entity) -> Result<(), StoreError> {
        self.ensure_active()?;
        self.mutations.push(Mutation::Insert(entity));
        Ok(())
    }

    fn insert_with_deferred_id(
        &mut self,
        key: IncompleteKey,
        properties: Map<String, Value>,
    ) -> Result<(), StoreError> {
        self.ensure_active()?;
        self.mutations.push(Mutation::InsertDeferred { key, properties });
        Ok(())
    }

    fn update(&mut self, entity: Entity) -> Result<(), StoreError> {
        self.ensure_active()?;
        self.mutations.push(Mutation::Update(entity));
        Ok(())
    }

    fn delete(&mut self, key: &Key) -> Result<(), StoreError> {
        self.ensure_active()?;
        self.mutations.push(Mutation::Delete(key.clone()));
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        self.ensure_active()?;
        if self.mutations.is_empty() {
            self.state = TxState::Committed;
            return Ok(());
        }

        let _lock = FileLock::acquire(&self.lock_path)?;
        let current = NamespaceDoc::load(&self.doc_path)?;
        if current.version != self.base_version {
            // Stale snapshot; the caller's cleanup path rolls us back.
            return Err(StoreError::Conflict {
                expected: self.base_version,
                actual: current.version,
            });
        }

        let version = current.version;
        let mut next_id = current.next_id;
        let mut working = current.into_map();
        apply_mutations(&mut working, &mut next_id, &self.mutations)?;

        NamespaceDoc::from_map(version + 1, next_id, working).persist(&self.doc_path)?;
        tracing::debug!(
            path = %self.doc_path.display(),
            version = version + 1,
            mutations = self.mutations.len(),
            "committed transaction"
        );
        self.state = TxState::Committed;
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), StoreError> {
        self.ensure_active()?;
        self.mutations.clear();
        self.state = TxState::RolledBack;
        tracing::debug!(path = %self.doc_path.display(), "rolled back transaction");
        Ok(())
    }

    fn state(&self) -> TxState {
        self.state
    }
}

impl Drop for FileTransaction {
    fn drop(&mut self) {
        // Backstop: a transaction abandoned while active rolls back.
        if self.state == TxState::Active {
            let _ = self.rollback();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::key::PathId;
    use serde_json::json;
    use tempfile::TempDir;

    fn open_store(dir: &TempDir) -> FileDatastore {
        let project = ProjectId::new("demo").unwrap();
        FileDatastore::open(dir.path(), &project, "guestbook").unwrap()
    }

    fn user_entity(name: &str, count: i64) -> Entity {
        let mut properties = Map::new();
        properties.insert("count".into(), json!(count));
        Entity::new(Key::named("User", name), properties)
    }

    #[test]
    fn data_survives_reopening_the_store() {
        let dir = TempDir::new().unwrap();
        {
            let store = open_store(&dir);
            let mut tx = store.transaction().unwrap();
            tx.insert(user_entity("alice", 0)).unwrap();
            tx.commit().unwrap();
        }

        let reopened = open_store(&dir);
        let tx = reopened.transaction().unwrap();
        let entity = tx.get(&Key::named("User", "alice")).unwrap().unwrap();
        assert_eq!(entity.properties()["count"], json!(0));
    }

    #[test]
    fn missing_document_reads_as_empty_namespace() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        let tx = store.transaction().unwrap();
        assert!(tx.get(&Key::named("User", "nobody")).unwrap().is_none());
    }

    #[test]
    fn read_only_transaction_writes_nothing_to_disk() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        let mut tx = store.transaction().unwrap();
        tx.get(&Key::named("User", "nobody")).unwrap();
        tx.commit().unwrap();
        assert!(!store.doc_path().exists());
    }

    #[test]
    fn concurrent_commit_conflicts() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        let mut first = store.transaction().unwrap();
        let mut second = store.transaction().unwrap();
        first.insert(user_entity("alice", 0)).unwrap();
        second.insert(user_entity("bob", 0)).unwrap();

        first.commit().unwrap();
        let err = second.commit().unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
        assert_eq!(second.state(), TxState::Active);
        second.rollback().unwrap();

        // Only the first commit's write landed.
        let tx = store.transaction().unwrap();
        assert!(tx.get(&Key::named("User", "alice")).unwrap().is_some());
        assert!(tx.get(&Key::named("User", "bob")).unwrap().is_none());
    }

    #[test]
    fn deferred_ids_persist_across_transactions() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        let user = Key::named("User", "alice");

        for expected_id in 1..=3u64 {
            let mut tx = store.transaction().unwrap();
            tx.insert_with_deferred_id(IncompleteKey::new(user.clone(), "Comment"), Map::new())
                .unwrap();
            tx.commit().unwrap();

            let check = store.transaction().unwrap();
            assert!(
                check
                    .get(&user.child("Comment", PathId::Id(expected_id)))
                    .unwrap()
                    .is_some(),
                "expected comment id {expected_id}"
            );
        }
    }

    #[test]
    fn corrupt_document_surfaces_as_corrupt_error() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        fs::write(store.doc_path(), b"not json at all").unwrap();

        let err = store.transaction().err().unwrap();
        assert!(matches!(err, StoreError::Corrupt(_)));
    }

    #[test]
    fn unsafe_namespace_is_rejected() {
        let dir = TempDir::new().unwrap();
        let project = ProjectId::new("demo").unwrap();
        assert!(FileDatastore::open(dir.path(), &project, "../escape").is_err());
        assert!(FileDatastore::open(dir.path(), &project, "").is_err());
    }

    #[test]
    fn failed_commit_leaves_document_unchanged() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        let mut tx = store.transaction().unwrap();
        tx.insert(user_entity("alice", 0)).unwrap();
        tx.commit().unwrap();

        // Inserting the same key again must fail and leave version 1 intact.
        let mut dup = store.transaction().unwrap();
        dup.insert(user_entity("alice", 9)).unwrap();
        let err = dup.commit().unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));
        dup.rollback().unwrap();

        let tx = store.transaction().unwrap();
        let entity = tx.get(&Key::named("User", "alice")).unwrap().unwrap();
        assert_eq!(entity.properties()["count"], json!(0));
    }
}
