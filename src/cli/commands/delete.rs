//! cli::commands::delete
//!
//! Delete a user and every comment under it.
//!
//! # Behavior
//!
//! A missing user is a no-op, not an error. Otherwise a keys-only ancestor
//! query finds every comment under the user's key; each key is deleted,
//! then the user key itself, all inside the caller's transaction.

use std::io::Write;

use crate::core::records::COMMENT_KIND;
use crate::store::{Key, Query, Transaction};

use super::{ActionError, ArgumentError, Request};

/// `delete` takes no arguments; extras are ignored.
pub(super) fn parse(_args: &[String]) -> Result<Request, ArgumentError> {
    Ok(Request::Delete)
}

/// Delete `user_key` and all of its comments inside the caller's transaction.
pub fn delete(
    tx: &mut dyn Transaction,
    user_key: &Key,
    out: &mut dyn Write,
) -> Result<(), ActionError> {
    let name = user_key.name().unwrap_or_default();
    if tx.get(user_key)?.is_none() {
        writeln!(out, "Nothing to delete, user '{name}' does not exist.")?;
        return Ok(());
    }

    let query = Query::new(COMMENT_KIND)
        .ancestor(user_key.clone())
        .keys_only();
    let page = tx.run_query(&query)?;
    let mut count = 0usize;
    for entity in &page.entities {
        tx.delete(entity.key())?;
        count += 1;
    }
    tx.delete(user_key)?;
    writeln!(out, "Deleting user '{name}' and {count} comment[s].")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::{add_comment, with_transaction};
    use super::*;
    use crate::core::records::{user_key, COMMENT_KIND};
    use crate::core::types::UserName;
    use crate::store::memory::MemoryDatastore;
    use crate::store::{Datastore, Query};

    fn run_delete(store: &MemoryDatastore, key: &Key) -> String {
        let mut out = Vec::new();
        with_transaction(store, |tx| delete(tx, key, &mut out)).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn missing_user_is_a_noop() {
        let store = MemoryDatastore::new();
        let key = user_key(&UserName::new("ghost").unwrap());

        let output = run_delete(&store, &key);
        assert!(output.contains("Nothing to delete, user 'ghost' does not exist."));
        assert_eq!(store.entity_count(), 0);
    }

    #[test]
    fn removes_user_and_every_comment_atomically() {
        let store = MemoryDatastore::new();
        let key = user_key(&UserName::new("alice").unwrap());
        for i in 0..3 {
            with_transaction(&store, |tx| {
                add_comment(tx, &key, &format!("comment {i}"), &mut std::io::sink())
            })
            .unwrap();
        }
        assert_eq!(store.entity_count(), 4);

        let output = run_delete(&store, &key);
        assert!(output.contains("Deleting user 'alice' and 3 comment[s]."));

        let tx = store.transaction().unwrap();
        assert!(tx.get(&key).unwrap().is_none());
        let page = tx
            .run_query(&Query::new(COMMENT_KIND).ancestor(key.clone()))
            .unwrap();
        assert!(page.entities.is_empty());
        assert_eq!(store.entity_count(), 0);
    }

    #[test]
    fn leaves_other_users_untouched() {
        let store = MemoryDatastore::new();
        let alice = user_key(&UserName::new("alice").unwrap());
        let bob = user_key(&UserName::new("bob").unwrap());
        with_transaction(&store, |tx| add_comment(tx, &alice, "hi", &mut std::io::sink())).unwrap();
        with_transaction(&store, |tx| add_comment(tx, &bob, "yo", &mut std::io::sink())).unwrap();

        run_delete(&store, &alice);

        let tx = store.transaction().unwrap();
        assert!(tx.get(&bob).unwrap().is_some());
        let page = tx
            .run_query(&Query::new(COMMENT_KIND).ancestor(bob.clone()))
            .unwrap();
        assert_eq!(page.entities.len(), 1);
    }
}
