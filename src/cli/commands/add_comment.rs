//! cli::commands::add_comment
//!
//! Append a timestamped comment to a user's guestbook.
//!
//! # Behavior
//!
//! Creates the user with `count = 1` when absent, otherwise increments the
//! stored count, then inserts the comment as a child of the user key with a
//! deferred id; the store assigns the numeric id at commit time.

use std::io::Write;

use crate::core::records::{comment_key, CommentRecord, UserRecord};
use crate::core::types::UtcTimestamp;
use crate::store::{Entity, Key, Transaction};

use super::{ActionError, ArgumentError, Request};

/// Content stored when the invocation supplies none.
const DEFAULT_CONTENT: &str = "No comment.";

/// Join all arguments into the comment content; never fails.
pub(super) fn parse(args: &[String]) -> Result<Request, ArgumentError> {
    let content = if args.is_empty() {
        DEFAULT_CONTENT.to_string()
    } else {
        args.join(" ")
    };
    Ok(Request::AddComment { content })
}

/// Add one comment under `user_key` inside the caller's transaction.
pub fn add_comment(
    tx: &mut dyn Transaction,
    user_key: &Key,
    content: &str,
    out: &mut dyn Write,
) -> Result<(), ActionError> {
    let name = user_key.name().unwrap_or_default();
    match tx.get(user_key)? {
        None => {
            writeln!(out, "Adding a new user.")?;
            let user = UserRecord::with_count(1);
            tx.insert(Entity::new(user_key.clone(), user.to_properties()?))?;
        }
        Some(entity) => {
            let mut user = UserRecord::from_entity(&entity)?;
            user.count += 1;
            tx.update(Entity::new(user_key.clone(), user.to_properties()?))?;
        }
    }

    let comment = CommentRecord {
        content: content.to_string(),
        timestamp: UtcTimestamp::now(),
    };
    tx.insert_with_deferred_id(comment_key(user_key), comment.to_properties()?)?;
    writeln!(out, "Adding a comment to user '{name}'.")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::with_transaction;
    use super::*;
    use crate::core::records::{user_key, COMMENT_KIND};
    use crate::core::types::UserName;
    use crate::store::memory::MemoryDatastore;
    use crate::store::{Datastore, Query};
    use serde_json::json;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parse_defaults_to_no_comment() {
        assert_eq!(
            parse(&args(&[])).unwrap(),
            Request::AddComment {
                content: "No comment.".into()
            }
        );
    }

    #[test]
    fn parse_joins_arguments_with_single_spaces() {
        assert_eq!(
            parse(&args(&["hello", "brave", "world"])).unwrap(),
            Request::AddComment {
                content: "hello brave world".into()
            }
        );
    }

    #[test]
    fn first_comment_creates_the_user_with_count_one() {
        let store = MemoryDatastore::new();
        let key = user_key(&UserName::new("alice").unwrap());

        let mut out = Vec::new();
        with_transaction(&store, |tx| add_comment(tx, &key, "hi", &mut out)).unwrap();

        let output = String::from_utf8(out).unwrap();
        assert!(output.contains("Adding a new user."));
        assert!(output.contains("Adding a comment to user 'alice'."));

        let user = store.entity(&key).unwrap();
        assert_eq!(user.properties()["count"], json!(1));
    }

    #[test]
    fn n_comments_leave_count_n_and_n_children() {
        let store = MemoryDatastore::new();
        let key = user_key(&UserName::new("alice").unwrap());

        for i in 0..5 {
            with_transaction(&store, |tx| {
                add_comment(tx, &key, &format!("comment {i}"), &mut std::io::sink())
            })
            .unwrap();
        }

        let user = store.entity(&key).unwrap();
        assert_eq!(user.properties()["count"], json!(5));

        let tx = store.transaction().unwrap();
        let page = tx
            .run_query(&Query::new(COMMENT_KIND).ancestor(key.clone()))
            .unwrap();
        assert_eq!(page.entities.len(), 5);

        // Deferred ids came out distinct.
        let mut ids: Vec<u64> = page.entities.iter().filter_map(|e| e.key().id()).collect();
        ids.dedup();
        assert_eq!(ids.len(), 5);
    }
}
