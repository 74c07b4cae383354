//! cli::commands::display
//!
//! Show a user's contact details, comment count, and comments in
//! chronological order.
//!
//! # Pagination
//!
//! Comments are fetched through a bounded ancestor query, following the
//! continuation cursor until a page comes back short. Pages are mutually
//! consistent because queries run against the transaction's snapshot.
//!
//! # Ordering
//!
//! The store returns comments in key order, not time order. Comments are
//! collected into a map keyed by `(timestamp, id)` - the id breaks ties
//! consistently - and printed chronologically. The store is never asked to
//! sort by property.

use std::collections::BTreeMap;
use std::io::Write;

use crate::core::records::{CommentRecord, UserRecord, COMMENT_KIND};
use crate::core::types::UtcTimestamp;
use crate::store::{Key, Query, Transaction};

use super::{ActionError, ArgumentError, Request};

/// Comments fetched per query page.
const COMMENT_PAGE_SIZE: usize = 200;

/// `display` takes no arguments; extras are ignored.
pub(super) fn parse(_args: &[String]) -> Result<Request, ArgumentError> {
    Ok(Request::Display)
}

/// Print `user_key`'s record and comments. Never mutates.
pub fn display(
    tx: &mut dyn Transaction,
    user_key: &Key,
    out: &mut dyn Write,
) -> Result<(), ActionError> {
    let name = user_key.name().unwrap_or_default();
    let Some(entity) = tx.get(user_key)? else {
        writeln!(out, "User '{name}' does not exist.")?;
        return Ok(());
    };
    let user = UserRecord::from_entity(&entity)?;

    if let Some(contact) = &user.contact {
        writeln!(
            out,
            "User '{name}' email is '{}', phone is '{}'.",
            contact.email, contact.phone
        )?;
    }
    writeln!(out, "User '{name}' has {} comment[s].", user.count)?;

    let mut ordered: BTreeMap<(UtcTimestamp, u64), String> = BTreeMap::new();
    let mut query = Query::new(COMMENT_KIND)
        .ancestor(user_key.clone())
        .limit(COMMENT_PAGE_SIZE);
    loop {
        let page = tx.run_query(&query)?;
        let fetched = page.entities.len();
        for entity in &page.entities {
            let comment = CommentRecord::from_entity(entity)?;
            let id = entity.key().id().unwrap_or_default();
            ordered.insert((comment.timestamp, id), comment.content);
        }
        if fetched < COMMENT_PAGE_SIZE {
            break;
        }
        match page.cursor_after {
            Some(cursor) => query = query.start_cursor(cursor),
            None => break,
        }
    }

    for ((timestamp, _), content) in &ordered {
        writeln!(out, "\t{timestamp}: {content}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::{set_contact, with_transaction};
    use super::*;
    use crate::core::records::{comment_key, user_key, Contact};
    use crate::core::types::UserName;
    use crate::store::memory::MemoryDatastore;
    use crate::store::Entity;

    fn run_display(store: &MemoryDatastore, key: &Key) -> String {
        let mut out = Vec::new();
        with_transaction(store, |tx| display(tx, key, &mut out)).unwrap();
        String::from_utf8(out).unwrap()
    }

    /// Seed a user plus comments whose timestamps run in the given order.
    fn seed(name: &str, timestamps: &[i64]) -> (MemoryDatastore, Key) {
        let key = user_key(&UserName::new(name).unwrap());
        let mut entities = vec![Entity::new(
            key.clone(),
            UserRecord::with_count(timestamps.len() as i64)
                .to_properties()
                .unwrap(),
        )];
        for (i, secs) in timestamps.iter().enumerate() {
            let record = CommentRecord {
                content: format!("comment at {secs}"),
                timestamp: UtcTimestamp::from_unix_seconds(*secs),
            };
            entities.push(Entity::new(
                comment_key(&key).complete(i as u64 + 1),
                record.to_properties().unwrap(),
            ));
        }
        (MemoryDatastore::with_entities(entities), key)
    }

    fn comment_lines(output: &str) -> Vec<&str> {
        output.lines().filter(|l| l.starts_with('\t')).collect()
    }

    #[test]
    fn missing_user_is_a_noop() {
        let store = MemoryDatastore::new();
        let key = user_key(&UserName::new("ghost").unwrap());

        let output = run_display(&store, &key);
        assert!(output.contains("User 'ghost' does not exist."));
        assert_eq!(store.entity_count(), 0);
    }

    #[test]
    fn prints_contact_and_count() {
        let store = MemoryDatastore::new();
        let key = user_key(&UserName::new("alice").unwrap());
        let contact = Contact {
            email: "alice@example.com".into(),
            phone: "555-0100".into(),
        };
        with_transaction(&store, |tx| set_contact(tx, &key, &contact, &mut std::io::sink())).unwrap();

        let output = run_display(&store, &key);
        assert!(output
            .contains("User 'alice' email is 'alice@example.com', phone is '555-0100'."));
        assert!(output.contains("User 'alice' has 0 comment[s]."));
    }

    #[test]
    fn never_mutates() {
        let (store, key) = seed("alice", &[3, 1, 2]);
        run_display(&store, &key);
        assert_eq!(store.version(), 0);
    }

    #[test]
    fn comments_print_in_timestamp_order_across_page_boundaries() {
        // 450 comments spanning three 200-entity pages, timestamps assigned
        // in reverse of key order.
        let timestamps: Vec<i64> = (0..450).map(|i| 1_000_000 - i).collect();
        let (store, key) = seed("alice", &timestamps);

        let output = run_display(&store, &key);
        let lines = comment_lines(&output);
        assert_eq!(lines.len(), 450);

        let mut printed = Vec::new();
        for line in &lines {
            let timestamp = line
                .trim_start()
                .split(": ")
                .next()
                .and_then(|t| chrono::DateTime::parse_from_rfc3339(t).ok())
                .expect("comment line carries an RFC3339 timestamp");
            printed.push(timestamp);
        }
        let mut sorted = printed.clone();
        sorted.sort();
        assert_eq!(printed, sorted, "comments out of chronological order");
    }

    #[test]
    fn tied_timestamps_use_a_consistent_order() {
        let (store, key) = seed("alice", &[5, 5, 5]);
        let first = run_display(&store, &key);
        let second = run_display(&store, &key);
        assert_eq!(first, second);
        assert_eq!(comment_lines(&first).len(), 3);
    }
}
