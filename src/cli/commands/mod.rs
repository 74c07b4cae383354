//! cli::commands
//!
//! Verb registry, dispatch, and the transaction lifecycle.
//!
//! # Architecture
//!
//! Four fixed verbs map to handlers through an immutable [`Registry`] built
//! once at startup - a table of verb, parameter signature, and parse
//! function - with the parsed [`Request`] dispatched by a single match. No
//! global state, no trait-object hierarchy.
//!
//! # Dispatch order
//!
//! 1. Look up the case-normalized verb; unknown verbs report usage and
//!    return cleanly without touching the store
//! 2. Parse the verb arguments; failures report the expected signature and
//!    return cleanly before any transaction is opened
//! 3. Open one transaction, run the handler, commit on success
//!
//! # Transaction lifecycle
//!
//! [`with_transaction`] guarantees that on every exit path a transaction
//! still `Active` is rolled back - a transaction is never left neither
//! committed nor rolled back.

mod add_comment;
mod delete;
mod display;
mod set_contact;

// Re-export handler functions for testing and direct invocation
pub use add_comment::add_comment;
pub use delete::delete;
pub use display::display;
pub use set_contact::set_contact;

use std::io;

use anyhow::{Context as _, Result};
use thiserror::Error;

use crate::core::records::{self, Contact, RecordError};
use crate::core::types::UserName;
use crate::store::{Datastore, Key, StoreError, Transaction, TxState};

/// Errors from verb argument parsing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ArgumentError {
    /// `set` needs both an email and a phone.
    #[error("missing required email and phone")]
    MissingContactFields,

    /// `set` takes exactly two arguments.
    #[error("too many arguments")]
    TooManyArguments,
}

/// Errors from running a handler inside a transaction.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Record(#[from] RecordError),

    #[error("failed to write report: {0}")]
    Report(#[from] io::Error),
}

/// A parsed verb invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Delete,
    Display,
    AddComment { content: String },
    SetContact { contact: Contact },
}

/// One registry entry: a verb, its parameter signature, and its parser.
pub struct ActionSpec {
    /// Case-normalized verb string.
    pub verb: &'static str,
    /// Human-readable parameter signature, empty for verbs without arguments.
    pub params: &'static str,
    parse: fn(&[String]) -> Result<Request, ArgumentError>,
}

/// Immutable verb registry.
///
/// Built once at startup and passed by reference to [`dispatch`].
pub struct Registry {
    entries: Vec<ActionSpec>,
}

impl Registry {
    /// Build the registry of all four verbs.
    pub fn new() -> Self {
        Self {
            entries: vec![
                ActionSpec {
                    verb: "delete",
                    params: "",
                    parse: delete::parse,
                },
                ActionSpec {
                    verb: "display",
                    params: "",
                    parse: display::parse,
                },
                ActionSpec {
                    verb: "add",
                    params: "<comment>",
                    parse: add_comment::parse,
                },
                ActionSpec {
                    verb: "set",
                    params: "<email> <phone>",
                    parse: set_contact::parse,
                },
            ],
        }
    }

    /// Find the entry for an already-lowercased verb.
    pub fn lookup(&self, verb: &str) -> Option<&ActionSpec> {
        self.entries.iter().find(|entry| entry.verb == verb)
    }

    /// Usage summary enumerating every verb and its parameter signature.
    pub fn usage(&self) -> String {
        let mut usage = String::from("Usage: gb <project> <user> <operation> [args]...\n");
        for entry in &self.entries {
            usage.push('\t');
            usage.push_str(entry.verb);
            if !entry.params.is_empty() {
                usage.push(' ');
                usage.push_str(entry.params);
            }
            usage.push('\n');
        }
        usage
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

/// Dispatch one verb invocation.
///
/// Unknown verbs and argument validation failures report on `out` and
/// return `Ok` without opening a transaction; store and report-writing
/// failures return `Err` after the transaction lifecycle guarantees have
/// run.
pub fn dispatch(
    registry: &Registry,
    store: &dyn Datastore,
    user: &UserName,
    verb: &str,
    args: &[String],
    out: &mut dyn io::Write,
) -> Result<()> {
    let verb = verb.to_ascii_lowercase();
    let Some(action) = registry.lookup(&verb) else {
        writeln!(out, "Unrecognized operation '{verb}'.")?;
        write!(out, "{}", registry.usage())?;
        return Ok(());
    };

    let request = match (action.parse)(args) {
        Ok(request) => request,
        Err(err) => {
            writeln!(out, "Invalid input for operation '{}': {err}.", action.verb)?;
            if action.params.is_empty() {
                writeln!(out, "Expected: {}", action.verb)?;
            } else {
                writeln!(out, "Expected: {} {}", action.verb, action.params)?;
            }
            return Ok(());
        }
    };

    let user_key = records::user_key(user);
    with_transaction(store, |tx| run_request(tx, &user_key, &request, out))
        .with_context(|| format!("operation '{}' failed for user '{user}'", action.verb))?;
    Ok(())
}

/// Route a parsed request to its handler.
fn run_request(
    tx: &mut dyn Transaction,
    user_key: &Key,
    request: &Request,
    out: &mut dyn io::Write,
) -> Result<(), ActionError> {
    match request {
        Request::Delete => delete(tx, user_key, out),
        Request::Display => display(tx, user_key, out),
        Request::AddComment { content } => add_comment(tx, user_key, content, out),
        Request::SetContact { contact } => set_contact(tx, user_key, contact, out),
    }
}

/// Run one unit of work inside a transaction.
///
/// Opens a transaction, runs `f`, and commits on success. On every exit
/// path - handler failure, commit failure, or success - a transaction
/// still `Active` afterwards is rolled back, so the transaction always
/// finishes `Committed` or `RolledBack`.
pub fn with_transaction<F>(store: &dyn Datastore, f: F) -> Result<(), ActionError>
where
    F: FnOnce(&mut dyn Transaction) -> Result<(), ActionError>,
{
    let mut tx = store.transaction().map_err(ActionError::Store)?;
    let outcome = match f(tx.as_mut()) {
        Ok(()) => tx.commit().map_err(ActionError::Store),
        Err(err) => Err(err),
    };
    if tx.state() == TxState::Active {
        let rolled_back = tx.rollback().map_err(ActionError::Store);
        if outcome.is_ok() {
            rolled_back?;
        }
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::{FailOn, MemoryDatastore, StoreEvent};

    fn dispatch_to_string(
        store: &MemoryDatastore,
        verb: &str,
        args: &[&str],
    ) -> (Result<()>, String) {
        let registry = Registry::new();
        let user = UserName::new("alice").unwrap();
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        let mut out = Vec::new();
        let result = dispatch(&registry, store, &user, verb, &args, &mut out);
        (result, String::from_utf8(out).unwrap())
    }

    #[test]
    fn unknown_verb_reports_usage_without_touching_the_store() {
        let store = MemoryDatastore::new();
        let (result, output) = dispatch_to_string(&store, "frobnicate", &[]);

        result.unwrap();
        assert!(output.contains("Unrecognized operation 'frobnicate'."));
        for expected in ["delete", "display", "add <comment>", "set <email> <phone>"] {
            assert!(output.contains(expected), "usage missing {expected:?}");
        }
        assert!(store.events().is_empty());
    }

    #[test]
    fn verb_lookup_is_case_insensitive() {
        let store = MemoryDatastore::new();
        let (result, output) = dispatch_to_string(&store, "DISPLAY", &[]);

        result.unwrap();
        assert!(output.contains("does not exist"));
    }

    #[test]
    fn parse_failure_reports_signature_before_any_transaction() {
        let store = MemoryDatastore::new();
        let (result, output) = dispatch_to_string(&store, "set", &["only-email"]);

        result.unwrap();
        assert!(output.contains("Invalid input for operation 'set'"));
        assert!(output.contains("missing required email and phone"));
        assert!(output.contains("Expected: set <email> <phone>"));
        assert!(store.events().is_empty());
    }

    #[test]
    fn successful_dispatch_commits() {
        let store = MemoryDatastore::new();
        let (result, _) = dispatch_to_string(&store, "add", &["hello"]);

        result.unwrap();
        assert!(matches!(
            store.events().last(),
            Some(StoreEvent::Committed { .. })
        ));
    }

    #[test]
    fn handler_failure_rolls_back() {
        let store = MemoryDatastore::new()
            .fail_on(FailOn::InsertDeferred(StoreError::Corrupt("boom".into())));
        let (result, _) = dispatch_to_string(&store, "add", &["hello"]);

        assert!(result.is_err());
        let events = store.events();
        assert_eq!(events.last(), Some(&StoreEvent::RolledBack));
        assert!(!events
            .iter()
            .any(|e| matches!(e, StoreEvent::Committed { .. })));
        assert_eq!(store.entity_count(), 0);
    }

    #[test]
    fn commit_failure_rolls_back_instead_of_leaving_active() {
        let store = MemoryDatastore::new().fail_on(FailOn::Commit(StoreError::Io(
            std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
        )));
        let (result, _) = dispatch_to_string(&store, "add", &["hello"]);

        assert!(result.is_err());
        assert_eq!(store.events().last(), Some(&StoreEvent::RolledBack));
    }

    #[test]
    fn with_transaction_propagates_the_handler_error_over_rollback_success() {
        let store = MemoryDatastore::new();
        let err = with_transaction(&store, |_tx| {
            Err(ActionError::Store(StoreError::Corrupt("boom".into())))
        })
        .unwrap_err();
        assert!(matches!(err, ActionError::Store(StoreError::Corrupt(_))));
    }

    #[test]
    fn registry_usage_lists_every_verb_once() {
        let registry = Registry::new();
        let usage = registry.usage();
        assert_eq!(usage.matches("delete").count(), 1);
        assert_eq!(usage.matches("display").count(), 1);
    }
}
