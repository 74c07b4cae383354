//! Guestbook - a transactional guestbook CLI over a hierarchical entity store
//!
//! Guestbook is a single-binary tool that keeps a per-user guestbook: named
//! user records with embedded contact details and timestamped comment children.
//! Every verb invocation is one atomic unit of work against the store.
//!
//! # Architecture
//!
//! The codebase follows a strict layered architecture:
//!
//! - [`cli`] - Command-line interface layer (parses args, dispatches verbs)
//! - [`core`] - Domain types, records, and configuration
//! - [`store`] - Keys, entities, queries, and transactional backends
//!
//! # Correctness Invariants
//!
//! 1. Every read-then-write sequence executes inside a single transaction
//! 2. A transaction always ends Committed or RolledBack, never Active
//! 3. Comment children live strictly under their user's key prefix
//! 4. Validation failures never touch the store

pub mod cli;
pub mod core;
pub mod store;
