//! cli
//!
//! Command-line interface layer for the guestbook.
//!
//! # Responsibilities
//!
//! - Parse positional identity arguments and global flags
//! - Resolve project, user, and data directory from args, config, and the
//!   environment
//! - Construct the store and delegate to the command dispatcher
//!
//! # Architecture
//!
//! The CLI layer is thin. All store mutations flow through
//! [`commands::dispatch`], which owns the verb registry and the transaction
//! lifecycle.

pub mod args;
pub mod commands;

pub use args::Cli;

use std::io;
use std::path::PathBuf;

use anyhow::{bail, Context as _, Result};
use tracing_subscriber::EnvFilter;

use crate::core::config::Config;
use crate::core::records::NAMESPACE;
use crate::core::types::{ProjectId, UserName};
use crate::store::file::FileDatastore;
use commands::Registry;

/// Verb used when the invocation names none.
const DEFAULT_VERB: &str = "display";

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`. Handled validation
/// errors (unknown verb, bad verb arguments) report on stdout and return
/// `Ok`; store and internal failures return `Err`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();
    init_tracing(cli.debug);

    let config = Config::load().context("failed to load configuration")?;

    let project = ProjectId::new(
        cli.project
            .as_deref()
            .or_else(|| config.default_project())
            .unwrap_or("default"),
    )?;
    let user = match cli.user {
        Some(name) => UserName::new(name)?,
        None => UserName::new(os_user()?)?,
    };
    let verb = cli
        .verb
        .map(|v| v.to_ascii_lowercase())
        .unwrap_or_else(|| DEFAULT_VERB.to_string());
    let data_dir = resolve_data_dir(cli.data_dir, &config)?;

    let store = FileDatastore::open(&data_dir, &project, NAMESPACE)
        .with_context(|| format!("failed to open store under {}", data_dir.display()))?;

    let registry = Registry::new();
    let mut out = io::stdout().lock();
    commands::dispatch(&registry, &store, &user, &verb, &cli.args, &mut out)
}

/// Resolve the data directory: flag, then config, then the platform default.
fn resolve_data_dir(flag: Option<PathBuf>, config: &Config) -> Result<PathBuf> {
    if let Some(dir) = flag {
        return Ok(dir);
    }
    if let Some(dir) = config.data_dir() {
        return Ok(dir.to_path_buf());
    }
    match dirs::data_dir() {
        Some(dir) => Ok(dir.join("guestbook")),
        None => bail!("could not determine a data directory; pass --data-dir"),
    }
}

/// The invoking OS user's identity.
fn os_user() -> Result<String> {
    for var in ["USER", "USERNAME"] {
        if let Ok(name) = std::env::var(var) {
            if !name.is_empty() {
                return Ok(name);
            }
        }
    }
    bail!("could not determine the invoking user; pass a user name")
}

/// Install the stderr diagnostics subscriber.
///
/// Filter precedence: `GUESTBOOK_LOG`, then `RUST_LOG`, then a default that
/// `--debug` raises to debug level.
fn init_tracing(debug: bool) {
    let fallback = if debug { "guestbook=debug" } else { "guestbook=warn" };
    let filter = EnvFilter::try_from_env("GUESTBOOK_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}
