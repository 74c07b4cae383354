//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Surface
//!
//! `gb [OPTIONS] [PROJECT] [USER] [VERB] [ARGS]...`
//!
//! The identity arguments are positional so a full invocation reads like
//! `gb demo alice add hello world`. Verb arguments are passed through
//! untouched; verb dispatch and validation live in
//! [`crate::cli::commands`], not in clap.

use clap::Parser;
use std::path::PathBuf;

/// Guestbook - a transactional guestbook over a hierarchical entity store
#[derive(Parser, Debug)]
#[command(name = "gb")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Project the guestbook data belongs to (defaults to the configured
    /// project, else "default")
    #[arg(value_name = "PROJECT")]
    pub project: Option<String>,

    /// User whose guestbook is addressed (defaults to the invoking OS user)
    #[arg(value_name = "USER")]
    pub user: Option<String>,

    /// Operation to perform: delete | display | add | set (defaults to
    /// display; case-insensitive)
    #[arg(value_name = "VERB")]
    pub verb: Option<String>,

    /// Arguments for the verb
    #[arg(value_name = "ARGS", trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,

    /// Directory holding persisted guestbook data
    #[arg(long, value_name = "PATH")]
    pub data_dir: Option<PathBuf>,

    /// Enable debug diagnostics on stderr
    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}
