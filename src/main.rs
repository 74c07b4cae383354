//! gb - guestbook CLI binary.
//!
//! Thin shim over [`guestbook::cli::run`]. Store and internal failures
//! propagate out as a non-zero exit; handled validation errors do not.

use anyhow::Result;

fn main() -> Result<()> {
    guestbook::cli::run()
}
