//! # CLI Behavior
//!
//! Every command works on one content directory, `--content-dir` (or
//! `WIKI_CONTENT_DIR`, default `./content`). Its `wiki.toml` decides whether
//! the directory is versioned.
//!
//! Identifiers given on the command line are normalized the way page links
//! are: `"Team  Notes"` and `team_notes` name the same page.
//!
//! ### Saving
//!
//! `wiki save <id>` reads the body from stdin. An existing page keeps its
//! metadata unless `--title`/`--tags` replace it.
//!
//! ## Module Structure
//!
//! - `setup`: Argument parsing via clap
//! - `commands`: Per-command handlers that call the store and print results

mod commands;
pub mod setup;

pub use commands::run;

use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "WIKI_LOG";

pub fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
