//! # Wiki CLI
//!
//! An administrative client for a wikistore content directory. The binary is
//! thin: argument parsing and dispatch live in `src/cli/`, this file only calls
//! `cli::run()` and turns an error into a message and exit status.
//!
//! ## Workspace Structure
//!
//! - `crates/wikistore/`: storage engine, no terminal I/O
//! - `crates/wiki/`: this client
//!
//! ## Diagnostics
//!
//! Library events go through `tracing`. They are printed to stderr, filtered
//! by the `WIKI_LOG` variable (e.g. `WIKI_LOG=wikistore=debug`), and default
//! to warnings only so fallbacks such as grep failures stay visible.

mod cli;

fn main() {
    cli::init_tracing();
    if let Err(e) = cli::run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
