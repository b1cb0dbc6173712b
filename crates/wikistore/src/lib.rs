//! # Wikistore Architecture
//!
//! Wikistore is the **content storage engine** of a plain-text wiki. Pages are
//! single text files with a metadata header, rendered to HTML on load, and
//! optionally versioned through an external version control tool. Request
//! handling, sessions and templating belong to whatever calls this crate.
//!
//! ## Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Context (init.rs)                                          │
//! │  - Reads wiki.toml, picks the engine, builds the stores     │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Storage Layer (store/)                                     │
//! │  - PageStore trait, History capability                      │
//! │  - ContentStore (plain), LockedVersionedStore (git)         │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Building Blocks                                            │
//! │  - path.rs: identifiers to confined paths                   │
//! │  - record.rs: header + body codec                           │
//! │  - markup.rs: HTML rendering, [[cross references]]          │
//! │  - atomic.rs / lock.rs: crash-safe writes, named locks      │
//! │  - vcs.rs: version control client and log parsing           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The account table (`accounts.rs`) sits beside the page stores and reuses
//! the same atomic-write and named-lock building blocks.
//!
//! ## Key Principle: No Terminal Assumptions
//!
//! Nothing in this crate writes to stdout or stderr or exits the process.
//! Diagnostics go through `tracing`; the embedding program decides whether and
//! where they are shown.
//!
//! ## Testing Strategy
//!
//! - Unit tests sit beside the code they cover.
//! - The versioned store is tested against a recording fake
//!   ([`test_utils::RecordingVcs`], behind the `test_utils` feature) so no
//!   `git` binary is needed.
//! - `tests/` holds cross-module scenarios: concurrent writers, crash-safe
//!   replaces, account round trips.

pub mod accounts;
pub mod atomic;
pub mod config;
pub mod error;
pub mod init;
pub mod lock;
pub mod markup;
pub mod page;
pub mod path;
pub mod record;
pub mod store;
pub mod vcs;

#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;

pub use error::{Result, WikiError};
