//! # Configuration
//!
//! Wiki configuration is a [`confique`] struct loaded in layers:
//!
//! 1. **Environment variables**: `WIKI_FILE_EXT`, `WIKI_USE_GIT`, etc.
//! 2. **Content Config**: `<content_dir>/wiki.toml`. A missing file is fine.
//! 3. **Compiled Defaults**: `#[config(default = ...)]`.
//!
//! ## Available Settings
//!
//! | Key | Default | Description |
//! |-----|---------|-------------|
//! | `file_ext` | `.md` | Record file extension |
//! | `use_git` | `false` | Commit every change and keep history |
//! | `vcs_lock_file` | `<content_dir>/wikigit.flock` | Content-root lock |
//! | `user_lock_file` | `<content_dir>/users.lock` | Account-table lock |
//! | `lock_timeout_ms` | `30000` | Lock wait bound, `0` waits forever |
//! | `default_authentication_method` | `cleartext` | `cleartext` or `hash` |
//! | `default_search_ignore_case` | `true` | Search case folding |

use crate::accounts::{AuthMethod, ACCOUNTS_LOCK_FILE};
use crate::error::{Result, WikiError};
use crate::lock::{NamedLock, DEFAULT_LOCK_TIMEOUT};
use crate::path::DEFAULT_FILE_EXT;
use confique::Config;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILENAME: &str = "wiki.toml";
pub const VCS_LOCK_FILE: &str = "wikigit.flock";

/// Configuration for one content directory, stored in `wiki.toml`.
#[derive(Config, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct WikiConfig {
    /// Extension of record files (e.g. ".md", ".txt")
    #[config(default = ".md", env = "WIKI_FILE_EXT")]
    pub file_ext: String,

    /// Keep the content directory under version control
    #[config(default = false, env = "WIKI_USE_GIT")]
    pub use_git: bool,

    /// Lock serializing content mutations. Relative paths are taken from the
    /// content directory.
    #[config(env = "WIKI_VCS_LOCK_FILE")]
    pub vcs_lock_file: Option<PathBuf>,

    /// Lock serializing account-table mutations.
    #[config(env = "WIKI_USER_LOCK_FILE")]
    pub user_lock_file: Option<PathBuf>,

    /// How long a writer waits for a lock, in milliseconds. 0 waits forever.
    #[config(default = 30000, env = "WIKI_LOCK_TIMEOUT_MS")]
    pub lock_timeout_ms: u64,

    #[config(default = "cleartext", env = "WIKI_DEFAULT_AUTHENTICATION_METHOD")]
    pub default_authentication_method: AuthMethod,

    #[config(default = true, env = "WIKI_DEFAULT_SEARCH_IGNORE_CASE")]
    pub default_search_ignore_case: bool,
}

impl Default for WikiConfig {
    fn default() -> Self {
        Self {
            file_ext: DEFAULT_FILE_EXT.to_string(),
            use_git: false,
            vcs_lock_file: None,
            user_lock_file: None,
            lock_timeout_ms: DEFAULT_LOCK_TIMEOUT.as_millis() as u64,
            default_authentication_method: AuthMethod::Cleartext,
            default_search_ignore_case: true,
        }
    }
}

impl WikiConfig {
    /// Environment over `<content_dir>/wiki.toml` over defaults.
    pub fn load(content_dir: &Path) -> Result<Self> {
        Self::builder()
            .env()
            .file(content_dir.join(CONFIG_FILENAME))
            .load()
            .map_err(|e| WikiError::Config(e.to_string()))
    }

    /// Get the file extension, normalized to start with a dot.
    pub fn file_ext(&self) -> String {
        if self.file_ext.starts_with('.') {
            self.file_ext.clone()
        } else {
            format!(".{}", self.file_ext)
        }
    }

    pub fn lock_timeout(&self) -> Option<Duration> {
        match self.lock_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }

    pub fn vcs_lock(&self, content_dir: &Path) -> NamedLock {
        let path = locate(content_dir, self.vcs_lock_file.as_deref(), VCS_LOCK_FILE);
        NamedLock::new(path).with_timeout(self.lock_timeout())
    }

    pub fn user_lock(&self, content_dir: &Path) -> NamedLock {
        let path = locate(content_dir, self.user_lock_file.as_deref(), ACCOUNTS_LOCK_FILE);
        NamedLock::new(path).with_timeout(self.lock_timeout())
    }
}

fn locate(content_dir: &Path, configured: Option<&Path>, default_name: &str) -> PathBuf {
    match configured {
        Some(path) => content_dir.join(path),
        None => content_dir.join(default_name),
    }
}
