use crate::accounts::AccountStore;
use crate::config::WikiConfig;
use crate::error::Result;
use crate::store::fs::ContentStore;
use crate::store::versioned::LockedVersionedStore;
use crate::store::{History, PageStore};
use crate::vcs::GitCli;
use std::path::{Path, PathBuf};
use tracing::debug;

/// The storage backend chosen by `use_git`.
pub enum Engine {
    Plain(ContentStore),
    Versioned(LockedVersionedStore<GitCli>),
}

pub struct WikiContext {
    pub engine: Engine,
    pub accounts: AccountStore,
    pub config: WikiConfig,
    pub content_dir: PathBuf,
}

impl WikiContext {
    pub fn store(&self) -> &dyn PageStore {
        match &self.engine {
            Engine::Plain(store) => store,
            Engine::Versioned(store) => store,
        }
    }

    /// Present only when the content directory is versioned.
    pub fn history(&self) -> Option<&dyn History> {
        match &self.engine {
            Engine::Plain(_) => None,
            Engine::Versioned(store) => Some(store),
        }
    }
}

/// Build the stores for `content_dir` from its configuration.
///
/// With `use_git` the directory must already be a repository.
pub fn initialize(content_dir: &Path) -> Result<WikiContext> {
    let config = WikiConfig::load(content_dir)?;
    initialize_with(content_dir, config)
}

pub fn initialize_with(content_dir: &Path, config: WikiConfig) -> Result<WikiContext> {
    let store = ContentStore::new(content_dir).with_file_ext(&config.file_ext());

    let engine = if config.use_git {
        let git = GitCli::open(content_dir)?;
        Engine::Versioned(LockedVersionedStore::new(
            store,
            git,
            config.vcs_lock(content_dir),
        ))
    } else {
        Engine::Plain(store)
    };

    let accounts = AccountStore::new(content_dir)
        .with_lock(config.user_lock(content_dir))
        .with_default_method(config.default_authentication_method);

    debug!(
        content_dir = %content_dir.display(),
        use_git = config.use_git,
        "initialized wiki"
    );

    Ok(WikiContext {
        engine,
        accounts,
        config,
        content_dir: content_dir.to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::AuthMethod;
    use crate::test_utils::record;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_plain_engine_has_no_history() {
        let temp = TempDir::new().unwrap();
        let ctx = initialize_with(temp.path(), WikiConfig::default()).unwrap();
        assert!(matches!(ctx.engine, Engine::Plain(_)));
        assert!(ctx.history().is_none());

        ctx.store()
            .save("home", &record(&[("title", "Home")], "hi"), None)
            .unwrap();
        assert!(temp.path().join("home.md").is_file());
    }

    #[test]
    fn test_config_file_drives_stores() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("wiki.toml"),
            "file_ext = \"txt\"\ndefault_authentication_method = \"hash\"\n",
        )
        .unwrap();
        let ctx = initialize(temp.path()).unwrap();

        ctx.store().save("a", &record(&[], "x"), None).unwrap();
        assert!(temp.path().join("a.txt").is_file());
        assert_eq!(ctx.accounts.default_method(), AuthMethod::Hash);
    }

    #[test]
    fn test_versioned_engine_needs_repository() {
        let temp = TempDir::new().unwrap();
        let config = WikiConfig {
            use_git: true,
            ..Default::default()
        };
        // A fresh temp dir is not inside any repository.
        assert!(initialize_with(temp.path(), config).is_err());
    }
}
