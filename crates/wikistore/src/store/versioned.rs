//! # Locked, Versioned Store
//!
//! [`LockedVersionedStore`] decorates a [`ContentStore`]: `load`, `save`,
//! `move_page` and `delete` run under the content-root [`NamedLock`], and each
//! mutation is committed through a [`VcsClient`] before the lock is released.
//! The lock is what keeps two writers (threads or separate processes) from
//! interleaving a file write with someone else's commit.
//!
//! ## Lost Updates
//!
//! The lock orders writes; it does not merge them. Two editors who both
//! loaded revision N and save one after the other each get a clean commit,
//! and the second one silently replaces the first one's changes. There is no
//! base-revision check and no conflict detection.
//!
//! ## Reads
//!
//! `exists`, `index` and `history` take no lock. `search` asks the version
//! control tool to grep first and falls back to the linear search of the
//! wrapped store whenever the tool fails (empty repository, binary missing).

use super::fs::{already_exists, ContentStore};
use super::{History, PageStore};
use crate::error::{Result, WikiError};
use crate::lock::NamedLock;
use crate::markup::MarkupProcessor;
use crate::page::{sort_by_title, Page};
use crate::path::PathResolver;
use crate::record::PageRecord;
use crate::vcs::{is_commit_hash, CommitRecord, GitCli, VcsClient, LOG_FORMAT};
use std::collections::HashSet;
use std::fs;
use tracing::{debug, info, warn};

pub const DEFAULT_AUTHOR: &str = "anonymouse";

const SAVE_MESSAGE: &str = "changed";
const MOVE_MESSAGE: &str = "file moved";
const DELETE_MESSAGE: &str = "file deleted";

/// `name <name>`, the author identity recorded for a save.
pub fn author_identity(author: Option<&str>) -> String {
    let name = author
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(DEFAULT_AUTHOR);
    format!("{} <{}>", name, name)
}

pub struct LockedVersionedStore<V: VcsClient = GitCli> {
    inner: ContentStore,
    vcs: V,
    lock: NamedLock,
}

impl<V: VcsClient> LockedVersionedStore<V> {
    pub fn new(inner: ContentStore, vcs: V, lock: NamedLock) -> Self {
        Self { inner, vcs, lock }
    }

    pub fn inner(&self) -> &ContentStore {
        &self.inner
    }

    pub fn vcs(&self) -> &V {
        &self.vcs
    }

    pub fn lock(&self) -> &NamedLock {
        &self.lock
    }

    fn relative(&self, id: &str) -> Result<String> {
        self.inner.resolver().relative(id)
    }

    /// Page identifiers named in NUL-separated grep output, first occurrence
    /// order, record files only.
    fn grep_identifiers(&self, output: &str) -> Vec<String> {
        let ext = self.inner.resolver().file_ext();
        let mut seen = HashSet::new();
        output
            .split('\0')
            .map(|path| path.trim_start_matches('\n'))
            .filter_map(|path| path.strip_suffix(ext))
            .filter(|id| !id.is_empty())
            .filter(|id| seen.insert(id.to_string()))
            .map(str::to_string)
            .collect()
    }
}

impl<V: VcsClient> PageStore for LockedVersionedStore<V> {
    fn resolver(&self) -> &PathResolver {
        self.inner.resolver()
    }

    fn processor(&self) -> &MarkupProcessor {
        self.inner.processor()
    }

    fn exists(&self, id: &str) -> bool {
        self.inner.exists(id)
    }

    fn load(&self, id: &str) -> Result<String> {
        self.lock.with(|| self.inner.load(id))
    }

    fn save(&self, id: &str, record: &PageRecord, author: Option<&str>) -> Result<()> {
        self.lock.with(|| {
            self.inner.save(id, record, None)?;
            let path = self.relative(id)?;
            let author = author_identity(author);
            self.vcs.add(&path)?;
            if !self.vcs.has_staged_changes(&path)? {
                debug!(id, "page unchanged, nothing to commit");
                return Ok(());
            }
            self.vcs.commit(SAVE_MESSAGE, Some(&author))?;
            info!(id, author = %author, "committed page");
            Ok(())
        })
    }

    fn move_page(&self, id: &str, new_id: &str) -> Result<()> {
        // Confine both ends before anything touches the repository.
        let source = self.inner.path(id)?;
        let target = self.inner.path(new_id)?;

        self.lock.with(|| {
            if !source.is_file() {
                return Err(WikiError::NotFound(id.to_string()));
            }
            if source == target {
                return Ok(());
            }
            if target.exists() {
                return Err(already_exists(new_id));
            }
            if let Some(folder) = target.parent() {
                fs::create_dir_all(folder)?;
            }
            self.vcs.mv(&self.relative(id)?, &self.relative(new_id)?)?;
            self.vcs.commit(MOVE_MESSAGE, None)?;
            info!(from = id, to = new_id, "committed page move");
            Ok(())
        })
    }

    fn delete(&self, id: &str) -> Result<bool> {
        let path = self.relative(id)?;
        self.lock.with(|| {
            if !self.inner.exists(id) {
                return Ok(false);
            }
            self.vcs.remove(&path)?;
            self.vcs.commit(DELETE_MESSAGE, None)?;
            info!(id, "committed page deletion");
            Ok(true)
        })
    }

    fn index_filtered(&self, filter: &dyn Fn(&Page) -> bool) -> Result<Vec<Page>> {
        self.inner.index_filtered(filter)
    }

    fn search(&self, term: &str, ignore_case: bool) -> Result<Vec<Page>> {
        let output = match self.vcs.grep(term, ignore_case) {
            Ok(output) => output,
            Err(e) => {
                warn!(term, error = %e, "grep failed, falling back to linear search");
                return self.inner.search(term, ignore_case);
            }
        };

        let mut pages = Vec::new();
        for id in self.grep_identifiers(&output) {
            // The path may be outside the root's confinement or gone already.
            match self.inner.get(&id) {
                Ok(Some(page)) => pages.push(page),
                Ok(None) => {}
                Err(e) => warn!(id = %id, error = %e, "skipping grep result"),
            }
        }
        sort_by_title(&mut pages);
        Ok(pages)
    }
}

impl<V: VcsClient> History for LockedVersionedStore<V> {
    fn history(&self, id: &str, offset: usize, limit: usize) -> Vec<CommitRecord> {
        let path = match self.relative(id) {
            Ok(path) => path,
            Err(e) => {
                warn!(id, error = %e, "no history for unresolvable page");
                return Vec::new();
            }
        };
        let output = match self.vcs.log(Some(&path), LOG_FORMAT) {
            Ok(output) => output,
            Err(e) => {
                warn!(id, error = %e, "history lookup failed");
                return Vec::new();
            }
        };

        output
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(CommitRecord::from_log_line)
            .skip(offset)
            .take(limit.saturating_sub(offset))
            .collect()
    }

    fn diff(&self, commit: &str) -> Result<CommitRecord> {
        if !is_commit_hash(commit) {
            return Err(WikiError::NotFound(commit.to_string()));
        }
        let format = format!("{}%x00", LOG_FORMAT);
        let output = self.vcs.show(commit, &format)?;
        CommitRecord::from_show_output(&output)
            .ok_or_else(|| WikiError::vcs("show", format!("unexpected output for {}", commit)))
    }
}
