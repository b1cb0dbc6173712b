//! # Storage Layer
//!
//! Pages live as record files under a content root (see [`crate::record`] for
//! the format and [`crate::path`] for the identifier ↔ path mapping). The
//! [`PageStore`] trait is the one contract callers program against; two
//! variants implement it:
//!
//! - [`fs::ContentStore`]: plain filesystem backend.
//! - [`versioned::LockedVersionedStore`]: decorates a `ContentStore`, taking
//!   the content-root lock around every mutation and committing each change
//!   through a [`crate::vcs::VcsClient`].
//!
//! History is a separate capability ([`History`]) that only the versioned
//! variant implements, so callers ask for it explicitly instead of getting
//! stub results from the plain store.
//!
//! ## Consistency
//!
//! - **Writes** are atomic replaces: a reader sees the old file or the new
//!   one, never a mix.
//! - **Reads** on the plain backend take no lock. A single file is always read
//!   whole, but an [`PageStore::index`] walk running next to writers may see
//!   some pages before and some after a change.
//! - **No caching**: every call reads from disk. Callers keeping their own
//!   cache must drop it on save, move and delete.
//!
//! ## Storage Layout
//!
//! ```text
//! content/
//! ├── wiki.toml          # Optional configuration
//! ├── users.json         # Account table (see accounts.rs)
//! ├── users.lock         # Account-table lock
//! ├── wikigit.flock      # Content-root lock (versioned backend)
//! ├── home.md
//! └── team/
//!     └── roster.md      # identifier `team/roster`
//! ```

use crate::error::{Result, WikiError};
use crate::markup::MarkupProcessor;
use crate::page::{sort_by_title, Page};
use crate::path::PathResolver;
use crate::record::PageRecord;
use crate::vcs::CommitRecord;
use std::collections::BTreeMap;

pub mod fs;
pub mod versioned;

/// Page fields the linear search can look at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchField {
    Title,
    Tags,
    Body,
}

impl SearchField {
    pub const ALL: [SearchField; 3] = [SearchField::Title, SearchField::Tags, SearchField::Body];
}

/// Abstract interface for page storage.
///
/// `load`, `save`, `move_page` and `delete` are the operations a decorating
/// store wraps; everything past them is derived from the required methods.
pub trait PageStore: Send + Sync {
    fn resolver(&self) -> &PathResolver;

    fn processor(&self) -> &MarkupProcessor;

    fn exists(&self, id: &str) -> bool;

    /// Raw record text. `NotFound` if there is no record.
    fn load(&self, id: &str) -> Result<String>;

    /// Create or replace the record for `id`. `author` is recorded by stores
    /// that keep history and ignored otherwise.
    fn save(&self, id: &str, record: &PageRecord, author: Option<&str>) -> Result<()>;

    fn move_page(&self, id: &str, new_id: &str) -> Result<()>;

    /// Returns `false` if there was nothing to delete.
    fn delete(&self, id: &str) -> Result<bool>;

    /// All pages accepted by `filter`, sorted by case-insensitive title.
    /// Reads every record under the root on each call.
    fn index_filtered(&self, filter: &dyn Fn(&Page) -> bool) -> Result<Vec<Page>>;

    /// Pages whose title, tags or body match `term`.
    fn search(&self, term: &str, ignore_case: bool) -> Result<Vec<Page>>;

    fn index(&self) -> Result<Vec<Page>> {
        self.index_filtered(&|_| true)
    }

    fn get(&self, id: &str) -> Result<Option<Page>> {
        if !self.exists(id) {
            return Ok(None);
        }
        match self.load(id) {
            Ok(raw) => Ok(Some(Page::from_raw(id, &raw, self.processor()))),
            // Deleted between the check and the read.
            Err(WikiError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn get_or_not_found(&self, id: &str) -> Result<Page> {
        self.get(id)?
            .ok_or_else(|| WikiError::NotFound(id.to_string()))
    }

    /// A blank page to start editing `id`, or `None` if it already exists.
    fn get_bare(&self, id: &str) -> Option<Page> {
        if self.exists(id) {
            return None;
        }
        Some(Page::new(id))
    }

    fn save_page(&self, page: &Page, author: Option<&str>) -> Result<()> {
        self.save(&page.id, &page.to_record(), author)
    }

    /// Pages grouped by tag. Tags are trimmed; empty ones are skipped.
    fn tags_index(&self) -> Result<BTreeMap<String, Vec<Page>>> {
        let mut tags: BTreeMap<String, Vec<Page>> = BTreeMap::new();
        for page in self.index()? {
            for tag in page.tag_list() {
                tags.entry(tag.to_string()).or_default().push(page.clone());
            }
        }
        Ok(tags)
    }

    fn index_by_tag(&self, tag: &str) -> Result<Vec<Page>> {
        let tag = tag.trim();
        let mut pages = self.index_filtered(&|page| page.has_tag(tag))?;
        sort_by_title(&mut pages);
        Ok(pages)
    }

    fn get_by_title(&self, title: &str) -> Result<Option<Page>> {
        Ok(self
            .index_filtered(&|page| page.title() == title)?
            .into_iter()
            .next())
    }
}

/// Per-file history, offered by stores backed by version control.
pub trait History {
    /// Commits touching `id`, newest first, restricted to positions
    /// `offset..limit`. Empty when the file has no history or the tool fails.
    fn history(&self, id: &str, offset: usize, limit: usize) -> Vec<CommitRecord>;

    /// One commit with its patch text.
    fn diff(&self, commit: &str) -> Result<CommitRecord>;
}

pub const DEFAULT_HISTORY_LIMIT: usize = 5;
