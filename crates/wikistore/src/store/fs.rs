use super::{PageStore, SearchField};
use crate::atomic::write_atomic;
use crate::error::{Result, WikiError};
use crate::markup::MarkupProcessor;
use crate::page::{sort_by_title, Page};
use crate::path::PathResolver;
use crate::record::{encode, PageRecord};
use regex::{Regex, RegexBuilder};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Plain filesystem page store.
pub struct ContentStore {
    resolver: PathResolver,
    processor: MarkupProcessor,
}

impl ContentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            resolver: PathResolver::new(root),
            processor: MarkupProcessor::default(),
        }
    }

    pub fn with_file_ext(mut self, ext: &str) -> Self {
        self.resolver = self.resolver.with_file_ext(ext);
        self
    }

    pub fn with_processor(mut self, processor: MarkupProcessor) -> Self {
        self.processor = processor;
        self
    }

    pub fn root(&self) -> &Path {
        self.resolver.root()
    }

    /// Confined record path for `id`.
    pub fn path(&self, id: &str) -> Result<PathBuf> {
        self.resolver.resolve_confined(id)
    }

    fn ensure_dir(&self, path: &Path) -> Result<()> {
        if !path.exists() {
            fs::create_dir_all(path).map_err(WikiError::Io)?;
        }
        Ok(())
    }

    /// Linear search over the requested fields. The first matching field
    /// settles a page, so each page appears at most once.
    pub fn search_in(
        &self,
        term: &str,
        ignore_case: bool,
        fields: &[SearchField],
    ) -> Result<Vec<Page>> {
        let pattern = search_pattern(term, ignore_case);
        self.index_filtered(&|page| {
            fields.iter().any(|field| match field {
                SearchField::Title => pattern.is_match(page.title()),
                SearchField::Tags => pattern.is_match(page.tags()),
                SearchField::Body => pattern.is_match(&page.body),
            })
        })
    }

    fn collect_record_files(&self, dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        for entry in entries {
            let entry = entry?;
            let name = entry.file_name();
            // Skips .git, temp files from atomic writes, editor swap files.
            if name.to_string_lossy().starts_with('.') {
                continue;
            }
            let path = entry.path();
            let file_type = entry.file_type()?;
            // A link can point anywhere, including outside the root.
            if file_type.is_symlink() {
                debug!(path = %path.display(), "skipping symbolic link");
                continue;
            }
            if file_type.is_dir() {
                self.collect_record_files(&path, out)?;
            } else if name
                .to_string_lossy()
                .ends_with(self.resolver.file_ext())
            {
                out.push(path);
            }
        }
        Ok(())
    }
}

/// Compile `term` as a pattern, falling back to a literal match when it is
/// not a valid one.
pub(crate) fn search_pattern(term: &str, ignore_case: bool) -> Regex {
    let build = |pattern: &str| {
        RegexBuilder::new(pattern)
            .case_insensitive(ignore_case)
            .build()
    };
    match build(term) {
        Ok(regex) => regex,
        Err(_) => {
            debug!(term, "search term is not a valid pattern, matching literally");
            build(&regex::escape(term)).unwrap_or_else(|_| never_matches())
        }
    }
}

/// Error for a move onto a page that is already there.
pub(crate) fn already_exists(id: &str) -> WikiError {
    WikiError::Io(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("page already exists: {}", id),
    ))
}

fn never_matches() -> Regex {
    // An escaped literal only fails to build past the size limit.
    Regex::new(r"\b\B").expect("contradictory assertions are a valid pattern")
}

impl PageStore for ContentStore {
    fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    fn processor(&self) -> &MarkupProcessor {
        &self.processor
    }

    fn exists(&self, id: &str) -> bool {
        self.path(id).map(|path| path.is_file()).unwrap_or(false)
    }

    fn load(&self, id: &str) -> Result<String> {
        let path = self.path(id)?;
        debug!(id, path = %path.display(), "loading page");
        match fs::read_to_string(&path) {
            Ok(raw) => Ok(raw),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(WikiError::NotFound(id.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, id: &str, record: &PageRecord, _author: Option<&str>) -> Result<()> {
        let path = self.path(id)?;
        debug!(id, path = %path.display(), "saving page");
        write_atomic(&path, encode(record).as_bytes())
    }

    fn move_page(&self, id: &str, new_id: &str) -> Result<()> {
        let source = self.path(id)?;
        let target = self.path(new_id)?;
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
            self.ensure_dir(folder)?;
        }
        debug!(from = id, to = new_id, "moving page");
        fs::rename(&source, &target)?;
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<bool> {
        let path = self.path(id)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(id, "deleted page");
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn index_filtered(&self, filter: &dyn Fn(&Page) -> bool) -> Result<Vec<Page>> {
        let mut files = Vec::new();
        self.collect_record_files(self.resolver.root(), &mut files)?;

        let mut pages = Vec::with_capacity(files.len());
        for path in files {
            let Some(id) = self.resolver.identifier_for(&path) else {
                continue;
            };
            let raw = match fs::read_to_string(&path) {
                Ok(raw) => raw,
                Err(e) => {
                    // Deleted mid-walk, or not UTF-8.
                    warn!(path = %path.display(), error = %e, "skipping unreadable page");
                    continue;
                }
            };
            let page = Page::from_raw(id, &raw, &self.processor);
            if filter(&page) {
                pages.push(page);
            }
        }

        sort_by_title(&mut pages);
        Ok(pages)
    }

    fn search(&self, term: &str, ignore_case: bool) -> Result<Vec<Page>> {
        self.search_in(term, ignore_case, &SearchField::ALL)
    }
}
