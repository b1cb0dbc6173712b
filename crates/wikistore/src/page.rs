//! # Pages
//!
//! A [`Page`] is the in-memory view of a record: identifier, parsed metadata,
//! raw body and the rendered hypertext. Pages are built fresh on every load
//! and never cached by the store.
//!
//! ## Well-known Metadata
//!
//! | Key | Accessor | Fallback |
//! |-----|----------|----------|
//! | `title` | [`Page::title`] | the identifier |
//! | `tags` | [`Page::tags`] / [`Page::tag_list`] | empty |
//!
//! Typed accessors read the first value of a key. Every other key is reachable
//! through [`Page::get_metadata`], which returns all values.

use crate::markup::MarkupProcessor;
use crate::record::{Metadata, PageRecord};

pub const TITLE_KEY: &str = "title";
pub const TAGS_KEY: &str = "tags";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub id: String,
    pub metadata: Metadata,
    pub body: String,
    pub html: String,
}

impl Page {
    /// An empty page for an identifier that has no record yet.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            metadata: Metadata::new(),
            body: String::new(),
            html: String::new(),
        }
    }

    /// Build a page from the raw text of its record.
    pub fn from_raw(id: impl Into<String>, raw: &str, processor: &MarkupProcessor) -> Self {
        let rendered = processor.process(raw);
        Self {
            id: id.into(),
            metadata: rendered.metadata,
            body: rendered.body,
            html: rendered.html,
        }
    }

    pub fn title(&self) -> &str {
        self.metadata.first(TITLE_KEY).unwrap_or(&self.id)
    }

    /// Raw comma separated tags, `""` when absent.
    pub fn tags(&self) -> &str {
        self.metadata.first(TAGS_KEY).unwrap_or("")
    }

    /// Trimmed, non-empty tags.
    pub fn tag_list(&self) -> Vec<&str> {
        split_tags(self.tags())
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tag_list().contains(&tag)
    }

    pub fn get_metadata(&self, key: &str) -> Option<&[String]> {
        self.metadata.get(key)
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.metadata.set(TITLE_KEY, vec![title.into()]);
    }

    pub fn set_tags(&mut self, tags: impl Into<String>) {
        self.metadata.set(TAGS_KEY, vec![tags.into()]);
    }

    /// Replace the body. `html` is refreshed on the next load or
    /// [`Page::render`].
    pub fn set_body(&mut self, body: impl Into<String>) {
        self.body = crate::record::normalize_newlines(&body.into());
    }

    pub fn render(&mut self, processor: &MarkupProcessor) {
        self.html = processor.render_body(&self.body);
    }

    pub fn to_record(&self) -> PageRecord {
        PageRecord::new(self.metadata.clone(), self.body.clone())
    }
}

pub fn split_tags(raw: &str) -> Vec<&str> {
    raw.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .collect()
}

/// Case-insensitive title ordering used by listings.
pub fn sort_by_title(pages: &mut [Page]) {
    pages.sort_by_cached_key(|page| page.title().to_lowercase());
}
