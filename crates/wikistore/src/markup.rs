//! # Markup Processing
//!
//! Turning a record into hypertext happens in three steps:
//!
//! 1. **Split**: the metadata header is separated from the body ([`crate::record`]).
//! 2. **Render**: the body goes through a [`Renderer`]. The default is
//!    [`CommonMarkRenderer`] (pulldown-cmark with tables, strikethrough and
//!    footnotes); callers can plug in any converter.
//! 3. **Cross references**: `[[target]]` and `[[target|label]]` in the rendered
//!    output become links to the normalized identifier of `target`.
//!
//! Cross references are resolved *after* rendering. Anything between a
//! `<code ...>` tag and its `</code>` is skipped, so `[[...]]` inside inline
//! code or a code block stays literal text.

use crate::path::normalize_identifier;
use crate::record::{self, Metadata, PageRecord};
use once_cell::sync::Lazy;
use pulldown_cmark::{html, Options, Parser};
use regex::Regex;
use std::sync::Arc;

/// Converts markup text into hypertext.
pub trait Renderer: Send + Sync {
    fn render(&self, markup: &str) -> String;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CommonMarkRenderer;

impl Renderer for CommonMarkRenderer {
    fn render(&self, markup: &str) -> String {
        let options =
            Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_FOOTNOTES;
        let parser = Parser::new_ext(markup, options);
        let mut out = String::with_capacity(markup.len() * 3 / 2);
        html::push_html(&mut out, parser);
        out
    }
}

static CROSS_REFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[\[([^<|\]][^|\]]*?)\s*(?:\|\s*([^\]]+?)\s*)?\]\]")
        .expect("cross reference pattern is valid")
});

static CODE_ELEMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<code(?:\s[^>]*)?>.*?</code>").expect("code element pattern is valid")
});

/// Byte ranges of every `<code>` element, tags included.
fn code_ranges(hypertext: &str) -> Vec<std::ops::Range<usize>> {
    CODE_ELEMENT.find_iter(hypertext).map(|m| m.range()).collect()
}

/// Replace every `[[target]]` / `[[target|label]]` with a link built by `href`.
///
/// Single pass, left to right, non-overlapping; inserted links are never
/// scanned again.
pub fn resolve_cross_references_with<F>(hypertext: &str, href: F) -> String
where
    F: Fn(&str) -> String,
{
    let code = code_ranges(hypertext);
    let mut out = String::with_capacity(hypertext.len());
    let mut last = 0;

    for caps in CROSS_REFERENCE.captures_iter(hypertext) {
        let Some(whole) = caps.get(0) else { continue };
        if code
            .iter()
            .any(|r| r.start < whole.end() && whole.start() < r.end)
        {
            continue;
        }

        let raw_target = caps.get(1).map_or("", |m| m.as_str()).trim();
        let label = caps.get(2).map_or(raw_target, |m| m.as_str());
        let identifier = normalize_identifier(raw_target);

        out.push_str(&hypertext[last..whole.start()]);
        out.push_str("<a href='");
        out.push_str(&escape_attribute(&href(&identifier)));
        out.push_str("'>");
        out.push_str(label);
        out.push_str("</a>");
        last = whole.end();
    }

    out.push_str(&hypertext[last..]);
    out
}

/// [`resolve_cross_references_with`] using `/<identifier>/` links.
pub fn resolve_cross_references(hypertext: &str) -> String {
    resolve_cross_references_with(hypertext, |id| format!("/{}/", id))
}

fn escape_attribute(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '\'' => out.push_str("&#39;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
    out
}

/// Output of [`MarkupProcessor::process`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub html: String,
    pub body: String,
    pub metadata: Metadata,
}

/// Splits, renders and links raw page text.
#[derive(Clone)]
pub struct MarkupProcessor {
    renderer: Arc<dyn Renderer>,
    link_base: String,
}

impl Default for MarkupProcessor {
    fn default() -> Self {
        Self::new(CommonMarkRenderer)
    }
}

impl std::fmt::Debug for MarkupProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarkupProcessor")
            .field("link_base", &self.link_base)
            .finish_non_exhaustive()
    }
}

impl MarkupProcessor {
    pub fn new(renderer: impl Renderer + 'static) -> Self {
        Self {
            renderer: Arc::new(renderer),
            link_base: "/".to_string(),
        }
    }

    /// Prefix for cross reference links, `/` by default. A page `about` links
    /// to `<base>about/`.
    pub fn with_link_base(mut self, base: &str) -> Self {
        self.link_base = if base.ends_with('/') {
            base.to_string()
        } else {
            format!("{}/", base)
        };
        self
    }

    /// Header lines and body of raw page text.
    pub fn split_header<'a>(&self, raw: &'a str) -> (Vec<&'a str>, &'a str) {
        match record::split_header(raw) {
            Some((header, body)) => (header.lines().collect(), body),
            None => (Vec::new(), raw),
        }
    }

    pub fn render_body(&self, body: &str) -> String {
        let html = self.renderer.render(body);
        resolve_cross_references_with(&html, |id| format!("{}{}/", self.link_base, id))
    }

    pub fn render_record(&self, record: &PageRecord) -> String {
        self.render_body(&record.body)
    }

    pub fn process(&self, raw: &str) -> Rendered {
        let PageRecord { metadata, body } = record::decode(raw);
        let html = self.render_body(&body);
        Rendered {
            html,
            body,
            metadata,
        }
    }
}
