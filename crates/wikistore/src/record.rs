//! # Record Format
//!
//! Every page is persisted as a single UTF-8 text file:
//!
//! ```text
//! title: Today            <-- header: one `key: value` per line, keys may repeat
//! tags: journal, work
//!                         <-- exactly one blank line
//! Hello                   <-- body, `\n` line endings
//! ```
//!
//! A record without metadata still starts with the blank separator line.
//!
//! ## Decoding Modes
//!
//! Files are often edited by hand, so the default [`decode`] is tolerant:
//! header lines that are not `key: value` are dropped (with a warning), and a
//! file without any blank separator is read as body only. [`decode_strict`]
//! rejects both with [`WikiError::MalformedRecord`].
//!
//! ## Multi-valued Keys
//!
//! Values are stored as lists. A key may repeat, and an indented line right
//! after a header line continues the previous key with another value. Both
//! forms decode to the same list, and [`encode`] always writes the repeated
//! key form.

use crate::error::{Result, WikiError};
use tracing::warn;

/// Ordered mapping of metadata key to its values.
///
/// Key insertion order is kept so a record written back looks like the one
/// that was read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    entries: Vec<(String, Vec<String>)>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, values)| values.as_slice())
    }

    /// First value for `key`.
    pub fn first(&self, key: &str) -> Option<&str> {
        self.get(key)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Replace all values of `key`, keeping its position if it exists.
    pub fn set(&mut self, key: impl Into<String>, values: Vec<String>) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = values,
            None => self.entries.push((key, values)),
        }
    }

    /// Append one value to `key`, creating the key at the end if needed.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => existing.push(value),
            None => self.entries.push((key, vec![value])),
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<Vec<String>> {
        let pos = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(pos).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(k, values)| (k.as_str(), values.as_slice()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Vec<String>)> for Metadata {
    fn from_iter<I: IntoIterator<Item = (K, Vec<String>)>>(iter: I) -> Self {
        let mut metadata = Metadata::new();
        for (key, values) in iter {
            metadata.set(key, values);
        }
        metadata
    }
}

/// The persisted unit: metadata header plus raw body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageRecord {
    pub metadata: Metadata,
    pub body: String,
}

impl PageRecord {
    pub fn new(metadata: Metadata, body: impl Into<String>) -> Self {
        Self {
            metadata,
            body: normalize_newlines(&body.into()),
        }
    }
}

pub fn normalize_newlines(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// Split raw text at the first blank line into (header, body).
///
/// Returns `None` when the text has no blank separator line at all.
pub fn split_header(raw: &str) -> Option<(&str, &str)> {
    if let Some(body) = raw.strip_prefix('\n') {
        return Some(("", body));
    }
    raw.split_once("\n\n")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Tolerant,
    Strict,
}

/// Decode a record, dropping malformed header lines.
pub fn decode(raw: &str) -> PageRecord {
    match decode_with(raw, Mode::Tolerant) {
        Ok(record) => record,
        // Tolerant decoding never reports header errors.
        Err(_) => PageRecord::new(Metadata::new(), raw),
    }
}

/// Decode a record, failing on any header line that is not `key: value`.
pub fn decode_strict(raw: &str) -> Result<PageRecord> {
    decode_with(raw, Mode::Strict)
}

fn decode_with(raw: &str, mode: Mode) -> Result<PageRecord> {
    let text = normalize_newlines(raw);

    let (header, body) = match split_header(&text) {
        Some(parts) => parts,
        None if mode == Mode::Strict => {
            return Err(WikiError::MalformedRecord {
                line: 1,
                content: "missing blank line after metadata".to_string(),
            });
        }
        None => {
            warn!("record has no metadata separator, reading it as body only");
            return Ok(PageRecord::new(Metadata::new(), text));
        }
    };

    let metadata = parse_header(header, mode)?;
    Ok(PageRecord {
        metadata,
        body: body.to_string(),
    })
}

fn parse_header(header: &str, mode: Mode) -> Result<Metadata> {
    let mut metadata = Metadata::new();
    let mut last_key: Option<String> = None;

    for (index, line) in header.lines().enumerate() {
        let continuation = line.starts_with("    ") || line.starts_with('\t');
        if continuation {
            if let Some(key) = &last_key {
                metadata.push(key.clone(), line.trim());
                continue;
            }
        }

        match line.split_once(':') {
            Some((key, value)) if !key.trim().is_empty() => {
                let key = key.trim().to_string();
                metadata.push(key.clone(), value.trim());
                last_key = Some(key);
            }
            _ => {
                if mode == Mode::Strict {
                    return Err(WikiError::MalformedRecord {
                        line: index + 1,
                        content: line.to_string(),
                    });
                }
                warn!(line = index + 1, content = line, "dropping malformed metadata line");
                last_key = None;
            }
        }
    }

    Ok(metadata)
}

/// Encode a record: header lines, one blank line, then the body.
pub fn encode(record: &PageRecord) -> String {
    let mut out = String::new();
    for (key, values) in record.metadata.iter() {
        for value in values {
            out.push_str(key);
            out.push_str(": ");
            out.push_str(value);
            out.push('\n');
        }
    }
    out.push('\n');
    out.push_str(&normalize_newlines(&record.body));
    out
}
