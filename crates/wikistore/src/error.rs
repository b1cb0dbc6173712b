use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WikiError {
    /// A page or account that was asked for does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The identifier resolves to a path outside of the content root.
    #[error("Possible write attempt outside content directory: {identifier}")]
    PathEscape { identifier: String, path: PathBuf },

    /// Strict decoding met a header line without a `key: value` shape.
    #[error("Malformed record header at line {line}: {content:?}")]
    MalformedRecord { line: usize, content: String },

    #[error("Timed out after {waited:?} waiting for lock {}", path.display())]
    LockTimeout { path: PathBuf, waited: Duration },

    #[error("Unknown authentication method: {0}")]
    UnknownAuthMethod(String),

    #[error("Version control command `{command}` failed: {message}")]
    VcsCommand { command: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),
}

impl WikiError {
    pub(crate) fn vcs(command: impl Into<String>, message: impl Into<String>) -> Self {
        WikiError::VcsCommand {
            command: command.into(),
            message: message.into(),
        }
    }

    /// Whether this failure is worth retrying as-is.
    pub fn is_transient(&self) -> bool {
        matches!(self, WikiError::LockTimeout { .. })
    }
}

pub type Result<T> = std::result::Result<T, WikiError>;
