//! # Version Control Client
//!
//! The versioned store does not implement history itself; it drives an
//! external version control tool through the [`VcsClient`] trait and only owns
//! the parsing of the tool's text output.
//!
//! ## Log Format
//!
//! History is requested with [`LOG_FORMAT`] (`%h%x00%at%x00%an`): abbreviated
//! hash, unix timestamp and author name separated by NUL bytes, one commit per
//! line. `show` uses the same fields followed by one more NUL and the patch.
//!
//! ## Implementations
//!
//! - [`GitCli`]: runs the `git` binary inside the content root.
//! - Tests use fakes that apply `mv`/`rm` to the working tree and record calls.

use crate::error::{Result, WikiError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

pub const LOG_FORMAT: &str = "%h%x00%at%x00%an";

const FIELD_SEPARATOR: char = '\0';

/// Operations the versioned store needs from a version control tool.
///
/// Paths are relative to the repository root and use `/` separators.
pub trait VcsClient: Send + Sync {
    fn add(&self, path: &str) -> Result<()>;

    fn commit(&self, message: &str, author: Option<&str>) -> Result<()>;

    /// Whether the index holds changes for `path` that are not yet committed.
    fn has_staged_changes(&self, path: &str) -> Result<bool>;

    fn mv(&self, from: &str, to: &str) -> Result<()>;

    fn remove(&self, path: &str) -> Result<()>;

    /// Log text for `path` (whole repository when `None`) in `format`.
    fn log(&self, path: Option<&str>, format: &str) -> Result<String>;

    fn show(&self, commit: &str, format: &str) -> Result<String>;

    /// NUL-terminated paths of the files with a matching line, unquoted.
    /// No match is an empty string, not an error.
    fn grep(&self, term: &str, ignore_case: bool) -> Result<String>;
}

/// One entry of a file's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitRecord {
    pub hash: String,
    pub timestamp: DateTime<Utc>,
    pub author: String,
    /// Patch text, only present for [`CommitRecord::from_show_output`].
    pub data: Option<String>,
}

impl CommitRecord {
    /// Parse one line of `log --format=LOG_FORMAT` output.
    pub fn from_log_line(line: &str) -> Option<Self> {
        let mut fields = line.split(FIELD_SEPARATOR);
        let hash = fields.next()?.trim();
        let timestamp = parse_timestamp(fields.next()?)?;
        let author = fields.next()?;
        if hash.is_empty() {
            return None;
        }
        Some(Self {
            hash: hash.to_string(),
            timestamp,
            author: author.to_string(),
            data: None,
        })
    }

    /// Parse `show --pretty=format:LOG_FORMAT%x00` output.
    pub fn from_show_output(output: &str) -> Option<Self> {
        let mut fields = output.splitn(4, FIELD_SEPARATOR);
        let hash = fields.next()?.trim();
        let timestamp = parse_timestamp(fields.next()?)?;
        let author = fields.next()?;
        let data = fields.next().unwrap_or("").trim();
        if hash.is_empty() {
            return None;
        }
        Some(Self {
            hash: hash.to_string(),
            timestamp,
            author: author.to_string(),
            data: Some(data.to_string()),
        })
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let seconds: i64 = raw.trim().parse().ok()?;
    DateTime::from_timestamp(seconds, 0)
}

/// Abbreviated or full commit hashes only; anything else could be read as an
/// option by the tool.
pub fn is_commit_hash(candidate: &str) -> bool {
    (4..=64).contains(&candidate.len()) && candidate.chars().all(|c| c.is_ascii_hexdigit())
}

/// [`VcsClient`] over the `git` command line.
#[derive(Debug, Clone)]
pub struct GitCli {
    workdir: PathBuf,
    program: PathBuf,
}

impl GitCli {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
            program: PathBuf::from("git"),
        }
    }

    /// Use a specific git binary instead of the one on `PATH`.
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Open an existing repository, failing if `workdir` is not inside one.
    pub fn open(workdir: impl Into<PathBuf>) -> Result<Self> {
        let git = Self::new(workdir);
        git.run(&["rev-parse", "--git-dir"])?;
        Ok(git)
    }

    /// Create a repository in `workdir` (harmless if one exists).
    pub fn init(workdir: impl Into<PathBuf>) -> Result<Self> {
        let git = Self::new(workdir);
        std::fs::create_dir_all(&git.workdir)?;
        git.run(&["init", "--quiet"])?;
        Ok(git)
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    fn command_line(args: &[&str]) -> String {
        format!("git {}", args.join(" "))
    }

    fn output(&self, args: &[&str]) -> Result<std::process::Output> {
        debug!(command = %Self::command_line(args), "running version control command");
        Command::new(&self.program)
            .args(args)
            .current_dir(&self.workdir)
            .output()
            .map_err(|e| WikiError::vcs(Self::command_line(args), e.to_string()))
    }

    fn run(&self, args: &[&str]) -> Result<String> {
        let output = self.output(args)?;
        if !output.status.success() {
            return Err(failure(args, &output));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

fn failure(args: &[&str], output: &std::process::Output) -> WikiError {
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    let message = if stderr.is_empty() {
        format!("exited with {}", output.status)
    } else {
        stderr
    };
    WikiError::vcs(GitCli::command_line(args), message)
}

impl VcsClient for GitCli {
    fn add(&self, path: &str) -> Result<()> {
        self.run(&["add", "--", path]).map(drop)
    }

    fn commit(&self, message: &str, author: Option<&str>) -> Result<()> {
        let mut args = vec!["commit", "--quiet", "-m", message];
        if let Some(author) = author {
            args.push("--author");
            args.push(author);
        }
        self.run(&args).map(drop)
    }

    fn has_staged_changes(&self, path: &str) -> Result<bool> {
        let args = ["diff", "--cached", "--quiet", "--", path];
        let output = self.output(&args)?;
        match output.status.code() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(failure(&args, &output)),
        }
    }

    fn mv(&self, from: &str, to: &str) -> Result<()> {
        self.run(&["mv", "--", from, to]).map(drop)
    }

    fn remove(&self, path: &str) -> Result<()> {
        self.run(&["rm", "--quiet", "--", path]).map(drop)
    }

    fn log(&self, path: Option<&str>, format: &str) -> Result<String> {
        let format_arg = format!("--format={}", format);
        let mut args = vec!["log", format_arg.as_str()];
        if let Some(path) = path {
            args.push("--");
            args.push(path);
        }
        self.run(&args)
    }

    fn show(&self, commit: &str, format: &str) -> Result<String> {
        if !is_commit_hash(commit) {
            return Err(WikiError::vcs(
                "git show",
                format!("not a commit hash: {:?}", commit),
            ));
        }
        let pretty = format!("--pretty=format:{}", format);
        self.run(&["show", commit, "-M9", pretty.as_str()])
    }

    fn grep(&self, term: &str, ignore_case: bool) -> Result<String> {
        let mut args = vec!["grep", "-z", "-l", "-G"];
        if ignore_case {
            args.push("-i");
        }
        args.push("-e");
        args.push(term);

        let output = self.output(&args)?;
        if output.status.success() {
            return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
        }
        // Exit code 1 with nothing on stderr means "no matches".
        if output.status.code() == Some(1) && output.stderr.is_empty() {
            return Ok(String::new());
        }
        Err(failure(&args, &output))
    }
}
