use crate::error::{Result, WikiError};
use crate::record::{Metadata, PageRecord};
use crate::store::fs::ContentStore;
use crate::vcs::VcsClient;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use tempfile::TempDir;

/// A [`ContentStore`] rooted in a fresh temporary directory, removed on drop.
pub struct TestEnv {
    pub _temp_dir: TempDir,
    pub store: ContentStore,
    pub root: PathBuf,
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl TestEnv {
    pub fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("failed to create temp dir");
        let root = temp_dir.path().to_path_buf();
        let store = ContentStore::new(root.clone());
        Self {
            _temp_dir: temp_dir,
            store,
            root,
        }
    }
}

/// Build a record from single-valued `(key, value)` pairs.
pub fn record(pairs: &[(&str, &str)], body: &str) -> PageRecord {
    let mut metadata = Metadata::new();
    for (key, value) in pairs {
        metadata.push(*key, *value);
    }
    PageRecord::new(metadata, body)
}

#[derive(Debug, Clone)]
pub enum GrepBehavior {
    Fail,
    Output(String),
}

/// Fake version control client.
///
/// Applies `mv`/`rm` to the working tree like the real tool would, records
/// every call except the staged-changes check, and answers `log`/`show`/`grep`
/// with canned output.
pub struct RecordingVcs {
    workdir: PathBuf,
    calls: Mutex<Vec<String>>,
    log_output: Mutex<Option<String>>,
    show_output: Mutex<Option<String>>,
    grep: Mutex<GrepBehavior>,
    fail_commit: Mutex<bool>,
    staged: Mutex<bool>,
}

impl RecordingVcs {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
            calls: Mutex::new(Vec::new()),
            log_output: Mutex::new(None),
            show_output: Mutex::new(None),
            grep: Mutex::new(GrepBehavior::Fail),
            fail_commit: Mutex::new(false),
            staged: Mutex::new(true),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn set_log_output(&self, output: Option<&str>) {
        *self.log_output.lock().unwrap() = output.map(str::to_string);
    }

    pub fn set_show_output(&self, output: Option<&str>) {
        *self.show_output.lock().unwrap() = output.map(str::to_string);
    }

    pub fn set_grep(&self, behavior: GrepBehavior) {
        *self.grep.lock().unwrap() = behavior;
    }

    pub fn set_fail_commit(&self, fail: bool) {
        *self.fail_commit.lock().unwrap() = fail;
    }

    /// What `has_staged_changes` answers; `true` until changed.
    pub fn set_staged(&self, staged: bool) {
        *self.staged.lock().unwrap() = staged;
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

impl VcsClient for RecordingVcs {
    fn add(&self, path: &str) -> Result<()> {
        self.record(format!("add {}", path));
        Ok(())
    }

    fn commit(&self, message: &str, author: Option<&str>) -> Result<()> {
        self.record(format!("commit {} by {}", message, author.unwrap_or("-")));
        if *self.fail_commit.lock().unwrap() {
            return Err(WikiError::vcs("commit", "simulated failure"));
        }
        Ok(())
    }

    fn has_staged_changes(&self, _path: &str) -> Result<bool> {
        Ok(*self.staged.lock().unwrap())
    }

    fn mv(&self, from: &str, to: &str) -> Result<()> {
        self.record(format!("mv {} {}", from, to));
        fs::rename(self.workdir.join(from), self.workdir.join(to))?;
        Ok(())
    }

    fn remove(&self, path: &str) -> Result<()> {
        self.record(format!("rm {}", path));
        fs::remove_file(self.workdir.join(path))?;
        Ok(())
    }

    fn log(&self, path: Option<&str>, _format: &str) -> Result<String> {
        self.record(format!("log {}", path.unwrap_or("-")));
        self.log_output
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| WikiError::vcs("log", "no history"))
    }

    fn show(&self, commit: &str, _format: &str) -> Result<String> {
        self.record(format!("show {}", commit));
        self.show_output
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| WikiError::vcs("show", "unknown revision"))
    }

    fn grep(&self, term: &str, ignore_case: bool) -> Result<String> {
        self.record(format!("grep {} {}", term, ignore_case));
        match &*self.grep.lock().unwrap() {
            GrepBehavior::Fail => Err(WikiError::vcs("grep", "simulated failure")),
            GrepBehavior::Output(output) => Ok(output.clone()),
        }
    }
}
