#![allow(deprecated)]

use assert_cmd::cargo::cargo_bin;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn wiki_cmd(content: &TempDir) -> Command {
    let mut cmd = Command::new(cargo_bin("wiki"));
    cmd.env_remove("WIKI_LOG")
        .env_remove("WIKI_USE_GIT")
        .env_remove("WIKI_FILE_EXT")
        .env("WIKI_CONTENT_DIR", content.path());
    cmd
}

#[test]
fn test_save_show_list_workflow() {
    let content = TempDir::new().unwrap();

    wiki_cmd(&content)
        .args(["save", "Notes/Today", "--title", "Today", "--tags", "journal, work"])
        .write_stdin("Hello, see [[home|the start]]")
        .assert()
        .success()
        .stdout(predicate::str::contains("Saved notes/today"));

    assert_eq!(
        fs::read_to_string(content.path().join("notes/today.md")).unwrap(),
        "title: Today\ntags: journal, work\n\nHello, see [[home|the start]]"
    );

    wiki_cmd(&content)
        .args(["show", "notes/today"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Today"))
        .stdout(predicate::str::contains("tags: journal, work"));

    wiki_cmd(&content)
        .args(["show", "notes/today", "--html"])
        .assert()
        .success()
        .stdout(predicate::str::contains("<a href='/home/'>the start</a>"));

    wiki_cmd(&content)
        .args(["list", "--tag", "work"])
        .assert()
        .success()
        .stdout(predicate::str::contains("notes/today\tToday"));

    wiki_cmd(&content)
        .arg("tags")
        .assert()
        .success()
        .stdout(predicate::str::contains("journal\t1"));
}

#[test]
fn test_resave_keeps_metadata() {
    let content = TempDir::new().unwrap();
    wiki_cmd(&content)
        .args(["save", "home", "--title", "Welcome"])
        .write_stdin("first")
        .assert()
        .success();
    wiki_cmd(&content)
        .args(["save", "home"])
        .write_stdin("second")
        .assert()
        .success();

    assert_eq!(
        fs::read_to_string(content.path().join("home.md")).unwrap(),
        "title: Welcome\n\nsecond"
    );
}

#[test]
fn test_search_case_handling() {
    let content = TempDir::new().unwrap();
    wiki_cmd(&content)
        .args(["save", "rust"])
        .write_stdin("All about Ownership")
        .assert()
        .success();

    wiki_cmd(&content)
        .args(["search", "ownership"])
        .assert()
        .success()
        .stdout(predicate::str::contains("rust\trust"));

    wiki_cmd(&content)
        .args(["search", "ownership", "--case-sensitive"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No pages found."));
}

#[test]
fn test_move_and_delete() {
    let content = TempDir::new().unwrap();
    wiki_cmd(&content)
        .args(["save", "draft"])
        .write_stdin("x")
        .assert()
        .success();

    wiki_cmd(&content)
        .args(["move", "draft", "archive/draft"])
        .assert()
        .success();
    assert!(content.path().join("archive/draft.md").is_file());

    wiki_cmd(&content)
        .args(["delete", "archive/draft"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted archive/draft"));

    wiki_cmd(&content)
        .args(["delete", "archive/draft"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not found"));
}

#[test]
fn test_escaping_identifier_fails() {
    let content = TempDir::new().unwrap();
    wiki_cmd(&content)
        .args(["save", "../outside"])
        .write_stdin("x")
        .assert()
        .failure()
        .stderr(predicate::str::contains("outside content directory"));
    assert!(!content.path().parent().unwrap().join("outside.md").exists());
}

#[test]
fn test_history_requires_versioned_wiki() {
    let content = TempDir::new().unwrap();
    wiki_cmd(&content)
        .args(["history", "home"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("versioned"));
}

#[test]
fn test_user_lifecycle() {
    let content = TempDir::new().unwrap();

    wiki_cmd(&content)
        .args(["user", "add", "alice", "s3cr3t", "--method", "hash", "--role", "admin"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added user alice (hash)"));

    wiki_cmd(&content)
        .args(["user", "add", "alice", "other"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    wiki_cmd(&content)
        .args(["user", "check", "alice", "s3cr3t"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Password ok"));

    wiki_cmd(&content)
        .args(["user", "check", "alice", "wrong"])
        .assert()
        .failure();

    let table = fs::read_to_string(content.path().join("users.json")).unwrap();
    assert!(!table.contains("s3cr3t"));

    wiki_cmd(&content)
        .args(["user", "delete", "alice"])
        .assert()
        .success();
    wiki_cmd(&content)
        .args(["user", "check", "alice", "s3cr3t"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not found"));
}
