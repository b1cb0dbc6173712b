use std::fs;
use tempfile::TempDir;
use wikistore::accounts::{AccountStore, AuthMethod};
use wikistore::init::initialize;
use wikistore::lock::NamedLock;
use wikistore::WikiError;

#[test]
fn test_alice_hash_scenario_through_context() {
    let dir = TempDir::new().unwrap();
    let ctx = initialize(dir.path()).unwrap();

    ctx.accounts
        .add_account("alice", "s3cr3t", true, vec![], Some(AuthMethod::Hash))
        .unwrap()
        .unwrap();

    // A second handle sees the persisted table.
    let accounts = AccountStore::new(dir.path());
    let alice = accounts.get_account("alice").unwrap().unwrap();
    assert!(accounts.check_password(&alice.record, "s3cr3t").unwrap());
    assert!(!accounts.check_password(&alice.record, "wrong").unwrap());

    let table: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("users.json")).unwrap())
            .unwrap();
    assert_eq!(table["alice"]["authentication_method"], "hash");
    assert!(table["alice"].get("password").is_none());
    assert_eq!(table["alice"]["hash"].as_str().unwrap().len(), 256);
}

#[test]
fn test_account_lock_is_independent_of_content_lock() {
    let dir = TempDir::new().unwrap();
    let content_lock = NamedLock::new(dir.path().join("wikigit.flock"));
    let _held = content_lock.acquire().unwrap();

    let accounts = AccountStore::new(dir.path());
    assert!(accounts
        .add_account("bob", "pw", true, vec![], None)
        .unwrap()
        .is_some());
}

#[test]
fn test_held_account_lock_times_out_writers_not_readers() {
    let dir = TempDir::new().unwrap();
    let accounts = AccountStore::new(dir.path()).with_lock(
        NamedLock::new(dir.path().join("users.lock"))
            .with_timeout(Some(std::time::Duration::from_millis(30))),
    );
    accounts.add_account("a", "pw", true, vec![], None).unwrap();

    let _held = NamedLock::new(dir.path().join("users.lock"))
        .acquire()
        .unwrap();
    let err = accounts.delete_account("a").unwrap_err();
    assert!(matches!(err, WikiError::LockTimeout { .. }));
    assert!(err.is_transient());
    assert!(accounts.get_account("a").unwrap().is_some());
}

#[test]
fn test_corrupt_table_is_an_error_not_empty() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("users.json"), "{ not json").unwrap();
    let accounts = AccountStore::new(dir.path());
    assert!(matches!(
        accounts.read(),
        Err(WikiError::Serialization(_))
    ));
    assert!(accounts
        .add_account("x", "pw", true, vec![], None)
        .is_err());
}
