//! # Account Table
//!
//! Accounts live in one JSON document, `users.json`, mapping account name to
//! an [`AccountRecord`]:
//!
//! ```json
//! {
//!   "alice": {
//!     "active": true,
//!     "roles": ["editor"],
//!     "authentication_method": "hash",
//!     "hash": "<128 hex chars of salt><128 hex chars of sha512>"
//!   }
//! }
//! ```
//!
//! The table is small and always rewritten whole. Writes go through
//! [`write_atomic`], so a reader never needs a lock: it sees the previous table
//! or the next one. Every read-modify-write (`add`, `delete`, `update`) holds
//! the account lock, a [`NamedLock`] of its own that is unrelated to the
//! content-root lock.
//!
//! ## Credentials
//!
//! - `cleartext`: the secret is stored in `password` and compared as is.
//! - `hash`: `hash` holds `hex(salt) + hex(sha512(salt[..32] + secret + salt[32..]))`
//!   with a random 64-byte salt.
//!
//! A record without `authentication_method` is checked with the store's
//! default method. Any other method name is an error, never a silent
//! rejection or acceptance.

use crate::atomic::write_atomic;
use crate::error::{Result, WikiError};
use crate::lock::NamedLock;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use subtle::ConstantTimeEq;
use tracing::{info, warn};

pub const ACCOUNTS_FILE: &str = "users.json";
pub const ACCOUNTS_LOCK_FILE: &str = "users.lock";

const SALT_LEN: usize = 64;
const SALT_HEX_LEN: usize = SALT_LEN * 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    #[default]
    Cleartext,
    Hash,
}

impl AuthMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMethod::Cleartext => "cleartext",
            AuthMethod::Hash => "hash",
        }
    }
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthMethod {
    type Err = WikiError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "cleartext" => Ok(AuthMethod::Cleartext),
            "hash" => Ok(AuthMethod::Hash),
            other => Err(WikiError::UnknownAuthMethod(other.to_string())),
        }
    }
}

fn default_active() -> bool {
    true
}

/// One entry of the account table, as stored.
///
/// The method is kept as the raw string so a table written by something else
/// round-trips unchanged and an unknown method is reported when it is used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountRecord {
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authentication_method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    /// Fields this crate does not interpret.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl AccountRecord {
    /// A record holding the credential for `secret` in the form `method` wants.
    pub fn with_secret(secret: &str, active: bool, roles: Vec<String>, method: AuthMethod) -> Self {
        let (password, hash) = match method {
            AuthMethod::Cleartext => (Some(secret.to_string()), None),
            AuthMethod::Hash => (None, Some(make_salted_hash(secret, None))),
        };
        Self {
            active,
            roles,
            authentication_method: Some(method.to_string()),
            password,
            hash,
            extra: BTreeMap::new(),
        }
    }

    /// The method this record is checked with.
    pub fn method(&self, default: AuthMethod) -> Result<AuthMethod> {
        match &self.authentication_method {
            Some(method) => method.parse(),
            None => Ok(default),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub name: String,
    pub record: AccountRecord,
}

impl Account {
    pub fn is_active(&self) -> bool {
        self.record.active
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.record.roles.iter().any(|r| r == role)
    }

    pub fn set_active(&mut self, store: &AccountStore, active: bool) -> Result<()> {
        self.record.active = active;
        store.update_account(&self.name, &self.record)
    }

    pub fn set_roles(&mut self, store: &AccountStore, roles: Vec<String>) -> Result<()> {
        self.record.roles = roles;
        store.update_account(&self.name, &self.record)
    }
}

/// `hex(salt) + hex(sha512(salt[..32] + secret + salt[32..]))`.
///
/// A fresh random salt is drawn when none is given.
pub fn make_salted_hash(secret: &str, salt: Option<&[u8; SALT_LEN]>) -> String {
    let salt = match salt {
        Some(salt) => *salt,
        None => {
            let mut fresh = [0u8; SALT_LEN];
            OsRng.fill_bytes(&mut fresh);
            fresh
        }
    };
    let mut digest = Sha512::new();
    digest.update(&salt[..SALT_LEN / 2]);
    digest.update(secret.as_bytes());
    digest.update(&salt[SALT_LEN / 2..]);
    format!("{}{}", hex::encode(salt), hex::encode(digest.finalize()))
}

/// Recompute `salted_hash` for `candidate` using its embedded salt.
pub fn check_hashed_password(candidate: &str, salted_hash: &str) -> bool {
    let salt = salted_hash
        .get(..SALT_HEX_LEN)
        .and_then(|prefix| hex::decode(prefix).ok())
        .and_then(|bytes| <[u8; SALT_LEN]>::try_from(bytes.as_slice()).ok());
    let Some(salt) = salt else {
        warn!("stored password hash is malformed");
        return false;
    };
    let expected = make_salted_hash(candidate, Some(&salt));
    expected.as_bytes().ct_eq(salted_hash.as_bytes()).into()
}

/// Verify `candidate` against `record`. `default` applies when the record
/// names no method.
pub fn check_password(record: &AccountRecord, candidate: &str, default: AuthMethod) -> Result<bool> {
    match record.method(default)? {
        AuthMethod::Cleartext => Ok(record
            .password
            .as_deref()
            .is_some_and(|stored| stored.as_bytes().ct_eq(candidate.as_bytes()).into())),
        AuthMethod::Hash => Ok(record
            .hash
            .as_deref()
            .is_some_and(|stored| check_hashed_password(candidate, stored))),
    }
}

/// The account table of one content directory.
#[derive(Debug, Clone)]
pub struct AccountStore {
    file: PathBuf,
    lock: NamedLock,
    default_method: AuthMethod,
}

impl AccountStore {
    /// `users.json` and `users.lock` inside `dir`.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            file: dir.join(ACCOUNTS_FILE),
            lock: NamedLock::new(dir.join(ACCOUNTS_LOCK_FILE)),
            default_method: AuthMethod::default(),
        }
    }

    pub fn with_lock(mut self, lock: NamedLock) -> Self {
        self.lock = lock;
        self
    }

    pub fn with_default_method(mut self, method: AuthMethod) -> Self {
        self.default_method = method;
        self
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    pub fn default_method(&self) -> AuthMethod {
        self.default_method
    }

    /// The whole table. A missing file is an empty table.
    pub fn read(&self) -> Result<BTreeMap<String, AccountRecord>> {
        let raw = match fs::read_to_string(&self.file) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&raw)?)
    }

    /// Replace the whole table. Callers mutating it should hold the lock.
    pub fn write(&self, accounts: &BTreeMap<String, AccountRecord>) -> Result<()> {
        let json = serde_json::to_string_pretty(accounts)?;
        write_atomic(&self.file, json.as_bytes())
    }

    /// Create an account. `Ok(None)` if `name` is taken.
    pub fn add_account(
        &self,
        name: &str,
        secret: &str,
        active: bool,
        roles: Vec<String>,
        method: Option<AuthMethod>,
    ) -> Result<Option<Account>> {
        let method = method.unwrap_or(self.default_method);
        self.lock.with(|| {
            let mut accounts = self.read()?;
            if accounts.contains_key(name) {
                return Ok(None);
            }
            let record = AccountRecord::with_secret(secret, active, roles, method);
            accounts.insert(name.to_string(), record.clone());
            self.write(&accounts)?;
            info!(name, method = %method, "created account");
            Ok(Some(Account {
                name: name.to_string(),
                record,
            }))
        })
    }

    /// Lock-free lookup.
    pub fn get_account(&self, name: &str) -> Result<Option<Account>> {
        Ok(self.read()?.remove(name).map(|record| Account {
            name: name.to_string(),
            record,
        }))
    }

    /// Returns `false` if there was no such account.
    pub fn delete_account(&self, name: &str) -> Result<bool> {
        self.lock.with(|| {
            let mut accounts = self.read()?;
            if accounts.remove(name).is_none() {
                return Ok(false);
            }
            self.write(&accounts)?;
            info!(name, "deleted account");
            Ok(true)
        })
    }

    /// Store `record` under `name`, creating the entry if needed.
    pub fn update_account(&self, name: &str, record: &AccountRecord) -> Result<()> {
        self.lock.with(|| {
            let mut accounts = self.read()?;
            accounts.insert(name.to_string(), record.clone());
            self.write(&accounts)
        })
    }

    pub fn check_password(&self, record: &AccountRecord, candidate: &str) -> Result<bool> {
        check_password(record, candidate, self.default_method)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, AccountStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = AccountStore::new(dir.path());
        (dir, store)
    }

    #[test]
    fn test_hash_scenario() {
        let (_dir, store) = store();
        let alice = store
            .add_account("alice", "s3cr3t", true, vec![], Some(AuthMethod::Hash))
            .unwrap()
            .unwrap();
        assert!(alice.record.password.is_none());
        assert!(store.check_password(&alice.record, "s3cr3t").unwrap());
        assert!(!store.check_password(&alice.record, "wrong").unwrap());
    }

    #[test]
    fn test_salted_hash_layout() {
        let salt = [7u8; SALT_LEN];
        let hashed = make_salted_hash("pw", Some(&salt));
        assert_eq!(hashed.len(), SALT_HEX_LEN + 128);
        assert!(hashed.starts_with(&"07".repeat(SALT_LEN)));
        assert_eq!(hashed, make_salted_hash("pw", Some(&salt)));
        assert!(check_hashed_password("pw", &hashed));

        // Fresh salts differ.
        assert_ne!(make_salted_hash("pw", None), make_salted_hash("pw", None));
    }

    #[test]
    fn test_malformed_hash_never_matches() {
        assert!(!check_hashed_password("pw", "zz"));
        assert!(!check_hashed_password("pw", &"g".repeat(256)));
    }

    #[test]
    fn test_cleartext_and_default_method() {
        let (_dir, store) = store();
        let bob = store
            .add_account("bob", "hunter2", true, vec!["admin".into()], None)
            .unwrap()
            .unwrap();
        assert_eq!(bob.record.authentication_method.as_deref(), Some("cleartext"));
        assert_eq!(bob.record.password.as_deref(), Some("hunter2"));
        assert!(bob.has_role("admin"));
        assert!(store.check_password(&bob.record, "hunter2").unwrap());

        let hashing = AccountStore::new(store.file().parent().unwrap())
            .with_default_method(AuthMethod::Hash);
        let carol = hashing
            .add_account("carol", "pw", true, vec![], None)
            .unwrap()
            .unwrap();
        assert!(carol.record.hash.is_some());
    }

    #[test]
    fn test_missing_method_uses_default() {
        let mut record = AccountRecord::with_secret("pw", true, vec![], AuthMethod::Hash);
        record.authentication_method = None;
        assert!(check_password(&record, "pw", AuthMethod::Hash).unwrap());
        // Checked as cleartext there is no password to compare.
        assert!(!check_password(&record, "pw", AuthMethod::Cleartext).unwrap());
    }

    #[test]
    fn test_unknown_method_is_an_error() {
        let mut record = AccountRecord::with_secret("pw", true, vec![], AuthMethod::Cleartext);
        record.authentication_method = Some("rot13".to_string());
        let err = check_password(&record, "pw", AuthMethod::Cleartext).unwrap_err();
        assert!(matches!(err, WikiError::UnknownAuthMethod(m) if m == "rot13"));
        assert!("rot13".parse::<AuthMethod>().is_err());
    }

    #[test]
    fn test_duplicate_name_is_not_created() {
        let (_dir, store) = store();
        assert!(store.add_account("a", "1", true, vec![], None).unwrap().is_some());
        assert!(store.add_account("a", "2", true, vec![], None).unwrap().is_none());
        let a = store.get_account("a").unwrap().unwrap();
        assert!(store.check_password(&a.record, "1").unwrap());
    }

    #[test]
    fn test_missing_table_is_empty() {
        let (_dir, store) = store();
        assert!(store.read().unwrap().is_empty());
        assert!(store.get_account("nobody").unwrap().is_none());
        assert!(!store.delete_account("nobody").unwrap());
        assert!(!store.file().exists());
    }

    #[test]
    fn test_delete_and_update() {
        let (_dir, store) = store();
        let mut a = store.add_account("a", "1", true, vec![], None).unwrap().unwrap();
        a.set_active(&store, false).unwrap();
        a.set_roles(&store, vec!["editor".into()]).unwrap();

        let reloaded = store.get_account("a").unwrap().unwrap();
        assert!(!reloaded.is_active());
        assert_eq!(reloaded.record.roles, ["editor"]);

        assert!(store.delete_account("a").unwrap());
        assert!(store.get_account("a").unwrap().is_none());
    }

    #[test]
    fn test_table_format_and_unknown_fields() {
        let (dir, store) = store();
        fs::write(
            store.file(),
            r#"{"old": {"active": true, "roles": [], "password": "x", "email": "o@example.com"}}"#,
        )
        .unwrap();
        store.add_account("new", "y", false, vec![], None).unwrap();

        let raw = fs::read_to_string(dir.path().join(ACCOUNTS_FILE)).unwrap();
        assert!(raw.contains("\n  \"new\": {"));
        assert!(raw.contains("\"email\": \"o@example.com\""));
        assert!(!raw.contains("\"hash\""));

        let old = store.get_account("old").unwrap().unwrap();
        assert!(store.check_password(&old.record, "x").unwrap());
    }

    #[test]
    fn test_concurrent_adds_all_land() {
        let (_dir, store) = store();
        std::thread::scope(|scope| {
            for i in 0..8 {
                let store = &store;
                scope.spawn(move || {
                    store
                        .add_account(&format!("user{}", i), "pw", true, vec![], None)
                        .unwrap();
                });
            }
        });
        assert_eq!(store.read().unwrap().len(), 8);
    }
}
