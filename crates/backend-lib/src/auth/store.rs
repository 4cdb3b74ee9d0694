// ============================
// authgate-lib/src/auth/store.rs
// ============================
//! Credential storage abstraction with in-memory and flat-file implementations.
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::{mapref::entry::Entry, DashMap};
use serde::{Deserialize, Serialize};
use tokio::fs as tokio_fs;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::AuthError;

/// File holding all records of a [`FlatFileCredentialStore`]
pub const CREDENTIALS_FILE: &str = "credentials.json";

/// A registered identity and the salted hash of its secret
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct CredentialRecord {
    pub identity: String,
    pub secret_hash: String,
    pub created_at: DateTime<Utc>,
}

impl CredentialRecord {
    pub fn new(identity: impl Into<String>, secret_hash: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            secret_hash: secret_hash.into(),
            created_at: Utc::now(),
        }
    }
}

impl std::fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("identity", &self.identity)
            .field("secret_hash", &"<redacted>")
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Trait for credential backends
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Add a new record; an identity can only be registered once
    async fn register(&self, record: CredentialRecord) -> Result<(), AuthError>;

    /// Fetch the record for an identity
    async fn lookup(&self, identity: &str) -> Result<CredentialRecord, AuthError>;
}

/// Process-local store. Check-and-insert is atomic per identity.
#[derive(Clone, Default)]
pub struct InMemoryCredentialStore {
    records: Arc<DashMap<String, CredentialRecord>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn register(&self, record: CredentialRecord) -> Result<(), AuthError> {
        match self.records.entry(record.identity.clone()) {
            Entry::Occupied(_) => Err(AuthError::DuplicateIdentity),
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(())
            }
        }
    }

    async fn lookup(&self, identity: &str) -> Result<CredentialRecord, AuthError> {
        self.records
            .get(identity)
            .map(|r| r.value().clone())
            .ok_or(AuthError::NotFound)
    }
}

/// Store persisted as one JSON document under a data directory.
///
/// Every registration rewrites the file through a temp file and rename while
/// holding the write lock, so the file and the map never disagree.
#[derive(Clone)]
pub struct FlatFileCredentialStore {
    path: PathBuf,
    records: Arc<RwLock<HashMap<String, CredentialRecord>>>,
}

impl FlatFileCredentialStore {
    /// Open the store in `root`, loading existing records if any
    pub async fn open<P: AsRef<Path>>(root: P) -> Result<Self, AuthError> {
        let root = root.as_ref().to_path_buf();
        tokio_fs::create_dir_all(&root)
            .await
            .map_err(|e| AuthError::Storage(format!("create {}: {e}", root.display())))?;

        let path = root.join(CREDENTIALS_FILE);
        let records = match tokio_fs::read_to_string(&path).await {
            Ok(content) => {
                let list: Vec<CredentialRecord> = serde_json::from_str(&content)
                    .map_err(|e| AuthError::Storage(format!("parse {}: {e}", path.display())))?;
                list.into_iter()
                    .map(|r| (r.identity.clone(), r))
                    .collect::<HashMap<_, _>>()
            }
            Err(e) if e.kind() == ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                return Err(AuthError::Storage(format!("read {}: {e}", path.display())));
            }
        };

        info!(path = %path.display(), records = records.len(), "credential store opened");

        Ok(Self {
            path,
            records: Arc::new(RwLock::new(records)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, records: &HashMap<String, CredentialRecord>) -> Result<(), AuthError> {
        let mut list: Vec<&CredentialRecord> = records.values().collect();
        list.sort_by(|a, b| a.identity.cmp(&b.identity));

        let json = serde_json::to_string_pretty(&list)
            .map_err(|e| AuthError::Storage(format!("serialize credentials: {e}")))?;

        let tmp = self.path.with_extension("json.tmp");
        tokio_fs::write(&tmp, json)
            .await
            .map_err(|e| AuthError::Storage(format!("write {}: {e}", tmp.display())))?;
        tokio_fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| AuthError::Storage(format!("rename {}: {e}", tmp.display())))?;

        Ok(())
    }
}

#[async_trait]
impl CredentialStore for FlatFileCredentialStore {
    async fn register(&self, record: CredentialRecord) -> Result<(), AuthError> {
        let mut records = self.records.write().await;
        if records.contains_key(&record.identity) {
            return Err(AuthError::DuplicateIdentity);
        }

        let identity = record.identity.clone();
        records.insert(identity.clone(), record);
        if let Err(e) = self.persist(&records).await {
            records.remove(&identity);
            return Err(e);
        }

        debug!(records = records.len(), "credential file rewritten");
        Ok(())
    }

    async fn lookup(&self, identity: &str) -> Result<CredentialRecord, AuthError> {
        let records = self.records.read().await;
        records.get(identity).cloned().ok_or(AuthError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn memory_register_then_lookup() {
        let store = InMemoryCredentialStore::new();
        store
            .register(CredentialRecord::new("a@example.com", "$scrypt$hash"))
            .await
            .unwrap();

        let record = store.lookup("a@example.com").await.unwrap();
        assert_eq!(record.secret_hash, "$scrypt$hash");
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn memory_duplicate_keeps_original() {
        let store = InMemoryCredentialStore::new();
        store
            .register(CredentialRecord::new("a@example.com", "first"))
            .await
            .unwrap();

        let second = store
            .register(CredentialRecord::new("a@example.com", "second"))
            .await;
        assert_eq!(second, Err(AuthError::DuplicateIdentity));
        assert_eq!(store.lookup("a@example.com").await.unwrap().secret_hash, "first");
    }

    #[tokio::test]
    async fn memory_unknown_identity_is_not_found() {
        let store = InMemoryCredentialStore::new();
        assert_eq!(store.lookup("ghost").await, Err(AuthError::NotFound));
    }

    #[tokio::test]
    async fn file_store_survives_reopen() {
        let dir = tempdir().unwrap();
        {
            let store = FlatFileCredentialStore::open(dir.path()).await.unwrap();
            store
                .register(CredentialRecord::new("a@example.com", "hash-a"))
                .await
                .unwrap();
            store
                .register(CredentialRecord::new("b@example.com", "hash-b"))
                .await
                .unwrap();
        }

        let reopened = FlatFileCredentialStore::open(dir.path()).await.unwrap();
        assert_eq!(reopened.lookup("a@example.com").await.unwrap().secret_hash, "hash-a");
        assert_eq!(reopened.lookup("b@example.com").await.unwrap().secret_hash, "hash-b");
        assert_eq!(reopened.lookup("c@example.com").await, Err(AuthError::NotFound));
    }

    #[tokio::test]
    async fn file_store_rejects_duplicates() {
        let dir = tempdir().unwrap();
        let store = FlatFileCredentialStore::open(dir.path()).await.unwrap();
        store
            .register(CredentialRecord::new("a@example.com", "first"))
            .await
            .unwrap();

        assert_eq!(
            store.register(CredentialRecord::new("a@example.com", "second")).await,
            Err(AuthError::DuplicateIdentity)
        );

        let on_disk = std::fs::read_to_string(store.path()).unwrap();
        assert!(on_disk.contains("first"));
        assert!(!on_disk.contains("second"));
    }

    #[tokio::test]
    async fn file_store_rejects_corrupt_file() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(CREDENTIALS_FILE), "not json").unwrap();

        let result = FlatFileCredentialStore::open(dir.path()).await;
        assert!(matches!(result, Err(AuthError::Storage(_))));
    }

    #[tokio::test]
    async fn file_store_unreadable_file_is_an_error() {
        let dir = tempdir().unwrap();
        // A directory where the file should be cannot be read as text
        std::fs::create_dir(dir.path().join(CREDENTIALS_FILE)).unwrap();

        let result = FlatFileCredentialStore::open(dir.path()).await;
        assert!(matches!(result, Err(AuthError::Storage(_))));
        assert!(dir.path().join(CREDENTIALS_FILE).is_dir());
    }

    #[tokio::test]
    async fn file_store_starts_empty_without_file() {
        let dir = tempdir().unwrap();
        let store = FlatFileCredentialStore::open(dir.path().join("fresh")).await.unwrap();
        assert_eq!(store.lookup("a@example.com").await, Err(AuthError::NotFound));
        assert!(!store.path().exists());
    }

    #[test]
    fn record_debug_hides_hash() {
        let record = CredentialRecord::new("a@example.com", "$scrypt$secret-hash");
        assert!(!format!("{record:?}").contains("secret-hash"));
    }
}
