//! Namespaced secure key-value storage for session persistence.
//!
//! The coordinator persists the minimal state needed to resume a session
//! (issuer/WebID string, scopes, key pair, tokens) through this trait.
//! Implementations decide where the bytes actually live; the bundled ones
//! cover in-memory (tests, ephemeral apps) and a JSON-file-per-namespace
//! layout. Platform keychains plug in the same way.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use dashmap::DashMap;
use miette::Diagnostic;
use thiserror::Error;

/// Error raised by a [`SecureStore`] implementation.
#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    #[error("store io error: {0}")]
    #[diagnostic(
        code(podauth_common::store::io),
        help("verify the store location is accessible and writable")
    )]
    Io(#[from] std::io::Error),
    #[error("store serialization error: {0}")]
    #[diagnostic(code(podauth_common::store::serde))]
    Serde(#[from] serde_json::Error),
    #[error("store backend error: {0}")]
    #[diagnostic(code(podauth_common::store::backend))]
    Backend(String),
}

/// Namespaced key-value store with string values.
///
/// Multiple live instances are tolerated by constructing implementations
/// with an owner id, which prefixes the effective namespace so instances
/// do not trample each other's entries.
#[async_trait::async_trait]
pub trait SecureStore: Send + Sync {
    /// Read a value, `None` when absent.
    async fn get(&self, namespace: &str, key: &str) -> Result<Option<String>, StoreError>;

    /// Write a value, replacing any previous one.
    async fn set(&self, namespace: &str, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove a value. Removing an absent key is not an error.
    async fn remove(&self, namespace: &str, key: &str) -> Result<(), StoreError>;
}

/// In-memory store backed by a concurrent map.
#[derive(Debug, Default)]
pub struct MemoryStore {
    owner: Option<String>,
    entries: DashMap<(String, String), String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Namespace-prefix every entry with an owner id.
    pub fn with_owner(owner: impl Into<String>) -> Self {
        Self {
            owner: Some(owner.into()),
            entries: DashMap::new(),
        }
    }

    fn scoped(&self, namespace: &str) -> String {
        match &self.owner {
            Some(owner) => format!("{owner}.{namespace}"),
            None => namespace.to_owned(),
        }
    }
}

#[async_trait::async_trait]
impl SecureStore for MemoryStore {
    async fn get(&self, namespace: &str, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .entries
            .get(&(self.scoped(namespace), key.to_owned()))
            .map(|v| v.clone()))
    }

    async fn set(&self, namespace: &str, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries
            .insert((self.scoped(namespace), key.to_owned()), value.to_owned());
        Ok(())
    }

    async fn remove(&self, namespace: &str, key: &str) -> Result<(), StoreError> {
        self.entries.remove(&(self.scoped(namespace), key.to_owned()));
        Ok(())
    }
}

/// File-backed store: one JSON object per namespace under a base directory.
///
/// Writes replace the namespace file atomically via a temp file + rename.
#[derive(Debug, Clone)]
pub struct FileStore {
    base: PathBuf,
    owner: Option<String>,
}

impl FileStore {
    /// Create a store rooted at the given directory.
    pub fn new(base: impl AsRef<Path>) -> Self {
        Self {
            base: base.as_ref().to_path_buf(),
            owner: None,
        }
    }

    /// Namespace-prefix every file with an owner id.
    pub fn with_owner(base: impl AsRef<Path>, owner: impl Into<String>) -> Self {
        Self {
            base: base.as_ref().to_path_buf(),
            owner: Some(owner.into()),
        }
    }

    fn path_for(&self, namespace: &str) -> PathBuf {
        let name = match &self.owner {
            Some(owner) => format!("{owner}.{namespace}.json"),
            None => format!("{namespace}.json"),
        };
        self.base.join(name)
    }

    async fn load(&self, namespace: &str) -> Result<BTreeMap<String, String>, StoreError> {
        match tokio::fs::read(self.path_for(namespace)).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn persist(
        &self,
        namespace: &str,
        entries: &BTreeMap<String, String>,
    ) -> Result<(), StoreError> {
        let path = self.path_for(namespace);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let buf = serde_json::to_vec_pretty(entries)?;
        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, &buf).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl SecureStore for FileStore {
    async fn get(&self, namespace: &str, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.load(namespace).await?.remove(key))
    }

    async fn set(&self, namespace: &str, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.load(namespace).await?;
        entries.insert(key.to_owned(), value.to_owned());
        self.persist(namespace, &entries).await
    }

    async fn remove(&self, namespace: &str, key: &str) -> Result<(), StoreError> {
        let mut entries = self.load(namespace).await?;
        entries.remove(key);
        if entries.is_empty() {
            let _ = tokio::fs::remove_file(self.path_for(namespace)).await;
            Ok(())
        } else {
            self.persist(namespace, &entries).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_round_trip() {
        let store = MemoryStore::new();
        store.set("auth", "token", "abc").await.unwrap();
        assert_eq!(
            store.get("auth", "token").await.unwrap().as_deref(),
            Some("abc")
        );
        store.remove("auth", "token").await.unwrap();
        assert_eq!(store.get("auth", "token").await.unwrap(), None);
    }

    #[tokio::test]
    async fn owner_ids_do_not_collide() {
        let a = MemoryStore::with_owner("a");
        let b = MemoryStore::with_owner("b");
        a.set("auth", "k", "va").await.unwrap();
        b.set("auth", "k", "vb").await.unwrap();
        assert_eq!(a.get("auth", "k").await.unwrap().as_deref(), Some("va"));
        assert_eq!(b.get("auth", "k").await.unwrap().as_deref(), Some("vb"));
    }

    #[tokio::test]
    async fn file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        store.set("auth", "keys", "pem").await.unwrap();
        assert_eq!(
            store.get("auth", "keys").await.unwrap().as_deref(),
            Some("pem")
        );
        store.remove("auth", "keys").await.unwrap();
        assert_eq!(store.get("auth", "keys").await.unwrap(), None);
    }
}
