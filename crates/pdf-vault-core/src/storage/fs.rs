use async_trait::async_trait;
use chrono::Local;
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::{debug, info};

use super::BlobStore;
use super::naming::{generate_stored_name, validate_stored_name};
use crate::error::{Error, Result};

/// Blob store backed by a flat directory
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();

        std::fs::create_dir_all(&root).map_err(|e| {
            Error::Storage(format!(
                "Failed to create storage directory {}: {}",
                root.display(),
                e
            ))
        })?;

        info!("File storage location: {}", root.display());

        Ok(Self { root })
    }

    fn resolve(&self, stored_name: &str) -> Result<PathBuf> {
        validate_stored_name(stored_name)?;
        Ok(self.root.join(stored_name))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn store(&self, bytes: &[u8], original_name: &str) -> Result<String> {
        let stored_name = generate_stored_name(original_name, Local::now().naive_local())?;
        let path = self.root.join(&stored_name);

        tokio::fs::write(&path, bytes).await.map_err(|e| {
            Error::Storage(format!("Could not store file {original_name}: {e}"))
        })?;

        debug!("Stored {} ({} bytes) as {}", original_name, bytes.len(), stored_name);
        Ok(stored_name)
    }

    async fn load(&self, stored_name: &str) -> Result<Vec<u8>> {
        let path = self.resolve(stored_name)?;

        tokio::fs::read(&path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => Error::BlobNotFound(stored_name.to_string()),
            _ => Error::Storage(format!("Could not read file {stored_name}: {e}")),
        })
    }

    async fn delete(&self, stored_name: &str) -> Result<()> {
        let path = self.resolve(stored_name)?;

        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!("Deleted {}", stored_name);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Storage(format!(
                "Could not delete file {stored_name}: {e}"
            ))),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_store_load_delete() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("pdfs");
        let store = FsBlobStore::new(&root).unwrap();

        let name = store.store(b"%PDF-1.4 body", "Spec Sheet.pdf").await.unwrap();
        assert!(name.starts_with("Spec_Sheet_"));
        assert!(root.join(&name).is_file());
        assert_eq!(store.load(&name).await.unwrap(), b"%PDF-1.4 body");

        store.delete(&name).await.unwrap();
        assert!(!root.join(&name).exists());

        // Idempotent
        store.delete(&name).await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_blob() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path()).unwrap();

        let err = store.load("gone_20240101_000000_deadbeef.pdf").await.unwrap_err();
        assert!(matches!(err, Error::BlobNotFound(_)));
    }

    #[tokio::test]
    async fn test_traversal_rejected_on_every_operation() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path().join("root")).unwrap();
        std::fs::write(dir.path().join("secret.pdf"), b"secret").unwrap();

        assert!(matches!(
            store.load("../secret.pdf").await,
            Err(Error::InvalidPath(_))
        ));
        assert!(matches!(
            store.delete("../secret.pdf").await,
            Err(Error::InvalidPath(_))
        ));
        assert!(matches!(
            store.store(b"x", "../secret.pdf").await,
            Err(Error::InvalidPath(_))
        ));
        assert!(dir.path().join("secret.pdf").exists());
    }
}
