mod fs;
mod naming;

pub use fs::FsBlobStore;
pub use naming::{generate_stored_name, validate_stored_name};

use async_trait::async_trait;

use crate::error::Result;

/// Byte storage for uploaded documents, addressed by generated names
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes under a fresh unique name derived from `original_name`.
    ///
    /// Returns the stored name, relative to the store's root.
    async fn store(&self, bytes: &[u8], original_name: &str) -> Result<String>;

    /// Read back a stored blob
    async fn load(&self, stored_name: &str) -> Result<Vec<u8>>;

    /// Remove a stored blob. Removing a missing blob is not an error.
    async fn delete(&self, stored_name: &str) -> Result<()>;
}
