use anyhow::{Context, Result};
use pdf_vault_core::{AppConfig, DocumentService};
use tracing::info;

/// Global application state
pub struct AppState {
    /// Catalog, blob store and watermarking behind one service
    pub service: DocumentService,
    /// Effective configuration
    pub config: AppConfig,
}

impl AppState {
    /// Open storage and catalog as configured.
    ///
    /// Fails fast if the catalog is locked by another process.
    pub fn new(config: AppConfig) -> Result<Self> {
        let service = DocumentService::from_config(&config)
            .context("Failed to open document storage")?;

        info!(
            "Catalog at {}, {} active document(s)",
            config.catalog.resolved_path().display(),
            service.count().unwrap_or_default()
        );

        Ok(Self { service, config })
    }

    /// State backed by an in-memory catalog.
    #[cfg(test)]
    pub fn temporary(config: AppConfig) -> Result<Self> {
        use pdf_vault_core::{DocumentCatalog, FsBlobStore};
        use std::sync::Arc;

        let blobs = FsBlobStore::new(&config.storage.upload_dir)?;
        let service = DocumentService::new(
            DocumentCatalog::temporary()?,
            Arc::new(blobs),
            config.storage.max_file_size,
        )?;
        Ok(Self { service, config })
    }
}
