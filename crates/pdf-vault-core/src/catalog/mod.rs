mod bookmarks;
mod documents;
mod record;

pub use bookmarks::BookmarkStore;
pub use documents::DocumentCatalog;
pub use record::{
    Bookmark, DEFAULT_CREATED_BY, DocumentRecord, DocumentSummary, NewDocument, PDF_CONTENT_TYPE,
    UploadRequest, timestamp,
};

use sled::Db;
use std::path::Path;
use tracing::debug;

use crate::error::{Error, Result};

/// Open (or create) the catalog database at `path`.
pub(crate) fn open_db(path: &Path) -> Result<Db> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            Error::CatalogInit(format!(
                "Failed to create catalog directory {}: {}",
                parent.display(),
                e
            ))
        })?;
    }

    let db = sled::open(path).map_err(|e| {
        let err_str = e.to_string();
        // Detect lock errors and provide actionable fix
        if err_str.contains("WouldBlock") || err_str.contains("lock") {
            Error::CatalogInit(format!(
                "Catalog locked at {}\n\n\
                Another process is using the catalog, or a previous instance crashed.\n\
                To fix: rm {}/db/LOCK",
                path.display(),
                path.display()
            ))
        } else {
            Error::CatalogInit(format!("Failed to open catalog at {}: {}", path.display(), e))
        }
    })?;

    debug!("Opened catalog at {}", path.display());
    Ok(db)
}

/// In-memory database that is discarded on drop.
pub(crate) fn temporary_db() -> Result<Db> {
    sled::Config::new()
        .temporary(true)
        .open()
        .map_err(|e| Error::CatalogInit(format!("Failed to open temporary catalog: {e}")))
}
