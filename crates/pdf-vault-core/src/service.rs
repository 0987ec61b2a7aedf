//! Document workflows: upload, lookup, update, soft delete, viewing,
//! watermarked download and bookmarks.

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::catalog::{
    Bookmark, BookmarkStore, DocumentCatalog, DocumentRecord, DocumentSummary, NewDocument,
    PDF_CONTENT_TYPE, UploadRequest,
};
use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::pdf;
use crate::storage::{BlobStore, FsBlobStore};

/// A file received from a client
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Client supplied filename
    pub filename: String,
    /// Declared MIME type
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Result of a successful upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub document_id: u64,
    pub filename: String,
    pub file_size: u64,
    pub page_count: u32,
    pub message: String,
}

/// Orchestrates catalog, blob store and watermark engine
#[derive(Clone)]
pub struct DocumentService {
    catalog: DocumentCatalog,
    bookmarks: BookmarkStore,
    blobs: Arc<dyn BlobStore>,
    max_file_size: u64,
}

impl DocumentService {
    pub fn new(catalog: DocumentCatalog, blobs: Arc<dyn BlobStore>, max_file_size: u64) -> Result<Self> {
        let bookmarks = catalog.bookmarks()?;
        Ok(Self {
            catalog,
            bookmarks,
            blobs,
            max_file_size,
        })
    }

    /// Build the service from configuration: filesystem blobs and an on-disk catalog.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let blobs = FsBlobStore::new(&config.storage.upload_dir)?;
        let catalog = DocumentCatalog::open(config.catalog.resolved_path())?;
        Self::new(catalog, Arc::new(blobs), config.storage.max_file_size)
    }

    // =========================================================================
    // Documents
    // =========================================================================

    /// Validate, store and catalogue an uploaded PDF.
    ///
    /// A blank title falls back to the filename without its `.pdf` suffix.
    /// If the catalog write fails the stored blob is removed again.
    pub async fn upload(&self, file: UploadedFile, mut request: UploadRequest) -> Result<UploadResponse> {
        info!("Uploading document: {}", file.filename);
        self.validate_file(&file)?;

        if request.title.trim().is_empty() {
            request.title = title_from_filename(&file.filename);
        }
        request.validate()?;

        let UploadedFile { filename, bytes, .. } = file;
        let file_size = bytes.len() as u64;
        let checksum = format!("{:x}", md5::compute(&bytes));

        let (page_count, bytes) = tokio::task::spawn_blocking(move || (pdf::page_count(&bytes), bytes))
            .await
            .map_err(|e| Error::Storage(format!("Page counting task failed: {e}")))?;

        let stored_name = self.blobs.store(&bytes, &filename).await?;

        let created_by = request.created_by_or_default();
        let new = NewDocument {
            title: request.title,
            filename: filename.clone(),
            file_path: stored_name.clone(),
            file_size,
            page_count,
            product_code: request.product_code,
            edition: request.edition,
            publication_date: request.publication_date,
            notes: request.notes,
            content_type: PDF_CONTENT_TYPE.to_string(),
            checksum,
            created_by,
        };

        let record = match self.catalog.save(new) {
            Ok(record) => record,
            Err(e) => {
                if let Err(cleanup) = self.blobs.delete(&stored_name).await {
                    warn!("Failed to remove orphaned file {}: {}", stored_name, cleanup);
                }
                return Err(e);
            }
        };

        info!(
            "Uploaded document {} ({}, {} pages)",
            record.id,
            crate::util::readable_file_size(file_size),
            page_count
        );

        Ok(UploadResponse {
            document_id: record.id,
            filename,
            file_size,
            page_count,
            message: "File uploaded successfully".to_string(),
        })
    }

    fn validate_file(&self, file: &UploadedFile) -> Result<()> {
        if file.bytes.is_empty() {
            return Err(Error::EmptyUpload);
        }

        let content_type = file.content_type.as_deref().unwrap_or_default();
        if content_type != PDF_CONTENT_TYPE {
            return Err(Error::UnsupportedMediaType(if content_type.is_empty() {
                "no content type".to_string()
            } else {
                content_type.to_string()
            }));
        }

        let size = file.bytes.len() as u64;
        if size > self.max_file_size {
            return Err(Error::PayloadTooLarge {
                size,
                limit: self.max_file_size,
            });
        }

        Ok(())
    }

    /// All active documents, newest first
    pub fn list(&self) -> Result<Vec<DocumentSummary>> {
        Ok(summaries(self.catalog.list_active()?))
    }

    /// One active document
    pub fn get(&self, id: u64) -> Result<DocumentSummary> {
        self.active_record(id).map(DocumentSummary::from)
    }

    /// Keyword search; a blank query lists everything
    pub fn search(&self, query: &str) -> Result<Vec<DocumentSummary>> {
        debug!("Searching documents for '{}'", query);
        Ok(summaries(self.catalog.search(query)?))
    }

    pub fn find_by_product_code(&self, code: &str) -> Result<Vec<DocumentSummary>> {
        Ok(summaries(self.catalog.find_by_product_code(code)?))
    }

    pub fn find_by_edition(&self, edition: &str) -> Result<Vec<DocumentSummary>> {
        Ok(summaries(self.catalog.find_by_edition(edition)?))
    }

    /// Replace a document's editable metadata
    pub fn update(&self, id: u64, request: &UploadRequest) -> Result<DocumentSummary> {
        request.validate()?;
        self.catalog.update(id, request).map(DocumentSummary::from)
    }

    /// Number of active documents
    pub fn count(&self) -> Result<u64> {
        self.catalog.count()
    }

    /// Soft-delete a document and remove its file.
    ///
    /// Returns `false` when there was no active document with this id. A
    /// failure to remove the file is logged, not returned.
    pub async fn delete(&self, id: u64) -> Result<bool> {
        let Some(record) = self.catalog.soft_delete(id)? else {
            warn!("Document not found for deletion with id {}", id);
            return Ok(false);
        };

        if let Err(e) = self.blobs.delete(&record.file_path).await {
            warn!("Failed to delete file from storage: {}", e);
        }

        Ok(true)
    }

    /// Original bytes of an active document
    pub async fn view(&self, id: u64) -> Result<(DocumentRecord, Vec<u8>)> {
        let record = self.active_record(id)?;
        let bytes = self.blobs.load(&record.file_path).await?;
        Ok((record, bytes))
    }

    /// Watermarked copy of an active document, labelled with its title
    pub async fn download_watermarked(&self, id: u64) -> Result<(DocumentRecord, Vec<u8>)> {
        let (record, bytes) = self.view(id).await?;
        let label = record.title.clone();

        let watermarked = tokio::task::spawn_blocking(move || pdf::apply_watermark(&bytes, &label))
            .await
            .map_err(|e| Error::RenderFailure(format!("Watermark task failed: {e}")))??;

        info!("Prepared watermarked download of document {}", id);
        Ok((record, watermarked))
    }

    fn active_record(&self, id: u64) -> Result<DocumentRecord> {
        self.catalog.find_by_id(id)?.ok_or(Error::NotFound(id))
    }

    // =========================================================================
    // Bookmarks
    // =========================================================================

    /// Set the user's bookmark for a document (page defaults to 1, name to "Page N").
    pub fn add_bookmark(
        &self,
        document_id: u64,
        user_id: &str,
        page: Option<u32>,
        name: Option<&str>,
    ) -> Result<Bookmark> {
        let record = self.active_record(document_id)?;

        let page = page.unwrap_or(1);
        if page == 0 || (record.page_count > 0 && page > record.page_count) {
            return Err(Error::validation(
                "page",
                format!("must be between 1 and {}", record.page_count.max(1)),
            ));
        }

        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map_or_else(|| format!("Page {page}"), str::to_string);

        let bookmark = self.bookmarks.upsert(user_id, document_id, page, &name)?;
        debug!("Bookmark for {} on document {} at page {}", user_id, document_id, page);
        Ok(bookmark)
    }

    /// The user's bookmarks on active documents, most recent first
    pub fn user_bookmarks(&self, user_id: &str) -> Result<Vec<Bookmark>> {
        let mut bookmarks = Vec::new();
        for bookmark in self.bookmarks.list_for_user(user_id)? {
            if self.catalog.find_by_id(bookmark.document_id)?.is_some() {
                bookmarks.push(bookmark);
            }
        }
        Ok(bookmarks)
    }

    /// The user's bookmark for one active document
    pub fn bookmark_for(&self, user_id: &str, document_id: u64) -> Result<Bookmark> {
        self.active_record(document_id)?;
        self.bookmarks
            .find(user_id, document_id)?
            .ok_or(Error::BookmarkNotFound { document_id })
    }

    /// Remove the user's bookmark for a document
    pub fn remove_bookmark(&self, user_id: &str, document_id: u64) -> Result<bool> {
        self.bookmarks.remove(user_id, document_id)
    }
}

/// Default title for an upload: the filename without a trailing `.pdf`.
pub fn title_from_filename(filename: &str) -> String {
    let name = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    let stem = name
        .len()
        .checked_sub(4)
        .filter(|&cut| name.is_char_boundary(cut) && name[cut..].eq_ignore_ascii_case(".pdf"))
        .map_or(name, |cut| &name[..cut]);
    stem.to_string()
}

fn summaries(records: Vec<DocumentRecord>) -> Vec<DocumentSummary> {
    records.into_iter().map(DocumentSummary::from).collect()
}
