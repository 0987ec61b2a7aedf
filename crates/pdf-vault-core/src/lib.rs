//! PDF Vault Core Library
//!
//! This library provides the core functionality of the document vault:
//! - Watermark overlay for downloaded PDF copies
//! - PDF metadata and page counting
//! - Filesystem blob storage
//! - Document catalog with soft delete, search and bookmarks
//! - The document service tying these together

pub mod catalog;
pub mod config;
pub mod error;
pub mod pdf;
pub mod service;
pub mod storage;
pub mod util;

pub use catalog::{
    Bookmark, BookmarkStore, DocumentCatalog, DocumentRecord, DocumentSummary, NewDocument,
    UploadRequest,
};
pub use config::AppConfig;
pub use error::{Error, Result};
pub use pdf::{
    DocumentMetadata, PdfDocument, WatermarkSpec, apply_watermark, apply_watermark_at,
    apply_watermark_with, page_count,
};
pub use service::{DocumentService, UploadResponse, UploadedFile, title_from_filename};
pub use storage::{BlobStore, FsBlobStore};
