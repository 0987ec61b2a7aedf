use thiserror::Error;

/// Unified error type for pdf-vault-core
///
/// This enum encompasses all error cases that can occur in the library:
/// - PDF operations (parsing, watermark rendering)
/// - Catalog lookups and persistence
/// - Upload validation
/// - Blob storage
/// - Configuration loading
/// - General I/O operations
#[derive(Error, Debug)]
pub enum Error {
    // ==========================================================================
    // PDF Errors
    // ==========================================================================
    /// The bytes could not be parsed as a PDF document
    #[error("invalid PDF document: {0}")]
    InvalidDocument(String),

    /// Drawing, font measurement or serialization failed while rendering
    #[error("failed to render watermark: {0}")]
    RenderFailure(String),

    // ==========================================================================
    // Lookup Errors
    // ==========================================================================
    /// Document id is absent or the document was deleted
    #[error("document not found with id {0}")]
    NotFound(u64),

    /// No bookmark for this user and document
    #[error("no bookmark for document {document_id}")]
    BookmarkNotFound { document_id: u64 },

    // ==========================================================================
    // Validation Errors
    // ==========================================================================
    /// A request field failed validation
    #[error("invalid value for '{field}': {reason}")]
    Validation { field: String, reason: String },

    /// Uploaded file has no content
    #[error("file is empty")]
    EmptyUpload,

    /// Uploaded file is not a PDF
    #[error("file must be a PDF (got {0})")]
    UnsupportedMediaType(String),

    /// Uploaded file exceeds the configured size limit
    #[error("file size {size} bytes exceeds the limit of {limit} bytes")]
    PayloadTooLarge { size: u64, limit: u64 },

    // ==========================================================================
    // Storage Errors
    // ==========================================================================
    /// Stored name contains a traversal sequence or is absolute
    #[error("filename contains invalid path sequence: {0}")]
    InvalidPath(String),

    /// Blob missing from the storage root
    #[error("file not found in storage: {0}")]
    BlobNotFound(String),

    /// Failed to write or remove a blob
    #[error("storage error: {0}")]
    Storage(String),

    // ==========================================================================
    // Catalog Errors
    // ==========================================================================
    /// Failed to open the catalog database
    #[error("failed to open catalog: {0}")]
    CatalogInit(String),

    /// Failed to read from or write to the catalog
    #[error("catalog error: {0}")]
    Catalog(String),

    /// Stored record could not be (de)serialized
    #[error("record serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    // ==========================================================================
    // Configuration Errors
    // ==========================================================================
    /// Failed to load configuration file
    #[error("failed to load config: {0}")]
    ConfigLoad(String),

    /// Invalid configuration value
    #[error("invalid config value for '{field}': {reason}")]
    ConfigInvalid { field: String, reason: String },

    // ==========================================================================
    // I/O Errors
    // ==========================================================================
    /// General I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn validation(field: &str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether the failure was caused by the caller's input rather than the server.
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidDocument(_)
                | Self::Validation { .. }
                | Self::EmptyUpload
                | Self::UnsupportedMediaType(_)
                | Self::PayloadTooLarge { .. }
                | Self::InvalidPath(_)
        )
    }
}

impl From<sled::Error> for Error {
    fn from(e: sled::Error) -> Self {
        Self::Catalog(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
