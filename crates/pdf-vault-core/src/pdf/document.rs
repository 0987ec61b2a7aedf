use std::path::Path;
use std::sync::Arc;

use lopdf::{Dictionary, Document, Object};
use tracing::warn;

use crate::error::{Error, Result};

/// Parsed facts about a PDF, computed once on load
pub struct PdfDocument {
    /// The raw PDF bytes
    bytes: Arc<Vec<u8>>,
    /// Cached metadata
    metadata: DocumentMetadata,
    /// Number of pages
    page_count: u32,
    /// Header version, e.g. "1.7"
    version: String,
    /// Whether the trailer carries an /Encrypt dictionary
    encrypted: bool,
    /// MD5 hex of the bytes
    checksum: String,
}

/// Document metadata from the trailer `/Info` dictionary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub keywords: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub creation_date: Option<String>,
    pub modification_date: Option<String>,
}

impl DocumentMetadata {
    fn from_info(info: &Dictionary) -> Self {
        let get_meta = |key: &[u8]| -> Option<String> {
            info.get(key)
                .ok()
                .and_then(|obj| obj.as_str().ok())
                .map(decode_text_string)
                .filter(|s| !s.trim().is_empty())
        };

        Self {
            title: get_meta(b"Title"),
            author: get_meta(b"Author"),
            subject: get_meta(b"Subject"),
            keywords: get_meta(b"Keywords"),
            creator: get_meta(b"Creator"),
            producer: get_meta(b"Producer"),
            creation_date: get_meta(b"CreationDate"),
            modification_date: get_meta(b"ModDate"),
        }
    }
}

impl PdfDocument {
    /// Parse a PDF from bytes
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Result<Self> {
        let bytes = bytes.into();

        let doc = Document::load_mem(&bytes)
            .map_err(|e| Error::InvalidDocument(format!("Failed to parse PDF: {e}")))?;

        let page_count = u32::try_from(doc.get_pages().len()).unwrap_or(u32::MAX);

        let metadata = info_dictionary(&doc)
            .map(DocumentMetadata::from_info)
            .unwrap_or_default();

        let checksum = format!("{:x}", md5::compute(&bytes));

        Ok(Self {
            bytes: Arc::new(bytes),
            metadata,
            page_count,
            version: doc.version.clone(),
            encrypted: is_protected(&doc),
            checksum,
        })
    }

    /// Parse a PDF from a file path
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref()).map_err(|e| {
            Error::InvalidDocument(format!(
                "Failed to read file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_bytes(bytes)
    }

    /// Get document metadata
    pub const fn metadata(&self) -> &DocumentMetadata {
        &self.metadata
    }

    /// Get number of pages
    pub const fn page_count(&self) -> u32 {
        self.page_count
    }

    /// PDF header version
    pub fn version(&self) -> &str {
        &self.version
    }

    pub const fn is_encrypted(&self) -> bool {
        self.encrypted
    }

    /// MD5 hex digest of the document bytes.
    pub fn checksum(&self) -> &str {
        &self.checksum
    }

    /// Get raw PDF bytes as a slice.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Get raw PDF bytes as a reference-counted pointer.
    pub fn bytes_arc(&self) -> Arc<Vec<u8>> {
        Arc::clone(&self.bytes)
    }
}

impl Clone for PdfDocument {
    /// O(1) for the bytes; only the `Arc` is cloned.
    fn clone(&self) -> Self {
        Self {
            bytes: Arc::clone(&self.bytes),
            metadata: self.metadata.clone(),
            page_count: self.page_count,
            version: self.version.clone(),
            encrypted: self.encrypted,
            checksum: self.checksum.clone(),
        }
    }
}

impl std::fmt::Debug for PdfDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfDocument")
            .field("page_count", &self.page_count)
            .field("version", &self.version)
            .field("encrypted", &self.encrypted)
            .field("metadata", &self.metadata)
            .field("bytes_len", &self.bytes.len())
            .finish()
    }
}

/// Count the pages of a PDF, or 0 if it cannot be parsed.
///
/// Uploads are accepted even when page counting fails, so this never errors.
pub fn page_count(bytes: &[u8]) -> u32 {
    match Document::load_mem(bytes) {
        Ok(doc) => u32::try_from(doc.get_pages().len()).unwrap_or(u32::MAX),
        Err(e) => {
            warn!("Could not count pages: {}", e);
            0
        }
    }
}

/// Whether the source file was encrypted.
///
/// lopdf decrypts files whose user password is empty while loading them, which
/// drops `/Encrypt` from the trailer and leaves only `encryption_state` behind.
pub(crate) fn is_protected(doc: &Document) -> bool {
    doc.encryption_state.is_some() || doc.is_encrypted()
}

fn info_dictionary(doc: &Document) -> Option<&Dictionary> {
    match doc.trailer.get(b"Info").ok()? {
        Object::Reference(id) => doc.get_dictionary(*id).ok(),
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}

/// Decode a PDF text string: UTF-16BE or UTF-8 with BOM, otherwise
/// PDFDocEncoding (treated as Latin-1).
fn decode_text_string(bytes: &[u8]) -> String {
    if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = utf16
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    if let Some(utf8) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        return String::from_utf8_lossy(utf8).into_owned();
    }
    bytes.iter().copied().map(char::from).collect()
}
