//! Integration tests for pdf-vault-core
//!
//! These tests verify the end-to-end workflow:
//! - Upload, catalogue, search and soft delete
//! - Watermarked downloads through the public API
//! - Blob store failure handling with a mock backend
//! - Engine behavior on multi-page and malformed input

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, Stream};
use pdf_vault_core::{
    BlobStore, DocumentCatalog, DocumentService, Error, FsBlobStore, PdfDocument, Result,
    UploadRequest, UploadedFile, apply_watermark, apply_watermark_at, page_count,
};

// =============================================================================
// Mock Blob Store for Testing
// =============================================================================

/// An in-memory blob store that can be told to fail deletes.
/// Lets the service's cleanup and logging paths run without a filesystem.
#[derive(Default)]
struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
    fail_deletes: bool,
}

impl MemoryBlobStore {
    fn failing_deletes() -> Self {
        Self {
            fail_deletes: true,
            ..Self::default()
        }
    }

    fn len(&self) -> usize {
        self.blobs.lock().unwrap().len()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn store(&self, bytes: &[u8], original_name: &str) -> Result<String> {
        let mut blobs = self.blobs.lock().unwrap();
        let name = format!("{}-{}", blobs.len(), original_name);
        blobs.insert(name.clone(), bytes.to_vec());
        Ok(name)
    }

    async fn load(&self, stored_name: &str) -> Result<Vec<u8>> {
        self.blobs
            .lock()
            .unwrap()
            .get(stored_name)
            .cloned()
            .ok_or_else(|| Error::BlobNotFound(stored_name.to_string()))
    }

    async fn delete(&self, stored_name: &str) -> Result<()> {
        if self.fail_deletes {
            return Err(Error::Storage("Mock delete failure".to_string()));
        }
        self.blobs.lock().unwrap().remove(stored_name);
        Ok(())
    }
}

// =============================================================================
// Test Fixtures
// =============================================================================

/// Build a PDF with `pages` US Letter pages that share one inherited media box
fn test_pdf(pages: usize) -> Vec<u8> {
    let mut doc = Document::with_version("1.4");
    let page_tree_id = doc.new_object_id();

    let mut kids = Vec::new();
    for n in 0..pages {
        let content = Content {
            operations: vec![
                // Deliberately unbalanced graphics state
                Operation::new("q", vec![]),
                Operation::new("g", vec![Object::Real(0.9)]),
                Operation::new("BT", vec![]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(
            Dictionary::new(),
            content.encode().expect("content encodes"),
        ));
        let page_id = doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(page_tree_id)),
            ("Contents", Object::Reference(content_id)),
            ("Rotate", Object::Integer(if n % 2 == 0 { 0 } else { 90 })),
        ]));
        kids.push(Object::Reference(page_id));
    }

    let count = i64::try_from(kids.len()).expect("page count fits");
    doc.objects.insert(
        page_tree_id,
        Object::Dictionary(Dictionary::from_iter([
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(kids)),
            ("Count", Object::Integer(count)),
            (
                "MediaBox",
                Object::Array(vec![0.into(), 0.into(), 612.into(), 792.into()]),
            ),
        ])),
    );

    let catalog_id = doc.add_object(Dictionary::from_iter([
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(page_tree_id)),
    ]));
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut output = Vec::new();
    doc.save_to(&mut output).expect("test PDF saves");
    output
}

fn pdf_upload(name: &str, pages: usize) -> UploadedFile {
    UploadedFile {
        filename: name.to_string(),
        content_type: Some("application/pdf".to_string()),
        bytes: test_pdf(pages),
    }
}

fn memory_service(blobs: Arc<MemoryBlobStore>) -> DocumentService {
    DocumentService::new(
        DocumentCatalog::temporary().expect("temporary catalog"),
        blobs,
        10 * 1024 * 1024,
    )
    .expect("service builds")
}

// =============================================================================
// Watermark Engine Tests
// =============================================================================

#[test]
fn test_watermark_preserves_page_count() {
    let source = test_pdf(4);
    let output = apply_watermark(&source, "Inventory").expect("watermark succeeds");

    assert!(output.starts_with(b"%PDF"), "Output should be a PDF");
    assert_eq!(page_count(&output), 4);
}

#[test]
fn test_watermark_with_fixed_timestamp() {
    let source = test_pdf(1);
    let output =
        apply_watermark_at(&source, "Inventory", "2024-01-02 03:04:05").expect("watermark succeeds");

    let doc = Document::load_mem(&output).expect("output parses");
    let page_id = *doc.get_pages().get(&1).expect("first page");
    let content = doc.get_page_content(page_id).expect("page content");
    let text = String::from_utf8_lossy(&content);

    assert!(text.contains("CONFIDENTIAL - Inventory - Downloaded: 2024-01-02 03:04:05"));
}

#[test]
fn test_watermark_rejects_garbage() {
    let result = apply_watermark(&[0, 1, 2, 3], "x");
    assert!(matches!(result, Err(Error::InvalidDocument(_))));
}

#[test]
fn test_watermarked_output_is_loadable_as_document() {
    let output = apply_watermark(&test_pdf(2), "Inventory").expect("watermark succeeds");
    let doc = PdfDocument::from_bytes(output).expect("output parses");
    assert_eq!(doc.page_count(), 2);
}

// =============================================================================
// Document Workflow Tests
// =============================================================================

#[tokio::test]
async fn test_upload_search_download_delete() {
    let dir = tempfile::tempdir().expect("temp dir");
    let blobs = FsBlobStore::new(dir.path().join("uploads")).expect("blob store");
    let catalog = DocumentCatalog::open(dir.path().join("catalog")).expect("catalog");
    let service = DocumentService::new(catalog, Arc::new(blobs), 10 * 1024 * 1024)
        .expect("service builds");

    let mut request = UploadRequest::titled("Pump Service Manual");
    request.product_code = Some("PX-200".to_string());
    let uploaded = service
        .upload(pdf_upload("pump.pdf", 3), request)
        .await
        .expect("upload succeeds");
    assert_eq!(uploaded.page_count, 3);

    service
        .upload(pdf_upload("other.pdf", 1), UploadRequest::default())
        .await
        .expect("upload succeeds");

    assert_eq!(service.search("px-2").expect("search").len(), 1);
    assert_eq!(service.search("").expect("search").len(), 2);
    assert_eq!(service.find_by_product_code("PX-200").expect("lookup").len(), 1);

    let (record, bytes) = service
        .download_watermarked(uploaded.document_id)
        .await
        .expect("download succeeds");
    assert_eq!(record.title, "Pump Service Manual");
    assert_eq!(page_count(&bytes), 3);

    assert!(service.delete(uploaded.document_id).await.expect("delete"));
    assert_eq!(service.count().expect("count"), 1);
    assert!(matches!(
        service.download_watermarked(uploaded.document_id).await,
        Err(Error::NotFound(_))
    ));
}

#[tokio::test]
async fn test_delete_survives_blob_failure() {
    let blobs = Arc::new(MemoryBlobStore::failing_deletes());
    let service = memory_service(Arc::clone(&blobs));

    let id = service
        .upload(pdf_upload("a.pdf", 1), UploadRequest::default())
        .await
        .expect("upload succeeds")
        .document_id;

    // The record is soft-deleted even though the file could not be removed
    assert!(service.delete(id).await.expect("delete reports success"));
    assert_eq!(blobs.len(), 1);
    assert!(matches!(service.get(id), Err(Error::NotFound(_))));
}

#[tokio::test]
async fn test_missing_blob_is_reported() {
    let blobs = Arc::new(MemoryBlobStore::default());
    let service = memory_service(Arc::clone(&blobs));

    let id = service
        .upload(pdf_upload("a.pdf", 1), UploadRequest::default())
        .await
        .expect("upload succeeds")
        .document_id;
    let (record, _) = service.view(id).await.expect("view succeeds");

    blobs.blobs.lock().unwrap().remove(&record.file_path);

    assert!(matches!(
        service.download_watermarked(id).await,
        Err(Error::BlobNotFound(_))
    ));
}

#[tokio::test]
async fn test_corrupt_stored_file_fails_download() {
    let blobs = Arc::new(MemoryBlobStore::default());
    let service = memory_service(Arc::clone(&blobs));

    let upload = UploadedFile {
        filename: "corrupt.pdf".to_string(),
        content_type: Some("application/pdf".to_string()),
        bytes: b"%PDF-1.7\nthis is not a real document".to_vec(),
    };
    let id = service
        .upload(upload, UploadRequest::titled("Corrupt"))
        .await
        .expect("upload is accepted with zero pages")
        .document_id;

    assert_eq!(service.get(id).expect("get").page_count, 0);
    assert!(matches!(
        service.download_watermarked(id).await,
        Err(Error::InvalidDocument(_))
    ));
}
