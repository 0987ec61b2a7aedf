use chrono::Local;
use sled::{Db, Tree};
use std::path::Path;
use tracing::{debug, info};

use super::bookmarks::BookmarkStore;
use super::record::{DocumentRecord, NewDocument, UploadRequest};
use crate::error::{Error, Result};

const DOCUMENTS_TREE: &str = "documents";

/// Persistent document records with soft delete.
///
/// Records are stored as JSON under their big-endian id. Inactive records are
/// kept but hidden from every query except [`DocumentCatalog::find_any_by_id`].
#[derive(Clone)]
pub struct DocumentCatalog {
    db: Db,
    documents: Tree,
}

impl DocumentCatalog {
    /// Open the catalog stored at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_db(super::open_db(path.as_ref())?)
    }

    /// Catalog that lives only as long as this value (used by tests and demos)
    pub fn temporary() -> Result<Self> {
        Self::from_db(super::temporary_db()?)
    }

    fn from_db(db: Db) -> Result<Self> {
        let documents = db.open_tree(DOCUMENTS_TREE)?;
        Ok(Self { db, documents })
    }

    /// Bookmark store sharing this catalog's database
    pub fn bookmarks(&self) -> Result<BookmarkStore> {
        BookmarkStore::open(&self.db)
    }

    /// Insert a new record, assigning id and upload date
    pub fn save(&self, new: NewDocument) -> Result<DocumentRecord> {
        let id = self.db.generate_id()? + 1;
        let record = new.into_record(id, Local::now().naive_local());
        self.put(&record)?;
        info!("Catalogued document {} ({})", record.id, record.filename);
        Ok(record)
    }

    /// Active record by id
    pub fn find_by_id(&self, id: u64) -> Result<Option<DocumentRecord>> {
        Ok(self.find_any_by_id(id)?.filter(|r| r.is_active))
    }

    /// Record by id, including soft-deleted ones
    pub fn find_any_by_id(&self, id: u64) -> Result<Option<DocumentRecord>> {
        self.documents
            .get(id.to_be_bytes())?
            .map(|bytes| serde_json::from_slice(&bytes).map_err(Error::from))
            .transpose()
    }

    /// All active records, newest upload first
    pub fn list_active(&self) -> Result<Vec<DocumentRecord>> {
        self.active_where(|_| true)
    }

    /// Case-insensitive substring search over title, filename, product
    /// code, edition and notes. A blank query returns every active record.
    pub fn search(&self, query: &str) -> Result<Vec<DocumentRecord>> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return self.list_active();
        }
        self.active_where(|r| r.matches(&needle))
    }

    /// Active records with exactly this product code
    pub fn find_by_product_code(&self, code: &str) -> Result<Vec<DocumentRecord>> {
        self.active_where(|r| r.product_code.as_deref() == Some(code))
    }

    /// Active records with exactly this edition
    pub fn find_by_edition(&self, edition: &str) -> Result<Vec<DocumentRecord>> {
        self.active_where(|r| r.edition.as_deref() == Some(edition))
    }

    /// Replace the editable metadata of an active record
    pub fn update(&self, id: u64, request: &UploadRequest) -> Result<DocumentRecord> {
        let record = self
            .modify_active(id, |record| {
                record.title.clone_from(&request.title);
                record.product_code.clone_from(&request.product_code);
                record.edition.clone_from(&request.edition);
                record.publication_date = request.publication_date;
                record.notes.clone_from(&request.notes);
                record.updated_date = Some(Local::now().naive_local());
            })?
            .ok_or(Error::NotFound(id))?;

        info!("Updated document {}", id);
        Ok(record)
    }

    /// Mark a record inactive.
    ///
    /// Returns the deactivated record, or `None` if it was absent or already
    /// inactive.
    pub fn soft_delete(&self, id: u64) -> Result<Option<DocumentRecord>> {
        let record = self.modify_active(id, |record| {
            record.is_active = false;
            record.updated_date = Some(Local::now().naive_local());
        })?;

        if record.is_some() {
            info!("Soft-deleted document {}", id);
        }
        Ok(record)
    }

    /// Number of active records
    pub fn count(&self) -> Result<u64> {
        let mut count = 0;
        for record in self.records() {
            if record?.is_active {
                count += 1;
            }
        }
        Ok(count)
    }

    fn put(&self, record: &DocumentRecord) -> Result<()> {
        let bytes = serde_json::to_vec(record)?;
        self.documents.insert(record.id.to_be_bytes(), bytes)?;

        // Flush to ensure persistence
        self.flush()
    }

    /// Apply `change` to an active record and write it back atomically.
    ///
    /// The write only lands if the stored bytes are still the ones `change`
    /// saw, so a concurrent soft delete can never be overwritten by a stale
    /// active copy. Returns `None` if the record is absent or inactive.
    fn modify_active(
        &self,
        id: u64,
        change: impl Fn(&mut DocumentRecord),
    ) -> Result<Option<DocumentRecord>> {
        let key = id.to_be_bytes();

        loop {
            let Some(current) = self.documents.get(key)? else {
                return Ok(None);
            };
            let mut record: DocumentRecord = serde_json::from_slice(&current)?;
            if !record.is_active {
                return Ok(None);
            }

            change(&mut record);
            let updated = serde_json::to_vec(&record)?;

            match self
                .documents
                .compare_and_swap(key, Some(&current), Some(updated))?
            {
                Ok(()) => {
                    self.flush()?;
                    return Ok(Some(record));
                }
                Err(_) => debug!("Document {} changed concurrently, retrying", id),
            }
        }
    }

    fn flush(&self) -> Result<()> {
        self.documents
            .flush()
            .map_err(|e| Error::Catalog(format!("Flush failed: {e}")))?;
        Ok(())
    }

    fn records(&self) -> impl Iterator<Item = Result<DocumentRecord>> + '_ {
        self.documents
            .iter()
            .values()
            .map(|value| -> Result<DocumentRecord> { Ok(serde_json::from_slice(&value?)?) })
    }

    fn active_where(&self, predicate: impl Fn(&DocumentRecord) -> bool) -> Result<Vec<DocumentRecord>> {
        let mut matches = Vec::new();
        for record in self.records() {
            let record = record?;
            if record.is_active && predicate(&record) {
                matches.push(record);
            }
        }

        // Newest first; ids break ties between uploads in the same second
        matches.sort_by(|a, b| b.upload_date.cmp(&a.upload_date).then(b.id.cmp(&a.id)));
        debug!("Catalog query matched {} record(s)", matches.len());
        Ok(matches)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::catalog::record::{DEFAULT_CREATED_BY, PDF_CONTENT_TYPE};

    fn new_document(title: &str, product_code: Option<&str>, edition: Option<&str>) -> NewDocument {
        NewDocument {
            title: title.to_string(),
            filename: format!("{}.pdf", title.to_lowercase().replace(' ', "_")),
            file_path: format!("{}_stored.pdf", title.to_lowercase().replace(' ', "_")),
            file_size: 100,
            page_count: 2,
            product_code: product_code.map(str::to_string),
            edition: edition.map(str::to_string),
            publication_date: None,
            notes: None,
            content_type: PDF_CONTENT_TYPE.to_string(),
            checksum: "0".repeat(32),
            created_by: DEFAULT_CREATED_BY.to_string(),
        }
    }

    #[test]
    fn test_save_assigns_ids_from_one() {
        let catalog = DocumentCatalog::temporary().unwrap();
        let first = catalog.save(new_document("Alpha", None, None)).unwrap();
        let second = catalog.save(new_document("Beta", None, None)).unwrap();

        assert_eq!(first.id, 1);
        assert!(second.id > first.id);
        assert!(first.is_active);
        assert_eq!(first.updated_date, None);
        assert_eq!(catalog.find_by_id(first.id).unwrap(), Some(first));
    }

    #[test]
    fn test_list_newest_first() {
        let catalog = DocumentCatalog::temporary().unwrap();
        let a = catalog.save(new_document("Alpha", None, None)).unwrap();
        let b = catalog.save(new_document("Beta", None, None)).unwrap();

        let ids: Vec<u64> = catalog.list_active().unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![b.id, a.id]);
    }

    #[test]
    fn test_soft_delete_hides_record() {
        let catalog = DocumentCatalog::temporary().unwrap();
        let kept = catalog.save(new_document("Kept", None, None)).unwrap();
        let gone = catalog.save(new_document("Gone", Some("G-1"), None)).unwrap();

        let deleted = catalog.soft_delete(gone.id).unwrap().unwrap();
        assert!(!deleted.is_active);
        assert!(deleted.updated_date.is_some());

        assert_eq!(catalog.find_by_id(gone.id).unwrap(), None);
        assert_eq!(catalog.count().unwrap(), 1);
        assert_eq!(catalog.list_active().unwrap(), vec![kept]);
        assert!(catalog.search("gone").unwrap().is_empty());
        assert!(catalog.find_by_product_code("G-1").unwrap().is_empty());

        // Still physically present
        assert!(catalog.find_any_by_id(gone.id).unwrap().is_some());

        // Second delete finds nothing to do
        assert_eq!(catalog.soft_delete(gone.id).unwrap(), None);
        assert!(matches!(
            catalog.update(gone.id, &UploadRequest::titled("x")),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_search() {
        let catalog = DocumentCatalog::temporary().unwrap();
        catalog.save(new_document("Service Manual", Some("SM-100"), Some("2nd"))).unwrap();
        let mut with_notes = new_document("Parts List", None, None);
        with_notes.notes = Some("Includes HYDRAULIC pumps".to_string());
        catalog.save(with_notes).unwrap();

        assert_eq!(catalog.search("MANUAL").unwrap().len(), 1);
        assert_eq!(catalog.search("sm-1").unwrap().len(), 1);
        assert_eq!(catalog.search("2ND").unwrap().len(), 1);
        assert_eq!(catalog.search("hydraulic").unwrap().len(), 1);
        assert_eq!(catalog.search("parts_list.pdf").unwrap().len(), 1);
        assert!(catalog.search("nothing").unwrap().is_empty());
        assert_eq!(catalog.search("  ").unwrap().len(), 2);
    }

    #[test]
    fn test_exact_lookups() {
        let catalog = DocumentCatalog::temporary().unwrap();
        catalog.save(new_document("A", Some("X-1"), Some("2024"))).unwrap();
        catalog.save(new_document("B", Some("X-10"), Some("2024"))).unwrap();

        assert_eq!(catalog.find_by_product_code("X-1").unwrap().len(), 1);
        assert_eq!(catalog.find_by_edition("2024").unwrap().len(), 2);
        assert!(catalog.find_by_edition("2023").unwrap().is_empty());
    }

    #[test]
    fn test_update_replaces_metadata() {
        let catalog = DocumentCatalog::temporary().unwrap();
        let saved = catalog.save(new_document("Draft", Some("D-1"), None)).unwrap();

        let mut request = UploadRequest::titled("Final");
        request.edition = Some("1st".to_string());
        let updated = catalog.update(saved.id, &request).unwrap();

        assert_eq!(updated.title, "Final");
        assert_eq!(updated.product_code, None);
        assert_eq!(updated.edition.as_deref(), Some("1st"));
        assert_eq!(updated.filename, saved.filename);
        assert_eq!(updated.created_by, saved.created_by);
        assert!(updated.updated_date.is_some());
        assert_eq!(catalog.find_by_id(saved.id).unwrap(), Some(updated));
    }

    #[test]
    fn test_update_racing_soft_delete_never_resurrects() {
        let catalog = DocumentCatalog::temporary().unwrap();

        for round in 0..200 {
            let saved = catalog
                .save(new_document(&format!("Doc {round}"), None, None))
                .unwrap();

            let (updated, deleted) = std::thread::scope(|scope| {
                let writer = scope.spawn(|| catalog.update(saved.id, &UploadRequest::titled("Edited")));
                let deleter = scope.spawn(|| catalog.soft_delete(saved.id));
                (writer.join().unwrap(), deleter.join().unwrap())
            });

            // The delete always wins eventually: either it ran last, or the
            // update saw the inactive record and reported NotFound.
            assert!(deleted.unwrap().is_some(), "round {round}");
            assert_eq!(catalog.find_by_id(saved.id).unwrap(), None, "round {round}");
            match updated {
                Ok(record) => assert_eq!(record.title, "Edited"),
                Err(e) => assert!(matches!(e, Error::NotFound(_))),
            }
        }
    }

    #[test]
    fn test_missing_id() {
        let catalog = DocumentCatalog::temporary().unwrap();
        assert_eq!(catalog.find_by_id(42).unwrap(), None);
        assert_eq!(catalog.soft_delete(42).unwrap(), None);
        assert_eq!(catalog.count().unwrap(), 0);
    }
}
