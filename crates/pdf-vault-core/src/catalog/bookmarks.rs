use chrono::Local;
use sled::{Db, Tree};

use super::record::Bookmark;
use crate::error::{Error, Result};

const BOOKMARKS_TREE: &str = "bookmarks";

/// One bookmark per (user, document), keyed `user \0 document_id`
#[derive(Clone)]
pub struct BookmarkStore {
    tree: Tree,
}

impl BookmarkStore {
    pub(crate) fn open(db: &Db) -> Result<Self> {
        Ok(Self {
            tree: db.open_tree(BOOKMARKS_TREE)?,
        })
    }

    fn key(user_id: &str, document_id: u64) -> Vec<u8> {
        let mut key = Self::user_prefix(user_id);
        key.extend_from_slice(&document_id.to_be_bytes());
        key
    }

    fn user_prefix(user_id: &str) -> Vec<u8> {
        let mut prefix = user_id.as_bytes().to_vec();
        prefix.push(0);
        prefix
    }

    /// Create or replace the user's bookmark for a document.
    ///
    /// Replacing refreshes the creation date.
    pub fn upsert(
        &self,
        user_id: &str,
        document_id: u64,
        page_number: u32,
        name: &str,
    ) -> Result<Bookmark> {
        let bookmark = Bookmark {
            user_id: user_id.to_string(),
            document_id,
            page_number,
            name: name.to_string(),
            created_date: Local::now().naive_local(),
        };

        self.tree
            .insert(Self::key(user_id, document_id), serde_json::to_vec(&bookmark)?)?;
        self.tree
            .flush()
            .map_err(|e| Error::Catalog(format!("Flush failed: {e}")))?;

        Ok(bookmark)
    }

    /// The user's bookmark for one document
    pub fn find(&self, user_id: &str, document_id: u64) -> Result<Option<Bookmark>> {
        self.tree
            .get(Self::key(user_id, document_id))?
            .map(|bytes| serde_json::from_slice(&bytes).map_err(Error::from))
            .transpose()
    }

    /// All of a user's bookmarks, most recently set first
    pub fn list_for_user(&self, user_id: &str) -> Result<Vec<Bookmark>> {
        let mut bookmarks = self
            .tree
            .scan_prefix(Self::user_prefix(user_id))
            .values()
            .map(|value| -> Result<Bookmark> { Ok(serde_json::from_slice(&value?)?) })
            .collect::<Result<Vec<_>>>()?;

        bookmarks.sort_by(|a, b| b.created_date.cmp(&a.created_date));
        Ok(bookmarks)
    }

    /// Remove the user's bookmark for a document. Returns whether one existed.
    pub fn remove(&self, user_id: &str, document_id: u64) -> Result<bool> {
        let removed = self.tree.remove(Self::key(user_id, document_id))?;
        Ok(removed.is_some())
    }
}
