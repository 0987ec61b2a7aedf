use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default MIME type for catalogued documents
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Uploader recorded when the client does not name one
pub const DEFAULT_CREATED_BY: &str = "system";

const MAX_TITLE_LEN: usize = 255;
const MAX_CODE_LEN: usize = 100;
const MAX_NOTES_LEN: usize = 4000;

/// A catalogued document as persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRecord {
    pub id: u64,
    pub title: String,
    /// Original client filename
    pub filename: String,
    /// Stored name, relative to the blob store root
    pub file_path: String,
    pub file_size: u64,
    pub page_count: u32,
    pub product_code: Option<String>,
    pub edition: Option<String>,
    pub publication_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub content_type: String,
    /// MD5 hex of the uploaded bytes
    pub checksum: String,
    #[serde(with = "timestamp")]
    pub upload_date: NaiveDateTime,
    pub created_by: String,
    #[serde(with = "timestamp::option", default)]
    pub updated_date: Option<NaiveDateTime>,
    pub is_active: bool,
}

impl DocumentRecord {
    /// Whether any of the searchable text fields contains `needle`.
    ///
    /// `needle` must already be lowercase.
    pub(crate) fn matches(&self, needle: &str) -> bool {
        let contains = |field: &str| field.to_lowercase().contains(needle);

        contains(&self.title)
            || contains(&self.filename)
            || self.product_code.as_deref().is_some_and(contains)
            || self.edition.as_deref().is_some_and(contains)
            || self.notes.as_deref().is_some_and(contains)
    }
}

/// Fields of a record before the catalog assigns id and timestamps
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub title: String,
    pub filename: String,
    pub file_path: String,
    pub file_size: u64,
    pub page_count: u32,
    pub product_code: Option<String>,
    pub edition: Option<String>,
    pub publication_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub content_type: String,
    pub checksum: String,
    pub created_by: String,
}

impl NewDocument {
    pub(crate) fn into_record(self, id: u64, upload_date: NaiveDateTime) -> DocumentRecord {
        DocumentRecord {
            id,
            title: self.title,
            filename: self.filename,
            file_path: self.file_path,
            file_size: self.file_size,
            page_count: self.page_count,
            product_code: self.product_code,
            edition: self.edition,
            publication_date: self.publication_date,
            notes: self.notes,
            content_type: self.content_type,
            checksum: self.checksum,
            upload_date,
            created_by: self.created_by,
            updated_date: None,
            is_active: true,
        }
    }
}

/// Client supplied document metadata, for uploads and updates
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub product_code: Option<String>,
    #[serde(default)]
    pub edition: Option<String>,
    #[serde(default)]
    pub publication_date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub created_by: Option<String>,
}

impl UploadRequest {
    /// Request with only a title
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Check field presence and lengths
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::validation("title", "must not be blank"));
        }
        check_len("title", Some(&self.title), MAX_TITLE_LEN)?;
        check_len("productCode", self.product_code.as_deref(), MAX_CODE_LEN)?;
        check_len("edition", self.edition.as_deref(), MAX_CODE_LEN)?;
        check_len("notes", self.notes.as_deref(), MAX_NOTES_LEN)?;
        Ok(())
    }

    /// Uploader name, falling back to [`DEFAULT_CREATED_BY`]
    pub fn created_by_or_default(&self) -> String {
        self.created_by
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_CREATED_BY)
            .to_string()
    }
}

fn check_len(field: &str, value: Option<&str>, max: usize) -> Result<()> {
    match value {
        Some(v) if v.chars().count() > max => Err(Error::validation(
            field,
            format!("must be at most {max} characters"),
        )),
        _ => Ok(()),
    }
}

/// Public view of a record, as returned by the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSummary {
    pub id: u64,
    pub title: String,
    pub filename: String,
    pub file_size: u64,
    pub page_count: u32,
    pub product_code: Option<String>,
    pub edition: Option<String>,
    pub publication_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub content_type: String,
    #[serde(with = "timestamp")]
    pub upload_date: NaiveDateTime,
    pub created_by: String,
    #[serde(with = "timestamp::option", default)]
    pub updated_date: Option<NaiveDateTime>,
}

impl From<&DocumentRecord> for DocumentSummary {
    fn from(record: &DocumentRecord) -> Self {
        Self {
            id: record.id,
            title: record.title.clone(),
            filename: record.filename.clone(),
            file_size: record.file_size,
            page_count: record.page_count,
            product_code: record.product_code.clone(),
            edition: record.edition.clone(),
            publication_date: record.publication_date,
            notes: record.notes.clone(),
            content_type: record.content_type.clone(),
            upload_date: record.upload_date,
            created_by: record.created_by.clone(),
            updated_date: record.updated_date,
        }
    }
}

impl From<DocumentRecord> for DocumentSummary {
    fn from(record: DocumentRecord) -> Self {
        Self::from(&record)
    }
}

/// A user's saved reading position in a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bookmark {
    pub user_id: String,
    pub document_id: u64,
    pub page_number: u32,
    #[serde(rename = "bookmarkName")]
    pub name: String,
    #[serde(with = "timestamp")]
    pub created_date: NaiveDateTime,
}

/// `yyyy-MM-dd HH:mm:ss` (de)serialization for timestamps
pub mod timestamp {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&value.format(FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let s = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&s, FORMAT).map_err(serde::de::Error::custom)
    }

    pub mod option {
        use chrono::NaiveDateTime;
        use serde::{Deserialize, Deserializer, Serializer};

        #[allow(clippy::ref_option)]
        pub fn serialize<S: Serializer>(
            value: &Option<NaiveDateTime>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(v) => serializer.collect_str(&v.format(super::FORMAT)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<NaiveDateTime>, D::Error> {
            Option::<String>::deserialize(deserializer)?
                .map(|s| NaiveDateTime::parse_from_str(&s, super::FORMAT))
                .transpose()
                .map_err(serde::de::Error::custom)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn record() -> DocumentRecord {
        NewDocument {
            title: "Quarterly Report".to_string(),
            filename: "q1.pdf".to_string(),
            file_path: "q1_20240301_093005_abcd1234.pdf".to_string(),
            file_size: 1024,
            page_count: 3,
            product_code: Some("PRD-7".to_string()),
            edition: None,
            publication_date: NaiveDate::from_ymd_opt(2024, 3, 1),
            notes: Some("Board copy".to_string()),
            content_type: PDF_CONTENT_TYPE.to_string(),
            checksum: "d41d8cd98f00b204e9800998ecf8427e".to_string(),
            created_by: DEFAULT_CREATED_BY.to_string(),
        }
        .into_record(
            7,
            NaiveDate::from_ymd_opt(2024, 3, 1)
                .unwrap()
                .and_hms_opt(9, 30, 5)
                .unwrap(),
        )
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_value(DocumentSummary::from(record())).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["fileSize"], 1024);
        assert_eq!(json["productCode"], "PRD-7");
        assert_eq!(json["publicationDate"], "2024-03-01");
        assert_eq!(json["uploadDate"], "2024-03-01 09:30:05");
        assert!(json["updatedDate"].is_null());
        assert!(json.get("filePath").is_none());
        assert!(json.get("checksum").is_none());
    }

    #[test]
    fn test_record_survives_storage_encoding() {
        let mut original = record();
        original.updated_date = Some(original.upload_date);
        let bytes = serde_json::to_vec(&original).unwrap();
        let decoded: DocumentRecord = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_matches_is_case_insensitive_over_all_fields() {
        let rec = record();
        assert!(rec.matches("quarterly"));
        assert!(rec.matches("q1.pdf"));
        assert!(rec.matches("prd-7"));
        assert!(rec.matches("board"));
        assert!(!rec.matches("missing"));
    }

    #[test]
    fn test_validate() {
        assert!(UploadRequest::titled("Manual").validate().is_ok());

        let err = UploadRequest::titled("   ").validate().unwrap_err();
        assert!(matches!(err, Error::Validation { ref field, .. } if field == "title"));

        let long = UploadRequest::titled("x".repeat(256));
        assert!(long.validate().is_err());

        let mut req = UploadRequest::titled("Manual");
        req.product_code = Some("c".repeat(101));
        assert!(matches!(
            req.validate(),
            Err(Error::Validation { ref field, .. }) if field == "productCode"
        ));
    }

    #[test]
    fn test_created_by_default() {
        let mut req = UploadRequest::titled("Manual");
        assert_eq!(req.created_by_or_default(), "system");
        req.created_by = Some(" ".to_string());
        assert_eq!(req.created_by_or_default(), "system");
        req.created_by = Some("alice".to_string());
        assert_eq!(req.created_by_or_default(), "alice");
    }

    #[test]
    fn test_update_request_from_json() {
        let req: UploadRequest = serde_json::from_str(
            r#"{"title":"New","productCode":"A1","publicationDate":"2023-12-31"}"#,
        )
        .unwrap();
        assert_eq!(req.product_code.as_deref(), Some("A1"));
        assert_eq!(req.publication_date, NaiveDate::from_ymd_opt(2023, 12, 31));
        assert_eq!(req.notes, None);
    }

    #[test]
    fn test_missing_title_fails_validation_not_parsing() {
        let req: UploadRequest = serde_json::from_str(r#"{"edition":"3rd"}"#).unwrap();
        assert_eq!(req.title, "");
        assert!(matches!(
            req.validate(),
            Err(Error::Validation { ref field, .. }) if field == "title"
        ));
    }
}
