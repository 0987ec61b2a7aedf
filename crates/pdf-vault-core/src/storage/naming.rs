//! Stored-name generation and validation.
//!
//! Stored names are flat: `{base}_{yyyyMMdd_HHmmss}_{uuid8}{ext}`, where
//! `base` and `ext` come from the client supplied filename with every
//! character outside `[A-Za-z0-9._-]` replaced by `_`.

use chrono::NaiveDateTime;
use uuid::Uuid;

use crate::error::{Error, Result};

const STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Base used when the supplied filename has no usable stem.
const FALLBACK_BASE: &str = "document";

/// Build a unique stored name for a client supplied filename.
///
/// Directory components are stripped. Names containing `..` are rejected.
pub fn generate_stored_name(original_name: &str, now: NaiveDateTime) -> Result<String> {
    let normalized = original_name.replace('\\', "/");
    if normalized.contains("..") {
        return Err(Error::InvalidPath(original_name.to_string()));
    }

    let file_name = normalized.rsplit('/').next().unwrap_or_default().trim();

    let (base, ext) = match file_name.rfind('.') {
        Some(dot) if dot > 0 => file_name.split_at(dot),
        _ => (file_name, ""),
    };

    let base = sanitize(base);
    let base = if base.is_empty() { FALLBACK_BASE.to_string() } else { base };

    let unique = Uuid::new_v4().simple().to_string();

    Ok(format!(
        "{base}_{}_{}{}",
        now.format(STAMP_FORMAT),
        &unique[..8],
        sanitize(ext)
    ))
}

/// Reject stored names that could escape the storage root.
pub fn validate_stored_name(stored_name: &str) -> Result<()> {
    let invalid = stored_name.is_empty()
        || stored_name.contains("..")
        || stored_name.contains('/')
        || stored_name.contains('\\')
        || stored_name.contains('\0');

    if invalid {
        return Err(Error::InvalidPath(stored_name.to_string()));
    }
    Ok(())
}

fn sanitize(part: &str) -> String {
    part.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn fixed_time() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(9, 30, 5)
            .unwrap()
    }

    #[test]
    fn test_name_layout() {
        let name = generate_stored_name("annual report.pdf", fixed_time()).unwrap();
        assert!(name.starts_with("annual_report_20240301_093005_"), "{name}");
        assert!(name.ends_with(".pdf"));
        // base + '_' + 15 char stamp + '_' + 8 hex + ".pdf"
        assert_eq!(name.len(), "annual_report".len() + 1 + 15 + 1 + 8 + 4);
    }

    #[test]
    fn test_names_are_unique() {
        let a = generate_stored_name("a.pdf", fixed_time()).unwrap();
        let b = generate_stored_name("a.pdf", fixed_time()).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_directory_components_stripped() {
        let name = generate_stored_name("C:\\Users\\me\\scan.pdf", fixed_time()).unwrap();
        assert!(name.starts_with("scan_"), "{name}");

        let name = generate_stored_name("/tmp/upload/scan.pdf", fixed_time()).unwrap();
        assert!(name.starts_with("scan_"), "{name}");
    }

    #[test]
    fn test_traversal_rejected() {
        let err = generate_stored_name("../../etc/passwd", fixed_time()).unwrap_err();
        assert!(matches!(err, Error::InvalidPath(_)));
    }

    #[test]
    fn test_missing_stem_and_extension() {
        let name = generate_stored_name("", fixed_time()).unwrap();
        assert!(name.starts_with("document_"));

        let name = generate_stored_name("README", fixed_time()).unwrap();
        assert!(name.starts_with("README_"));
        assert!(!name.contains(".pdf"));

        let name = generate_stored_name("報告.pdf", fixed_time()).unwrap();
        assert!(name.starts_with("___"), "{name}");
    }

    #[test]
    fn test_validate_stored_name() {
        assert!(validate_stored_name("report_20240301_093005_abcd1234.pdf").is_ok());
        for bad in ["", "../secret", "a/b.pdf", "a\\b.pdf", "/etc/passwd"] {
            assert!(
                matches!(validate_stored_name(bad), Err(Error::InvalidPath(_))),
                "{bad} should be rejected"
            );
        }
    }
}
