//! Upload route - multipart PDF upload handling.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use axum_extra::extract::Multipart;
use chrono::NaiveDate;
use pdf_vault_core::{UploadRequest, UploadResponse, UploadedFile};
use std::sync::Arc;
use tracing::{info, warn};

use crate::helpers::{ApiError, ApiResponse, ResultExt, RouteResult};
use crate::state::AppState;

const GENERIC_BINARY: &str = "application/octet-stream";

/// Upload a PDF with optional catalog metadata.
///
/// Expects a `file` part plus optional `title`, `productCode`, `edition`,
/// `publicationDate` (YYYY-MM-DD), `notes` and `createdBy` text parts.
pub async fn upload_document(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> RouteResult<Json<ApiResponse<UploadResponse>>> {
    let mut file: Option<UploadedFile> = None;
    let mut request = UploadRequest::default();

    while let Some(field) = multipart.next_field().await.or_bad_request()? {
        let name = field.name().unwrap_or("").to_string();

        if name == "file" {
            let filename = field.file_name().unwrap_or("document.pdf").to_string();
            let content_type = declared_content_type(field.content_type(), &filename);
            let bytes = field.bytes().await.or_bad_request()?;

            info!(
                "Upload received: {} ({} bytes, {})",
                filename,
                bytes.len(),
                content_type.as_deref().unwrap_or("no content type")
            );

            file = Some(UploadedFile {
                filename,
                content_type,
                bytes: bytes.to_vec(),
            });
            continue;
        }

        let value = field.text().await.or_bad_request()?;
        let value = value.trim();
        let text = (!value.is_empty()).then(|| value.to_string());

        match name.as_str() {
            "title" => request.title = text.unwrap_or_default(),
            "productCode" => request.product_code = text,
            "edition" => request.edition = text,
            "notes" => request.notes = text,
            "createdBy" => request.created_by = text,
            "publicationDate" => request.publication_date = text.and_then(|s| parse_date(&s)),
            other => warn!("Ignoring unknown upload field '{}'", other),
        }
    }

    let file = file.ok_or_else(|| {
        ApiError::Status(StatusCode::BAD_REQUEST, "No file uploaded".to_string())
    })?;

    let response = state.service.upload(file, request).await?;
    Ok(ApiResponse::ok_with_message(
        "Document uploaded successfully",
        response,
    ))
}

/// Content type of the file part, guessed from the filename when the client
/// sent none or a generic binary type.
fn declared_content_type(declared: Option<&str>, filename: &str) -> Option<String> {
    match declared {
        Some(ct) if !ct.is_empty() && ct != GENERIC_BINARY => Some(ct.to_string()),
        _ => mime_guess::from_path(filename)
            .first_raw()
            .map(str::to_string)
            .or_else(|| declared.map(str::to_string)),
    }
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| warn!("Could not parse publication date '{}': {}", value, e))
        .ok()
}
