//! File routes - inline viewing and watermarked downloads.

use axum::{
    body::Body,
    extract::{Path, State},
    http::{StatusCode, header},
    response::Response,
};
use std::sync::Arc;

use crate::helpers::{ResultExt, RouteResult, content_disposition};
use crate::state::AppState;

/// Serve the original PDF inline, never cached.
pub async fn view_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> RouteResult<Response> {
    let (record, bytes) = state.service.view(id).await?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, record.content_type)
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition("inline", &record.filename),
        )
        .header(header::CACHE_CONTROL, "no-cache, no-store, must-revalidate")
        .header(header::PRAGMA, "no-cache")
        .header(header::EXPIRES, "0")
        .body(Body::from(bytes))
        .or_internal_error()
}

/// Download a watermarked copy labelled with the document title.
pub async fn download_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> RouteResult<Response> {
    let (record, bytes) = state.service.download_watermarked(id).await?;

    let download_name = format!("watermarked_{}", record.filename);

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/pdf")
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition("attachment", &download_name),
        )
        .header(header::CONTENT_LENGTH, bytes.len())
        .body(Body::from(bytes))
        .or_internal_error()
}
