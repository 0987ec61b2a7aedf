//! Document routes - listing, lookup, search, update and delete.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use pdf_vault_core::{DocumentSummary, UploadRequest};
use std::sync::Arc;
use tracing::debug;

use super::SearchQuery;
use crate::helpers::{ApiResponse, OptionExt, RouteResult};
use crate::state::AppState;

type JsonResponse<T> = Json<ApiResponse<T>>;

/// Liveness check.
pub async fn test_endpoint() -> JsonResponse<()> {
    debug!("Test endpoint called");
    ApiResponse::message("Controller is working!")
}

/// All active documents, newest first.
pub async fn list_documents(
    State(state): State<Arc<AppState>>,
) -> RouteResult<JsonResponse<Vec<DocumentSummary>>> {
    Ok(ApiResponse::ok(state.service.list()?))
}

pub async fn get_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> RouteResult<JsonResponse<DocumentSummary>> {
    Ok(ApiResponse::ok(state.service.get(id)?))
}

pub async fn update_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    Json(request): Json<UploadRequest>,
) -> RouteResult<JsonResponse<DocumentSummary>> {
    let document = state.service.update(id, &request)?;
    Ok(ApiResponse::ok_with_message("Document updated successfully", document))
}

/// Soft delete; 404 when there is no active document with this id.
pub async fn delete_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> RouteResult<JsonResponse<()>> {
    state
        .service
        .delete(id)
        .await?
        .then_some(())
        .or_not_found(&format!("Document not found with id {id}"))?;
    Ok(ApiResponse::message("Document deleted successfully"))
}

/// Keyword search over title, filename, product code, edition and notes.
pub async fn search_documents(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> RouteResult<JsonResponse<Vec<DocumentSummary>>> {
    let query = query.query.unwrap_or_default();
    Ok(ApiResponse::ok(state.service.search(&query)?))
}

pub async fn count_documents(State(state): State<Arc<AppState>>) -> RouteResult<JsonResponse<u64>> {
    Ok(ApiResponse::ok(state.service.count()?))
}

pub async fn documents_by_product_code(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> RouteResult<JsonResponse<Vec<DocumentSummary>>> {
    Ok(ApiResponse::ok(state.service.find_by_product_code(&code)?))
}

pub async fn documents_by_edition(
    State(state): State<Arc<AppState>>,
    Path(edition): Path<String>,
) -> RouteResult<JsonResponse<Vec<DocumentSummary>>> {
    Ok(ApiResponse::ok(state.service.find_by_edition(&edition)?))
}
