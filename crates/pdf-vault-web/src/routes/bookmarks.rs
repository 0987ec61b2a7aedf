//! Bookmark routes - per-caller reading positions.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use pdf_vault_core::Bookmark;
use std::sync::Arc;

use super::BookmarkQuery;
use crate::helpers::{ApiResponse, ClientId, RouteResult};
use crate::state::AppState;

/// Create or move the caller's bookmark for a document.
pub async fn add_bookmark(
    State(state): State<Arc<AppState>>,
    Path(document_id): Path<u64>,
    Query(query): Query<BookmarkQuery>,
    ClientId(user): ClientId,
) -> RouteResult<Json<ApiResponse<Bookmark>>> {
    let bookmark =
        state
            .service
            .add_bookmark(document_id, &user, query.page, query.name.as_deref())?;
    Ok(ApiResponse::ok_with_message("Bookmark saved", bookmark))
}

pub async fn get_bookmark(
    State(state): State<Arc<AppState>>,
    Path(document_id): Path<u64>,
    ClientId(user): ClientId,
) -> RouteResult<Json<ApiResponse<Bookmark>>> {
    Ok(ApiResponse::ok(state.service.bookmark_for(&user, document_id)?))
}

pub async fn remove_bookmark(
    State(state): State<Arc<AppState>>,
    Path(document_id): Path<u64>,
    ClientId(user): ClientId,
) -> RouteResult<Json<ApiResponse<()>>> {
    let message = if state.service.remove_bookmark(&user, document_id)? {
        "Bookmark removed"
    } else {
        "No bookmark to remove"
    };
    Ok(ApiResponse::message(message))
}

/// The caller's bookmarks, most recent first.
pub async fn list_bookmarks(
    State(state): State<Arc<AppState>>,
    ClientId(user): ClientId,
) -> RouteResult<Json<ApiResponse<Vec<Bookmark>>>> {
    Ok(ApiResponse::ok(state.service.user_bookmarks(&user)?))
}
