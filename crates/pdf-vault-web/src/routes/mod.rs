//! HTTP routes for the document vault API.
//!
//! Everything lives under [`API_BASE`] and answers with the JSON envelope from
//! [`crate::helpers::ApiResponse`], except the two file routes which stream PDF bytes.

mod bookmarks;
mod documents;
mod files;
mod upload;

pub use bookmarks::{add_bookmark, get_bookmark, list_bookmarks, remove_bookmark};
pub use documents::{
    count_documents, delete_document, documents_by_edition, documents_by_product_code,
    get_document, list_documents, search_documents, test_endpoint, update_document,
};
pub use files::{download_document, view_document};
pub use upload::upload_document;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use serde::Deserialize as SerdeDeserialize;
use std::sync::Arc;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;

/// Mount point of the API.
pub const API_BASE: &str = "/api/pdf";

/// Room for multipart boundaries and text fields on top of the file itself.
const MULTIPART_OVERHEAD: u64 = 1024 * 1024;

/// Query params for search.
#[derive(SerdeDeserialize, Default)]
pub struct SearchQuery {
    #[serde(default)]
    pub query: Option<String>,
}

/// Query params for saving a bookmark.
#[derive(SerdeDeserialize, Default)]
pub struct BookmarkQuery {
    /// 1-based page number, defaults to 1
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    let body_limit = usize::try_from(state.config.storage.max_file_size + MULTIPART_OVERHEAD)
        .unwrap_or(usize::MAX);

    let api = Router::new()
        .route("/test", get(test_endpoint))
        .route("/upload", post(upload_document))
        .route("/documents", get(list_documents))
        .route("/search", get(search_documents))
        .route("/count", get(count_documents))
        .route("/product/{code}", get(documents_by_product_code))
        .route("/edition/{edition}", get(documents_by_edition))
        .route(
            "/document/{id}",
            get(get_document).put(update_document).delete(delete_document),
        )
        .route("/view/{id}", get(view_document))
        .route("/download/{id}", get(download_document))
        .route(
            "/bookmark/{document_id}",
            post(add_bookmark).get(get_bookmark).delete(remove_bookmark),
        )
        .route("/bookmarks", get(list_bookmarks));

    Router::new()
        .nest(API_BASE, api)
        .layer(CompressionLayer::new())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
