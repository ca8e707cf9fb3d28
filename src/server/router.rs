use std::sync::Arc;

use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::server::handlers::{chat, documents, health};
use crate::state::AppState;

/// Creates the application router with all routes and middleware.
///
/// The HTTP surface is a thin shell: handlers validate input, call the
/// injected core components, and map typed core errors to status codes.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/chat", post(chat::chat))
        .route("/documents/upload", post(documents::upload_document))
        .route(
            "/documents/process-storage",
            post(documents::process_storage_document),
        )
        .route("/documents", get(documents::list_documents))
        .route("/documents/:document_id", delete(documents::delete_document))
        .route("/search", get(documents::search_documents))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
