use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::errors::ApiError;
use crate::index::DEFAULT_LIST_LIMIT;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct DocumentUploadRequest {
    pub title: String,
    pub content: String,
    pub metadata: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct ProcessStorageRequest {
    pub bucket: String,
    pub key: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub query: String,
    pub max_results: Option<i64>,
}

pub async fn upload_document(
    State(state): State<Arc<AppState>>,
    Json(request): Json<DocumentUploadRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let report = state
        .processor
        .process_direct(&request.title, &request.content, request.metadata)
        .await?;

    Ok(Json(json!({
        "message": "Document processed successfully",
        "document_id": report.document_id,
        "title": report.title,
        "content_length": report.content_length,
    })))
}

pub async fn process_storage_document(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ProcessStorageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let report = state
        .processor
        .process_object(&request.bucket, &request.key)
        .await?;

    Ok(Json(json!({
        "message": "Storage document processed successfully",
        "document_id": report.document_id,
        "bucket": request.bucket,
        "key": request.key,
        "content_length": report.content_length,
    })))
}

pub async fn list_documents(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let documents = state.index.list(DEFAULT_LIST_LIMIT).await?;
    Ok(Json(json!({ "documents": documents })))
}

pub async fn delete_document(
    State(state): State<Arc<AppState>>,
    Path(document_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.index.delete(&document_id).await?;
    Ok(Json(json!({ "message": "Document deleted successfully" })))
}

pub async fn search_documents(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<impl IntoResponse, ApiError> {
    if params.query.trim().is_empty() {
        return Err(ApiError::BadRequest("query must not be empty".into()));
    }

    let results = state
        .rag
        .retriever()
        .retrieve(&params.query, params.max_results)
        .await?;
    Ok(Json(json!({ "results": results })))
}
