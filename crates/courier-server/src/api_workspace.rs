//! Read-only workspace passthrough: agent memory and the file listing.

use crate::{api::ApiError, AppState};
use axum::{extract::Extension, Json};
use courier_uploads::MemorySnapshot;
use serde_json::{json, Value};
use std::sync::Arc;

/// Handler for `GET /memory`.
pub async fn memory_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<MemorySnapshot>, ApiError> {
    let Some(root) = state.workspace.clone() else {
        return Ok(Json(MemorySnapshot::default()));
    };

    let snapshot = tokio::task::spawn_blocking(move || courier_uploads::read_memory(&root))
        .await
        .map_err(|e| ApiError::InternalServerError(format!("task join error: {}", e)))?
        .map_err(|e| {
            tracing::error!(error = %e, "failed to read agent memory");
            ApiError::InternalServerError(format!("failed to read memory: {}", e))
        })?;

    Ok(Json(snapshot))
}

/// Handler for `GET /files`.
pub async fn files_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Value>, ApiError> {
    let files = match state.workspace.clone() {
        Some(root) => tokio::task::spawn_blocking(move || courier_uploads::list_files(&root))
            .await
            .map_err(|e| ApiError::InternalServerError(format!("task join error: {}", e)))?,
        None => Vec::new(),
    };

    Ok(Json(json!({ "files": files })))
}
