//! Upload API handler for JSON-encoded file batches.
//!
//! Files arrive base64-encoded inside a JSON body and are written under the
//! agent workspace so the agent can read them with its own file tools.

use crate::{
    api::{parse_json_body, ApiError},
    AppState,
};
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, Extension},
    Json,
};
use serde_json::{json, Value};
use std::sync::Arc;

/// Handler for `POST /uploads`.
pub async fn uploads_handler(
    Extension(state): Extension<Arc<AppState>>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<Value>, ApiError> {
    let Some(root) = state.workspace.clone() else {
        return Err(ApiError::InternalServerError(
            "workspace unavailable".to_string(),
        ));
    };

    let mut payload = parse_json_body(body)?;
    let files = match payload.get_mut("files").map(Value::take) {
        Some(Value::Array(files)) if !files.is_empty() => files,
        _ => return Err(ApiError::BadRequest("files list required".to_string())),
    };
    let count = files.len();

    let saved = tokio::task::spawn_blocking(move || courier_uploads::ingest(&root, &files))
        .await
        .map_err(|e| ApiError::InternalServerError(format!("task join error: {}", e)))??;

    tracing::info!(requested = count, saved = saved.len(), "upload batch stored");
    Ok(Json(json!({ "saved_files": saved })))
}
