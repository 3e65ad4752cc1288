//! Conversational handlers: chat messages and session reset.
//!
//! Both go through [`HttpChannel::exchange`](crate::channel::HttpChannel::exchange);
//! the reset is just the agent's control command with a shorter timeout.

use crate::{
    api::{parse_json_body, ApiError},
    channel::ExchangeError,
    middleware::resolve_identity,
    AppState,
};
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, Extension},
    http::HeaderMap,
    Json,
};
use courier_broker::BrokerError;
use serde_json::{json, Value};
use std::sync::Arc;

/// Handler for `POST /chat`.
pub async fn chat_handler(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<Value>, ApiError> {
    let payload = parse_json_body(body)?;
    let message = payload
        .get("message")
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or_default();
    if message.is_empty() {
        return Err(ApiError::BadRequest("message required".to_string()));
    }

    let identity = resolve_identity(&headers);
    match state
        .channel
        .exchange(&identity, message, state.agent.chat_timeout())
        .await
    {
        Ok(reply) => Ok(Json(json!({ "response": reply.content }))),
        Err(ExchangeError::Await(BrokerError::TimedOut { waited })) => {
            tracing::warn!(
                sender_id = %identity.sender_id,
                waited_secs = waited.as_secs(),
                "agent did not reply in time"
            );
            Err(ApiError::GatewayTimeout("agent timed out".to_string()))
        }
        Err(e) => {
            tracing::error!(sender_id = %identity.sender_id, error = %e, "chat exchange failed");
            Err(ApiError::BadGateway("agent unavailable".to_string()))
        }
    }
}

/// Handler for `DELETE /conversations`.
///
/// Asks the agent to start a fresh session (it consolidates the old one into
/// memory). A slow agent is not an error here: the reset still happens, the
/// acknowledgement text is just omitted.
pub async fn clear_conversations_handler(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let identity = resolve_identity(&headers);
    match state
        .channel
        .exchange(
            &identity,
            &state.agent.reset_command,
            state.agent.reset_timeout(),
        )
        .await
    {
        Ok(reply) => Ok(Json(json!({
            "status": "cleared",
            "message": reply.content,
        }))),
        Err(ExchangeError::Await(e)) => {
            tracing::info!(sender_id = %identity.sender_id, reason = %e, "reset not acknowledged");
            Ok(Json(json!({ "status": "cleared" })))
        }
        Err(e @ ExchangeError::Publish(_)) => {
            tracing::error!(sender_id = %identity.sender_id, error = %e, "reset could not be sent");
            Err(ApiError::BadGateway("agent unavailable".to_string()))
        }
    }
}
