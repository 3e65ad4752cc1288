use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderValue, Method, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use courier_types::Identity;
use std::any::Any;

/// Header carrying the caller's user id.
pub const USER_ID_HEADER: &str = "x-user-id";

const ALLOW_ORIGIN: &str = "*";
const ALLOW_METHODS: &str = "GET, POST, DELETE, OPTIONS";
const ALLOW_HEADERS: &str = "Content-Type, X-User-ID";

/// Resolves the requesting identity from `X-User-ID`.
///
/// Total: a missing, blank, or non-ASCII header yields the anonymous identity.
pub fn resolve_identity(headers: &HeaderMap) -> Identity {
    let value = headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok());
    Identity::from_header_value(value)
}

/// Permissive CORS on every response.
///
/// Preflight (`OPTIONS` on any path) is answered with `204 No Content`
/// without reaching routing. Every other response, including error bodies
/// and 500s from the panic layer, gets the same headers.
pub async fn cors_middleware(req: Request<Body>, next: Next) -> Response {
    let mut response = if req.method() == Method::OPTIONS {
        StatusCode::NO_CONTENT.into_response()
    } else {
        next.run(req).await
    };

    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static(ALLOW_ORIGIN),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOW_METHODS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOW_HEADERS),
    );
    response
}

/// Converts a handler panic into a JSON 500 so it still passes through the
/// CORS layer.
pub fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic"
    };
    tracing::error!(panic = %detail, "handler panicked");

    crate::api::ApiError::InternalServerError("internal error".to_string()).into_response()
}
