//! Bearer-key authentication for the API entrypoints.

use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::config::Settings;
use crate::models::Actor;

/// Resolve the caller's identity from the Authorization header.
///
/// Authentication failures are distinct from input errors: always 401,
/// before any request parsing side effects.
pub fn authenticate(headers: &HeaderMap, settings: &Settings) -> Result<Actor, Response> {
    let key = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim);

    let Some(key) = key else {
        return Err(unauthorized("missing Authorization bearer key"));
    };

    settings
        .resolve_api_key(key)
        .ok_or_else(|| unauthorized("unknown API key"))
}

fn unauthorized(detail: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({ "success": false, "error": detail })),
    )
        .into_response()
}
