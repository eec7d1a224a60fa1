//! Cache-clear surface: lets the identity/permission services invalidate
//! gateway caches when a user logs out or a role's rules change.

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Serialize;

use crate::app::AppState;
use crate::errors::{GatewayError, GatewayResult};
use crate::headers;

#[derive(Debug, Serialize)]
pub struct CleanResponse {
    pub cleaned: bool,
}

/// Evicts the cached identity of the credential in the `X-Token` header.
pub async fn clean_user(
    State(state): State<AppState>,
    request_headers: HeaderMap,
) -> GatewayResult<Json<CleanResponse>> {
    let token = request_headers
        .get(headers::X_TOKEN)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| GatewayError::invalid("missing X-Token header"))?;

    Ok(Json(CleanResponse {
        cleaned: state.resolver.evict(token),
    }))
}

/// Evicts one role's permission partition.
pub async fn clean_role_permissions(
    State(state): State<AppState>,
    Path(role_id): Path<i64>,
) -> GatewayResult<Json<CleanResponse>> {
    state.permissions.evict_role(role_id);
    Ok(Json(CleanResponse { cleaned: true }))
}

/// Clears every permission partition.
pub async fn clean_permissions(State(state): State<AppState>) -> GatewayResult<Json<CleanResponse>> {
    state.permissions.clear();
    Ok(Json(CleanResponse { cleaned: true }))
}
