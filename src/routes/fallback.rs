use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use crate::errors::ErrorBody;

/// The proxying engine's fallback path: a request that cleared the
/// permission pipeline but has no reachable backend gets HTTP 200 with an
/// embedded error code, so clients can distinguish a gateway-side outage
/// from a rejection.
pub async fn service_unavailable() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(ErrorBody {
            code: "CONNECT".to_string(),
            message: "backend service temporarily unavailable, retry later".to_string(),
        }),
    )
}
