//! Route-table admin surface: inspect the merged table and write individual
//! dynamic routes, each write publishing a refresh event.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::app::AppState;
use crate::errors::{GatewayError, GatewayResult};
use crate::models::route::RouteDefinition;

pub async fn list_routes(State(state): State<AppState>) -> Json<Vec<RouteDefinition>> {
    Json(state.sync.store().merged())
}

pub async fn add_route(
    State(state): State<AppState>,
    Json(definition): Json<RouteDefinition>,
) -> GatewayResult<StatusCode> {
    if definition.id.is_empty() {
        return Err(GatewayError::invalid("route id must not be empty"));
    }
    state.sync.add_route(definition);
    Ok(StatusCode::CREATED)
}

pub async fn delete_route(State(state): State<AppState>, Path(id): Path<String>) -> StatusCode {
    if state.sync.delete_route(&id) {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}
