use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::app::AppState;
use crate::errors::GatewayResult;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub stages: Vec<&'static str>,
    pub cached_sessions: usize,
    pub permission_partitions: usize,
    pub dynamic_routes: usize,
}

pub async fn health(State(state): State<AppState>) -> GatewayResult<Json<HealthResponse>> {
    Ok(Json(HealthResponse {
        status: "ok",
        stages: state.pipeline.stage_names(),
        cached_sessions: state.resolver.cached_sessions(),
        permission_partitions: state.permissions.partition_count(),
        dynamic_routes: state.sync.store().dynamic_len(),
    }))
}
