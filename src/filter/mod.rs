//! Ordered permission-filter pipeline.
//!
//! Stages register through [`PermissionStage`] and run in ascending
//! [`PermissionStage::order`]. A stage either passes (possibly mutating the
//! request-scoped [`FilterContext`]), or short-circuits by returning a typed
//! [`GatewayError`]. The "skip remaining stages" signal is an explicit
//! context field, never a wire header, so it cannot leak downstream or be
//! spoofed by a client.

pub mod auth_code;
pub mod cookie;
pub mod login;
pub mod role;
pub mod whitelist;

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{Request, State};
use axum::http::{HeaderMap, HeaderValue, Method};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::app::AppState;
use crate::errors::GatewayResult;
use crate::headers;
use crate::models::identity::Identity;

pub const ORDER_WHITELIST: i32 = -200;
pub const ORDER_AUTH_CODE: i32 = -180;
pub const ORDER_COOKIE: i32 = -160;
pub const ORDER_LOGIN: i32 = -150;
pub const ORDER_ROLE: i32 = -100;

/// Per-request state threaded through the stages.
pub struct FilterContext {
    pub method: Method,
    pub path: String,
    pub request_headers: HeaderMap,
    /// One-time auth code from the `token` query parameter.
    pub query_code: Option<String>,
    /// Canonical credential: the bearer header, or a cookie value adopted by
    /// the cookie stage.
    pub token: Option<String>,
    /// Headers to add to the forwarded request.
    pub forward_headers: HeaderMap,
    /// Headers to add to the response (cookie refresh, refresh hint).
    pub response_headers: HeaderMap,
    skip: bool,
}

impl FilterContext {
    pub fn new(method: Method, path: String, request_headers: HeaderMap, query: Option<&str>) -> Self {
        let token = request_headers
            .get(headers::X_TOKEN)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .map(|value| value.to_string());
        let query_code = query.and_then(code_param);

        Self {
            method,
            path,
            request_headers,
            query_code,
            token,
            forward_headers: HeaderMap::new(),
            response_headers: HeaderMap::new(),
            skip: false,
        }
    }

    pub fn should_skip(&self) -> bool {
        self.skip
    }

    /// Marks the request as fully authorized; later permission stages pass
    /// through without re-checking.
    pub fn skip_remaining(&mut self) {
        self.skip = true;
    }

    /// Cookie stage: promote a cookie value to the canonical token header
    /// for the rest of the pipeline and the forwarded request.
    pub fn adopt_token(&mut self, token: String) {
        if let Ok(value) = HeaderValue::from_str(&token) {
            self.forward_headers.insert(headers::X_TOKEN, value);
        }
        self.token = Some(token);
    }

    /// Adds the resolved identity to the forwarded request headers.
    pub fn attach_identity(&mut self, identity: &Identity) {
        self.insert_forward(headers::X_CURRENT_USER, &identity.user_id.to_string());
        self.insert_forward(headers::X_TOKEN_USER, &identity.username);
        let tenant = identity
            .tenant_id
            .map(|tenant_id| tenant_id.to_string())
            .unwrap_or_default();
        self.insert_forward(headers::X_TOKEN_TENANT, &tenant);
    }

    fn insert_forward(&mut self, name: &'static str, value: &str) {
        match HeaderValue::from_str(value) {
            Ok(value) => {
                self.forward_headers.insert(name, value);
            }
            Err(_) => tracing::warn!(header = name, "identity value is not a valid header value"),
        }
    }
}

fn code_param(query: &str) -> Option<String> {
    query
        .split('&')
        .find_map(|pair| pair.strip_prefix("token="))
        .filter(|value| !value.is_empty())
        .map(|value| value.to_string())
}

#[async_trait]
pub trait PermissionStage: Send + Sync {
    fn name(&self) -> &'static str;

    /// Lower runs first.
    fn order(&self) -> i32;

    async fn handle(&self, ctx: &mut FilterContext) -> GatewayResult<()>;
}

/// The ordered stage registry. Construction sorts by `order()` once; the
/// per-request loop is a plain sequential pass.
pub struct FilterPipeline {
    stages: Vec<Arc<dyn PermissionStage>>,
}

impl FilterPipeline {
    pub fn new(mut stages: Vec<Arc<dyn PermissionStage>>) -> Self {
        stages.sort_by_key(|stage| stage.order());
        Self { stages }
    }

    pub async fn run(&self, ctx: &mut FilterContext) -> GatewayResult<()> {
        for stage in &self.stages {
            tracing::trace!(stage = stage.name(), path = %ctx.path, "running permission stage");
            stage.handle(ctx).await?;
        }
        Ok(())
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }
}

/// Axum middleware wrapping the pipeline around any downstream service.
///
/// On pass, the forwarded request carries the identity headers (client
/// values for those names are stripped first) and the response gains any
/// accumulated response headers. On rejection, the typed error body is
/// returned directly and the refresh hint, if set, still applies.
pub async fn permission_pipeline(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let (mut parts, body) = request.into_parts();

    let mut ctx = FilterContext::new(
        parts.method.clone(),
        parts.uri.path().to_string(),
        parts.headers.clone(),
        parts.uri.query(),
    );

    let outcome = state.pipeline.run(&mut ctx).await;

    match outcome {
        Ok(()) => {
            for name in [
                headers::X_CURRENT_USER,
                headers::X_TOKEN_USER,
                headers::X_TOKEN_TENANT,
            ] {
                parts.headers.remove(name);
            }
            for (name, value) in ctx.forward_headers.iter() {
                parts.headers.insert(name, value.clone());
            }

            let mut response = next.run(Request::from_parts(parts, body)).await;
            merge_headers(response.headers_mut(), &ctx.response_headers);
            response
        }
        Err(err) => {
            tracing::debug!(path = %ctx.path, code = err.code(), "request rejected by permission pipeline");
            let mut response = err.into_response();
            merge_headers(response.headers_mut(), &ctx.response_headers);
            response
        }
    }
}

fn merge_headers(target: &mut HeaderMap, extra: &HeaderMap) {
    for (name, value) in extra.iter() {
        target.append(name, value.clone());
    }
}
