//! Shared test fixtures: scriptable collaborator stubs and app builders.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::extract::Request;
use axum::http::HeaderMap;
use axum::middleware;
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde_json::{json, Value};

use edge_gateway::clients::{IdentityClient, PermissionClient};
use edge_gateway::config::{CookieConfig, GatewayConfig};
use edge_gateway::errors::{GatewayError, GatewayResult};
use edge_gateway::filter::permission_pipeline;
use edge_gateway::models::auth_code::AuthCode;
use edge_gateway::models::identity::Identity;
use edge_gateway::models::permission::{Classification, PermissionRule};
use edge_gateway::route::ChannelRouteConfigSource;
use edge_gateway::{build_state, AppState};

pub fn identity(username: &str, role_id: i64, expires_in_ms: i64) -> Identity {
    Identity {
        username: username.to_string(),
        user_id: 7,
        role_id,
        tenant_id: Some(1),
        expires_at: Utc::now().timestamp_millis() + expires_in_ms,
    }
}

#[derive(Default)]
pub struct StubIdentityClient {
    pub identities: Mutex<HashMap<String, Identity>>,
    pub expired_tokens: Mutex<Vec<String>>,
    pub renew_ok: AtomicBool,
    pub lookup_calls: AtomicUsize,
    pub renew_calls: AtomicUsize,
}

impl StubIdentityClient {
    pub fn grant(&self, token: &str, identity: Identity) {
        self.identities
            .lock()
            .unwrap()
            .insert(token.to_string(), identity);
    }

    pub fn mark_expired(&self, token: &str) {
        self.expired_tokens.lock().unwrap().push(token.to_string());
    }
}

#[async_trait]
impl IdentityClient for StubIdentityClient {
    async fn token_info(&self, token: &str) -> GatewayResult<Identity> {
        self.lookup_calls.fetch_add(1, Ordering::SeqCst);
        if self.expired_tokens.lock().unwrap().iter().any(|t| t == token) {
            return Err(GatewayError::expired("credential past validity"));
        }
        self.identities
            .lock()
            .unwrap()
            .get(token)
            .cloned()
            .ok_or_else(|| GatewayError::not_login("unknown credential"))
    }

    async fn renew(&self, _token: &str) -> GatewayResult<bool> {
        self.renew_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.renew_ok.load(Ordering::SeqCst))
    }
}

#[derive(Default)]
pub struct StubPermissionClient {
    pub partitions: Mutex<HashMap<String, Vec<PermissionRule>>>,
    pub auth_codes: Mutex<HashMap<String, AuthCode>>,
    pub fail: AtomicBool,
}

impl StubPermissionClient {
    pub fn set_rules(&self, partition: &str, rules: Vec<PermissionRule>) {
        self.partitions
            .lock()
            .unwrap()
            .insert(partition.to_string(), rules);
    }

    pub fn set_auth_code(&self, code: AuthCode) {
        self.auth_codes
            .lock()
            .unwrap()
            .insert(code.code.clone(), code);
    }

    fn partition(&self, key: &str) -> GatewayResult<Vec<PermissionRule>> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(GatewayError::connect("permission service down"));
        }
        Ok(self
            .partitions
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl PermissionClient for StubPermissionClient {
    async fn permissions(&self, classification: Classification) -> GatewayResult<Vec<PermissionRule>> {
        self.partition(classification.code())
    }

    async fn role_permissions(&self, role_id: i64) -> GatewayResult<Vec<PermissionRule>> {
        self.partition(&role_id.to_string())
    }

    async fn auth_code(&self, code: &str) -> GatewayResult<Option<AuthCode>> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(GatewayError::connect("permission service down"));
        }
        Ok(self.auth_codes.lock().unwrap().get(code).cloned())
    }
}

pub struct TestGateway {
    pub state: AppState,
    pub identity: Arc<StubIdentityClient>,
    pub permissions: Arc<StubPermissionClient>,
    pub route_source: Arc<ChannelRouteConfigSource>,
}

pub fn gateway() -> TestGateway {
    gateway_with_cookie(CookieConfig::default())
}

pub fn gateway_with_cookie(cookie: CookieConfig) -> TestGateway {
    let identity = Arc::new(StubIdentityClient::default());
    let permissions = Arc::new(StubPermissionClient::default());
    let route_source = Arc::new(ChannelRouteConfigSource::new(None));

    let config = GatewayConfig {
        port: 0,
        sso_base_url: "http://sso.test".to_string(),
        upms_base_url: "http://upms.test".to_string(),
        route_config_url: None,
        cookie,
    };

    let state = build_state(
        &config,
        identity.clone(),
        permissions.clone(),
        route_source.clone(),
        Vec::new(),
    );

    TestGateway {
        state,
        identity,
        permissions,
        route_source,
    }
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string())
}

async fn echo_upstream(request: Request) -> Json<Value> {
    let headers = request.headers();
    Json(json!({
        "upstream": true,
        "current_user": header_string(headers, "x-current-user"),
        "token_user": header_string(headers, "x-token-user"),
        "token_tenant": header_string(headers, "x-token-tenant"),
        "token": header_string(headers, "x-token"),
    }))
}

/// The permission pipeline wrapped around an upstream that echoes the
/// forwarded headers, standing in for the proxying engine.
pub fn pipeline_app(state: AppState) -> Router {
    Router::new()
        .fallback(echo_upstream)
        .layer(middleware::from_fn_with_state(state, permission_pipeline))
}

pub async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), 1_048_576)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("json body")
}
