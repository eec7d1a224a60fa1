//! Remote collaborator contracts: the identity (SSO) service that verifies
//! and renews credentials, and the permission (UPMS) service that owns rule
//! lists and auth codes. Filter stages depend on the traits; production
//! wiring injects the reqwest-backed implementations.

use async_trait::async_trait;
use serde::Deserialize;

use crate::errors::{GatewayError, GatewayResult};
use crate::models::auth_code::AuthCode;
use crate::models::identity::Identity;
use crate::models::permission::{Classification, PermissionRule};

#[async_trait]
pub trait IdentityClient: Send + Sync {
    /// Verify a raw credential and return the identity it represents.
    /// Rejections come back as `NotLogin`/`Expired`, connectivity problems
    /// as `Connect`.
    async fn token_info(&self, token: &str) -> GatewayResult<Identity>;

    /// Ask the identity service to extend the credential's validity.
    async fn renew(&self, token: &str) -> GatewayResult<bool>;
}

#[async_trait]
pub trait PermissionClient: Send + Sync {
    async fn permissions(&self, classification: Classification) -> GatewayResult<Vec<PermissionRule>>;

    async fn role_permissions(&self, role_id: i64) -> GatewayResult<Vec<PermissionRule>>;

    async fn auth_code(&self, code: &str) -> GatewayResult<Option<AuthCode>>;
}

/// Envelope every collaborator wraps single payloads in.
#[derive(Debug, Deserialize)]
struct ItemEnvelope<T> {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    data: Option<T>,
}

/// Envelope for list payloads.
#[derive(Debug, Deserialize)]
struct ListEnvelope<T> {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    rows: Vec<T>,
}

/// Rule as the permission service ships it; the classification is stamped by
/// the caller from the partition it asked for.
#[derive(Debug, Default, Deserialize)]
struct RuleDto {
    url: String,
    #[serde(default)]
    method: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AuthCodeDto {
    code: String,
    #[serde(default)]
    status: Option<i32>,
    #[serde(default)]
    expires_at: Option<i64>,
    #[serde(default)]
    max_uses: Option<i32>,
    #[serde(default)]
    used_count: Option<i32>,
    #[serde(default)]
    permissions: Vec<RuleDto>,
}

fn stamp(rules: Vec<RuleDto>, classification: Classification) -> Vec<PermissionRule> {
    rules
        .into_iter()
        .map(|rule| PermissionRule::new(rule.url, rule.method.as_deref(), classification))
        .collect()
}

pub struct HttpIdentityClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpIdentityClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl IdentityClient for HttpIdentityClient {
    async fn token_info(&self, token: &str) -> GatewayResult<Identity> {
        let url = format!("{}/token/info", self.base_url);
        let envelope: ItemEnvelope<Identity> = self
            .http
            .get(url)
            .query(&[("token", token)])
            .send()
            .await
            .map_err(|err| GatewayError::connect(format!("identity lookup failed: {err}")))?
            .json()
            .await
            .map_err(|err| GatewayError::connect(format!("identity lookup failed: {err}")))?;

        if !envelope.success {
            let message = envelope.message.unwrap_or_else(|| "credential rejected".to_string());
            return Err(match envelope.code.as_deref() {
                Some("EXPIRED") => GatewayError::expired(message),
                _ => GatewayError::not_login(message),
            });
        }
        envelope
            .data
            .ok_or_else(|| GatewayError::not_login("identity service returned no identity"))
    }

    async fn renew(&self, token: &str) -> GatewayResult<bool> {
        let url = format!("{}/token/renew", self.base_url);
        let envelope: ItemEnvelope<bool> = self
            .http
            .post(url)
            .query(&[("token", token)])
            .send()
            .await
            .map_err(|err| GatewayError::connect(format!("identity renew failed: {err}")))?
            .json()
            .await
            .map_err(|err| GatewayError::connect(format!("identity renew failed: {err}")))?;

        Ok(envelope.success && envelope.data.unwrap_or(false))
    }
}

pub struct HttpPermissionClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpPermissionClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    async fn fetch_rules(&self, url: String) -> GatewayResult<Vec<RuleDto>> {
        let envelope: ListEnvelope<RuleDto> = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|err| GatewayError::connect(format!("permission lookup failed: {err}")))?
            .json()
            .await
            .map_err(|err| GatewayError::connect(format!("permission lookup failed: {err}")))?;

        if !envelope.success {
            let message = envelope
                .message
                .unwrap_or_else(|| "permission service rejected the request".to_string());
            return Err(GatewayError::connect(message));
        }
        Ok(envelope.rows)
    }
}

#[async_trait]
impl PermissionClient for HttpPermissionClient {
    async fn permissions(&self, classification: Classification) -> GatewayResult<Vec<PermissionRule>> {
        let url = format!("{}/permissions/{}", self.base_url, classification.code());
        Ok(stamp(self.fetch_rules(url).await?, classification))
    }

    async fn role_permissions(&self, role_id: i64) -> GatewayResult<Vec<PermissionRule>> {
        let url = format!("{}/roles/{role_id}/permissions", self.base_url);
        Ok(stamp(self.fetch_rules(url).await?, Classification::Role))
    }

    async fn auth_code(&self, code: &str) -> GatewayResult<Option<AuthCode>> {
        let url = format!("{}/auth-codes/{code}", self.base_url);
        let envelope: ItemEnvelope<AuthCodeDto> = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|err| GatewayError::connect(format!("auth code lookup failed: {err}")))?
            .json()
            .await
            .map_err(|err| GatewayError::connect(format!("auth code lookup failed: {err}")))?;

        Ok(envelope.data.map(|dto| AuthCode {
            code: dto.code,
            status: dto.status,
            expires_at: dto.expires_at,
            max_uses: dto.max_uses,
            used_count: dto.used_count,
            permissions: stamp(dto.permissions, Classification::Temp),
        }))
    }
}
