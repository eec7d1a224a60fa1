use std::sync::Arc;

use async_trait::async_trait;

use crate::clients::PermissionClient;
use crate::errors::{GatewayError, GatewayResult};
use crate::filter::{FilterContext, PermissionStage, ORDER_AUTH_CODE};
use crate::matcher;
use crate::models::permission::Classification;
use crate::permissions::PermissionCache;

/// Validates one-time auth codes presented via the `token` query parameter
/// on temporary-code-eligible paths. The record is fetched per use and not
/// cached; a valid code authorizes the request like a whitelist hit.
pub struct AuthCodeStage {
    permissions: Arc<PermissionCache>,
    client: Arc<dyn PermissionClient>,
}

impl AuthCodeStage {
    pub fn new(permissions: Arc<PermissionCache>, client: Arc<dyn PermissionClient>) -> Self {
        Self { permissions, client }
    }
}

#[async_trait]
impl PermissionStage for AuthCodeStage {
    fn name(&self) -> &'static str {
        "auth-code"
    }

    fn order(&self) -> i32 {
        ORDER_AUTH_CODE
    }

    async fn handle(&self, ctx: &mut FilterContext) -> GatewayResult<()> {
        if ctx.should_skip() {
            return Ok(());
        }
        let Some(code) = ctx.query_code.clone() else {
            return Ok(());
        };

        // Only temporary-code-eligible paths may authenticate this way.
        let eligible = match self.permissions.get(Classification::Temp, None).await {
            Ok(rules) => matcher::rules_allow(&rules, &ctx.path, ctx.method.as_str()),
            Err(err) => {
                tracing::warn!(error = %err, "temp-eligibility lookup failed; ignoring auth code");
                false
            }
        };
        if !eligible {
            return Ok(());
        }

        let record = match self.client.auth_code(&code).await {
            Ok(Some(record)) => record,
            Ok(None) => return Err(GatewayError::invalid("auth code not found")),
            Err(GatewayError::Connect(message)) => return Err(GatewayError::connect(message)),
            Err(_) => return Err(GatewayError::invalid("auth code check failed")),
        };

        record.check_usable()?;

        // An empty permission list grants any path; a non-empty one must
        // authorize this path and method.
        if !record.permissions.is_empty()
            && !matcher::rules_allow(&record.permissions, &ctx.path, ctx.method.as_str())
        {
            return Err(GatewayError::not_auth("auth code does not authorize this path"));
        }

        tracing::info!(path = %ctx.path, "auth code accepted");
        ctx.skip_remaining();
        Ok(())
    }
}
