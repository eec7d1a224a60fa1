use std::sync::Arc;

use async_trait::async_trait;
use axum::http::HeaderValue;

use crate::auth::resolver::IdentityResolver;
use crate::errors::{GatewayError, GatewayResult};
use crate::filter::{FilterContext, PermissionStage, ORDER_LOGIN};
use crate::headers;
use crate::matcher;
use crate::models::permission::Classification;
use crate::permissions::PermissionCache;

/// Requires a resolvable identity for everything that was not already
/// authorized. Paths classified login-only are done after this stage; others
/// continue into the role check.
pub struct LoginStage {
    permissions: Arc<PermissionCache>,
    resolver: Arc<IdentityResolver>,
}

impl LoginStage {
    pub fn new(permissions: Arc<PermissionCache>, resolver: Arc<IdentityResolver>) -> Self {
        Self { permissions, resolver }
    }
}

#[async_trait]
impl PermissionStage for LoginStage {
    fn name(&self) -> &'static str {
        "login"
    }

    fn order(&self) -> i32 {
        ORDER_LOGIN
    }

    async fn handle(&self, ctx: &mut FilterContext) -> GatewayResult<()> {
        if ctx.should_skip() {
            return Ok(());
        }

        let Some(token) = ctx.token.clone() else {
            return Err(GatewayError::not_login("no credential presented"));
        };

        let identity = match self.resolver.resolve(&token).await {
            Ok(identity) => identity,
            Err(err @ GatewayError::Expired(_)) => {
                // Hint the client to run the renewal flow before retrying.
                ctx.response_headers
                    .insert(headers::X_REFRESH_TOKEN, HeaderValue::from_static("1"));
                return Err(err);
            }
            Err(err) => return Err(err),
        };

        tracing::debug!(path = %ctx.path, username = %identity.username, "credential resolved");
        ctx.attach_identity(&identity);

        match self.permissions.get(Classification::Login, None).await {
            Ok(rules) => {
                if matcher::rules_allow(&rules, &ctx.path, ctx.method.as_str()) {
                    // Login-only path: no stronger role check needed.
                    ctx.skip_remaining();
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "login-only lookup failed; deferring to the role stage");
            }
        }
        Ok(())
    }
}
