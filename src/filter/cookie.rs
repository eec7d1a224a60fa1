use std::sync::Arc;

use async_trait::async_trait;

use crate::auth::cookie::{cookie_value, CookieRefreshService};
use crate::errors::GatewayResult;
use crate::filter::{FilterContext, PermissionStage, ORDER_COOKIE};
use crate::matcher;
use crate::models::permission::Classification;
use crate::permissions::PermissionCache;

/// On cookie-eligible paths, adopts the token cookie as the canonical
/// credential when no bearer header was sent, renewing the cookie when it is
/// close to expiry.
pub struct CookieStage {
    permissions: Arc<PermissionCache>,
    refresh: Arc<CookieRefreshService>,
}

impl CookieStage {
    pub fn new(permissions: Arc<PermissionCache>, refresh: Arc<CookieRefreshService>) -> Self {
        Self { permissions, refresh }
    }
}

#[async_trait]
impl PermissionStage for CookieStage {
    fn name(&self) -> &'static str {
        "cookie"
    }

    fn order(&self) -> i32 {
        ORDER_COOKIE
    }

    async fn handle(&self, ctx: &mut FilterContext) -> GatewayResult<()> {
        if ctx.should_skip() || ctx.token.is_some() {
            return Ok(());
        }

        let cookie_name = &self.refresh.config().token_name;
        let Some(cookie_token) =
            cookie_value(&ctx.request_headers, cookie_name).filter(|token| !token.is_empty())
        else {
            return Ok(());
        };

        let eligible = match self.permissions.get(Classification::Cookie, None).await {
            Ok(rules) => matcher::rules_allow(&rules, &ctx.path, ctx.method.as_str()),
            Err(err) => {
                tracing::warn!(error = %err, "cookie-eligibility lookup failed; ignoring cookie");
                false
            }
        };
        if !eligible {
            return Ok(());
        }

        if self.refresh.needs_refresh(&cookie_token).await {
            tracing::debug!(path = %ctx.path, "token cookie renewed");
            self.refresh.refresh_cookie(&mut ctx.response_headers, &cookie_token);
        }

        tracing::debug!(path = %ctx.path, "adopted token cookie as credential");
        ctx.adopt_token(cookie_token);
        Ok(())
    }
}
