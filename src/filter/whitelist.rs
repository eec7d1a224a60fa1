use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::GatewayResult;
use crate::filter::{FilterContext, PermissionStage, ORDER_WHITELIST};
use crate::matcher;
use crate::models::permission::Classification;
use crate::permissions::PermissionCache;

/// Runs first: a path matching a no-auth-required rule authorizes the
/// request outright and the remaining stages pass through.
pub struct WhitelistStage {
    permissions: Arc<PermissionCache>,
}

impl WhitelistStage {
    pub fn new(permissions: Arc<PermissionCache>) -> Self {
        Self { permissions }
    }
}

#[async_trait]
impl PermissionStage for WhitelistStage {
    fn name(&self) -> &'static str {
        "whitelist"
    }

    fn order(&self) -> i32 {
        ORDER_WHITELIST
    }

    async fn handle(&self, ctx: &mut FilterContext) -> GatewayResult<()> {
        match self.permissions.get(Classification::Whitelist, None).await {
            Ok(rules) => {
                if matcher::rules_allow(&rules, &ctx.path, ctx.method.as_str()) {
                    tracing::debug!(path = %ctx.path, "path is whitelisted");
                    ctx.skip_remaining();
                }
            }
            // No whitelist means no skip; the credential stages decide.
            Err(err) => {
                tracing::warn!(error = %err, "whitelist lookup failed; treating path as not whitelisted");
            }
        }
        Ok(())
    }
}
