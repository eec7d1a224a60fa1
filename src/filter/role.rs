use std::sync::Arc;

use async_trait::async_trait;

use crate::auth::resolver::IdentityResolver;
use crate::errors::{GatewayError, GatewayResult};
use crate::filter::{FilterContext, PermissionStage, ORDER_ROLE};
use crate::matcher;
use crate::models::permission::Classification;
use crate::permissions::PermissionCache;

/// Last stage: the caller's role must hold a rule matching the path and
/// method. The identity is already cached from the login stage, so the
/// resolve here is a cache hit.
pub struct RoleStage {
    permissions: Arc<PermissionCache>,
    resolver: Arc<IdentityResolver>,
}

impl RoleStage {
    pub fn new(permissions: Arc<PermissionCache>, resolver: Arc<IdentityResolver>) -> Self {
        Self { permissions, resolver }
    }
}

#[async_trait]
impl PermissionStage for RoleStage {
    fn name(&self) -> &'static str {
        "role"
    }

    fn order(&self) -> i32 {
        ORDER_ROLE
    }

    async fn handle(&self, ctx: &mut FilterContext) -> GatewayResult<()> {
        if ctx.should_skip() {
            return Ok(());
        }

        let Some(token) = ctx.token.clone() else {
            return Err(GatewayError::not_login("no credential presented"));
        };
        let identity = self.resolver.resolve(&token).await?;

        let rules = self
            .permissions
            .get(Classification::Role, Some(identity.role_id))
            .await?;
        if !matcher::rules_allow(&rules, &ctx.path, ctx.method.as_str()) {
            tracing::warn!(
                username = %identity.username,
                role_id = identity.role_id,
                path = %ctx.path,
                "role lacks a matching permission rule"
            );
            return Err(GatewayError::not_auth(format!(
                "role {} has no permission for {}",
                identity.role_id, ctx.path
            )));
        }

        ctx.attach_identity(&identity);
        Ok(())
    }
}
