use std::sync::Arc;

use axum::middleware;
use axum::routing::{delete, get};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::auth::{CookieRefreshService, IdentityResolver};
use crate::clients::{IdentityClient, PermissionClient};
use crate::config::GatewayConfig;
use crate::filter::auth_code::AuthCodeStage;
use crate::filter::cookie::CookieStage;
use crate::filter::login::LoginStage;
use crate::filter::role::RoleStage;
use crate::filter::whitelist::WhitelistStage;
use crate::filter::{self, FilterPipeline};
use crate::models::route::RouteDefinition;
use crate::permissions::PermissionCache;
use crate::route::{RouteConfigSource, RouteStore, RouteSynchronizer};
use crate::routes::{admin, clean, fallback, health};

#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<IdentityResolver>,
    pub permissions: Arc<PermissionCache>,
    pub cookies: Arc<CookieRefreshService>,
    pub pipeline: Arc<FilterPipeline>,
    pub sync: Arc<RouteSynchronizer>,
}

/// Wires the services and the standard five-stage pipeline from injected
/// collaborators. Everything downstream receives its dependencies
/// explicitly; there are no process-wide statics.
pub fn build_state(
    config: &GatewayConfig,
    identity_client: Arc<dyn IdentityClient>,
    permission_client: Arc<dyn PermissionClient>,
    route_source: Arc<dyn RouteConfigSource>,
    static_routes: Vec<RouteDefinition>,
) -> AppState {
    let resolver = Arc::new(IdentityResolver::new(identity_client.clone()));
    let permissions = Arc::new(PermissionCache::new(permission_client.clone()));
    let cookies = Arc::new(CookieRefreshService::new(
        config.cookie.clone(),
        resolver.clone(),
        identity_client,
    ));

    let pipeline = Arc::new(FilterPipeline::new(vec![
        Arc::new(WhitelistStage::new(permissions.clone())),
        Arc::new(AuthCodeStage::new(permissions.clone(), permission_client)),
        Arc::new(CookieStage::new(permissions.clone(), cookies.clone())),
        Arc::new(LoginStage::new(permissions.clone(), resolver.clone())),
        Arc::new(RoleStage::new(permissions.clone(), resolver.clone())),
    ]));

    let store = Arc::new(RouteStore::new(static_routes));
    let sync = Arc::new(RouteSynchronizer::new(store, route_source));

    AppState {
        resolver,
        permissions,
        cookies,
        pipeline,
        sync,
    }
}

/// Admin surface plus the permission pipeline wrapped around the proxy
/// handoff. Everything outside the admin routes runs through the pipeline;
/// authorized requests that reach us (instead of the proxying engine) land
/// on the fallback handler.
pub fn create_app(state: AppState) -> Router {
    let admin_routes = Router::new()
        .route("/gateway/health", get(health::health))
        .route("/clean/user", get(clean::clean_user))
        .route("/clean/role/:role_id/permissions", get(clean::clean_role_permissions))
        .route("/clean/permissions", get(clean::clean_permissions))
        .route("/admin/routes", get(admin::list_routes).post(admin::add_route))
        .route("/admin/routes/:id", delete(admin::delete_route));

    let proxied = Router::new()
        .fallback(fallback::service_unavailable)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            filter::permission_pipeline,
        ));

    admin_routes
        .merge(proxied)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
