use std::sync::Arc;
use std::time::Duration;

use edge_gateway::clients::{HttpIdentityClient, HttpPermissionClient};
use edge_gateway::config::GatewayConfig;
use edge_gateway::route::{ChannelRouteConfigSource, HttpRouteConfigSource, RouteConfigSource};
use edge_gateway::{build_state, create_app};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_env();
    init_tracing();

    let config = GatewayConfig::from_env()?;

    let http = reqwest::Client::new();
    let identity_client = Arc::new(HttpIdentityClient::new(http.clone(), config.sso_base_url.clone()));
    let permission_client = Arc::new(HttpPermissionClient::new(http.clone(), config.upms_base_url.clone()));

    let route_source: Arc<dyn RouteConfigSource> = match &config.route_config_url {
        Some(url) => Arc::new(HttpRouteConfigSource::new(
            http,
            url.clone(),
            Duration::from_secs(30),
        )),
        None => {
            tracing::warn!("GATEWAY_ROUTE_CONFIG_URL not set; running with an empty dynamic route table");
            Arc::new(ChannelRouteConfigSource::new(None))
        }
    };

    let state = build_state(
        &config,
        identity_client,
        permission_client,
        route_source,
        Vec::new(),
    );

    if config.route_config_url.is_some() {
        state.sync.bootstrap().await;
        tokio::spawn(state.sync.clone().listen());
    }

    let app = create_app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

fn load_env() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    let crate_env = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
    let _ = dotenvy::from_path(crate_env);
}

fn init_tracing() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false);

    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}
