mod common;

use std::sync::atomic::Ordering;

use anyhow::Result;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::util::ServiceExt;

use edge_gateway::create_app;
use edge_gateway::models::permission::Classification;

use common::{body_json, gateway, identity};

#[tokio::test]
async fn clean_user_evicts_cached_identity() -> Result<()> {
    let gw = gateway();
    gw.identity.grant("tok-a", identity("ada", 2, 3_600_000));

    gw.state.resolver.resolve("tok-a").await?;
    assert_eq!(gw.identity.lookup_calls.load(Ordering::SeqCst), 1);

    let app = create_app(gw.state.clone());
    let req = Request::builder()
        .uri("/clean/user")
        .header("x-token", "tok-a")
        .body(Body::empty())?;
    let resp = app.clone().oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["cleaned"], true);

    // Next resolve has to go back to the identity service.
    gw.state.resolver.resolve("tok-a").await?;
    assert_eq!(gw.identity.lookup_calls.load(Ordering::SeqCst), 2);

    // Cleaning an unknown token reports nothing cleaned.
    let req = Request::builder()
        .uri("/clean/user")
        .header("x-token", "tok-unknown")
        .body(Body::empty())?;
    let resp = app.oneshot(req).await?;
    assert_eq!(body_json(resp).await["cleaned"], false);
    Ok(())
}

#[tokio::test]
async fn clean_user_without_token_is_invalid() -> Result<()> {
    let gw = gateway();
    let app = create_app(gw.state);

    let req = Request::builder().uri("/clean/user").body(Body::empty())?;
    let resp = app.oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(resp).await["code"], "INVALID");
    Ok(())
}

#[tokio::test]
async fn clean_role_and_all_permissions() -> Result<()> {
    let gw = gateway();
    gw.state.permissions.get(Classification::Whitelist, None).await?;
    gw.state.permissions.get(Classification::Role, Some(2)).await?;
    assert_eq!(gw.state.permissions.partition_count(), 2);

    let app = create_app(gw.state.clone());

    let req = Request::builder()
        .uri("/clean/role/2/permissions")
        .body(Body::empty())?;
    assert_eq!(app.clone().oneshot(req).await?.status(), StatusCode::OK);
    assert_eq!(gw.state.permissions.partition_count(), 1);

    let req = Request::builder()
        .uri("/clean/permissions")
        .body(Body::empty())?;
    assert_eq!(app.oneshot(req).await?.status(), StatusCode::OK);
    assert_eq!(gw.state.permissions.partition_count(), 0);
    Ok(())
}

#[tokio::test]
async fn health_reports_pipeline_and_caches() -> Result<()> {
    let gw = gateway();
    let app = create_app(gw.state);

    let req = Request::builder().uri("/gateway/health").body(Body::empty())?;
    let resp = app.oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::OK);

    let body = body_json(resp).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(
        body["stages"],
        serde_json::json!(["whitelist", "auth-code", "cookie", "login", "role"])
    );
    assert_eq!(body["dynamic_routes"], 0);
    Ok(())
}
