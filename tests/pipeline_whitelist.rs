mod common;

use anyhow::Result;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::util::ServiceExt;

use edge_gateway::models::permission::{Classification, PermissionRule};

use common::{body_json, gateway, pipeline_app};

#[tokio::test]
async fn whitelisted_path_passes_without_credential() -> Result<()> {
    let gw = gateway();
    gw.permissions.set_rules(
        "whitelist",
        vec![PermissionRule::new("/open/**", None, Classification::Whitelist)],
    );
    let app = pipeline_app(gw.state);

    for method in ["GET", "POST", "DELETE"] {
        let req = Request::builder()
            .method(method)
            .uri("/open/docs")
            .body(Body::empty())?;
        let resp = app.clone().oneshot(req).await?;
        assert_eq!(resp.status(), StatusCode::OK, "method {method} should pass");

        let body = body_json(resp).await;
        assert_eq!(body["upstream"], true);
    }

    Ok(())
}

#[tokio::test]
async fn non_whitelisted_path_requires_credential() -> Result<()> {
    let gw = gateway();
    gw.permissions.set_rules(
        "whitelist",
        vec![PermissionRule::new("/open/**", None, Classification::Whitelist)],
    );
    let app = pipeline_app(gw.state);

    let req = Request::builder().uri("/upms/user/1").body(Body::empty())?;
    let resp = app.oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let body = body_json(resp).await;
    assert_eq!(body["code"], "NOT_LOGIN");
    Ok(())
}

#[tokio::test]
async fn method_scoped_whitelist_rule_only_matches_that_method() -> Result<()> {
    let gw = gateway();
    gw.permissions.set_rules(
        "whitelist",
        vec![PermissionRule::new(
            "/open/ping",
            Some("GET"),
            Classification::Whitelist,
        )],
    );
    let app = pipeline_app(gw.state);

    let get = Request::builder().uri("/open/ping").body(Body::empty())?;
    assert_eq!(app.clone().oneshot(get).await?.status(), StatusCode::OK);

    let post = Request::builder()
        .method("POST")
        .uri("/open/ping")
        .body(Body::empty())?;
    assert_eq!(app.oneshot(post).await?.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn whitelist_lookup_failure_does_not_grant_access() -> Result<()> {
    let gw = gateway();
    gw.permissions
        .fail
        .store(true, std::sync::atomic::Ordering::SeqCst);
    let app = pipeline_app(gw.state);

    let req = Request::builder().uri("/open/docs").body(Body::empty())?;
    let resp = app.oneshot(req).await?;
    // Fail closed: with the permission service down the request is not
    // whitelisted and carries no credential.
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}
