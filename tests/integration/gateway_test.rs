//! Gateway behavior: proactive refresh, header merging, 401 handling,
//! and the de-duplicated profile fetch.

use std::sync::atomic::Ordering;

use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};

use crate::helpers::{make_token, TestApp};

#[tokio::test]
async fn test_far_future_token_skips_refresh() {
    let app = TestApp::new().await;

    let response = app
        .ctx
        .gateway
        .request(Method::GET, "/api/pulver/", None)
        .await
        .unwrap();

    assert!(response.status().is_success());
    assert_eq!(app.state.refresh_hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_near_expiry_token_is_refreshed_and_persisted() {
    // Five minutes of validity is inside the ten minute window.
    let app = TestApp::with_token(make_token("admin", 300)).await;
    let old_token = app.store.token().await.unwrap().unwrap();

    let response = app
        .ctx
        .gateway
        .request(Method::GET, "/api/pulver/", None)
        .await
        .unwrap();

    assert!(response.status().is_success());
    assert_eq!(app.state.refresh_hits.load(Ordering::SeqCst), 1);

    // Refresh-on-read side effect: the stored token rotated.
    let new_token = app.store.token().await.unwrap().unwrap();
    assert_ne!(new_token, old_token);
}

#[tokio::test]
async fn test_failed_refresh_proceeds_with_old_token() {
    let app = TestApp::with_token(make_token("admin", 300)).await;
    app.state.refresh_fails.store(true, Ordering::SeqCst);

    // The old token is still accepted, so the request goes through.
    let response = app
        .ctx
        .gateway
        .request(Method::GET, "/api/pulver/", None)
        .await
        .unwrap();

    assert!(response.status().is_success());
    assert_eq!(app.state.refresh_hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_undecodable_token_fails_open_in_gateway() {
    let token = "not.a.jwt".to_string();
    let app = TestApp::with_token(token).await;

    let response = app
        .ctx
        .gateway
        .request(Method::GET, "/api/pulver/", None)
        .await
        .unwrap();

    // No refresh attempt; the request simply carries the odd token.
    assert!(response.status().is_success());
    assert_eq!(app.state.refresh_hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_unauthorized_clears_session_and_returns_no_response() {
    let app = TestApp::new().await;
    app.state.force_unauthorized.store(true, Ordering::SeqCst);

    let result = app.ctx.gateway.request(Method::GET, "/api/pulver/", None).await;

    let error = result.unwrap_err();
    assert!(error.is_session());
    assert!(app.notifier.alerted("Sitzung abgelaufen"));
    assert!(app.store.load().await.unwrap().is_none());
}

#[tokio::test]
async fn test_missing_token_forces_logout_without_request() {
    let app = TestApp::new().await;
    app.store.clear().await.unwrap();

    let result = app.ctx.gateway.request(Method::GET, "/api/pulver/", None).await;

    assert!(result.unwrap_err().is_session());
}

#[tokio::test]
async fn test_caller_headers_win_on_conflict() {
    let app = TestApp::new().await;

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
    let response = app
        .ctx
        .gateway
        .request_with_headers(Method::GET, "/api/headers", None, headers)
        .await
        .unwrap();

    assert!(response.status().is_success());
    let seen = app.state.seen_content_type.lock().unwrap().clone();
    assert_eq!(seen.as_deref(), Some("text/plain"));
}

#[tokio::test]
async fn test_concurrent_permission_checks_share_one_fetch() {
    let app = TestApp::new().await;

    let checks = (0..5).map(|_| app.ctx.profile.has_permission("user.manage"));
    let results = futures::future::join_all(checks).await;

    for result in results {
        assert!(result.unwrap());
    }
    assert_eq!(app.state.me_hits.load(Ordering::SeqCst), 1);

    // The settled profile stays cached; later checks hit no endpoint.
    assert!(app.ctx.profile.has_permission("pulver.manage").await.unwrap());
    assert_eq!(app.state.me_hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_failed_profile_fetch_is_retried_later() {
    let app = TestApp::new().await;
    app.state.me_fails.store(true, Ordering::SeqCst);

    assert!(app.ctx.profile.current_user().await.is_err());
    assert_eq!(app.state.me_hits.load(Ordering::SeqCst), 1);

    app.state.me_fails.store(false, Ordering::SeqCst);
    let user = app.ctx.profile.current_user().await.unwrap();
    assert_eq!(user.username, "admin");
    assert_eq!(app.state.me_hits.load(Ordering::SeqCst), 2);
}
