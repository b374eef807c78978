//! Session guard matrix: missing, expired, undecodable, near-expiry,
//! and healthy tokens.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use pulverhub_core::config::auth::AuthConfig;
use pulverhub_session::SessionGuard;

use crate::helpers::{make_token, TestApp};

fn guard_for(app: &TestApp) -> SessionGuard {
    SessionGuard::new(
        app.store.clone(),
        reqwest::Client::new(),
        &app.api_config(),
        &AuthConfig::default(),
    )
}

#[tokio::test]
async fn test_valid_token_passes_without_refresh() {
    let app = TestApp::new().await;
    let guard = guard_for(&app);

    assert!(guard.ensure_valid_session().await.unwrap());
    assert_eq!(app.state.refresh_hits.load(Ordering::SeqCst), 0);
    assert!(app.store.load().await.unwrap().is_some());
}

#[tokio::test]
async fn test_missing_token_requires_login() {
    let app = TestApp::new().await;
    app.store.clear().await.unwrap();

    assert!(!guard_for(&app).ensure_valid_session().await.unwrap());
}

#[tokio::test]
async fn test_expired_token_forces_logout() {
    let app = TestApp::with_token(make_token("admin", -60)).await;

    assert!(!guard_for(&app).ensure_valid_session().await.unwrap());
    assert!(app.store.load().await.unwrap().is_none());
}

#[tokio::test]
async fn test_undecodable_token_forces_logout() {
    let app = TestApp::with_token("three.garbage.parts".to_string()).await;

    assert!(!guard_for(&app).ensure_valid_session().await.unwrap());
    assert!(app.store.load().await.unwrap().is_none());
}

#[tokio::test]
async fn test_near_expiry_token_is_renewed() {
    let app = TestApp::with_token(make_token("admin", 300)).await;
    let old_token = app.store.token().await.unwrap().unwrap();

    assert!(guard_for(&app).ensure_valid_session().await.unwrap());
    assert_eq!(app.state.refresh_hits.load(Ordering::SeqCst), 1);

    let new_token = app.store.token().await.unwrap().unwrap();
    assert_ne!(new_token, old_token);
}

#[tokio::test]
async fn test_near_expiry_with_failing_refresh_forces_logout() {
    let app = TestApp::with_token(make_token("admin", 300)).await;
    app.state.refresh_fails.store(true, Ordering::SeqCst);

    assert!(!guard_for(&app).ensure_valid_session().await.unwrap());
    assert!(app.store.load().await.unwrap().is_none());
}

#[tokio::test]
async fn test_guard_can_run_repeatedly() {
    let app = TestApp::new().await;
    let guard = Arc::new(guard_for(&app));

    assert!(guard.ensure_valid_session().await.unwrap());
    assert!(guard.ensure_valid_session().await.unwrap());
}
