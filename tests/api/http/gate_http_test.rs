//! Request gate behavior: token sources, expiry and the enforcement toggle

use super::*;
use authx_core::jwt::Subject;
use chrono::Duration;
use pretty_assertions::assert_eq;

fn config_with_auth(enabled: bool) -> Config {
    let mut config = create_test_config();
    config.auth.enabled = enabled;
    config
}

#[tokio::test]
async fn test_missing_token_is_unauthenticated() {
    let state = TestAppState::new(config_with_auth(true));
    let owner = state.add_user("gate@example.com", "pw").await;
    let key = state.app_repo.add_application(owner.id, "gatekey").await.app_key;
    let app = build_test_router(state);

    for path in ["/api/app".to_string(), format!("/api/app/{}", key)] {
        let (status, body) = get_json::<Value>(&app, &path, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body.unwrap()["error"], "unauthorized");
    }
}

#[tokio::test]
async fn test_auth_disabled_opens_protected_routes() {
    let state = TestAppState::new(config_with_auth(false));
    let owner = state.add_user("open@example.com", "pw").await;
    let key = state.app_repo.add_application(owner.id, "openkey").await.app_key;
    let app = build_test_router(state);

    let (status, body) = get_json::<Value>(&app, &format!("/api/app/{}", key), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap()["data"]["app_key"], key);

    let (status, _) =
        get_json::<Value>(&app, &format!("/api/app/{}/client/cl_none", key), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Operations that need an owner still need one
    let (status, _) = put_json::<Value>(&app, "/api/app", None, &json!({ "name": "x" })).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_disabled_still_checks_presented_tokens() {
    let state = TestAppState::new(config_with_auth(false));
    let owner = state.add_user("owner2@example.com", "pw").await;
    let other = state.add_user("other2@example.com", "pw").await;
    let key = state.app_repo.add_application(owner.id, "checked").await.app_key;
    let other_token = state.token_for(&other);
    let app = build_test_router(state);

    let (status, _) =
        get_json::<Value>(&app, &format!("/api/app/{}", key), Some(&other_token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = get_json::<Value>(&app, &format!("/api/app/{}", key), Some("garbage")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_cookie_token_is_accepted() {
    let state = TestAppState::new(config_with_auth(true));
    let owner = state.add_user("cookie@example.com", "pw").await;
    let key = state.app_repo.add_application(owner.id, "cookiekey").await.app_key;
    let token = state.token_for(&owner);
    let app = build_test_router(state);

    let request = Request::builder()
        .method(Method::GET)
        .uri(format!("/api/app/{}", key))
        .header(header::COOKIE, format!("authx_token={}", token))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_expired_token_is_rejected() {
    let state = TestAppState::new(config_with_auth(true));
    let owner = state.add_user("expired@example.com", "pw").await;
    let key = state.app_repo.add_application(owner.id, "expkey").await.app_key;
    let expired = state
        .jwt_manager
        .issue_with_ttl(
            &Subject::User {
                id: owner.id,
                email: owner.email.clone(),
            },
            Duration::seconds(-5),
        )
        .unwrap()
        .token;
    let app = build_test_router(state);

    let (status, body) = get_json::<Value>(&app, &format!("/api/app/{}", key), Some(&expired)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body.unwrap()["error"], "token_expired");
}

#[tokio::test]
async fn test_token_from_other_issuer_is_invalid() {
    let state = TestAppState::new(config_with_auth(true));
    let owner = state.add_user("issuer@example.com", "pw").await;

    let mut foreign_config = crate::api::test_jwt_config();
    foreign_config.issuer = "https://elsewhere.test".to_string();
    let foreign = authx_core::jwt::JwtManager::new(foreign_config).unwrap();
    let token = crate::api::user_token(&foreign, owner.id, &owner.email);
    let app = build_test_router(state);

    let (status, body) = get_json::<Value>(&app, "/api/app", Some(&token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body.unwrap()["error"], "invalid_token");
}

#[tokio::test]
async fn test_public_routes_skip_the_gate() {
    let state = TestAppState::new(config_with_auth(true));
    let app = build_test_router(state);

    let (status, _) = post_json::<Value>(
        &app,
        "/auth/signup",
        Some("garbage"),
        &json!({ "email": "public@example.com", "password": "pw" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}
