//! Application and client HTTP tests

use super::*;
use crate::api::client_token;
use authx_core::domain::StringUuid;
use pretty_assertions::assert_eq;

fn app() -> (TestAppState, Router) {
    let state = TestAppState::new(create_test_config());
    (state.clone(), build_test_router(state))
}

#[tokio::test]
async fn test_create_and_list_applications() {
    let (state, app) = app();
    let owner = state.add_user("owner@example.com", "pw").await;
    let token = state.token_for(&owner);

    let (status, body) =
        put_json::<Value>(&app, "/api/app", Some(&token), &json!({ "name": "orders" })).await;
    assert_eq!(status, StatusCode::CREATED);
    let data = body.unwrap()["data"].clone();
    assert_eq!(data["name"], "orders");
    assert_eq!(data["owner_id"], owner.id.to_string());
    assert_eq!(data["app_key"].as_str().unwrap().len(), 16);

    let (status, body) = get_json::<Value>(&app, "/api/app", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    let list = body.unwrap()["data"].as_array().unwrap().clone();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["app_key"], data["app_key"]);
}

#[tokio::test]
async fn test_create_application_requires_token() {
    let (_, app) = app();

    let (status, body) = put_json::<Value>(&app, "/api/app", None, &json!({ "name": "x" })).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body.unwrap()["error"], "unauthorized");

    let (status, body) =
        put_json::<Value>(&app, "/api/app", Some("not.a.jwt"), &json!({ "name": "x" })).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body.unwrap()["error"], "invalid_token");
}

#[tokio::test]
async fn test_create_application_validates_name() {
    let (state, app) = app();
    let owner = state.add_user("v@example.com", "pw").await;
    let token = state.token_for(&owner);

    let (status, _) =
        put_json::<Value>(&app, "/api/app", Some(&token), &json!({ "name": "" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = put_json::<Value>(&app, "/api/app", Some(&token), &json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_token_for_missing_user_cannot_create() {
    let (state, app) = app();
    let token = crate::api::user_token(&state.jwt_manager, StringUuid::new_v4(), "ghost@x.com");

    let (status, _) =
        put_json::<Value>(&app, "/api/app", Some(&token), &json!({ "name": "x" })).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_owner_reads_application_with_clients() {
    let (state, app) = app();
    let owner = state.add_user("o@example.com", "pw").await;
    let token = state.token_for(&owner);
    let key = create_app(&app, &token, "inventory").await;

    let (status, body) = put_json::<Value>(
        &app,
        &format!("/api/app/{}/client", key),
        Some(&token),
        &json!({ "name": "sync-job" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let created = body.unwrap()["data"].clone();
    assert!(created["client_id"].as_str().unwrap().starts_with("cl_"));
    assert_eq!(created["client_secret"].as_str().unwrap().len(), 43);

    let (status, body) = get_json::<Value>(&app, &format!("/api/app/{}", key), Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    let data = body.unwrap()["data"].clone();
    assert_eq!(data["app_key"], key);
    let clients = data["clients"].as_array().unwrap();
    assert_eq!(clients.len(), 1);
    assert_eq!(clients[0]["client_id"], created["client_id"]);
    assert_eq!(clients[0]["name"], "sync-job");
    assert!(clients[0].get("client_secret").is_none());
    assert!(clients[0].get("secret_hash").is_none());

    let client_path = format!(
        "/api/app/{}/client/{}",
        key,
        created["client_id"].as_str().unwrap()
    );
    let (status, body) = get_json::<Value>(&app, &client_path, Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap()["data"]["client_id"], created["client_id"]);

    let (status, _) = get_json::<Value>(
        &app,
        &format!("/api/app/{}/client/cl_missing", key),
        Some(&token),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_client_without_body() {
    let (state, app) = app();
    let owner = state.add_user("nobody-body@example.com", "pw").await;
    let token = state.token_for(&owner);
    let key = create_app(&app, &token, "plain").await;

    let response = send(
        &app,
        Method::PUT,
        &format!("/api/app/{}/client", key),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let (_, body) = into_json::<Value>(response).await;
    assert!(body.unwrap()["data"]["name"].is_null());
}

#[tokio::test]
async fn test_cross_user_access_is_indistinguishable_from_missing() {
    let (state, app) = app();
    let alice = state.add_user("alice@example.com", "pw").await;
    let mallory = state.add_user("mallory@example.com", "pw").await;
    let alice_token = state.token_for(&alice);
    let mallory_token = state.token_for(&mallory);
    let key = create_app(&app, &alice_token, "private").await;

    let (status, foreign) =
        get_json::<Value>(&app, &format!("/api/app/{}", key), Some(&mallory_token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, missing) =
        get_json::<Value>(&app, "/api/app/doesnotexist0000", Some(&mallory_token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(foreign, missing);

    let (status, _) = put_json::<Value>(
        &app,
        &format!("/api/app/{}/client", key),
        Some(&mallory_token),
        &json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Mallory's own listing does not include Alice's application
    let (_, body) = get_json::<Value>(&app, "/api/app", Some(&mallory_token)).await;
    assert!(body.unwrap()["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_client_token_is_scoped_to_its_application() {
    let (state, app) = app();
    let owner = state.add_user("scoped@example.com", "pw").await;
    let token = state.token_for(&owner);
    let key_a = create_app(&app, &token, "a").await;
    let key_b = create_app(&app, &token, "b").await;

    let (_, body) = put_json::<Value>(
        &app,
        &format!("/api/app/{}/client", key_a),
        Some(&token),
        &json!({}),
    )
    .await;
    let client_id = body.unwrap()["data"]["client_id"]
        .as_str()
        .unwrap()
        .to_string();
    let client = client_token(&state.jwt_manager, &client_id, &key_a);

    let (status, _) = get_json::<Value>(&app, &format!("/api/app/{}", key_a), Some(&client)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = get_json::<Value>(
        &app,
        &format!("/api/app/{}/client/{}", key_a, client_id),
        Some(&client),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = get_json::<Value>(&app, &format!("/api/app/{}", key_b), Some(&client)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Clients cannot mint further clients or act as users
    let (status, _) = put_json::<Value>(
        &app,
        &format!("/api/app/{}/client", key_a),
        Some(&client),
        &json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = get_json::<Value>(&app, "/api/app", Some(&client)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_store_outage_is_service_unavailable() {
    let (state, app) = app();
    let owner = state.add_user("outage@example.com", "pw").await;
    let token = state.token_for(&owner);
    let key = create_app(&app, &token, "fragile").await;

    state.app_repo.set_unavailable(true);

    let (status, body) = get_json::<Value>(&app, &format!("/api/app/{}", key), Some(&token)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body.unwrap()["error"], "store_unavailable");
}
