//! Integration tests for auth: register, login, and the admin guard.

use std::collections::HashMap;
use std::sync::Arc;

use import_tracker::api::auth::{UserRole, create_token};
use import_tracker::api::routes::{AppState, app_router};
use import_tracker::store::{MemoryOrderStore, SharedOrderStore};
use tokio::sync::RwLock;
use uuid::Uuid;

fn test_state() -> AppState {
    let store: SharedOrderStore = Arc::new(MemoryOrderStore::new());
    AppState {
        store,
        user_store: Arc::new(RwLock::new(HashMap::new())),
        jwt_secret: b"test-jwt-secret".to_vec(),
    }
}

/// Spawn app on a random port and return (base_url, guard that keeps server running).
async fn spawn_app(state: AppState) -> (String, tokio::task::JoinHandle<()>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let base_url = format!("http://{}", addr);
    let app = app_router(state);
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (base_url, handle)
}

#[tokio::test]
async fn register_returns_201_with_user_id_and_email() {
    let (base_url, _handle) = spawn_app(test_state()).await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/api/v1/auth/register", base_url))
        .json(&serde_json::json!({ "email": "alice@example.com", "password": "secret123" }))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 201);
    let json: serde_json::Value = res.json().await.unwrap();
    assert_eq!(json["success"], true);
    assert!(json["data"]["userId"].as_str().is_some());
    assert_eq!(json["data"]["email"], "alice@example.com");
}

#[tokio::test]
async fn register_invalid_email_returns_400() {
    let (base_url, _handle) = spawn_app(test_state()).await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/api/v1/auth/register", base_url))
        .json(&serde_json::json!({ "email": "not-an-email", "password": "secret123" }))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 400);
    let json: serde_json::Value = res.json().await.unwrap();
    assert_eq!(json["success"], false);
    assert_eq!(json["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn register_empty_password_returns_400() {
    let (base_url, _handle) = spawn_app(test_state()).await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/api/v1/auth/register", base_url))
        .json(&serde_json::json!({ "email": "alice@example.com", "password": "" }))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 400);
}

#[tokio::test]
async fn malformed_json_body_returns_400_in_the_error_envelope() {
    let (base_url, _handle) = spawn_app(test_state()).await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/api/v1/auth/register", base_url))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 400);
    let json: serde_json::Value = res.json().await.unwrap();
    assert_eq!(json["success"], false);
    assert_eq!(json["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn register_duplicate_email_returns_409() {
    let (base_url, _handle) = spawn_app(test_state()).await;
    let client = reqwest::Client::new();

    let r1 = client
        .post(format!("{}/api/v1/auth/register", base_url))
        .json(&serde_json::json!({ "email": "bob@example.com", "password": "pass1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(r1.status().as_u16(), 201);

    let r2 = client
        .post(format!("{}/api/v1/auth/register", base_url))
        .json(&serde_json::json!({ "email": "BOB@example.com", "password": "pass2" }))
        .send()
        .await
        .unwrap();
    assert_eq!(r2.status().as_u16(), 409);
    let json: serde_json::Value = r2.json().await.unwrap();
    assert_eq!(json["error"]["code"], "CONFLICT");
}

#[tokio::test]
async fn register_then_login_returns_token() {
    let (base_url, _handle) = spawn_app(test_state()).await;
    let client = reqwest::Client::new();

    let reg = client
        .post(format!("{}/api/v1/auth/register", base_url))
        .json(&serde_json::json!({ "email": "carol@example.com", "password": "mypass" }))
        .send()
        .await
        .unwrap();
    assert_eq!(reg.status().as_u16(), 201);

    let login = client
        .post(format!("{}/api/v1/auth/login", base_url))
        .json(&serde_json::json!({ "email": "Carol@Example.com", "password": "mypass" }))
        .send()
        .await
        .unwrap();
    assert_eq!(login.status().as_u16(), 200);
    let json: serde_json::Value = login.json().await.unwrap();
    assert!(json["data"]["token"].as_str().is_some());
    assert!(json["data"]["userId"].as_str().is_some());
}

#[tokio::test]
async fn login_wrong_password_returns_401() {
    let (base_url, _handle) = spawn_app(test_state()).await;
    let client = reqwest::Client::new();

    let _ = client
        .post(format!("{}/api/v1/auth/register", base_url))
        .json(&serde_json::json!({ "email": "dave@example.com", "password": "right" }))
        .send()
        .await
        .unwrap();

    let res = client
        .post(format!("{}/api/v1/auth/login", base_url))
        .json(&serde_json::json!({ "email": "dave@example.com", "password": "wrong" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 401);
}

#[tokio::test]
async fn login_unknown_user_returns_401() {
    let (base_url, _handle) = spawn_app(test_state()).await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/api/v1/auth/login", base_url))
        .json(&serde_json::json!({ "email": "nobody@example.com", "password": "any" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 401);
}

#[tokio::test]
async fn admin_route_without_token_returns_401() {
    let (base_url, _handle) = spawn_app(test_state()).await;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/api/v1/orders/admin/orders", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 401);
    let json: serde_json::Value = res.json().await.unwrap();
    assert_eq!(json["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn admin_route_with_customer_token_returns_401() {
    let state = test_state();
    let token = create_token(&state.jwt_secret, Uuid::new_v4(), UserRole::Customer).unwrap();
    let (base_url, _handle) = spawn_app(state).await;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/api/v1/orders/admin/orders", base_url))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 401);
}

#[tokio::test]
async fn admin_route_with_garbage_token_returns_401() {
    let (base_url, _handle) = spawn_app(test_state()).await;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/api/v1/orders/admin/orders", base_url))
        .bearer_auth("not-a-jwt")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 401);
}

#[tokio::test]
async fn admin_route_with_admin_token_succeeds() {
    let state = test_state();
    let token = create_token(&state.jwt_secret, Uuid::new_v4(), UserRole::Admin).unwrap();
    let (base_url, _handle) = spawn_app(state).await;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/api/v1/orders/admin/orders", base_url))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);
    let json: serde_json::Value = res.json().await.unwrap();
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["pagination"]["totalItems"], 0);
}
