//! Tests for the client wrapper: query caching, invalidation on mutation,
//! and typed API errors.

use std::collections::HashMap;
use std::sync::Arc;

use import_tracker::api::auth::{UserRole, create_token};
use import_tracker::api::routes::{AppState, app_router};
use import_tracker::client::{ClientError, OrdersClient};
use import_tracker::store::{MemoryOrderStore, SharedOrderStore};
use import_tracker::types::order::OrderFilter;
use serde_json::json;
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

async fn spawn_admin_client() -> (OrdersClient, String, tokio::task::JoinHandle<()>) {
    let state = test_state();
    let token = create_token(&state.jwt_secret, Uuid::new_v4(), UserRole::Admin).unwrap();
    let (base_url, handle) = spawn_app(state).await;
    let client = OrdersClient::new(base_url.clone()).with_token(token);
    (client, base_url, handle)
}

fn camry() -> serde_json::Value {
    json!({
        "car_make": "Toyota",
        "car_model": "Camry",
        "car_year": 2023,
        "customer_name": "Test Customer"
    })
}

#[tokio::test]
async fn create_then_track_round_trip() {
    let (client, _base_url, _handle) = spawn_admin_client().await;

    let created = client.create_order(&camry()).await.unwrap();
    assert_eq!(created["status"], "WON");
    let code = created["trackingCode"].as_str().unwrap();

    let tracked = client.track_order(code).await.unwrap();
    assert_eq!(tracked["carMake"], "Toyota");
    assert!(tracked.get("customerEmail").is_none());
}

#[tokio::test]
async fn list_is_served_from_cache_until_a_mutation() {
    let (client, base_url, _handle) = spawn_admin_client().await;
    let filter = OrderFilter::default();

    let first = client.list_orders(&filter).await.unwrap();
    assert_eq!(first["pagination"]["totalItems"], 0);

    // Write behind the client's back: the cached page must not notice.
    let raw = reqwest::Client::new();
    let state_token = {
        // A fresh admin token for the same app; the secret is fixed in tests.
        create_token(b"test-jwt-secret", Uuid::new_v4(), UserRole::Admin).unwrap()
    };
    let res = raw
        .post(format!("{}/api/v1/orders/admin/orders", base_url))
        .bearer_auth(&state_token)
        .json(&camry())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 201);

    let cached = client.list_orders(&filter).await.unwrap();
    assert_eq!(cached["pagination"]["totalItems"], 0);

    // A mutation through the client invalidates the cache.
    client.create_order(&camry()).await.unwrap();
    let fresh = client.list_orders(&filter).await.unwrap();
    assert_eq!(fresh["pagination"]["totalItems"], 2);
}

#[tokio::test]
async fn search_needles_with_reserved_characters_survive_the_query_string() {
    let (client, _base_url, _handle) = spawn_admin_client().await;

    client
        .create_order(&json!({
            "car_make": "Toyota",
            "car_model": "Camry",
            "car_year": 2023,
            "customer_name": "Smith & Sons"
        }))
        .await
        .unwrap();
    client
        .create_order(&json!({
            "car_make": "Toyota",
            "car_model": "Camry",
            "car_year": 2023,
            "customer_name": "Smithers Jane"
        }))
        .await
        .unwrap();

    let filter = OrderFilter {
        search: Some("& Sons".to_string()),
        ..Default::default()
    };
    let page = client.list_orders(&filter).await.unwrap();
    assert_eq!(page["pagination"]["totalItems"], 1);
    assert_eq!(page["items"][0]["customerName"], "Smith & Sons");
}

#[tokio::test]
async fn detail_cache_is_invalidated_by_status_update() {
    let (client, _base_url, _handle) = spawn_admin_client().await;

    let created = client.create_order(&camry()).await.unwrap();
    let id = Uuid::parse_str(created["id"].as_str().unwrap()).unwrap();

    let before = client.get_order(id).await.unwrap();
    assert_eq!(before["status"], "WON");

    client
        .update_order_status(id, &json!({ "status": "PAID" }))
        .await
        .unwrap();

    let after = client.get_order(id).await.unwrap();
    assert_eq!(after["status"], "PAID");
    assert_eq!(after["currentStage"], 2);
}

#[tokio::test]
async fn api_failures_surface_code_and_message() {
    let (client, _base_url, _handle) = spawn_admin_client().await;

    let err = client.get_order(Uuid::new_v4()).await.unwrap_err();
    match err {
        ClientError::Api { code, message } => {
            assert_eq!(code, "NOT_FOUND");
            assert!(!message.is_empty());
        }
        other => panic!("expected api error, got {other:?}"),
    }
}

#[tokio::test]
async fn unauthenticated_client_gets_unauthorized_error() {
    let state = test_state();
    let (base_url, _handle) = spawn_app(state).await;
    let client = OrdersClient::new(base_url);

    let err = client
        .list_orders(&OrderFilter::default())
        .await
        .unwrap_err();
    match err {
        ClientError::Api { code, .. } => assert_eq!(code, "UNAUTHORIZED"),
        other => panic!("expected api error, got {other:?}"),
    }
}
