//! Identifier generation and store-level contract tests, no HTTP involved.

use chrono::{TimeZone, Utc};
use import_tracker::codes::{
    TRACKING_CODE_LEN, format_order_number, generate_tracking_code, normalize_tracking_code,
};
use import_tracker::store::{MemoryOrderStore, OrderStore, StoreError};
use import_tracker::types::order::{NewOrder, OrderFilter, OrderStatus, StatusChange};
use uuid::Uuid;

fn new_order(make: &str) -> NewOrder {
    NewOrder {
        car_make: make.to_string(),
        car_model: "Camry".to_string(),
        car_year: 2023,
        customer_name: "Test Customer".to_string(),
        ..Default::default()
    }
}

#[test]
fn order_number_format_is_prefix_date_sequence() {
    let ts = Utc.with_ymd_and_hms(2026, 8, 29, 12, 0, 0).unwrap();
    assert_eq!(format_order_number(ts, 7), "ORD-20260829-0007");
    assert_eq!(format_order_number(ts, 12345), "ORD-20260829-12345");
}

#[test]
fn tracking_codes_are_uppercase_alphanumeric_of_fixed_length() {
    let mut seen_past_hex = false;
    for _ in 0..200 {
        let code = generate_tracking_code();
        assert_eq!(code.len(), TRACKING_CODE_LEN);
        assert!(code.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        seen_past_hex |= code.chars().any(|c| c.is_ascii_uppercase() && c > 'F');
    }
    // The alphabet is the full A-Z0-9 range, not just hex digits; with
    // 2000 sampled characters this is effectively deterministic.
    assert!(seen_past_hex);
}

#[test]
fn normalize_upper_cases_and_trims() {
    assert_eq!(normalize_tracking_code("  ab12cd34ef "), "AB12CD34EF");
}

#[tokio::test]
async fn created_orders_never_share_numbers_or_codes() {
    let store = MemoryOrderStore::new();
    let mut numbers = std::collections::HashSet::new();
    let mut codes = std::collections::HashSet::new();
    for _ in 0..200 {
        let order = store.create_order(new_order("Toyota")).await.unwrap();
        assert!(numbers.insert(order.order_number));
        assert!(codes.insert(order.tracking_code));
    }
}

#[tokio::test]
async fn status_update_keeps_stage_in_sync_with_status() {
    let store = MemoryOrderStore::new();
    let order = store.create_order(new_order("Toyota")).await.unwrap();
    assert_eq!(order.status, OrderStatus::Won);
    assert_eq!(order.current_stage, 1);
    assert_eq!(order.history.len(), 1);

    let updated = store
        .update_status(
            order.id,
            StatusChange {
                status: OrderStatus::Port,
                note: None,
                location: Some("Poti".to_string()),
                changed_by: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.status, OrderStatus::Port);
    assert_eq!(updated.current_stage, OrderStatus::Port.stage());
    assert_eq!(updated.history[0].stage, 4);
    assert_eq!(updated.history[0].location.as_deref(), Some("Poti"));
}

#[tokio::test]
async fn listing_with_page_zero_behaves_like_the_first_page() {
    let store = MemoryOrderStore::new();
    for _ in 0..3 {
        store.create_order(new_order("Toyota")).await.unwrap();
    }

    let filter = OrderFilter {
        page: 0,
        limit: 2,
        ..Default::default()
    };
    let page = store.find_orders(&filter).await.unwrap();
    assert_eq!(page.total_items, 3);
    assert_eq!(page.items.len(), 2);
}

#[tokio::test]
async fn delete_is_not_found_for_unknown_id() {
    let store = MemoryOrderStore::new();
    let err = store.delete_order(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound));
}

#[tokio::test]
async fn tracking_lookup_ignores_case() {
    let store = MemoryOrderStore::new();
    let order = store.create_order(new_order("Toyota")).await.unwrap();
    let found = store
        .find_by_tracking_code(&order.tracking_code.to_lowercase())
        .await
        .unwrap();
    assert_eq!(found.map(|o| o.id), Some(order.id));
}
