//! Order repository contract shared by the postgres and in-memory backends.

mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::types::order::{NewOrder, Order, OrderFilter, OrderId, OrderPatch, StatusChange};

pub use memory::MemoryOrderStore;

/// Note attached to the WON history entry written at creation.
pub const CREATED_NOTE: &str = "Order created - won at auction";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("order not found")]
    NotFound,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("invalid stored value: {0}")]
    Invalid(String),
}

/// One page of a listing plus the unpaginated match count.
#[derive(Debug, Clone)]
pub struct OrderPage {
    pub items: Vec<Order>,
    pub total_items: u64,
}

/// Durable state transitions for orders. Every mutating call is atomic:
/// the order row and its history row land together or not at all.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Create an order in status WON with its initial history entry.
    /// Generates a unique order number and tracking code.
    async fn create_order(&self, input: NewOrder) -> Result<Order, StoreError>;

    /// Set the order's status/stage and append one history entry.
    /// Any of the five statuses is accepted regardless of the current one.
    async fn update_status(&self, id: OrderId, change: StatusChange) -> Result<Order, StoreError>;

    /// Partial update of descriptive/commercial/logistics fields.
    /// Does not touch status or history.
    async fn update_order(&self, id: OrderId, patch: OrderPatch) -> Result<Order, StoreError>;

    /// Paginated newest-first listing with optional status filter and
    /// case-sensitive substring search.
    async fn find_orders(&self, filter: &OrderFilter) -> Result<OrderPage, StoreError>;

    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, StoreError>;

    /// Case-insensitive lookup for the public tracking surface.
    async fn find_by_tracking_code(&self, code: &str) -> Result<Option<Order>, StoreError>;

    /// Hard delete, cascading to history.
    async fn delete_order(&self, id: OrderId) -> Result<(), StoreError>;
}

pub type SharedOrderStore = Arc<dyn OrderStore>;

/// True when the order matches the filter's substring search.
pub(crate) fn matches_search(order: &Order, needle: &str) -> bool {
    order.order_number.contains(needle)
        || order.tracking_code.contains(needle)
        || order.customer_name.contains(needle)
        || order.car_make.contains(needle)
        || order.car_model.contains(needle)
        || order.vin.as_deref().is_some_and(|v| v.contains(needle))
}
