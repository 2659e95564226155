//! In-memory order store: the same contract as postgres, backed by a map.
//! Used by the integration tests and anywhere a database is unwanted.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::codes;
use crate::types::order::{
    NewOrder, Order, OrderFilter, OrderId, OrderPatch, OrderStatus, OrderStatusHistory,
    StatusChange,
};

use super::{CREATED_NOTE, OrderPage, OrderStore, StoreError, matches_search};

#[derive(Default)]
pub struct MemoryOrderStore {
    orders: RwLock<HashMap<OrderId, Order>>,
    order_seq: AtomicI64,
    history_seq: AtomicI64,
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_history_id(&self) -> i64 {
        self.history_seq.fetch_add(1, Ordering::Relaxed) + 1
    }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn create_order(&self, input: NewOrder) -> Result<Order, StoreError> {
        let mut orders = self.orders.write().await;

        // Regenerate until the code is unused. The write lock is held for
        // the whole create, so the check-then-insert cannot race.
        let tracking_code = loop {
            let candidate = codes::generate_tracking_code();
            if !orders.values().any(|o| o.tracking_code == candidate) {
                break candidate;
            }
        };

        let now = Utc::now();
        let seq = self.order_seq.fetch_add(1, Ordering::Relaxed) + 1;
        let id = Uuid::new_v4();
        let initial = OrderStatusHistory {
            id: self.next_history_id(),
            order_id: id,
            status: OrderStatus::Won,
            stage: OrderStatus::Won.stage(),
            note: Some(CREATED_NOTE.to_string()),
            location: None,
            changed_by: None,
            created_at: now,
        };
        let order = Order {
            id,
            order_number: codes::format_order_number(now, seq),
            tracking_code,
            car_make: input.car_make,
            car_model: input.car_model,
            car_year: input.car_year,
            vin: input.vin,
            color: input.color,
            image_url: input.image_url,
            auction_price: input.auction_price,
            shipping_cost: input.shipping_cost,
            total_price: input.total_price,
            customer_name: input.customer_name,
            customer_phone: input.customer_phone,
            customer_email: input.customer_email,
            status: OrderStatus::Won,
            current_stage: OrderStatus::Won.stage(),
            auction_source: input.auction_source,
            lot_number: input.lot_number,
            origin_port: input.origin_port,
            destination_port: input.destination_port,
            vessel_name: input.vessel_name,
            estimated_arrival: input.estimated_arrival,
            created_at: now,
            updated_at: now,
            history: vec![initial],
        };
        orders.insert(id, order.clone());
        Ok(order)
    }

    async fn update_status(&self, id: OrderId, change: StatusChange) -> Result<Order, StoreError> {
        let mut orders = self.orders.write().await;
        let order = orders.get_mut(&id).ok_or(StoreError::NotFound)?;
        let now = Utc::now();
        order.status = change.status;
        order.current_stage = change.status.stage();
        order.updated_at = now;
        // History is kept newest-first.
        order.history.insert(
            0,
            OrderStatusHistory {
                id: self.next_history_id(),
                order_id: id,
                status: change.status,
                stage: change.status.stage(),
                note: change.note,
                location: change.location,
                changed_by: change.changed_by,
                created_at: now,
            },
        );
        Ok(order.clone())
    }

    async fn update_order(&self, id: OrderId, patch: OrderPatch) -> Result<Order, StoreError> {
        let mut orders = self.orders.write().await;
        let order = orders.get_mut(&id).ok_or(StoreError::NotFound)?;
        if let Some(v) = patch.car_make {
            order.car_make = v;
        }
        if let Some(v) = patch.car_model {
            order.car_model = v;
        }
        if let Some(v) = patch.car_year {
            order.car_year = v;
        }
        if let Some(v) = patch.vin {
            order.vin = Some(v);
        }
        if let Some(v) = patch.color {
            order.color = Some(v);
        }
        if let Some(v) = patch.image_url {
            order.image_url = Some(v);
        }
        if let Some(v) = patch.auction_price {
            order.auction_price = Some(v);
        }
        if let Some(v) = patch.shipping_cost {
            order.shipping_cost = Some(v);
        }
        if let Some(v) = patch.total_price {
            order.total_price = Some(v);
        }
        if let Some(v) = patch.customer_name {
            order.customer_name = v;
        }
        if let Some(v) = patch.customer_phone {
            order.customer_phone = Some(v);
        }
        if let Some(v) = patch.customer_email {
            order.customer_email = Some(v);
        }
        if let Some(v) = patch.auction_source {
            order.auction_source = Some(v);
        }
        if let Some(v) = patch.lot_number {
            order.lot_number = Some(v);
        }
        if let Some(v) = patch.origin_port {
            order.origin_port = Some(v);
        }
        if let Some(v) = patch.destination_port {
            order.destination_port = Some(v);
        }
        if let Some(v) = patch.vessel_name {
            order.vessel_name = Some(v);
        }
        if let Some(v) = patch.estimated_arrival {
            order.estimated_arrival = Some(v);
        }
        order.updated_at = Utc::now();
        Ok(order.clone())
    }

    async fn find_orders(&self, filter: &OrderFilter) -> Result<OrderPage, StoreError> {
        let orders = self.orders.read().await;
        let mut matched: Vec<&Order> = orders
            .values()
            .filter(|o| filter.status.is_none_or(|s| o.status == s))
            .filter(|o| {
                filter
                    .search
                    .as_deref()
                    .is_none_or(|needle| matches_search(o, needle))
            })
            .collect();
        matched.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.order_number.cmp(&a.order_number))
        });
        let total_items = matched.len() as u64;
        let items = matched
            .into_iter()
            .skip(filter.offset() as usize)
            .take(filter.limit as usize)
            .cloned()
            .collect();
        Ok(OrderPage { items, total_items })
    }

    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        Ok(self.orders.read().await.get(&id).cloned())
    }

    async fn find_by_tracking_code(&self, code: &str) -> Result<Option<Order>, StoreError> {
        let code = codes::normalize_tracking_code(code);
        Ok(self
            .orders
            .read()
            .await
            .values()
            .find(|o| o.tracking_code == code)
            .cloned())
    }

    async fn delete_order(&self, id: OrderId) -> Result<(), StoreError> {
        self.orders
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }
}
