use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Monetary amounts in minor units (cents).
pub type Money = i64;
pub type OrderId = Uuid;

/// Order lifecycle. Stage numbers are fixed: WON=1 .. DELIVERED=5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Won,
    Paid,
    Shipping,
    Port,
    Delivered,
}

impl OrderStatus {
    pub fn stage(self) -> i32 {
        match self {
            OrderStatus::Won => 1,
            OrderStatus::Paid => 2,
            OrderStatus::Shipping => 3,
            OrderStatus::Port => 4,
            OrderStatus::Delivered => 5,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Won => "WON",
            OrderStatus::Paid => "PAID",
            OrderStatus::Shipping => "SHIPPING",
            OrderStatus::Port => "PORT",
            OrderStatus::Delivered => "DELIVERED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "WON" => Some(OrderStatus::Won),
            "PAID" => Some(OrderStatus::Paid),
            "SHIPPING" => Some(OrderStatus::Shipping),
            "PORT" => Some(OrderStatus::Port),
            "DELIVERED" => Some(OrderStatus::Delivered),
            _ => None,
        }
    }
}

/// Immutable audit record of one status transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderStatusHistory {
    pub id: i64,
    pub order_id: Uuid,
    pub status: OrderStatus,
    pub stage: i32,
    pub note: Option<String>,
    pub location: Option<String>,
    pub changed_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One vehicle-import transaction, with its history newest-first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    pub tracking_code: String,
    pub car_make: String,
    pub car_model: String,
    pub car_year: i32,
    pub vin: Option<String>,
    pub color: Option<String>,
    pub image_url: Option<String>,
    pub auction_price: Option<Money>,
    pub shipping_cost: Option<Money>,
    pub total_price: Option<Money>,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub customer_email: Option<String>,
    pub status: OrderStatus,
    pub current_stage: i32,
    pub auction_source: Option<String>,
    pub lot_number: Option<String>,
    pub origin_port: Option<String>,
    pub destination_port: Option<String>,
    pub vessel_name: Option<String>,
    pub estimated_arrival: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub history: Vec<OrderStatusHistory>,
}

/// Validated input for order creation. Status is not an input: new orders
/// always start at WON.
#[derive(Debug, Clone, Default)]
pub struct NewOrder {
    pub car_make: String,
    pub car_model: String,
    pub car_year: i32,
    pub vin: Option<String>,
    pub color: Option<String>,
    pub image_url: Option<String>,
    pub auction_price: Option<Money>,
    pub shipping_cost: Option<Money>,
    pub total_price: Option<Money>,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub customer_email: Option<String>,
    pub auction_source: Option<String>,
    pub lot_number: Option<String>,
    pub origin_port: Option<String>,
    pub destination_port: Option<String>,
    pub vessel_name: Option<String>,
    pub estimated_arrival: Option<DateTime<Utc>>,
}

/// Partial update of descriptive/commercial/logistics fields. `None` means
/// "leave unchanged"; status and history are out of reach here.
#[derive(Debug, Clone, Default)]
pub struct OrderPatch {
    pub car_make: Option<String>,
    pub car_model: Option<String>,
    pub car_year: Option<i32>,
    pub vin: Option<String>,
    pub color: Option<String>,
    pub image_url: Option<String>,
    pub auction_price: Option<Money>,
    pub shipping_cost: Option<Money>,
    pub total_price: Option<Money>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub customer_email: Option<String>,
    pub auction_source: Option<String>,
    pub lot_number: Option<String>,
    pub origin_port: Option<String>,
    pub destination_port: Option<String>,
    pub vessel_name: Option<String>,
    pub estimated_arrival: Option<DateTime<Utc>>,
}

/// One status transition: the status entered plus free-text annotations.
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub status: OrderStatus,
    pub note: Option<String>,
    pub location: Option<String>,
    pub changed_by: Option<String>,
}

/// Listing filter. Search is a case-sensitive substring match over order
/// number, tracking code, customer name, make, model and VIN.
#[derive(Debug, Clone)]
pub struct OrderFilter {
    pub page: u32,
    pub limit: u32,
    pub status: Option<OrderStatus>,
    pub search: Option<String>,
}

impl Default for OrderFilter {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 10,
            status: None,
            search: None,
        }
    }
}

impl OrderFilter {
    /// Zero-based row offset. Pages are 1-based; 0 is treated as the
    /// first page rather than underflowing.
    pub fn offset(&self) -> u32 {
        (self.page.max(1) - 1) * self.limit
    }
}
