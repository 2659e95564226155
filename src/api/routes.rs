//! HTTP surface: router, state, request/response DTOs and handlers.
//!
//! Request bodies are snake_case, responses camelCase, wrapped in the
//! `{"success", "message"?, "data"}` envelope.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::api::auth::{
    AdminUser, UserRecord, UserRole, UserStore, create_token, hash_password, verify_password,
};
use crate::api::error::{ApiError, ApiJson};
use crate::store::SharedOrderStore;
use crate::types::order::{
    Money, NewOrder, Order, OrderFilter, OrderPatch, OrderStatus, OrderStatusHistory, StatusChange,
};

#[derive(Clone)]
pub struct AppState {
    pub store: SharedOrderStore,
    pub user_store: UserStore,
    pub jwt_secret: Vec<u8>,
}

async fn health() -> &'static str {
    "healthy"
}

pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/auth/register", post(register))
        .route("/api/v1/auth/login", post(login))
        .route("/api/v1/orders/track/{code}", get(track_order))
        .route(
            "/api/v1/orders/admin/orders",
            get(list_orders).post(create_order),
        )
        .route(
            "/api/v1/orders/admin/orders/{id}",
            get(get_order).patch(update_order).delete(delete_order),
        )
        .route(
            "/api/v1/orders/admin/orders/{id}/status",
            patch(update_order_status),
        )
        .with_state(state)
}

fn envelope<T: Serialize>(message: Option<&str>, data: T) -> Json<Value> {
    match message {
        Some(message) => Json(json!({ "success": true, "message": message, "data": data })),
        None => Json(json!({ "success": true, "data": data })),
    }
}

// ---------- response DTOs ----------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HistoryEntryResponse {
    status: OrderStatus,
    stage: i32,
    note: Option<String>,
    location: Option<String>,
    changed_by: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<&OrderStatusHistory> for HistoryEntryResponse {
    fn from(h: &OrderStatusHistory) -> Self {
        Self {
            status: h.status,
            stage: h.stage,
            note: h.note.clone(),
            location: h.location.clone(),
            changed_by: h.changed_by.clone(),
            created_at: h.created_at,
        }
    }
}

/// Full order view for authenticated admins.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OrderResponse {
    id: Uuid,
    order_number: String,
    tracking_code: String,
    car_make: String,
    car_model: String,
    car_year: i32,
    vin: Option<String>,
    color: Option<String>,
    image_url: Option<String>,
    auction_price: Option<Money>,
    shipping_cost: Option<Money>,
    total_price: Option<Money>,
    customer_name: String,
    customer_phone: Option<String>,
    customer_email: Option<String>,
    status: OrderStatus,
    current_stage: i32,
    auction_source: Option<String>,
    lot_number: Option<String>,
    origin_port: Option<String>,
    destination_port: Option<String>,
    vessel_name: Option<String>,
    estimated_arrival: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    history: Vec<HistoryEntryResponse>,
}

impl From<&Order> for OrderResponse {
    fn from(o: &Order) -> Self {
        Self {
            id: o.id,
            order_number: o.order_number.clone(),
            tracking_code: o.tracking_code.clone(),
            car_make: o.car_make.clone(),
            car_model: o.car_model.clone(),
            car_year: o.car_year,
            vin: o.vin.clone(),
            color: o.color.clone(),
            image_url: o.image_url.clone(),
            auction_price: o.auction_price,
            shipping_cost: o.shipping_cost,
            total_price: o.total_price,
            customer_name: o.customer_name.clone(),
            customer_phone: o.customer_phone.clone(),
            customer_email: o.customer_email.clone(),
            status: o.status,
            current_stage: o.current_stage,
            auction_source: o.auction_source.clone(),
            lot_number: o.lot_number.clone(),
            origin_port: o.origin_port.clone(),
            destination_port: o.destination_port.clone(),
            vessel_name: o.vessel_name.clone(),
            estimated_arrival: o.estimated_arrival,
            created_at: o.created_at,
            updated_at: o.updated_at,
            history: o.history.iter().map(Into::into).collect(),
        }
    }
}

/// Redacted projection for the public tracking endpoint. Customer
/// attributes and the auction price are not fields of this type, so they
/// can never leak into the serialized response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PublicOrderResponse {
    order_number: String,
    tracking_code: String,
    car_make: String,
    car_model: String,
    car_year: i32,
    vin: Option<String>,
    color: Option<String>,
    image_url: Option<String>,
    shipping_cost: Option<Money>,
    total_price: Option<Money>,
    status: OrderStatus,
    current_stage: i32,
    auction_source: Option<String>,
    lot_number: Option<String>,
    origin_port: Option<String>,
    destination_port: Option<String>,
    vessel_name: Option<String>,
    estimated_arrival: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    history: Vec<HistoryEntryResponse>,
}

impl From<&Order> for PublicOrderResponse {
    fn from(o: &Order) -> Self {
        Self {
            order_number: o.order_number.clone(),
            tracking_code: o.tracking_code.clone(),
            car_make: o.car_make.clone(),
            car_model: o.car_model.clone(),
            car_year: o.car_year,
            vin: o.vin.clone(),
            color: o.color.clone(),
            image_url: o.image_url.clone(),
            shipping_cost: o.shipping_cost,
            total_price: o.total_price,
            status: o.status,
            current_stage: o.current_stage,
            auction_source: o.auction_source.clone(),
            lot_number: o.lot_number.clone(),
            origin_port: o.origin_port.clone(),
            destination_port: o.destination_port.clone(),
            vessel_name: o.vessel_name.clone(),
            estimated_arrival: o.estimated_arrival,
            created_at: o.created_at,
            history: o.history.iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Pagination {
    page: u32,
    limit: u32,
    total_items: u64,
    total_pages: u64,
    has_next_page: bool,
    has_previous_page: bool,
}

impl Pagination {
    fn new(page: u32, limit: u32, total_items: u64) -> Self {
        let total_pages = total_items.div_ceil(limit as u64);
        Self {
            page,
            limit,
            total_items,
            total_pages,
            has_next_page: (page as u64) < total_pages,
            has_previous_page: page > 1,
        }
    }
}

// ---------- auth ----------

#[derive(Debug, Deserialize)]
struct RegisterRequest {
    email: Option<String>,
    password: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    email: Option<String>,
    password: Option<String>,
}

async fn register(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let email = body
        .email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty() && e.contains('@'))
        .ok_or_else(|| ApiError::Validation("a valid email is required".to_string()))?
        .to_lowercase();
    let password = body
        .password
        .as_deref()
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ApiError::Validation("password is required".to_string()))?;

    let mut users = state.user_store.write().await;
    if users.contains_key(&email) {
        return Err(ApiError::Conflict("email is already registered".to_string()));
    }
    let password_hash = hash_password(password).map_err(|_| ApiError::Internal)?;
    let user_id = Uuid::new_v4();
    users.insert(
        email.clone(),
        UserRecord {
            user_id,
            email: email.clone(),
            password_hash,
            role: UserRole::Customer,
        },
    );
    Ok((
        StatusCode::CREATED,
        envelope(None, json!({ "userId": user_id, "email": email })),
    ))
}

async fn login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> Result<Json<Value>, ApiError> {
    let email = body
        .email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .ok_or_else(|| ApiError::Validation("email is required".to_string()))?
        .to_lowercase();
    let password = body
        .password
        .as_deref()
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ApiError::Validation("password is required".to_string()))?;

    let users = state.user_store.read().await;
    let user = users
        .get(&email)
        .ok_or_else(|| ApiError::Unauthorized("invalid credentials".to_string()))?;
    if !verify_password(password, &user.password_hash) {
        return Err(ApiError::Unauthorized("invalid credentials".to_string()));
    }
    let token = create_token(&state.jwt_secret, user.user_id, user.role)
        .map_err(|_| ApiError::Internal)?;
    Ok(envelope(
        None,
        json!({ "token": token, "userId": user.user_id }),
    ))
}

// ---------- public tracking ----------

async fn track_order(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let order = state
        .store
        .find_by_tracking_code(&code)
        .await?
        .ok_or_else(|| ApiError::NotFound("tracking code not found".to_string()))?;
    Ok(envelope(None, PublicOrderResponse::from(&order)))
}

// ---------- admin orders ----------

#[derive(Debug, Deserialize)]
struct ListQuery {
    page: Option<u32>,
    limit: Option<u32>,
    status: Option<String>,
    search: Option<String>,
}

async fn list_orders(
    _admin: AdminUser,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Value>, ApiError> {
    let status = match query.status.as_deref() {
        Some(s) => Some(
            OrderStatus::parse(s)
                .ok_or_else(|| ApiError::Validation(format!("invalid status '{s}'")))?,
        ),
        None => None,
    };
    let filter = OrderFilter {
        page: query.page.unwrap_or(1).max(1),
        limit: query.limit.unwrap_or(10).clamp(1, 100),
        status,
        search: query.search.filter(|s| !s.is_empty()),
    };
    let page = state.store.find_orders(&filter).await?;
    let items: Vec<OrderResponse> = page.items.iter().map(Into::into).collect();
    Ok(envelope(
        None,
        json!({
            "items": items,
            "pagination": Pagination::new(filter.page, filter.limit, page.total_items),
        }),
    ))
}

/// Path ids arrive as plain strings; a malformed uuid is an unknown
/// resource, not a bad request.
fn parse_order_id(id: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(id).map_err(|_| ApiError::NotFound("order not found".to_string()))
}

async fn get_order(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_order_id(&id)?;
    let order = state
        .store
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("order not found".to_string()))?;
    Ok(envelope(None, OrderResponse::from(&order)))
}

#[derive(Debug, Deserialize)]
struct CreateOrderRequest {
    car_make: Option<String>,
    car_model: Option<String>,
    car_year: Option<i32>,
    vin: Option<String>,
    color: Option<String>,
    image_url: Option<String>,
    auction_price: Option<Money>,
    shipping_cost: Option<Money>,
    total_price: Option<Money>,
    customer_name: Option<String>,
    customer_phone: Option<String>,
    customer_email: Option<String>,
    auction_source: Option<String>,
    lot_number: Option<String>,
    origin_port: Option<String>,
    destination_port: Option<String>,
    vessel_name: Option<String>,
    estimated_arrival: Option<DateTime<Utc>>,
}

fn require_text(value: Option<&str>, field: &str) -> Result<String, ApiError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(ApiError::Validation(format!("{field} is required"))),
    }
}

async fn create_order(
    _admin: AdminUser,
    State(state): State<AppState>,
    ApiJson(body): ApiJson<CreateOrderRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let input = NewOrder {
        car_make: require_text(body.car_make.as_deref(), "car_make")?,
        car_model: require_text(body.car_model.as_deref(), "car_model")?,
        car_year: body
            .car_year
            .ok_or_else(|| ApiError::Validation("car_year is required".to_string()))?,
        vin: body.vin,
        color: body.color,
        image_url: body.image_url,
        auction_price: body.auction_price,
        shipping_cost: body.shipping_cost,
        total_price: body.total_price,
        customer_name: require_text(body.customer_name.as_deref(), "customer_name")?,
        customer_phone: body.customer_phone,
        customer_email: body.customer_email,
        auction_source: body.auction_source,
        lot_number: body.lot_number,
        origin_port: body.origin_port,
        destination_port: body.destination_port,
        vessel_name: body.vessel_name,
        estimated_arrival: body.estimated_arrival,
    };
    let order = state.store.create_order(input).await?;
    tracing::info!(order_id = %order.id, order_number = %order.order_number, "order created");
    Ok((
        StatusCode::CREATED,
        envelope(Some("Order created"), OrderResponse::from(&order)),
    ))
}

#[derive(Debug, Deserialize)]
struct UpdateOrderRequest {
    car_make: Option<String>,
    car_model: Option<String>,
    car_year: Option<i32>,
    vin: Option<String>,
    color: Option<String>,
    image_url: Option<String>,
    auction_price: Option<Money>,
    shipping_cost: Option<Money>,
    total_price: Option<Money>,
    customer_name: Option<String>,
    customer_phone: Option<String>,
    customer_email: Option<String>,
    auction_source: Option<String>,
    lot_number: Option<String>,
    origin_port: Option<String>,
    destination_port: Option<String>,
    vessel_name: Option<String>,
    estimated_arrival: Option<DateTime<Utc>>,
}

async fn update_order(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<UpdateOrderRequest>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_order_id(&id)?;
    let patch = OrderPatch {
        car_make: body.car_make,
        car_model: body.car_model,
        car_year: body.car_year,
        vin: body.vin,
        color: body.color,
        image_url: body.image_url,
        auction_price: body.auction_price,
        shipping_cost: body.shipping_cost,
        total_price: body.total_price,
        customer_name: body.customer_name,
        customer_phone: body.customer_phone,
        customer_email: body.customer_email,
        auction_source: body.auction_source,
        lot_number: body.lot_number,
        origin_port: body.origin_port,
        destination_port: body.destination_port,
        vessel_name: body.vessel_name,
        estimated_arrival: body.estimated_arrival,
    };
    let order = state.store.update_order(id, patch).await?;
    Ok(envelope(Some("Order updated"), OrderResponse::from(&order)))
}

#[derive(Debug, Deserialize)]
struct UpdateStatusRequest {
    status: Option<String>,
    note: Option<String>,
    location: Option<String>,
    changed_by: Option<String>,
}

async fn update_order_status(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<UpdateStatusRequest>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_order_id(&id)?;
    let status = body
        .status
        .as_deref()
        .and_then(OrderStatus::parse)
        .ok_or_else(|| {
            ApiError::Validation(
                "status must be one of WON, PAID, SHIPPING, PORT, DELIVERED".to_string(),
            )
        })?;
    let change = StatusChange {
        status,
        note: body.note,
        location: body.location,
        changed_by: body.changed_by,
    };
    let order = state.store.update_status(id, change).await?;
    tracing::info!(order_id = %order.id, status = status.as_str(), "order status updated");
    Ok(envelope(
        Some("Order status updated"),
        OrderResponse::from(&order),
    ))
}

async fn delete_order(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_order_id(&id)?;
    state.store.delete_order(id).await?;
    tracing::info!(order_id = %id, "order deleted");
    Ok(envelope(Some("Order deleted"), Value::Null))
}
