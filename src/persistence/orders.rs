//! Postgres order store: transactional create/update, filtered listing,
//! tracking lookup, cascading delete.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::codes;
use crate::store::{CREATED_NOTE, OrderPage, OrderStore, StoreError};
use crate::types::order::{
    NewOrder, Order, OrderFilter, OrderId, OrderPatch, OrderStatus, OrderStatusHistory,
    StatusChange,
};

pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const ORDER_COLUMNS: &str = "id, order_number, tracking_code, car_make, car_model, car_year, \
     vin, color, image_url, auction_price, shipping_cost, total_price, \
     customer_name, customer_phone, customer_email, status, current_stage, \
     auction_source, lot_number, origin_port, destination_port, vessel_name, \
     estimated_arrival, created_at, updated_at";

const LIST_FILTER: &str = "($1::text IS NULL OR status = $1) \
     AND ($2::text IS NULL \
          OR position($2::text in order_number) > 0 \
          OR position($2::text in tracking_code) > 0 \
          OR position($2::text in customer_name) > 0 \
          OR position($2::text in car_make) > 0 \
          OR position($2::text in car_model) > 0 \
          OR position($2::text in coalesce(vin, '')) > 0)";

#[derive(Debug, FromRow)]
struct OrderRow {
    id: Uuid,
    order_number: String,
    tracking_code: String,
    car_make: String,
    car_model: String,
    car_year: i32,
    vin: Option<String>,
    color: Option<String>,
    image_url: Option<String>,
    auction_price: Option<i64>,
    shipping_cost: Option<i64>,
    total_price: Option<i64>,
    customer_name: String,
    customer_phone: Option<String>,
    customer_email: Option<String>,
    status: String,
    current_stage: i32,
    auction_source: Option<String>,
    lot_number: Option<String>,
    origin_port: Option<String>,
    destination_port: Option<String>,
    vessel_name: Option<String>,
    estimated_arrival: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct HistoryRow {
    id: i64,
    order_id: Uuid,
    status: String,
    stage: i32,
    note: Option<String>,
    location: Option<String>,
    changed_by: Option<String>,
    created_at: DateTime<Utc>,
}

fn parse_status(s: &str) -> Result<OrderStatus, StoreError> {
    OrderStatus::parse(s).ok_or_else(|| StoreError::Invalid(format!("unknown status '{s}'")))
}

fn history_row_to_entry(row: HistoryRow) -> Result<OrderStatusHistory, StoreError> {
    Ok(OrderStatusHistory {
        id: row.id,
        order_id: row.order_id,
        status: parse_status(&row.status)?,
        stage: row.stage,
        note: row.note,
        location: row.location,
        changed_by: row.changed_by,
        created_at: row.created_at,
    })
}

fn order_row_to_order(row: OrderRow, history: Vec<OrderStatusHistory>) -> Result<Order, StoreError> {
    Ok(Order {
        id: row.id,
        order_number: row.order_number,
        tracking_code: row.tracking_code,
        car_make: row.car_make,
        car_model: row.car_model,
        car_year: row.car_year,
        vin: row.vin,
        color: row.color,
        image_url: row.image_url,
        auction_price: row.auction_price,
        shipping_cost: row.shipping_cost,
        total_price: row.total_price,
        customer_name: row.customer_name,
        customer_phone: row.customer_phone,
        customer_email: row.customer_email,
        status: parse_status(&row.status)?,
        current_stage: row.current_stage,
        auction_source: row.auction_source,
        lot_number: row.lot_number,
        origin_port: row.origin_port,
        destination_port: row.destination_port,
        vessel_name: row.vessel_name,
        estimated_arrival: row.estimated_arrival,
        created_at: row.created_at,
        updated_at: row.updated_at,
        history,
    })
}

impl PgOrderStore {
    /// History for one order, newest-first (bigserial id gives a stable
    /// order even when timestamps tie).
    async fn fetch_history(&self, order_id: Uuid) -> Result<Vec<OrderStatusHistory>, StoreError> {
        let rows = sqlx::query_as::<_, HistoryRow>(
            "SELECT id, order_id, status, stage, note, location, changed_by, created_at \
             FROM order_status_history WHERE order_id = $1 ORDER BY id DESC",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(history_row_to_entry).collect()
    }

    async fn fetch_order(&self, id: Uuid) -> Result<Option<Order>, StoreError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        match row {
            Some(row) => {
                let history = self.fetch_history(row.id).await?;
                Ok(Some(order_row_to_order(row, history)?))
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn create_order(&self, input: NewOrder) -> Result<Order, StoreError> {
        let mut tx = self.pool.begin().await?;

        let seq: i64 = sqlx::query_scalar("SELECT nextval('order_number_seq')")
            .fetch_one(&mut *tx)
            .await?;
        let now = Utc::now();
        let order_number = codes::format_order_number(now, seq);

        // Regenerate until an unused code is found.
        let tracking_code = loop {
            let candidate = codes::generate_tracking_code();
            let exists: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM orders WHERE tracking_code = $1)")
                    .bind(&candidate)
                    .fetch_one(&mut *tx)
                    .await?;
            if !exists {
                break candidate;
            }
        };

        let id = Uuid::new_v4();
        let status = OrderStatus::Won;
        sqlx::query(&format!(
            "INSERT INTO orders ({ORDER_COLUMNS}) VALUES \
             ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, \
              $18, $19, $20, $21, $22, $23, $24, $25)"
        ))
        .bind(id)
        .bind(&order_number)
        .bind(&tracking_code)
        .bind(&input.car_make)
        .bind(&input.car_model)
        .bind(input.car_year)
        .bind(&input.vin)
        .bind(&input.color)
        .bind(&input.image_url)
        .bind(input.auction_price)
        .bind(input.shipping_cost)
        .bind(input.total_price)
        .bind(&input.customer_name)
        .bind(&input.customer_phone)
        .bind(&input.customer_email)
        .bind(status.as_str())
        .bind(status.stage())
        .bind(&input.auction_source)
        .bind(&input.lot_number)
        .bind(&input.origin_port)
        .bind(&input.destination_port)
        .bind(&input.vessel_name)
        .bind(input.estimated_arrival)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let history_id: i64 = sqlx::query_scalar(
            "INSERT INTO order_status_history (order_id, status, stage, note, location, changed_by, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING id",
        )
        .bind(id)
        .bind(status.as_str())
        .bind(status.stage())
        .bind(CREATED_NOTE)
        .bind(Option::<String>::None)
        .bind(Option::<String>::None)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        let initial = OrderStatusHistory {
            id: history_id,
            order_id: id,
            status,
            stage: status.stage(),
            note: Some(CREATED_NOTE.to_string()),
            location: None,
            changed_by: None,
            created_at: now,
        };
        Ok(Order {
            id,
            order_number,
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
            status,
            current_stage: status.stage(),
            auction_source: input.auction_source,
            lot_number: input.lot_number,
            origin_port: input.origin_port,
            destination_port: input.destination_port,
            vessel_name: input.vessel_name,
            estimated_arrival: input.estimated_arrival,
            created_at: now,
            updated_at: now,
            history: vec![initial],
        })
    }

    async fn update_status(&self, id: OrderId, change: StatusChange) -> Result<Order, StoreError> {
        let mut tx = self.pool.begin().await?;
        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE orders SET status = $1, current_stage = $2, updated_at = $3 WHERE id = $4",
        )
        .bind(change.status.as_str())
        .bind(change.status.stage())
        .bind(now)
        .bind(id)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        sqlx::query(
            "INSERT INTO order_status_history (order_id, status, stage, note, location, changed_by, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(id)
        .bind(change.status.as_str())
        .bind(change.status.stage())
        .bind(&change.note)
        .bind(&change.location)
        .bind(&change.changed_by)
        .bind(now)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        self.fetch_order(id).await?.ok_or(StoreError::NotFound)
    }

    async fn update_order(&self, id: OrderId, patch: OrderPatch) -> Result<Order, StoreError> {
        let result = sqlx::query(
            "UPDATE orders SET \
                 car_make = COALESCE($1, car_make), \
                 car_model = COALESCE($2, car_model), \
                 car_year = COALESCE($3, car_year), \
                 vin = COALESCE($4, vin), \
                 color = COALESCE($5, color), \
                 image_url = COALESCE($6, image_url), \
                 auction_price = COALESCE($7, auction_price), \
                 shipping_cost = COALESCE($8, shipping_cost), \
                 total_price = COALESCE($9, total_price), \
                 customer_name = COALESCE($10, customer_name), \
                 customer_phone = COALESCE($11, customer_phone), \
                 customer_email = COALESCE($12, customer_email), \
                 auction_source = COALESCE($13, auction_source), \
                 lot_number = COALESCE($14, lot_number), \
                 origin_port = COALESCE($15, origin_port), \
                 destination_port = COALESCE($16, destination_port), \
                 vessel_name = COALESCE($17, vessel_name), \
                 estimated_arrival = COALESCE($18, estimated_arrival), \
                 updated_at = $19 \
             WHERE id = $20",
        )
        .bind(&patch.car_make)
        .bind(&patch.car_model)
        .bind(patch.car_year)
        .bind(&patch.vin)
        .bind(&patch.color)
        .bind(&patch.image_url)
        .bind(patch.auction_price)
        .bind(patch.shipping_cost)
        .bind(patch.total_price)
        .bind(&patch.customer_name)
        .bind(&patch.customer_phone)
        .bind(&patch.customer_email)
        .bind(&patch.auction_source)
        .bind(&patch.lot_number)
        .bind(&patch.origin_port)
        .bind(&patch.destination_port)
        .bind(&patch.vessel_name)
        .bind(patch.estimated_arrival)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        self.fetch_order(id).await?.ok_or(StoreError::NotFound)
    }

    async fn find_orders(&self, filter: &OrderFilter) -> Result<OrderPage, StoreError> {
        let status = filter.status.map(|s| s.as_str());
        let search = filter.search.as_deref();

        let total_items: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM orders WHERE {LIST_FILTER}"))
                .bind(status)
                .bind(search)
                .fetch_one(&self.pool)
                .await?;

        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE {LIST_FILTER} \
             ORDER BY created_at DESC, order_number DESC LIMIT $3 OFFSET $4"
        ))
        .bind(status)
        .bind(search)
        .bind(filter.limit as i64)
        .bind(filter.offset() as i64)
        .fetch_all(&self.pool)
        .await?;

        // One batched history fetch for the page, grouped per order.
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let history_rows = sqlx::query_as::<_, HistoryRow>(
            "SELECT id, order_id, status, stage, note, location, changed_by, created_at \
             FROM order_status_history WHERE order_id = ANY($1) ORDER BY id DESC",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;
        let mut by_order: HashMap<Uuid, Vec<OrderStatusHistory>> = HashMap::new();
        for row in history_rows {
            let order_id = row.order_id;
            by_order
                .entry(order_id)
                .or_default()
                .push(history_row_to_entry(row)?);
        }

        let items = rows
            .into_iter()
            .map(|row| {
                let history = by_order.remove(&row.id).unwrap_or_default();
                order_row_to_order(row, history)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(OrderPage {
            items,
            total_items: total_items as u64,
        })
    }

    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        self.fetch_order(id).await
    }

    async fn find_by_tracking_code(&self, code: &str) -> Result<Option<Order>, StoreError> {
        let code = codes::normalize_tracking_code(code);
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE tracking_code = $1"
        ))
        .bind(&code)
        .fetch_optional(&self.pool)
        .await?;
        match row {
            Some(row) => {
                let history = self.fetch_history(row.id).await?;
                Ok(Some(order_row_to_order(row, history)?))
            }
            None => Ok(None),
        }
    }

    async fn delete_order(&self, id: OrderId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
