//! Order repository.
//!
//! Orders are written once by checkout and afterwards only change status.
//! Address snapshots are stored as `JSONB` so later edits to the address book
//! never alter past orders.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use furnish_core::{OrderId, OrderStatus, PaymentMethodId, ProductId, UserId};

use super::{OrderStore, RepositoryError, db_quantity, model_quantity};
use crate::models::{AddressSnapshot, NewOrder, Order, OrderItem, OrderTotals};

const ORDER_COLUMNS: &str = r"
    id, user_id, subtotal, tax, shipping, discount, total, shipping_address,
    billing_address, payment_method_id, payment_last4, placed_at, status,
    estimated_delivery, tracking_code, notes, checkout_key
";

/// Row type for the `orders` table.
#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    user_id: UserId,
    subtotal: Decimal,
    tax: Decimal,
    shipping: Decimal,
    discount: Decimal,
    total: Decimal,
    shipping_address: Json<AddressSnapshot>,
    billing_address: Json<AddressSnapshot>,
    payment_method_id: Option<PaymentMethodId>,
    payment_last4: String,
    placed_at: DateTime<Utc>,
    status: OrderStatus,
    estimated_delivery: DateTime<Utc>,
    tracking_code: String,
    notes: Option<String>,
    checkout_key: Uuid,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> Result<Order, RepositoryError> {
        let totals = OrderTotals {
            subtotal: self.subtotal,
            tax: self.tax,
            shipping: self.shipping,
            discount: self.discount,
            total: self.total,
        };
        if !totals.is_consistent() {
            return Err(RepositoryError::DataCorruption(format!(
                "inconsistent totals for order {}",
                self.id
            )));
        }

        Ok(Order {
            id: self.id,
            user_id: self.user_id,
            items,
            totals,
            shipping_address: self.shipping_address.0,
            billing_address: self.billing_address.0,
            payment_method_id: self.payment_method_id,
            payment_last4: self.payment_last4,
            placed_at: self.placed_at,
            status: self.status,
            estimated_delivery: self.estimated_delivery,
            tracking_code: self.tracking_code,
            notes: self.notes,
            checkout_key: self.checkout_key,
        })
    }
}

/// Row type for the `order_items` table.
#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow {
    order_id: OrderId,
    product_id: ProductId,
    product_name: String,
    quantity: i32,
    unit_price: Decimal,
    line_total: Decimal,
    image: Option<String>,
}

impl TryFrom<OrderItemRow> for OrderItem {
    type Error = RepositoryError;

    fn try_from(row: OrderItemRow) -> Result<Self, Self::Error> {
        Ok(Self {
            product_id: row.product_id,
            product_name: row.product_name,
            quantity: model_quantity(row.quantity)?,
            unit_price: row.unit_price,
            line_total: row.line_total,
            image: row.image,
        })
    }
}

/// Attach items to a batch of order rows, preserving row order.
async fn with_items(
    conn: &mut PgConnection,
    rows: Vec<OrderRow>,
) -> Result<Vec<Order>, RepositoryError> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<i32> = rows.iter().map(|r| r.id.as_i32()).collect();
    let item_rows = sqlx::query_as::<_, OrderItemRow>(
        r"
        SELECT order_id, product_id, product_name, quantity, unit_price, line_total, image
        FROM order_items
        WHERE order_id = ANY($1)
        ORDER BY order_id, position
        ",
    )
    .bind(&ids)
    .fetch_all(&mut *conn)
    .await?;

    let mut items: HashMap<OrderId, Vec<OrderItem>> = HashMap::new();
    for row in item_rows {
        let order_id = row.order_id;
        items
            .entry(order_id)
            .or_default()
            .push(OrderItem::try_from(row)?);
    }

    rows.into_iter()
        .map(|row| {
            let lines = items.remove(&row.id).unwrap_or_default();
            row.into_order(lines)
        })
        .collect()
}

/// `PostgreSQL` order store.
pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn attach_items(&self, rows: Vec<OrderRow>) -> Result<Vec<Order>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        with_items(&mut conn, rows).await
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn create(&self, order: NewOrder) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            r"
            INSERT INTO orders (
                user_id, checkout_key, subtotal, tax, shipping, discount, total,
                shipping_address, billing_address, payment_method_id, payment_last4,
                placed_at, status, estimated_delivery, tracking_code, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            ON CONFLICT (user_id, checkout_key) DO NOTHING
            RETURNING {ORDER_COLUMNS}
            "
        );
        let inserted = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(order.user_id)
            .bind(order.checkout_key)
            .bind(order.totals.subtotal)
            .bind(order.totals.tax)
            .bind(order.totals.shipping)
            .bind(order.totals.discount)
            .bind(order.totals.total)
            .bind(Json(&order.shipping_address))
            .bind(Json(&order.billing_address))
            .bind(order.payment_method_id)
            .bind(&order.payment_last4)
            .bind(order.placed_at)
            .bind(order.status)
            .bind(order.estimated_delivery)
            .bind(&order.tracking_code)
            .bind(&order.notes)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(row) = inserted else {
            // Same checkout submitted twice; hand back the first order.
            tx.rollback().await?;
            return self
                .find_by_checkout_key(order.user_id, order.checkout_key)
                .await?
                .ok_or(RepositoryError::NotFound);
        };

        for (position, item) in (1_i32..).zip(&order.items) {
            sqlx::query(
                r"
                INSERT INTO order_items (
                    order_id, position, product_id, product_name, quantity,
                    unit_price, line_total, image
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                ",
            )
            .bind(row.id)
            .bind(position)
            .bind(item.product_id)
            .bind(&item.product_name)
            .bind(db_quantity(item.quantity)?)
            .bind(item.unit_price)
            .bind(item.line_total)
            .bind(&item.image)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        row.into_order(order.items)
    }

    async fn list_for_user(
        &self,
        user: UserId,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>, RepositoryError> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders \
             WHERE user_id = $1 AND ($2::order_status IS NULL OR status = $2) \
             ORDER BY placed_at DESC, id DESC"
        );
        let rows = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(user)
            .bind(status)
            .fetch_all(&self.pool)
            .await?;
        self.attach_items(rows).await
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(self.attach_items(row.into_iter().collect()).await?.pop())
    }

    async fn find_by_checkout_key(
        &self,
        user: UserId,
        checkout_key: Uuid,
    ) -> Result<Option<Order>, RepositoryError> {
        let sql =
            format!("SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 AND checkout_key = $2");
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(user)
            .bind(checkout_key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(self.attach_items(row.into_iter().collect()).await?.pop())
    }

    async fn update_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<Order, RepositoryError> {
        let updated: Option<OrderId> = sqlx::query_scalar(
            r"
            UPDATE orders
            SET status = $3, updated_at = now()
            WHERE id = $1 AND status = $2
            RETURNING id
            ",
        )
        .bind(id)
        .bind(from)
        .bind(to)
        .fetch_optional(&self.pool)
        .await?;

        if updated.is_none() {
            let exists: bool =
                sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM orders WHERE id = $1)")
                    .bind(id)
                    .fetch_one(&self.pool)
                    .await?;
            return Err(if exists {
                RepositoryError::Conflict(format!("order {id} is no longer {from}"))
            } else {
                RepositoryError::NotFound
            });
        }

        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    async fn recent(&self, limit: u32) -> Result<Vec<Order>, RepositoryError> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders ORDER BY placed_at DESC, id DESC LIMIT $1"
        );
        let rows = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;
        self.attach_items(rows).await
    }
}
