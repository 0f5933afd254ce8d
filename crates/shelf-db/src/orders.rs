//! Orders: the checkout transaction plus the read and admin paths.
//!
//! # Checkout contract
//! [`OrderManager::create_order`] either persists the header, every item row
//! and every stock decrement, or nothing at all:
//! - input is validated before a connection is taken,
//! - all writes share one `sqlx::Transaction`; any early return drops it,
//!   which rolls back,
//! - `commit` runs only after the last item succeeded.
//!
//! Stock is decremented arithmetically (`stock = stock - $q`) so concurrent
//! checkouts serialize on the row lock and never lose an update. There is no
//! availability check: stock may go negative, which is logged.

use std::collections::HashMap;

use anyhow::{bail, Context, Result};
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::{info, warn};

use shelf_config::{ShelfSettings, TotalPolicy};
use shelf_schemas::{
    NewOrder, Order, OrderId, OrderItem, OrderItemView, OrderStatus, OrderSummary, UserId,
};

#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    /// Rejected before any persistence work.
    #[error("{0}")]
    Validation(String),
    /// Anything that failed after the transaction began. The cause is kept
    /// for logging; callers see only the generic message.
    #[error("could not create order")]
    Persistence(anyhow::Error),
}

/// Checks performed before the transaction starts.
pub fn validate_new_order(order: &NewOrder, policy: TotalPolicy) -> Result<(), OrderError> {
    if order.items.is_empty() {
        return Err(OrderError::Validation(
            "order must contain at least one item".to_string(),
        ));
    }
    for (idx, line) in order.items.iter().enumerate() {
        if line.quantity <= 0 {
            return Err(OrderError::Validation(format!(
                "item {idx}: quantity must be a positive integer"
            )));
        }
        if line.price < Decimal::ZERO {
            return Err(OrderError::Validation(format!(
                "item {idx}: price must not be negative"
            )));
        }
    }
    if policy == TotalPolicy::CoverItems {
        let subtotal = order.items_subtotal().ok_or_else(|| {
            OrderError::Validation("order total out of range".to_string())
        })?;
        if order.total_amount < subtotal {
            return Err(OrderError::Validation(format!(
                "total_amount {} is less than items subtotal {}",
                order.total_amount, subtotal
            )));
        }
    }
    Ok(())
}

/// Owns the pool used for checkout; constructed once and shared.
#[derive(Debug, Clone)]
pub struct OrderManager {
    pool: PgPool,
    statement_timeout_ms: u64,
    total_policy: TotalPolicy,
}

impl OrderManager {
    pub fn new(pool: PgPool, statement_timeout_ms: u64, total_policy: TotalPolicy) -> Self {
        Self {
            pool,
            statement_timeout_ms,
            total_policy,
        }
    }

    pub fn from_settings(pool: PgPool, settings: &ShelfSettings) -> Self {
        Self::new(
            pool,
            settings.database.statement_timeout_ms,
            settings.orders.total_policy,
        )
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn total_policy(&self) -> TotalPolicy {
        self.total_policy
    }

    pub async fn create_order(&self, order: &NewOrder) -> Result<OrderId, OrderError> {
        validate_new_order(order, self.total_policy)?;

        let order_id = self
            .persist(order)
            .await
            .map_err(OrderError::Persistence)?;

        info!(
            order_id,
            user_id = order.user_id,
            items = order.items.len(),
            total_amount = %order.total_amount,
            "order created"
        );
        Ok(order_id)
    }

    async fn persist(&self, order: &NewOrder) -> Result<OrderId> {
        let mut tx = self.pool.begin().await.context("begin order tx failed")?;

        // set_config(.., true) is SET LOCAL: reset at commit or rollback.
        sqlx::query("select set_config('statement_timeout', $1, true)")
            .bind(self.statement_timeout_ms.to_string())
            .execute(&mut *tx)
            .await
            .context("set statement_timeout failed")?;

        let (order_id,): (i64,) = sqlx::query_as::<_, (i64,)>(
            r#"
            insert into orders (user_id, total_amount, status, shipping_address)
            values ($1, $2, $3, $4)
            returning id
            "#,
        )
        .bind(order.user_id)
        .bind(order.total_amount)
        .bind(OrderStatus::Pending.as_str())
        .bind(&order.shipping_address)
        .fetch_one(&mut *tx)
        .await
        .context("insert order header failed")?;

        for line in &order.items {
            sqlx::query(
                r#"
                insert into order_items (order_id, book_id, quantity, price)
                values ($1, $2, $3, $4)
                "#,
            )
            .bind(order_id)
            .bind(line.book_id)
            .bind(line.quantity)
            .bind(line.price)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("insert order item for book {} failed", line.book_id))?;

            let remaining: Option<(i32,)> = sqlx::query_as(
                "update books set stock = stock - $1 where id = $2 returning stock",
            )
            .bind(line.quantity)
            .bind(line.book_id)
            .fetch_optional(&mut *tx)
            .await
            .with_context(|| format!("stock decrement for book {} failed", line.book_id))?;

            let Some((stock,)) = remaining else {
                bail!("book {} not found", line.book_id);
            };
            if stock < 0 {
                warn!(book_id = line.book_id, stock, order_id, "stock oversold");
            }
        }

        tx.commit().await.context("commit order tx failed")?;
        Ok(order_id)
    }
}

// ---------------------------------------------------------------------------
// Read paths
// ---------------------------------------------------------------------------

fn order_from_row(row: &PgRow) -> Result<Order> {
    Ok(Order {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        total_amount: row.try_get("total_amount")?,
        status: OrderStatus::parse(&row.try_get::<String, _>("status")?)?,
        shipping_address: row.try_get("shipping_address")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn item_view_from_row(row: &PgRow) -> Result<OrderItemView> {
    Ok(OrderItemView {
        item: OrderItem {
            id: row.try_get("id")?,
            order_id: row.try_get("order_id")?,
            book_id: row.try_get("book_id")?,
            quantity: row.try_get("quantity")?,
            price: row.try_get("price")?,
        },
        title: row.try_get("title")?,
        author: row.try_get("author")?,
        image_url: row.try_get("image_url")?,
        isbn: row.try_get("isbn")?,
    })
}

const SUMMARY_SELECT: &str = r#"
    select
      o.id, o.user_id, o.total_amount, o.status, o.shipping_address,
      o.created_at, o.updated_at,
      u.username, u.email
    from orders o
    left join users u on u.id = o.user_id
"#;

/// Attach items (with book details) to already-fetched order headers,
/// using a single query for all of them.
async fn with_items(pool: &PgPool, rows: Vec<PgRow>) -> Result<Vec<OrderSummary>> {
    let mut summaries = rows
        .iter()
        .map(|row| {
            Ok(OrderSummary {
                order: order_from_row(row)?,
                username: row.try_get("username")?,
                email: row.try_get("email")?,
                items: Vec::new(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    if summaries.is_empty() {
        return Ok(summaries);
    }

    let ids: Vec<i64> = summaries.iter().map(|s| s.order.id).collect();
    let item_rows = sqlx::query(
        r#"
        select
          oi.id, oi.order_id, oi.book_id, oi.quantity, oi.price,
          b.title, b.author, b.image_url, b.isbn
        from order_items oi
        left join books b on b.id = oi.book_id
        where oi.order_id = any($1)
        order by oi.order_id, oi.id
        "#,
    )
    .bind(&ids)
    .fetch_all(pool)
    .await
    .context("fetch order items failed")?;

    let mut by_order: HashMap<OrderId, Vec<OrderItemView>> = HashMap::new();
    for row in &item_rows {
        let view = item_view_from_row(row)?;
        by_order.entry(view.item.order_id).or_default().push(view);
    }
    for s in &mut summaries {
        s.items = by_order.remove(&s.order.id).unwrap_or_default();
    }
    Ok(summaries)
}

/// Every order with buyer and items, newest first.
pub async fn list_orders(pool: &PgPool) -> Result<Vec<OrderSummary>> {
    let rows = sqlx::query(&format!(
        "{SUMMARY_SELECT} order by o.created_at desc, o.id desc"
    ))
    .fetch_all(pool)
    .await
    .context("list_orders failed")?;

    with_items(pool, rows).await
}

pub async fn list_user_orders(pool: &PgPool, user_id: UserId) -> Result<Vec<OrderSummary>> {
    let rows = sqlx::query(&format!(
        "{SUMMARY_SELECT} where o.user_id = $1 order by o.created_at desc, o.id desc"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await
    .context("list_user_orders failed")?;

    with_items(pool, rows).await
}

pub async fn fetch_order(pool: &PgPool, id: OrderId) -> Result<Option<OrderSummary>> {
    let row = sqlx::query(&format!("{SUMMARY_SELECT} where o.id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("fetch_order failed")?;

    let Some(row) = row else {
        return Ok(None);
    };
    Ok(with_items(pool, vec![row]).await?.pop())
}

// ---------------------------------------------------------------------------
// Admin updates
// ---------------------------------------------------------------------------

/// Any of the four states may be set at any time.
pub async fn update_status(pool: &PgPool, id: OrderId, status: OrderStatus) -> Result<bool> {
    let res = sqlx::query("update orders set status = $2 where id = $1")
        .bind(id)
        .bind(status.as_str())
        .execute(pool)
        .await
        .context("update_order_status failed")?;

    if res.rows_affected() == 1 {
        info!(order_id = id, status = status.as_str(), "order status updated");
    }
    Ok(res.rows_affected() == 1)
}

pub async fn update_shipping_address(pool: &PgPool, id: OrderId, address: &str) -> Result<bool> {
    let res = sqlx::query("update orders set shipping_address = $2 where id = $1")
        .bind(id)
        .bind(address)
        .execute(pool)
        .await
        .context("update_shipping_address failed")?;

    Ok(res.rows_affected() == 1)
}

/// Items cascade with the order. Stock is not given back.
pub async fn delete_order(pool: &PgPool, id: OrderId) -> Result<bool> {
    let res = sqlx::query("delete from orders where id = $1")
        .bind(id)
        .execute(pool)
        .await
        .context("delete_order failed")?;

    Ok(res.rows_affected() == 1)
}
