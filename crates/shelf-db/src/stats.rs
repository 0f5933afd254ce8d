use anyhow::{Context, Result};
use sqlx::{PgPool, Row};

use shelf_schemas::{OrderStatus, Stats};

/// Admin dashboard counters. Revenue sums every order that is not cancelled.
pub async fn fetch_stats(pool: &PgPool) -> Result<Stats> {
    let row = sqlx::query(
        r#"
        select
          (select count(*) from users)::bigint  as total_users,
          (select count(*) from books)::bigint  as total_books,
          (select count(*) from orders)::bigint as total_orders,
          (select coalesce(sum(total_amount), 0)
             from orders
            where status <> $1)::numeric       as total_revenue
        "#,
    )
    .bind(OrderStatus::Cancelled.as_str())
    .fetch_one(pool)
    .await
    .context("fetch_stats failed")?;

    Ok(Stats {
        total_users: row.try_get("total_users")?,
        total_books: row.try_get("total_books")?,
        total_orders: row.try_get("total_orders")?,
        total_revenue: row.try_get("total_revenue")?,
    })
}
