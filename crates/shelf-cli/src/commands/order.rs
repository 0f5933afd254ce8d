//! `shelf order ...`: inspect and administer orders from the terminal.

use anyhow::{Context, Result};
use sqlx::PgPool;

use shelf_db::orders;
use shelf_schemas::{OrderId, OrderStatus, OrderSummary};

/// key=value lines: header first, then one `item.N` line per item.
pub fn render(summary: &OrderSummary) -> Vec<String> {
    let o = &summary.order;
    let mut out = vec![
        format!("order_id={}", o.id),
        format!("user_id={}", o.user_id),
        format!("username={}", summary.username.as_deref().unwrap_or("-")),
        format!("status={}", o.status),
        format!("total_amount={}", o.total_amount),
        format!("shipping_address={}", o.shipping_address),
        format!("created_at={}", o.created_at.to_rfc3339()),
        format!("updated_at={}", o.updated_at.to_rfc3339()),
        format!("items={}", summary.items.len()),
    ];
    for (i, it) in summary.items.iter().enumerate() {
        out.push(format!(
            "item.{i}=book_id:{} quantity:{} price:{} title:{}",
            it.item.book_id,
            it.item.quantity,
            it.item.price,
            it.title.as_deref().unwrap_or("-"),
        ));
    }
    out
}

pub async fn show(pool: &PgPool, id: OrderId) -> Result<()> {
    let summary = orders::fetch_order(pool, id)
        .await?
        .with_context(|| format!("order {id} not found"))?;
    for line in render(&summary) {
        println!("{line}");
    }
    Ok(())
}

pub async fn set_status(pool: &PgPool, id: OrderId, status: &str) -> Result<()> {
    let status = OrderStatus::parse(status)?;
    if !orders::update_status(pool, id, status).await? {
        anyhow::bail!("order {id} not found");
    }
    println!("updated=true order_id={id} status={status}");
    Ok(())
}
