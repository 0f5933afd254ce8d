//! Shopping cart: one row per (user, book), merged on repeat adds.

use anyhow::{Context, Result};
use sqlx::PgPool;
use sqlx::Row;

use shelf_schemas::{BookId, CartItemId, CartLine, UserId};

use crate::books::book_from_row;

fn check_quantity(quantity: i32) -> Result<()> {
    if quantity < 1 {
        return Err(crate::invalid("quantity must be at least 1"));
    }
    Ok(())
}

/// Add `quantity` of a book to the user's cart, incrementing the existing
/// row if there is one. The upsert keeps a single row per pair even when
/// two adds race.
pub async fn add_or_increment(
    pool: &PgPool,
    user_id: UserId,
    book_id: BookId,
    quantity: i32,
) -> Result<CartItemId> {
    check_quantity(quantity)?;

    let (id,): (i64,) = sqlx::query_as::<_, (i64,)>(
        r#"
        insert into cart_items (user_id, book_id, quantity)
        values ($1, $2, $3)
        on conflict (user_id, book_id)
        do update set quantity = cart_items.quantity + excluded.quantity
        returning id
        "#,
    )
    .bind(user_id)
    .bind(book_id)
    .bind(quantity)
    .fetch_one(pool)
    .await
    .context("add_to_cart failed")?;

    Ok(id)
}

/// Cart lines with the full book embedded, newest first.
pub async fn list_cart(pool: &PgPool, user_id: UserId) -> Result<Vec<CartLine>> {
    let rows = sqlx::query(
        r#"
        select
          c.id, c.user_id, c.book_id, c.quantity, c.created_at,
          b.id as b_id,
          b.title as b_title,
          b.author as b_author,
          b.year as b_year,
          b.description as b_description,
          b.price as b_price,
          b.stock as b_stock,
          b.image_url as b_image_url,
          b.category as b_category,
          b.isbn as b_isbn,
          b.created_at as b_created_at
        from cart_items c
        join books b on b.id = c.book_id
        where c.user_id = $1
        order by c.created_at desc, c.id desc
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .context("list_cart failed")?;

    rows.iter()
        .map(|row| {
            Ok(CartLine {
                id: row.try_get("id")?,
                user_id: row.try_get("user_id")?,
                book_id: row.try_get("book_id")?,
                quantity: row.try_get("quantity")?,
                created_at: row.try_get("created_at")?,
                book: book_from_row(row, "b_")?,
            })
        })
        .collect()
}

/// Quantity of one (user, book) pair, if the book is in the cart.
pub async fn cart_quantity(pool: &PgPool, user_id: UserId, book_id: BookId) -> Result<Option<i32>> {
    let row: Option<(i32,)> =
        sqlx::query_as("select quantity from cart_items where user_id = $1 and book_id = $2")
            .bind(user_id)
            .bind(book_id)
            .fetch_optional(pool)
            .await
            .context("cart_quantity failed")?;

    Ok(row.map(|(q,)| q))
}

pub async fn set_quantity(pool: &PgPool, id: CartItemId, quantity: i32) -> Result<bool> {
    check_quantity(quantity)?;

    let res = sqlx::query("update cart_items set quantity = $2 where id = $1")
        .bind(id)
        .bind(quantity)
        .execute(pool)
        .await
        .context("set_cart_quantity failed")?;

    Ok(res.rows_affected() == 1)
}

pub async fn remove_item(pool: &PgPool, id: CartItemId) -> Result<bool> {
    let res = sqlx::query("delete from cart_items where id = $1")
        .bind(id)
        .execute(pool)
        .await
        .context("remove_cart_item failed")?;

    Ok(res.rows_affected() == 1)
}

/// Returns the number of rows removed (0 for an already empty cart).
pub async fn clear_cart(pool: &PgPool, user_id: UserId) -> Result<u64> {
    let res = sqlx::query("delete from cart_items where user_id = $1")
        .bind(user_id)
        .execute(pool)
        .await
        .context("clear_cart failed")?;

    Ok(res.rows_affected())
}
