//! Catalog CRUD.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use shelf_schemas::{Book, BookId, BookInput};

const BOOK_COLUMNS: &str =
    "id, title, author, year, description, price, stock, image_url, category, isbn, created_at";

/// Decode a book from a row whose book columns carry `prefix`
/// (empty for plain `select * from books`).
pub(crate) fn book_from_row(row: &PgRow, prefix: &str) -> Result<Book> {
    let col = |name: &str| format!("{prefix}{name}");
    Ok(Book {
        id: row.try_get(col("id").as_str())?,
        title: row.try_get(col("title").as_str())?,
        author: row.try_get(col("author").as_str())?,
        year: row.try_get(col("year").as_str())?,
        description: row.try_get(col("description").as_str())?,
        price: row.try_get(col("price").as_str())?,
        stock: row.try_get(col("stock").as_str())?,
        image_url: row.try_get(col("image_url").as_str())?,
        category: row.try_get(col("category").as_str())?,
        isbn: row.try_get(col("isbn").as_str())?,
        created_at: row.try_get(col("created_at").as_str())?,
    })
}

fn validate(input: &BookInput) -> Result<()> {
    if input.title.trim().is_empty() || input.author.trim().is_empty() {
        return Err(crate::invalid("title and author are required"));
    }
    if input.price < Decimal::ZERO {
        return Err(crate::invalid("price must not be negative"));
    }
    Ok(())
}

/// All books, newest first.
pub async fn list_books(pool: &PgPool) -> Result<Vec<Book>> {
    let rows = sqlx::query(&format!(
        "select {BOOK_COLUMNS} from books order by created_at desc, id desc"
    ))
    .fetch_all(pool)
    .await
    .context("list_books failed")?;

    rows.iter().map(|r| book_from_row(r, "")).collect()
}

pub async fn fetch_book(pool: &PgPool, id: BookId) -> Result<Option<Book>> {
    let row = sqlx::query(&format!("select {BOOK_COLUMNS} from books where id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("fetch_book failed")?;

    row.as_ref().map(|r| book_from_row(r, "")).transpose()
}

pub async fn insert_book(pool: &PgPool, input: &BookInput) -> Result<BookId> {
    validate(input)?;

    let (id,): (i64,) = sqlx::query_as::<_, (i64,)>(
        r#"
        insert into books (
          title, author, year, description, price, stock, image_url, category, isbn
        ) values (
          $1, $2, $3, $4, $5, $6, $7, $8, $9
        )
        returning id
        "#,
    )
    .bind(&input.title)
    .bind(&input.author)
    .bind(input.year)
    .bind(&input.description)
    .bind(input.price)
    .bind(input.stock)
    .bind(&input.image_url)
    .bind(&input.category)
    .bind(&input.isbn)
    .fetch_one(pool)
    .await
    .context("insert_book failed")?;

    Ok(id)
}

/// Full replace of the editable fields. Returns false when no row has `id`.
pub async fn update_book(pool: &PgPool, id: BookId, input: &BookInput) -> Result<bool> {
    validate(input)?;

    let res = sqlx::query(
        r#"
        update books
        set title = $2,
            author = $3,
            year = $4,
            description = $5,
            price = $6,
            stock = $7,
            image_url = $8,
            category = $9,
            isbn = $10
        where id = $1
        "#,
    )
    .bind(id)
    .bind(&input.title)
    .bind(&input.author)
    .bind(input.year)
    .bind(&input.description)
    .bind(input.price)
    .bind(input.stock)
    .bind(&input.image_url)
    .bind(&input.category)
    .bind(&input.isbn)
    .execute(pool)
    .await
    .context("update_book failed")?;

    Ok(res.rows_affected() == 1)
}

/// Fails with a foreign-key violation while order items still reference the book.
pub async fn delete_book(pool: &PgPool, id: BookId) -> Result<bool> {
    let res = sqlx::query("delete from books where id = $1")
        .bind(id)
        .execute(pool)
        .await
        .context("delete_book failed")?;

    Ok(res.rows_affected() == 1)
}

/// Current stock level, or `None` for an unknown book.
pub async fn fetch_stock(pool: &PgPool, id: BookId) -> Result<Option<i32>> {
    let row: Option<(i32,)> = sqlx::query_as("select stock from books where id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("fetch_stock failed")?;

    Ok(row.map(|(s,)| s))
}
