//! Successful checkout.
//!
//! GREEN when:
//! - book stock 3, order of 2 at 300 (total 600) leaves stock 1,
//! - the order is `pending` with exactly one item priced 300,
//! - later catalog price edits do not touch the stored item price,
//! - lines for the same book decrement cumulatively.

use rust_decimal::Decimal;
use shelf_config::TotalPolicy;
use shelf_db::OrderManager;
use shelf_schemas::{BookInput, NewOrder, OrderLine, OrderStatus};
use shelf_testkit::{seed_book, seed_user, test_pool};

#[tokio::test]
async fn checkout_decrements_stock_and_records_pending_order() -> anyhow::Result<()> {
    let Some(pool) = test_pool("checkout_decrements_stock_and_records_pending_order").await? else {
        return Ok(());
    };

    let user = seed_user(&pool).await?;
    let book = seed_book(&pool, Decimal::from(300), 3).await?;

    let mgr = OrderManager::new(pool.clone(), 5_000, TotalPolicy::CoverItems);
    let order_id = mgr
        .create_order(&NewOrder {
            user_id: user.id,
            shipping_address: "X".to_string(),
            items: vec![OrderLine {
                book_id: book.id,
                quantity: 2,
                price: Decimal::from(300),
            }],
            total_amount: Decimal::from(600),
        })
        .await?;

    assert_eq!(shelf_db::books::fetch_stock(&pool, book.id).await?, Some(1));

    let summary = shelf_db::orders::fetch_order(&pool, order_id)
        .await?
        .expect("order exists");
    assert_eq!(summary.order.status, OrderStatus::Pending);
    assert_eq!(summary.order.user_id, user.id);
    assert_eq!(summary.order.total_amount, Decimal::from(600));
    assert_eq!(summary.username.as_deref(), Some(user.username.as_str()));
    assert_eq!(summary.items.len(), 1);
    assert_eq!(summary.items[0].item.book_id, book.id);
    assert_eq!(summary.items[0].item.quantity, 2);
    assert_eq!(summary.items[0].item.price, Decimal::from(300));
    assert_eq!(summary.items[0].title.as_deref(), Some(book.title.as_str()));

    Ok(())
}

#[tokio::test]
async fn stored_item_price_survives_catalog_edit() -> anyhow::Result<()> {
    let Some(pool) = test_pool("stored_item_price_survives_catalog_edit").await? else {
        return Ok(());
    };

    let user = seed_user(&pool).await?;
    let book = seed_book(&pool, Decimal::from(300), 5).await?;

    let mgr = OrderManager::new(pool.clone(), 5_000, TotalPolicy::Trust);
    let order_id = mgr
        .create_order(&NewOrder {
            user_id: user.id,
            shipping_address: "X".to_string(),
            items: vec![OrderLine {
                book_id: book.id,
                quantity: 1,
                price: Decimal::from(300),
            }],
            total_amount: Decimal::from(300),
        })
        .await?;

    let repriced = BookInput {
        title: book.title.clone(),
        author: book.author.clone(),
        year: book.year,
        description: book.description.clone(),
        price: Decimal::from(500),
        stock: book.stock,
        image_url: book.image_url.clone(),
        category: book.category.clone(),
        isbn: book.isbn.clone(),
    };
    assert!(shelf_db::books::update_book(&pool, book.id, &repriced).await?);

    let summary = shelf_db::orders::fetch_order(&pool, order_id)
        .await?
        .expect("order exists");
    assert_eq!(summary.items[0].item.price, Decimal::from(300));

    Ok(())
}

#[tokio::test]
async fn repeated_book_lines_decrement_cumulatively() -> anyhow::Result<()> {
    let Some(pool) = test_pool("repeated_book_lines_decrement_cumulatively").await? else {
        return Ok(());
    };

    let user = seed_user(&pool).await?;
    let a = seed_book(&pool, Decimal::new(1050, 2), 10).await?;
    let b = seed_book(&pool, Decimal::new(2000, 2), 4).await?;

    let mgr = OrderManager::new(pool.clone(), 5_000, TotalPolicy::Trust);
    let order_id = mgr
        .create_order(&NewOrder {
            user_id: user.id,
            shipping_address: "X".to_string(),
            items: vec![
                OrderLine { book_id: a.id, quantity: 2, price: a.price },
                OrderLine { book_id: b.id, quantity: 1, price: b.price },
                OrderLine { book_id: a.id, quantity: 3, price: a.price },
            ],
            total_amount: Decimal::new(7250, 2),
        })
        .await?;

    assert_eq!(shelf_db::books::fetch_stock(&pool, a.id).await?, Some(5));
    assert_eq!(shelf_db::books::fetch_stock(&pool, b.id).await?, Some(3));

    let summary = shelf_db::orders::fetch_order(&pool, order_id)
        .await?
        .expect("order exists");
    assert_eq!(summary.items.len(), 3);

    Ok(())
}
