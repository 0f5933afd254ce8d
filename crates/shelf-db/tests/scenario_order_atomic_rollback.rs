//! Checkout atomicity.
//!
//! GREEN when:
//! - an order whose second item references a missing book fails as a
//!   persistence error,
//! - no order header and no item rows survive,
//! - the first item's stock decrement is rolled back,
//! - an empty order is rejected before anything is written.

use rust_decimal::Decimal;
use shelf_config::TotalPolicy;
use shelf_db::{OrderError, OrderManager};
use shelf_schemas::{NewOrder, OrderLine};
use shelf_testkit::{missing_book_id, seed_book, seed_user, test_pool};

async fn order_count_for(pool: &sqlx::PgPool, user_id: i64) -> anyhow::Result<i64> {
    let (n,): (i64,) = sqlx::query_as("select count(*) from orders where user_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await?;
    Ok(n)
}

#[tokio::test]
async fn missing_book_rolls_back_whole_order() -> anyhow::Result<()> {
    let Some(pool) = test_pool("missing_book_rolls_back_whole_order").await? else {
        return Ok(());
    };

    let user = seed_user(&pool).await?;
    let book = seed_book(&pool, Decimal::from(120), 10).await?;
    let ghost = missing_book_id(&pool).await?;

    let mgr = OrderManager::new(pool.clone(), 5_000, TotalPolicy::Trust);
    let res = mgr
        .create_order(&NewOrder {
            user_id: user.id,
            shipping_address: "Av. Siempre Viva 742".to_string(),
            items: vec![
                OrderLine {
                    book_id: book.id,
                    quantity: 4,
                    price: Decimal::from(120),
                },
                OrderLine {
                    book_id: ghost,
                    quantity: 1,
                    price: Decimal::from(10),
                },
            ],
            total_amount: Decimal::from(490),
        })
        .await;

    match res {
        Err(OrderError::Persistence(_)) => {}
        other => panic!("expected persistence failure, got {other:?}"),
    }

    assert_eq!(order_count_for(&pool, user.id).await?, 0, "no header may survive");
    assert_eq!(
        shelf_db::books::fetch_stock(&pool, book.id).await?,
        Some(10),
        "first item's decrement must be rolled back"
    );

    let (orphans,): (i64,) = sqlx::query_as(
        "select count(*) from order_items oi left join orders o on o.id = oi.order_id where o.id is null",
    )
    .fetch_one(&pool)
    .await?;
    assert_eq!(orphans, 0);

    Ok(())
}

#[tokio::test]
async fn empty_order_writes_nothing() -> anyhow::Result<()> {
    let Some(pool) = test_pool("empty_order_writes_nothing").await? else {
        return Ok(());
    };

    let user = seed_user(&pool).await?;
    let mgr = OrderManager::new(pool.clone(), 5_000, TotalPolicy::Trust);

    let err = mgr
        .create_order(&NewOrder {
            user_id: user.id,
            shipping_address: "X".to_string(),
            items: vec![],
            total_amount: Decimal::ZERO,
        })
        .await
        .unwrap_err();

    match err {
        OrderError::Validation(msg) => assert_eq!(msg, "order must contain at least one item"),
        other => panic!("expected validation error, got {other:?}"),
    }
    assert_eq!(order_count_for(&pool, user.id).await?, 0);

    Ok(())
}

#[tokio::test]
async fn unknown_user_fails_without_touching_stock() -> anyhow::Result<()> {
    let Some(pool) = test_pool("unknown_user_fails_without_touching_stock").await? else {
        return Ok(());
    };

    let book = seed_book(&pool, Decimal::from(50), 2).await?;
    let mgr = OrderManager::new(pool.clone(), 5_000, TotalPolicy::Trust);

    let res = mgr
        .create_order(&NewOrder {
            user_id: i64::MAX,
            shipping_address: "X".to_string(),
            items: vec![OrderLine {
                book_id: book.id,
                quantity: 1,
                price: Decimal::from(50),
            }],
            total_amount: Decimal::from(50),
        })
        .await;

    assert!(matches!(res, Err(OrderError::Persistence(_))));
    assert_eq!(shelf_db::books::fetch_stock(&pool, book.id).await?, Some(2));

    Ok(())
}
