//! Concurrent checkouts against the same book.
//!
//! GREEN when both orders of 3 against stock 5 succeed and the final stock
//! is exactly -1: no lost update, and no availability guard.

use rust_decimal::Decimal;
use shelf_config::TotalPolicy;
use shelf_db::OrderManager;
use shelf_schemas::{NewOrder, OrderLine};
use shelf_testkit::{seed_book, seed_user, test_pool};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_orders_oversell_without_lost_update() -> anyhow::Result<()> {
    let Some(pool) = test_pool("concurrent_orders_oversell_without_lost_update").await? else {
        return Ok(());
    };

    let buyer_a = seed_user(&pool).await?;
    let buyer_b = seed_user(&pool).await?;
    let book = seed_book(&pool, Decimal::from(40), 5).await?;

    let mgr = OrderManager::new(pool.clone(), 5_000, TotalPolicy::Trust);
    let order_for = |user_id: i64| NewOrder {
        user_id,
        shipping_address: "X".to_string(),
        items: vec![OrderLine {
            book_id: book.id,
            quantity: 3,
            price: Decimal::from(40),
        }],
        total_amount: Decimal::from(120),
    };

    let (mgr_a, order_a) = (mgr.clone(), order_for(buyer_a.id));
    let (mgr_b, order_b) = (mgr.clone(), order_for(buyer_b.id));
    let a = tokio::spawn(async move { mgr_a.create_order(&order_a).await });
    let b = tokio::spawn(async move { mgr_b.create_order(&order_b).await });

    let id_a = a.await??;
    let id_b = b.await??;
    assert_ne!(id_a, id_b);

    assert_eq!(shelf_db::books::fetch_stock(&pool, book.id).await?, Some(-1));

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn many_single_unit_orders_sum_exactly() -> anyhow::Result<()> {
    let Some(pool) = test_pool("many_single_unit_orders_sum_exactly").await? else {
        return Ok(());
    };

    let buyer = seed_user(&pool).await?;
    let book = seed_book(&pool, Decimal::from(1), 20).await?;
    let mgr = OrderManager::new(pool.clone(), 5_000, TotalPolicy::Trust);

    let mut handles = Vec::new();
    for _ in 0..12 {
        let mgr = mgr.clone();
        let order = NewOrder {
            user_id: buyer.id,
            shipping_address: "X".to_string(),
            items: vec![OrderLine {
                book_id: book.id,
                quantity: 1,
                price: Decimal::from(1),
            }],
            total_amount: Decimal::from(1),
        };
        handles.push(tokio::spawn(async move { mgr.create_order(&order).await }));
    }
    for h in handles {
        h.await??;
    }

    assert_eq!(shelf_db::books::fetch_stock(&pool, book.id).await?, Some(8));

    Ok(())
}
