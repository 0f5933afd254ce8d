//! Shared storefront types.
//!
//! Row shapes mirror the Postgres schema in `shelf-db/migrations`; request
//! payloads mirror the JSON bodies the browser client sends. Field names are
//! snake_case on the wire. No business logic lives here beyond parsing and
//! simple arithmetic helpers.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub type UserId = i64;
pub type BookId = i64;
pub type CartItemId = i64;
pub type OrderId = i64;

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub author: String,
    /// Publication year; the catalog allows it to be unknown.
    pub year: Option<i32>,
    pub description: String,
    pub price: Decimal,
    /// May be negative after an oversold checkout.
    pub stock: i32,
    pub image_url: String,
    pub category: String,
    pub isbn: String,
    pub created_at: DateTime<Utc>,
}

/// Body of `POST /api/books` and `PUT /api/books/:id`.
///
/// Missing fields fall back to empty strings / zero, the same way the admin
/// catalog form submits partially filled books.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BookInput {
    pub title: String,
    pub author: String,
    pub year: Option<i32>,
    pub description: String,
    pub price: Decimal,
    pub stock: i32,
    pub image_url: String,
    pub category: String,
    pub isbn: String,
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// Public user record. The password hash never leaves `shelf-db`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub is_admin: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UserUpdate {
    pub username: String,
    pub email: String,
    pub is_admin: bool,
}

/// `username` may hold either the username or the email address.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

// ---------------------------------------------------------------------------
// Cart
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: CartItemId,
    pub user_id: UserId,
    pub book_id: BookId,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
}

/// A cart row joined with the book it points at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    pub id: CartItemId,
    pub user_id: UserId,
    pub book_id: BookId,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
    pub book: Book,
}

/// Body of `POST /api/cart`. `quantity` defaults to 1.
#[derive(Debug, Clone, Deserialize)]
pub struct AddToCart {
    pub user_id: UserId,
    pub book_id: BookId,
    #[serde(default)]
    pub quantity: Option<i32>,
}

impl AddToCart {
    pub fn quantity_or_default(&self) -> i32 {
        self.quantity.unwrap_or(1)
    }
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

/// Order lifecycle: `pending -> sent -> completed`, plus `cancelled`.
///
/// Orders are always created `pending`; every later change is an explicit
/// admin action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Sent,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 4] = [
        OrderStatus::Pending,
        OrderStatus::Sent,
        OrderStatus::Completed,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Sent => "sent",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Result<Self, UnknownOrderStatus> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "sent" => Ok(OrderStatus::Sent),
            "completed" => Ok(OrderStatus::Completed),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(UnknownOrderStatus(other.to_string())),
        }
    }

    /// Cancelled orders do not count towards revenue.
    pub fn counts_as_revenue(&self) -> bool {
        !matches!(self, OrderStatus::Cancelled)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = UnknownOrderStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::parse(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownOrderStatus(pub String);

impl std::fmt::Display for UnknownOrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid order status '{}'; expected pending/sent/completed/cancelled",
            self.0
        )
    }
}

impl std::error::Error for UnknownOrderStatus {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub shipping_address: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Line item as persisted. `price` is the unit price captured at checkout and
/// is independent of the book's current price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: OrderId,
    pub book_id: BookId,
    pub quantity: i32,
    pub price: Decimal,
}

/// Order item joined with catalog details (all optional: the join is outer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItemView {
    #[serde(flatten)]
    pub item: OrderItem,
    pub title: Option<String>,
    pub author: Option<String>,
    pub image_url: Option<String>,
    pub isbn: Option<String>,
}

/// Order header plus buyer info and items, as returned by the order listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSummary {
    #[serde(flatten)]
    pub order: Order,
    pub username: Option<String>,
    pub email: Option<String>,
    pub items: Vec<OrderItemView>,
}

/// One requested line of a checkout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub book_id: BookId,
    pub quantity: i32,
    /// Unit price as shown to the buyer.
    pub price: Decimal,
}

impl OrderLine {
    /// `price * quantity`, or `None` when the product overflows.
    pub fn line_total(&self) -> Option<Decimal> {
        self.price.checked_mul(Decimal::from(self.quantity))
    }
}

/// Body of `POST /api/orders`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewOrder {
    #[serde(default)]
    pub user_id: UserId,
    #[serde(default)]
    pub shipping_address: String,
    #[serde(default)]
    pub items: Vec<OrderLine>,
    #[serde(default)]
    pub total_amount: Decimal,
}

impl NewOrder {
    /// Sum of `quantity * price` over all lines (shipping not included).
    /// `None` when any product or the running sum overflows.
    pub fn items_subtotal(&self) -> Option<Decimal> {
        self.items
            .iter()
            .try_fold(Decimal::ZERO, |acc, line| acc.checked_add(line.line_total()?))
    }
}

/// Body of `PUT /api/orders/:id`. When both fields are present the status
/// update is applied and the address is ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderUpdate {
    pub status: Option<String>,
    pub shipping_address: Option<String>,
}

/// Body of `PUT /api/cart/:id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartQuantity {
    pub quantity: i32,
}

// ---------------------------------------------------------------------------
// Admin stats
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub total_users: i64,
    pub total_books: i64,
    pub total_orders: i64,
    pub total_revenue: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn order_status_round_trips_through_str() {
        for s in OrderStatus::ALL {
            assert_eq!(OrderStatus::parse(s.as_str()), Ok(s));
        }
        assert!(OrderStatus::parse("shipped").is_err());
        assert!(OrderStatus::parse("PENDING").is_err());
    }

    #[test]
    fn new_order_status_defaults_to_pending() {
        assert_eq!(OrderStatus::default(), OrderStatus::Pending);
        assert!(OrderStatus::Completed.counts_as_revenue());
        assert!(!OrderStatus::Cancelled.counts_as_revenue());
    }

    #[test]
    fn new_order_parses_client_body_with_numeric_money() {
        let body = json!({
            "user_id": 2,
            "shipping_address": "X",
            "items": [{"book_id": 1, "quantity": 2, "price": 300}],
            "total_amount": 600
        });
        let order: NewOrder = serde_json::from_value(body).unwrap();
        assert_eq!(order.user_id, 2);
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].price, Decimal::from(300));
        assert_eq!(order.total_amount, Decimal::from(600));
        assert_eq!(order.items_subtotal(), Some(Decimal::from(600)));
    }

    #[test]
    fn subtotal_uses_fractional_prices() {
        let order = NewOrder {
            user_id: 1,
            shipping_address: "Calle 1".into(),
            items: vec![
                OrderLine { book_id: 1, quantity: 3, price: Decimal::new(1999, 2) },
                OrderLine { book_id: 2, quantity: 1, price: Decimal::new(550, 2) },
            ],
            total_amount: Decimal::ZERO,
        };
        assert_eq!(order.items_subtotal(), Some(Decimal::new(6547, 2)));
    }

    #[test]
    fn missing_items_deserialize_as_empty() {
        let order: NewOrder = serde_json::from_value(json!({"user_id": 3})).unwrap();
        assert!(order.items.is_empty());
        assert_eq!(order.total_amount, Decimal::ZERO);
    }

    #[test]
    fn add_to_cart_quantity_defaults_to_one() {
        let add: AddToCart = serde_json::from_value(json!({"user_id": 1, "book_id": 9})).unwrap();
        assert_eq!(add.quantity_or_default(), 1);
    }
}
