//! Axum router and all HTTP handlers for shelf-daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers (tracing, CORS, timeout) so tests can use the bare router.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use tracing::info;

use shelf_db::users::Registration;
use shelf_db::{books, cart, orders, stats, users};
use shelf_schemas::{
    AddToCart, BookId, BookInput, CartItemId, CartQuantity, LoginRequest, NewOrder, NewUser,
    OrderId, OrderStatus, OrderUpdate, UserId, UserUpdate,
};

use crate::{
    api_types::{CreatedResponse, HealthResponse, MessageResponse, UserResponse},
    error::{ApiError, ApiJson, ApiPath},
    state::AppState,
};

type ApiResult<T> = Result<T, ApiError>;

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        // auth
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        // users
        .route("/api/users", get(list_users))
        .route(
            "/api/users/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
        // catalog
        .route("/api/books", get(list_books).post(create_book))
        .route(
            "/api/books/:id",
            get(get_book).put(update_book).delete(delete_book),
        )
        // cart; GET takes a user id, PUT/DELETE a cart row id
        .route("/api/cart", post(add_to_cart))
        .route(
            "/api/cart/:id",
            get(get_cart).put(set_cart_quantity).delete(remove_cart_item),
        )
        .route("/api/cart/user/:user_id", delete(clear_cart))
        // orders
        .route("/api/orders", get(list_orders).post(create_order))
        .route("/api/orders/user/:user_id", get(list_user_orders))
        .route(
            "/api/orders/:id",
            get(get_order).put(update_order).delete(delete_order),
        )
        .route("/api/stats", get(get_stats))
        .fallback(not_found)
        .with_state(state)
}

async fn not_found() -> ApiError {
    ApiError::NotFound("route not found".to_string())
}

// ---------------------------------------------------------------------------
// GET /api/health
// ---------------------------------------------------------------------------

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: st.build.service,
            version: st.build.version,
        }),
    )
}

// ---------------------------------------------------------------------------
// /api/auth
// ---------------------------------------------------------------------------

pub(crate) async fn register(
    State(st): State<Arc<AppState>>,
    ApiJson(body): ApiJson<NewUser>,
) -> ApiResult<impl IntoResponse> {
    match users::register(&st.pool, &body).await? {
        Registration::Created(user) => {
            info!(user_id = user.id, "user registered");
            Ok((
                StatusCode::CREATED,
                Json(UserResponse {
                    message: "user created".to_string(),
                    user,
                }),
            ))
        }
        Registration::EmailTaken => Err(ApiError::Conflict("email already registered".to_string())),
        Registration::UsernameTaken => {
            Err(ApiError::Conflict("username already taken".to_string()))
        }
    }
}

pub(crate) async fn login(
    State(st): State<Arc<AppState>>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> ApiResult<Json<UserResponse>> {
    let user = users::authenticate(&st.pool, &body.username, &body.password)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("invalid credentials".to_string()))?;

    Ok(Json(UserResponse {
        message: "login successful".to_string(),
        user,
    }))
}

// ---------------------------------------------------------------------------
// /api/users
// ---------------------------------------------------------------------------

pub(crate) async fn list_users(State(st): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    Ok(Json(users::list_users(&st.pool).await?))
}

pub(crate) async fn get_user(
    State(st): State<Arc<AppState>>,
    ApiPath(id): ApiPath<UserId>,
) -> ApiResult<impl IntoResponse> {
    let user = users::fetch_user(&st.pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("user not found".to_string()))?;
    Ok(Json(user))
}

pub(crate) async fn update_user(
    State(st): State<Arc<AppState>>,
    ApiPath(id): ApiPath<UserId>,
    ApiJson(body): ApiJson<UserUpdate>,
) -> ApiResult<Json<MessageResponse>> {
    let updated = users::update_user(&st.pool, id, &body).await.map_err(|e| {
        ApiError::from_store(e, ApiError::BadRequest("invalid reference".to_string()))
    })?;
    if !updated {
        return Err(ApiError::NotFound("user not found".to_string()));
    }
    Ok(Json(MessageResponse::new("user updated")))
}

pub(crate) async fn delete_user(
    State(st): State<Arc<AppState>>,
    ApiPath(id): ApiPath<UserId>,
) -> ApiResult<Json<MessageResponse>> {
    let deleted = users::delete_user(&st.pool, id).await.map_err(|e| {
        ApiError::from_store(e, ApiError::Conflict("user has orders".to_string()))
    })?;
    if !deleted {
        return Err(ApiError::NotFound("user not found".to_string()));
    }
    Ok(Json(MessageResponse::new("user deleted")))
}

// ---------------------------------------------------------------------------
// /api/books
// ---------------------------------------------------------------------------

pub(crate) async fn list_books(State(st): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    Ok(Json(books::list_books(&st.pool).await?))
}

pub(crate) async fn get_book(
    State(st): State<Arc<AppState>>,
    ApiPath(id): ApiPath<BookId>,
) -> ApiResult<impl IntoResponse> {
    let book = books::fetch_book(&st.pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("book not found".to_string()))?;
    Ok(Json(book))
}

pub(crate) async fn create_book(
    State(st): State<Arc<AppState>>,
    ApiJson(body): ApiJson<BookInput>,
) -> ApiResult<impl IntoResponse> {
    let id = books::insert_book(&st.pool, &body).await?;
    info!(book_id = id, "book created");
    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            message: "book created".to_string(),
            id,
        }),
    ))
}

pub(crate) async fn update_book(
    State(st): State<Arc<AppState>>,
    ApiPath(id): ApiPath<BookId>,
    ApiJson(body): ApiJson<BookInput>,
) -> ApiResult<Json<MessageResponse>> {
    if !books::update_book(&st.pool, id, &body).await? {
        return Err(ApiError::NotFound("book not found".to_string()));
    }
    Ok(Json(MessageResponse::new("book updated")))
}

pub(crate) async fn delete_book(
    State(st): State<Arc<AppState>>,
    ApiPath(id): ApiPath<BookId>,
) -> ApiResult<Json<MessageResponse>> {
    let deleted = books::delete_book(&st.pool, id).await.map_err(|e| {
        ApiError::from_store(
            e,
            ApiError::Conflict("book is referenced by existing orders".to_string()),
        )
    })?;
    if !deleted {
        return Err(ApiError::NotFound("book not found".to_string()));
    }
    Ok(Json(MessageResponse::new("book deleted")))
}

// ---------------------------------------------------------------------------
// /api/cart
// ---------------------------------------------------------------------------

pub(crate) async fn get_cart(
    State(st): State<Arc<AppState>>,
    ApiPath(user_id): ApiPath<UserId>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(cart::list_cart(&st.pool, user_id).await?))
}

pub(crate) async fn add_to_cart(
    State(st): State<Arc<AppState>>,
    ApiJson(body): ApiJson<AddToCart>,
) -> ApiResult<impl IntoResponse> {
    cart::add_or_increment(&st.pool, body.user_id, body.book_id, body.quantity_or_default())
        .await
        .map_err(|e| {
            ApiError::from_store(e, ApiError::BadRequest("unknown user or book".to_string()))
        })?;
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("added to cart")),
    ))
}

pub(crate) async fn set_cart_quantity(
    State(st): State<Arc<AppState>>,
    ApiPath(id): ApiPath<CartItemId>,
    ApiJson(body): ApiJson<CartQuantity>,
) -> ApiResult<Json<MessageResponse>> {
    if !cart::set_quantity(&st.pool, id, body.quantity).await? {
        return Err(ApiError::NotFound("cart item not found".to_string()));
    }
    Ok(Json(MessageResponse::new("quantity updated")))
}

pub(crate) async fn remove_cart_item(
    State(st): State<Arc<AppState>>,
    ApiPath(id): ApiPath<CartItemId>,
) -> ApiResult<Json<MessageResponse>> {
    if !cart::remove_item(&st.pool, id).await? {
        return Err(ApiError::NotFound("cart item not found".to_string()));
    }
    Ok(Json(MessageResponse::new("item removed from cart")))
}

pub(crate) async fn clear_cart(
    State(st): State<Arc<AppState>>,
    ApiPath(user_id): ApiPath<UserId>,
) -> ApiResult<Json<MessageResponse>> {
    cart::clear_cart(&st.pool, user_id).await?;
    Ok(Json(MessageResponse::new("cart cleared")))
}

// ---------------------------------------------------------------------------
// /api/orders
// ---------------------------------------------------------------------------

pub(crate) async fn list_orders(State(st): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    Ok(Json(orders::list_orders(&st.pool).await?))
}

pub(crate) async fn list_user_orders(
    State(st): State<Arc<AppState>>,
    ApiPath(user_id): ApiPath<UserId>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(orders::list_user_orders(&st.pool, user_id).await?))
}

pub(crate) async fn get_order(
    State(st): State<Arc<AppState>>,
    ApiPath(id): ApiPath<OrderId>,
) -> ApiResult<impl IntoResponse> {
    let order = orders::fetch_order(&st.pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("order not found".to_string()))?;
    Ok(Json(order))
}

/// Checkout. 201 `{message, id}`; validation failures are 400 and any
/// failure inside the transaction is a generic 500.
pub(crate) async fn create_order(
    State(st): State<Arc<AppState>>,
    ApiJson(body): ApiJson<NewOrder>,
) -> ApiResult<impl IntoResponse> {
    let id = st.orders.create_order(&body).await?;
    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            message: "order created".to_string(),
            id,
        }),
    ))
}

/// `status` wins when both fields are present.
pub(crate) async fn update_order(
    State(st): State<Arc<AppState>>,
    ApiPath(id): ApiPath<OrderId>,
    ApiJson(body): ApiJson<OrderUpdate>,
) -> ApiResult<Json<MessageResponse>> {
    let (updated, message) = if let Some(raw) = body.status.as_deref() {
        let status =
            OrderStatus::parse(raw).map_err(|e| ApiError::BadRequest(e.to_string()))?;
        (
            orders::update_status(&st.pool, id, status).await?,
            "status updated",
        )
    } else if let Some(address) = body.shipping_address.as_deref() {
        (
            orders::update_shipping_address(&st.pool, id, address).await?,
            "shipping address updated",
        )
    } else {
        return Err(ApiError::BadRequest(
            "status or shipping_address is required".to_string(),
        ));
    };

    if !updated {
        return Err(ApiError::NotFound("order not found".to_string()));
    }
    Ok(Json(MessageResponse::new(message)))
}

pub(crate) async fn delete_order(
    State(st): State<Arc<AppState>>,
    ApiPath(id): ApiPath<OrderId>,
) -> ApiResult<Json<MessageResponse>> {
    if !orders::delete_order(&st.pool, id).await? {
        return Err(ApiError::NotFound("order not found".to_string()));
    }
    info!(order_id = id, "order deleted");
    Ok(Json(MessageResponse::new("order deleted")))
}

// ---------------------------------------------------------------------------
// GET /api/stats
// ---------------------------------------------------------------------------

pub(crate) async fn get_stats(State(st): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    Ok(Json(stats::fetch_stats(&st.pool).await?))
}
