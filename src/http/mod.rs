//! HTTP boundary
//!
//! Maps core error kinds to status codes and extracts the verified actor
//! forwarded by the upstream authentication middleware. No business rules
//! live here.

use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Path, State},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::domain::{CartSnapshot, Order, OrderItem, PaymentResult, Product, Review, ShippingAddress};
use crate::events::{DomainEvent, EventPublisher};
use crate::service::{InventoryLedger, OrderLifecycleManager, ReviewAggregator, SalesSummary};
use crate::store::{OrderStore, ProductStore};
use crate::{domain::product::slugify, Actor, Error};

#[derive(Clone)]
pub struct AppState {
    products: Arc<dyn ProductStore>,
    orders: Arc<OrderLifecycleManager>,
    reviews: Arc<ReviewAggregator>,
    inventory: Arc<InventoryLedger>,
    events: EventPublisher,
}

impl AppState {
    pub fn new(
        products: Arc<dyn ProductStore>,
        orders: Arc<dyn OrderStore>,
        events: EventPublisher,
    ) -> Self {
        Self {
            orders: Arc::new(OrderLifecycleManager::new(orders, products.clone())),
            reviews: Arc::new(ReviewAggregator::new(products.clone())),
            inventory: Arc::new(InventoryLedger::new(products.clone())),
            products,
            events,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/products", get(list_products).post(create_product))
        .route(
            "/api/v1/products/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route("/api/v1/products/:id/stock", put(adjust_stock))
        .route("/api/v1/products/:id/reviews", post(create_review))
        .route(
            "/api/v1/products/:id/reviews/:review_id",
            put(update_review).delete(delete_review),
        )
        .route("/api/v1/orders", get(list_orders).post(create_order))
        .route("/api/v1/orders/summary", get(order_summary))
        .route(
            "/api/v1/orders/:id",
            get(get_order).delete(delete_order),
        )
        .route("/api/v1/orders/:id/pay", put(pay_order))
        .route("/api/v1/orders/:id/deliver", put(deliver_order))
        .with_state(state)
}

// =============================================================================
// Errors
// =============================================================================

pub enum ApiError {
    Core(Error),
    BadRequest(String),
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError::Core(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Core(err) => {
                let status = match &err {
                    Error::ProductNotFound | Error::OrderNotFound | Error::ReviewNotFound => {
                        StatusCode::NOT_FOUND
                    }
                    Error::InsufficientStock(_) | Error::DuplicateReview | Error::InvalidRating => {
                        StatusCode::BAD_REQUEST
                    }
                    Error::NotAuthorized => StatusCode::UNAUTHORIZED,
                    Error::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                if status == StatusCode::INTERNAL_SERVER_ERROR {
                    tracing::error!(%err, "request failed");
                }
                (status, err.to_string())
            }
        };
        (status, Json(serde_json::json!({ "message": message }))).into_response()
    }
}

fn check<T: Validate>(payload: &T) -> Result<(), ApiError> {
    payload
        .validate()
        .map_err(|e| ApiError::BadRequest(e.to_string()))
}

// =============================================================================
// Actor extraction
// =============================================================================

// The auth layer in front of this service verifies the token and forwards
// the identity in these headers.
#[axum::async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, String);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get("x-actor-id")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| Uuid::parse_str(v).ok())
            .ok_or((StatusCode::UNAUTHORIZED, "missing actor identity".to_string()))?;
        let name = parts
            .headers
            .get("x-actor-name")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let is_admin = parts
            .headers
            .get("x-actor-admin")
            .and_then(|v| v.to_str().ok())
            .map(|v| v == "true")
            .unwrap_or(false);
        Ok(Actor { id, name, is_admin })
    }
}

fn require_admin(actor: &Actor) -> Result<(), ApiError> {
    if actor.is_admin {
        Ok(())
    } else {
        Err(Error::NotAuthorized.into())
    }
}

// =============================================================================
// Handlers
// =============================================================================

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "healthy", "service": "storefront" }))
}

async fn list_products(State(s): State<AppState>) -> Result<Json<Vec<Product>>, ApiError> {
    Ok(Json(s.products.list().await?))
}

async fn get_product(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Product>, ApiError> {
    let product = s.products.get(id).await?.ok_or(Error::ProductNotFound)?;
    Ok(Json(product))
}

#[derive(Debug, Deserialize, Validate)]
pub struct ProductPayload {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub brand: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[validate(range(min = 0))]
    pub price: i64,
    #[validate(range(min = 0))]
    #[serde(default)]
    pub stock: i32,
    #[serde(default)]
    pub images: Vec<String>,
}

async fn create_product(
    State(s): State<AppState>,
    actor: Actor,
    Json(payload): Json<ProductPayload>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    require_admin(&actor)?;
    check(&payload)?;
    let mut product = Product::new(payload.name, payload.category, payload.price, payload.stock);
    product.brand = payload.brand;
    product.description = payload.description;
    product.images = payload.images;
    s.products.insert(&product).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

async fn update_product(
    State(s): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<ProductPayload>,
) -> Result<Json<Product>, ApiError> {
    require_admin(&actor)?;
    check(&payload)?;
    let mut product = s.products.get(id).await?.ok_or(Error::ProductNotFound)?;
    product.link = slugify(&payload.name);
    product.name = payload.name;
    product.brand = payload.brand;
    product.category = payload.category;
    product.description = payload.description;
    product.price = payload.price;
    product.images = payload.images;
    product.updated_at = chrono::Utc::now();
    // Stock is adjusted through the dedicated endpoint, not the catalog edit.
    s.products.update(&product).await?;
    Ok(Json(product))
}

async fn delete_product(
    State(s): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    require_admin(&actor)?;
    if !s.products.delete(id).await? {
        return Err(Error::ProductNotFound.into());
    }
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct StockAdjustment {
    pub delta: i64,
}

async fn adjust_stock(
    State(s): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<StockAdjustment>,
) -> Result<Json<Product>, ApiError> {
    require_admin(&actor)?;
    if payload.delta == 0 || payload.delta.unsigned_abs() > u32::MAX as u64 {
        return Err(ApiError::BadRequest("delta out of range".into()));
    }
    let quantity = payload.delta.unsigned_abs() as u32;
    if payload.delta > 0 {
        s.inventory.release(id, quantity).await?;
        s.events
            .publish(DomainEvent::StockReleased { product_id: id, quantity })
            .await;
    } else {
        s.inventory.reserve(id, quantity).await?;
        s.events
            .publish(DomainEvent::StockReserved { product_id: id, quantity })
            .await;
    }
    let product = s.products.get(id).await?.ok_or(Error::ProductNotFound)?;
    Ok(Json(product))
}

#[derive(Debug, Deserialize, Validate)]
pub struct ReviewPayload {
    pub ratings: i32,
    #[validate(length(max = 2000))]
    #[serde(default)]
    pub comment: String,
}

async fn create_review(
    State(s): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReviewPayload>,
) -> Result<(StatusCode, Json<Review>), ApiError> {
    check(&payload)?;
    let review = s
        .reviews
        .create(id, &actor, payload.ratings, payload.comment)
        .await?;
    s.events
        .publish(DomainEvent::ReviewPosted {
            product_id: id,
            review_id: review.id,
            ratings: review.ratings,
        })
        .await;
    Ok((StatusCode::CREATED, Json(review)))
}

async fn update_review(
    State(s): State<AppState>,
    actor: Actor,
    Path((id, review_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<ReviewPayload>,
) -> Result<Json<Review>, ApiError> {
    check(&payload)?;
    let review = s
        .reviews
        .update(id, review_id, &actor, payload.ratings, payload.comment)
        .await?;
    Ok(Json(review))
}

async fn delete_review(
    State(s): State<AppState>,
    actor: Actor,
    Path((id, review_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    s.reviews.delete(id, review_id, &actor).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateOrderRequest {
    #[validate(length(min = 1))]
    pub items: Vec<OrderItemPayload>,
    pub shipping_address: ShippingAddress,
    #[validate(length(min = 1))]
    pub payment_method: String,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct OrderItemPayload {
    pub product_id: Uuid,
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(range(min = 1))]
    pub quantity: u32,
    #[validate(range(min = 0))]
    pub price: i64,
    #[serde(default)]
    pub images: Vec<String>,
}

async fn create_order(
    State(s): State<AppState>,
    actor: Actor,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    check(&payload)?;
    for item in &payload.items {
        check(item)?;
    }
    let cart = CartSnapshot {
        items: payload
            .items
            .into_iter()
            .map(|i| OrderItem {
                product_id: i.product_id,
                name: i.name,
                quantity: i.quantity,
                price: i.price,
                images: i.images,
            })
            .collect(),
        shipping_address: payload.shipping_address,
        payment_method: payload.payment_method,
    };
    let order = s.orders.create(cart, actor.id).await?;
    s.events
        .publish(DomainEvent::OrderPlaced {
            order_id: order.id,
            user_id: order.user_id,
            total_price: order.total_price,
        })
        .await;
    Ok((StatusCode::CREATED, Json(order)))
}

async fn list_orders(State(s): State<AppState>, actor: Actor) -> Result<Json<Vec<Order>>, ApiError> {
    Ok(Json(s.orders.list_for(&actor).await?))
}

async fn get_order(
    State(s): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, ApiError> {
    let order = s.orders.get(id).await?;
    if order.user_id != actor.id && !actor.is_admin {
        return Err(Error::NotAuthorized.into());
    }
    Ok(Json(order))
}

#[derive(Debug, Deserialize, Validate)]
pub struct PaymentResultPayload {
    #[validate(length(min = 1))]
    pub id: String,
    #[validate(length(min = 1))]
    pub status: String,
    #[serde(default)]
    pub update_time: String,
    #[serde(default)]
    pub payer_email: String,
}

async fn pay_order(
    State(s): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<PaymentResultPayload>,
) -> Result<Json<Order>, ApiError> {
    check(&payload)?;
    let existing = s.orders.get(id).await?;
    if existing.user_id != actor.id && !actor.is_admin {
        return Err(Error::NotAuthorized.into());
    }
    let result = PaymentResult {
        id: payload.id,
        status: payload.status,
        update_time: payload.update_time,
        payer_email: payload.payer_email,
    };
    let transaction_id = result.id.clone();
    let order = s.orders.mark_paid(id, result).await?;
    s.events
        .publish(DomainEvent::OrderPaid { order_id: order.id, transaction_id })
        .await;
    Ok(Json(order))
}

async fn deliver_order(
    State(s): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, ApiError> {
    require_admin(&actor)?;
    let order = s.orders.mark_delivered(id).await?;
    s.events
        .publish(DomainEvent::OrderDelivered { order_id: order.id })
        .await;
    Ok(Json(order))
}

async fn delete_order(
    State(s): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    require_admin(&actor)?;
    s.orders.delete(id).await?;
    s.events
        .publish(DomainEvent::OrderRemoved { order_id: id })
        .await;
    Ok(StatusCode::NO_CONTENT)
}

async fn order_summary(
    State(s): State<AppState>,
    actor: Actor,
) -> Result<Json<SalesSummary>, ApiError> {
    require_admin(&actor)?;
    Ok(Json(s.orders.summary().await?))
}
