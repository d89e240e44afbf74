use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::header::HeaderMap;
use axum::routing::{get, post};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::rest::actor_from_headers;
use crate::engine::dispatch;
use crate::error::AppError;
use crate::lifecycle::order::transition;
use crate::models::order::{Actor, LineItem, Order, OrderStatus, StatusEntry};
use crate::models::rider::GeoPoint;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/orders", post(create_order).get(list_orders))
        .route("/orders/:id", get(get_order))
        .route("/orders/:id/status", post(update_order_status))
        .route("/orders/:id/force-assign", post(force_assign))
}

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub vendor_id: Uuid,
    pub customer_id: Uuid,
    pub vendor_location: GeoPoint,
    pub dropoff: GeoPoint,
    pub zone: Option<String>,
    pub items: Vec<LineItemRequest>,
    #[serde(default)]
    pub is_batch_eligible: bool,
}

#[derive(Deserialize)]
pub struct LineItemRequest {
    pub product_id: Uuid,
    pub quantity: u32,
    pub unit_price: f64,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub target: OrderStatus,
    pub expected_version: Option<u64>,
}

#[derive(Deserialize)]
pub struct ForceAssignRequest {
    pub rider_id: Uuid,
}

#[derive(Deserialize)]
pub struct ListOrdersQuery {
    pub needs_manual: Option<bool>,
}

async fn create_order(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<Json<Order>, AppError> {
    if payload.items.is_empty() {
        return Err(AppError::BadRequest("order needs at least one item".to_string()));
    }
    if payload.items.iter().any(|item| item.quantity == 0) {
        return Err(AppError::BadRequest("item quantity must be > 0".to_string()));
    }

    let now = Utc::now();
    let order = Order {
        id: Uuid::new_v4(),
        vendor_id: payload.vendor_id,
        customer_id: payload.customer_id,
        vendor_location: payload.vendor_location,
        dropoff: payload.dropoff,
        zone: payload.zone,
        items: payload
            .items
            .into_iter()
            .map(|item| LineItem {
                product_id: item.product_id,
                quantity: item.quantity,
                unit_price: item.unit_price,
            })
            .collect(),
        status: OrderStatus::Pending,
        rider_id: None,
        status_history: vec![StatusEntry {
            status: OrderStatus::Pending,
            at: now,
            actor: Actor::Customer,
        }],
        is_batch_eligible: payload.is_batch_eligible,
        needs_manual_assignment: false,
        rush: false,
        version: 0,
        created_at: now,
    };

    state.orders.insert(order.id, order.clone());
    Ok(Json(order))
}

async fn get_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    let order = state
        .orders
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("order {} not found", id)))?;

    Ok(Json(order.value().clone()))
}

async fn list_orders(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListOrdersQuery>,
) -> Json<Vec<Order>> {
    let orders = state
        .orders
        .iter()
        .filter(|entry| match query.needs_manual {
            Some(flag) => entry.needs_manual_assignment == flag,
            None => true,
        })
        .map(|entry| entry.value().clone())
        .collect();

    Json(orders)
}

async fn update_order_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<Order>, AppError> {
    let actor = actor_from_headers(&headers)?;
    let order = transition(&state, id, payload.target, actor, payload.expected_version).await?;
    Ok(Json(order))
}

async fn force_assign(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(payload): Json<ForceAssignRequest>,
) -> Result<Json<Order>, AppError> {
    let actor = actor_from_headers(&headers)?;
    if actor != Actor::Admin {
        return Err(AppError::BadRequest("force-assign is admin only".to_string()));
    }

    let order = dispatch::force_assign(&state, id, payload.rider_id).await?;
    Ok(Json(order))
}
