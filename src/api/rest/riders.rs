use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::routing::{patch, post};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::rider::{GeoPoint, Rider};
use crate::registry;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/riders", post(create_rider).get(list_riders))
        .route("/riders/:id/online", patch(update_rider_online))
        .route("/riders/:id/location", patch(update_rider_location))
}

#[derive(Deserialize)]
pub struct CreateRiderRequest {
    pub name: String,
    pub location: GeoPoint,
    pub rating: f64,
    pub max_batch_size: u8,
    pub assigned_zone: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateOnlineRequest {
    pub online: bool,
}

#[derive(Deserialize)]
pub struct UpdateLocationRequest {
    pub location: GeoPoint,
    pub timestamp: Option<DateTime<Utc>>,
}

async fn create_rider(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateRiderRequest>,
) -> Result<Json<Rider>, AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("name cannot be empty".to_string()));
    }
    if payload.max_batch_size == 0 {
        return Err(AppError::BadRequest("max_batch_size must be > 0".to_string()));
    }

    let now = Utc::now();
    let rider = Rider {
        id: Uuid::new_v4(),
        name: payload.name,
        online: true,
        available: true,
        location: payload.location,
        location_updated_at: now,
        rating: payload.rating.clamp(0.0, 5.0),
        active_order_ids: Vec::new(),
        max_batch_size: payload.max_batch_size,
        assigned_zone: payload.assigned_zone,
        idle_since: now,
    };

    state.riders.insert(rider.id, rider.clone());
    Ok(Json(rider))
}

async fn list_riders(State(state): State<Arc<AppState>>) -> Json<Vec<Rider>> {
    let riders = state
        .riders
        .iter()
        .map(|entry| entry.value().clone())
        .collect();
    Json(riders)
}

async fn update_rider_online(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateOnlineRequest>,
) -> Result<Json<Rider>, AppError> {
    let rider = registry::set_online(&state, id, payload.online)?;
    Ok(Json(rider))
}

async fn update_rider_location(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateLocationRequest>,
) -> Result<Json<Rider>, AppError> {
    let timestamp = payload.timestamp.unwrap_or_else(Utc::now);
    let rider = registry::update_location(&state, id, payload.location, timestamp)?;
    Ok(Json(rider))
}
