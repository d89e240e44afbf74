use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::rider::{GeoPoint, Rider};
use crate::state::AppState;

pub fn set_online(state: &AppState, rider_id: Uuid, online: bool) -> Result<Rider, AppError> {
    let mut rider = state
        .riders
        .get_mut(&rider_id)
        .ok_or_else(|| AppError::NotFound(format!("rider {} not found", rider_id)))?;

    if online && !rider.online && rider.active_order_ids.is_empty() {
        rider.idle_since = Utc::now();
    }
    rider.online = online;
    rider.recompute_available();

    info!(rider_id = %rider_id, online, "rider online state changed");
    Ok(rider.clone())
}

/// Last-write-wins by the client-supplied timestamp, not by arrival order.
/// Stale pings are ignored rather than rejected.
pub fn update_location(
    state: &AppState,
    rider_id: Uuid,
    location: GeoPoint,
    timestamp: DateTime<Utc>,
) -> Result<Rider, AppError> {
    let mut rider = state
        .riders
        .get_mut(&rider_id)
        .ok_or_else(|| AppError::NotFound(format!("rider {} not found", rider_id)))?;

    if timestamp <= rider.location_updated_at {
        debug!(rider_id = %rider_id, "ignoring out-of-order location update");
        return Ok(rider.clone());
    }

    rider.location = location;
    rider.location_updated_at = timestamp;
    Ok(rider.clone())
}

/// The single compare-and-set point preventing double-assignment: the
/// availability check and the load increment happen under one entry lock.
pub fn claim(state: &AppState, rider_id: Uuid, order_id: Uuid) -> Result<Rider, AppError> {
    let mut rider = state
        .riders
        .get_mut(&rider_id)
        .ok_or_else(|| AppError::NotFound(format!("rider {} not found", rider_id)))?;

    if !rider.available {
        return Err(AppError::RiderUnavailable(rider_id));
    }

    if !rider.active_order_ids.contains(&order_id) {
        rider.active_order_ids.push(order_id);
    }
    rider.recompute_available();

    let utilization = rider.active_order_ids.len() as f64 / rider.max_batch_size as f64;
    state
        .metrics
        .rider_utilization
        .with_label_values(&[&rider_id.to_string()])
        .set(utilization);

    info!(rider_id = %rider_id, order_id = %order_id, load = rider.active_order_ids.len(), "rider claimed");
    Ok(rider.clone())
}

pub fn release(state: &AppState, rider_id: Uuid, order_id: Uuid) -> Result<Rider, AppError> {
    let mut rider = state
        .riders
        .get_mut(&rider_id)
        .ok_or_else(|| AppError::NotFound(format!("rider {} not found", rider_id)))?;

    rider.active_order_ids.retain(|id| *id != order_id);
    if rider.active_order_ids.is_empty() {
        rider.idle_since = Utc::now();
    }
    rider.recompute_available();

    let utilization = rider.active_order_ids.len() as f64 / rider.max_batch_size as f64;
    state
        .metrics
        .rider_utilization
        .with_label_values(&[&rider_id.to_string()])
        .set(utilization);

    info!(rider_id = %rider_id, order_id = %order_id, load = rider.active_order_ids.len(), "rider released");
    Ok(rider.clone())
}
