use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::AssignmentSettings;
use crate::engine::offer;
use crate::engine::scoring::{Candidate, rank_candidates};
use crate::error::AppError;
use crate::geo::haversine_km;
use crate::lifecycle::order;
use crate::models::offer::OfferOutcome;
use crate::models::order::{Actor, Order, OrderStatus};
use crate::models::rider::Rider;
use crate::state::AppState;

const NOMINAL_RIDER_SPEED_KMH: f64 = 25.0;

#[derive(Debug)]
pub struct DispatchRequest {
    pub order_id: Uuid,
}

/// Non-blocking on purpose: callers hold the order lock, and the engine
/// needs that same lock to drain the queue. A full queue parks the order
/// instead of waiting.
pub fn enqueue_dispatch(state: &AppState, order_id: Uuid) -> Result<(), AppError> {
    match state.dispatch_tx.try_send(DispatchRequest { order_id }) {
        Ok(()) => {
            state.metrics.dispatch_queue_depth.inc();
            Ok(())
        }
        Err(TrySendError::Full(_)) => {
            warn!(order_id = %order_id, "dispatch queue full");
            park_for_manual(state, order_id);
            Ok(())
        }
        Err(TrySendError::Closed(_)) => Err(AppError::Internal(
            "dispatch queue send failed: channel closed".to_string(),
        )),
    }
}

pub async fn run_dispatch_engine(state: Arc<AppState>, mut rx: mpsc::Receiver<DispatchRequest>) {
    info!("dispatch engine started");

    while let Some(request) = rx.recv().await {
        state.metrics.dispatch_queue_depth.dec();
        if let Err(err) = process_request(&state, request.order_id).await {
            error!(order_id = %request.order_id, error = %err, "failed to dispatch order");
        }
    }

    warn!("dispatch engine stopped: queue channel closed");
}

async fn process_request(state: &Arc<AppState>, order_id: Uuid) -> Result<(), AppError> {
    let lock = state.order_lock(order_id);
    let _guard = lock.lock().await;

    let Some(order) = state.orders.get(&order_id).map(|entry| entry.value().clone()) else {
        return Ok(());
    };
    if order.status != OrderStatus::ReadyForPickup || order.needs_manual_assignment {
        return Ok(());
    }
    // Serial-offer discipline: never two pending offers for one order.
    if state.pending_offer_for(order_id).is_some() {
        return Ok(());
    }

    let settings = state.settings.read().await.clone();
    if !settings.enabled {
        park_for_manual(state, order_id);
        return Ok(());
    }

    let excluded = state.exhausted_riders_for(order_id);
    let candidates = collect_candidates(state, &order, &settings, &excluded);
    if candidates.is_empty() {
        warn!(order_id = %order_id, "no candidate riders");
        park_for_manual(state, order_id);
        return Ok(());
    }

    let ranked = rank_candidates(candidates, order.rush, &settings);
    let top = &ranked[0];
    let attempt = state.resolved_attempts_for(order_id) + 1;
    let wait = Duration::from_secs(settings.max_wait_time_secs);

    let created = offer::create_offer(state, order_id, top.rider.id, attempt, wait);
    offer::spawn_expiry_timer(state.clone(), created.id, wait);
    Ok(())
}

fn collect_candidates(
    state: &AppState,
    order: &Order,
    settings: &AssignmentSettings,
    excluded: &[Uuid],
) -> Vec<Candidate> {
    let batching = settings.allow_batching && order.is_batch_eligible && !order.rush;
    let detour_km = NOMINAL_RIDER_SPEED_KMH * settings.batch_window_secs as f64 / 3_600.0;

    state
        .riders
        .iter()
        .filter_map(|entry| {
            let rider = entry.value();
            if !rider.online || !rider.available || excluded.contains(&rider.id) {
                return None;
            }
            if let (Some(order_zone), Some(rider_zone)) = (&order.zone, &rider.assigned_zone) {
                if order_zone != rider_zone {
                    return None;
                }
            }

            let distance_km = haversine_km(&rider.location, &order.vendor_location);
            if distance_km > settings.max_distance_km {
                return None;
            }

            let batch_preferred =
                batching && rider.is_mid_delivery() && route_compatible(state, rider, order, detour_km);

            Some(Candidate {
                rider: rider.clone(),
                distance_km,
                batch_preferred,
            })
        })
        .collect()
}

/// Route corridor check for batching: the rider already serves the same
/// vendor, or one of their active dropoffs is within the added-detour
/// threshold of the new dropoff.
fn route_compatible(state: &AppState, rider: &Rider, order: &Order, detour_km: f64) -> bool {
    rider.active_order_ids.iter().any(|active_id| {
        state
            .orders
            .get(active_id)
            .map(|active| {
                active.vendor_id == order.vendor_id
                    || haversine_km(&active.dropoff, &order.dropoff) <= detour_km
            })
            .unwrap_or(false)
    })
}

pub(crate) fn park_for_manual(state: &AppState, order_id: Uuid) {
    if let Some(mut order) = state.orders.get_mut(&order_id) {
        if order.needs_manual_assignment {
            return;
        }
        order.needs_manual_assignment = true;
    }
    state.metrics.manual_assignments_total.inc();
    warn!(order_id = %order_id, "order parked for manual assignment");
}

/// Admin override: bypasses candidate scoring entirely but still goes
/// through the registry claim. On an order that already carries a rider
/// this reassigns, releasing the previous rider.
pub async fn force_assign(
    state: &AppState,
    order_id: Uuid,
    rider_id: Uuid,
) -> Result<Order, AppError> {
    let lock = state.order_lock(order_id);
    let _guard = lock.lock().await;

    if let Some(pending) = state.pending_offer_for(order_id) {
        offer::resolve(state, &pending, OfferOutcome::Expired);
    }

    let status = state
        .orders
        .get(&order_id)
        .map(|order| order.status)
        .ok_or_else(|| AppError::NotFound(format!("order {} not found", order_id)))?;

    if status.carries_rider() {
        order::reassign(state, order_id, rider_id, Actor::Admin)
    } else {
        order::assign(state, order_id, rider_id, Actor::Admin).await
    }
}
