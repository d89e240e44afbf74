use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::sleep;
use tracing::{info, warn};
use uuid::Uuid;

use crate::engine::dispatch;
use crate::error::AppError;
use crate::lifecycle::order;
use crate::models::event::DomainEvent;
use crate::models::offer::{AssignmentOffer, OfferOutcome};
use crate::models::order::Actor;
use crate::state::AppState;

/// Creates the single outstanding offer for an order. Caller holds the
/// order lock and has verified no other offer is pending.
pub(crate) fn create_offer(
    state: &AppState,
    order_id: Uuid,
    rider_id: Uuid,
    attempt_number: u32,
    wait: Duration,
) -> AssignmentOffer {
    let offered_at = Utc::now();
    let offer = AssignmentOffer {
        id: Uuid::new_v4(),
        order_id,
        rider_id,
        offered_at,
        expires_at: offered_at + chrono::Duration::seconds(wait.as_secs() as i64),
        outcome: OfferOutcome::Pending,
        attempt_number,
    };

    state.offers.insert(offer.id, offer.clone());
    state.emit(DomainEvent::AssignmentOffered {
        offer_id: offer.id,
        order_id,
        rider_id,
        expires_at: offer.expires_at,
    });
    info!(order_id = %order_id, rider_id = %rider_id, offer_id = %offer.id, attempt = attempt_number, "offer extended");
    offer
}

/// Expiry runs off a monotonic timer, not the wall-clock `expires_at`.
/// The fired timer re-checks the outcome under the order lock, so an
/// acceptance that reached the lock first wins.
pub(crate) fn spawn_expiry_timer(state: Arc<AppState>, offer_id: Uuid, wait: Duration) {
    tokio::spawn(async move {
        sleep(wait).await;
        expire(&state, offer_id).await;
    });
}

pub async fn respond(
    state: &AppState,
    offer_id: Uuid,
    accept: bool,
) -> Result<AssignmentOffer, AppError> {
    let order_id = state
        .offers
        .get(&offer_id)
        .map(|offer| offer.order_id)
        .ok_or_else(|| AppError::NotFound(format!("offer {} not found", offer_id)))?;

    let lock = state.order_lock(order_id);
    let _guard = lock.lock().await;

    let offer = state
        .offers
        .get(&offer_id)
        .map(|entry| entry.value().clone())
        .ok_or_else(|| AppError::NotFound(format!("offer {} not found", offer_id)))?;
    if !offer.is_pending() {
        return Err(AppError::OfferExpired(offer_id));
    }

    if !accept {
        let resolved = resolve(state, &offer, OfferOutcome::Rejected);
        retry_or_park(state, order_id).await;
        return Ok(resolved);
    }

    match order::assign(state, order_id, offer.rider_id, Actor::System).await {
        Ok(_) => Ok(resolve(state, &offer, OfferOutcome::Accepted)),
        Err(AppError::RiderUnavailable(rider_id)) => {
            // Claim race lost (rider went offline or filled up since the
            // offer went out); treated as a rejection.
            resolve(state, &offer, OfferOutcome::Rejected);
            retry_or_park(state, order_id).await;
            Err(AppError::RiderUnavailable(rider_id))
        }
        Err(err) => Err(err),
    }
}

pub(crate) async fn expire(state: &Arc<AppState>, offer_id: Uuid) {
    let Some(order_id) = state.offers.get(&offer_id).map(|offer| offer.order_id) else {
        return;
    };

    let lock = state.order_lock(order_id);
    let _guard = lock.lock().await;

    let Some(offer) = state.offers.get(&offer_id).map(|entry| entry.value().clone()) else {
        return;
    };
    if !offer.is_pending() {
        return;
    }

    warn!(order_id = %order_id, offer_id = %offer_id, rider_id = %offer.rider_id, "offer expired");
    resolve(state, &offer, OfferOutcome::Expired);
    retry_or_park(state, order_id).await;
}

pub(crate) fn resolve(
    state: &AppState,
    offer: &AssignmentOffer,
    outcome: OfferOutcome,
) -> AssignmentOffer {
    let mut resolved = offer.clone();
    resolved.outcome = outcome;
    state.offers.insert(offer.id, resolved.clone());

    let elapsed = (Utc::now() - offer.offered_at).num_milliseconds().max(0) as f64 / 1_000.0;
    let label = match outcome {
        OfferOutcome::Pending => "pending",
        OfferOutcome::Accepted => "accepted",
        OfferOutcome::Rejected => "rejected",
        OfferOutcome::Expired => "expired",
    };
    state
        .metrics
        .offer_resolution_seconds
        .with_label_values(&[label])
        .observe(elapsed);
    state.metrics.offers_total.with_label_values(&[label]).inc();

    state.emit(DomainEvent::AssignmentResolved {
        offer_id: offer.id,
        order_id: offer.order_id,
        rider_id: offer.rider_id,
        outcome,
    });
    resolved
}

async fn retry_or_park(state: &AppState, order_id: Uuid) {
    let max_attempts = state.settings.read().await.max_assignment_attempts;
    let attempts = state.resolved_attempts_for(order_id);

    if attempts >= max_attempts {
        warn!(order_id = %order_id, attempts, "assignment attempts exhausted");
        dispatch::park_for_manual(state, order_id);
        return;
    }

    if let Err(err) = dispatch::enqueue_dispatch(state, order_id) {
        warn!(order_id = %order_id, error = %err, "failed to re-enqueue order after failed offer");
    }
}
