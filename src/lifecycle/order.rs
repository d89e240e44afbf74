use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::engine::dispatch;
use crate::engine::offer;
use crate::error::AppError;
use crate::lifecycle::ticket;
use crate::models::event::DomainEvent;
use crate::models::offer::OfferOutcome;
use crate::models::order::{Actor, Order, OrderStatus, StatusEntry};
use crate::registry;
use crate::state::AppState;

pub fn is_successor(from: OrderStatus, to: OrderStatus) -> bool {
    use OrderStatus::*;

    matches!(
        (from, to),
        (Pending, Confirmed)
            | (Confirmed, Preparing)
            | (Preparing, ReadyForPickup)
            | (ReadyForPickup, Assigned)
            | (Assigned, PickedUp)
            | (PickedUp, OutForDelivery)
            | (OutForDelivery, Delivered)
            | (Pending, Cancelled)
            | (Confirmed, Cancelled)
            | (Preparing, Cancelled)
            | (ReadyForPickup, Cancelled)
            | (Assigned, Cancelled)
            | (PickedUp, Cancelled)
    )
}

pub fn actor_may(actor: Actor, from: OrderStatus, to: OrderStatus) -> bool {
    use OrderStatus::*;

    match actor {
        Actor::Admin => true,
        Actor::System => matches!(
            (from, to),
            (Confirmed, Preparing) | (Preparing, ReadyForPickup) | (ReadyForPickup, Assigned)
        ),
        Actor::Customer => matches!(
            (from, to),
            (Pending, Confirmed) | (Pending, Cancelled) | (Confirmed, Cancelled)
        ),
        Actor::Vendor => {
            matches!((from, to), (Confirmed, Preparing) | (Preparing, ReadyForPickup))
                || (to == Cancelled
                    && matches!(from, Pending | Confirmed | Preparing | ReadyForPickup))
        }
        Actor::Rider => matches!(
            (from, to),
            (Assigned, PickedUp) | (PickedUp, OutForDelivery) | (OutForDelivery, Delivered)
        ),
    }
}

pub async fn transition(
    state: &AppState,
    order_id: Uuid,
    target: OrderStatus,
    actor: Actor,
    expected_version: Option<u64>,
) -> Result<Order, AppError> {
    let lock = state.order_lock(order_id);
    let _guard = lock.lock().await;
    apply_transition(state, order_id, target, actor, expected_version, None).await
}

/// Assumes the caller holds the order lock. `rider` must be given (and
/// already claimed) when entering `Assigned`.
pub(crate) async fn apply_transition(
    state: &AppState,
    order_id: Uuid,
    target: OrderStatus,
    actor: Actor,
    expected_version: Option<u64>,
    rider: Option<Uuid>,
) -> Result<Order, AppError> {
    let (updated, released_rider, from) = {
        let mut order = state
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| AppError::NotFound(format!("order {} not found", order_id)))?;

        if let Some(expected) = expected_version {
            if expected != order.version {
                return Err(AppError::StaleState {
                    expected,
                    actual: order.version,
                });
            }
        }

        let from = order.status;
        if !is_successor(from, target) || !actor_may(actor, from, target) {
            return Err(AppError::InvalidTransition {
                from,
                to: target,
                actor,
            });
        }
        if target == OrderStatus::Assigned && rider.is_none() {
            return Err(AppError::InvalidTransition {
                from,
                to: target,
                actor,
            });
        }

        let mut released_rider = None;
        match target {
            OrderStatus::Assigned => {
                order.rider_id = rider;
                order.needs_manual_assignment = false;
            }
            OrderStatus::Delivered | OrderStatus::Cancelled => {
                released_rider = order.rider_id.take();
            }
            _ => {}
        }

        order.status = target;
        order.version += 1;
        order.status_history.push(StatusEntry {
            status: target,
            at: Utc::now(),
            actor,
        });

        (order.clone(), released_rider, from)
    };

    state.emit(DomainEvent::OrderStatusChanged {
        order_id,
        status: target,
        at: updated
            .status_history
            .last()
            .map(|entry| entry.at)
            .unwrap_or_else(Utc::now),
        actor,
    });
    info!(order_id = %order_id, from = ?from, to = ?target, actor = ?actor, "order transitioned");

    match target {
        OrderStatus::Confirmed => {
            ticket::spawn_ticket(state, &updated);
        }
        OrderStatus::ReadyForPickup => {
            dispatch::enqueue_dispatch(state, order_id)?;
        }
        OrderStatus::Cancelled => {
            cancel_pending_offer(state, order_id);
            if let Some(rider_id) = released_rider {
                registry::release(state, rider_id, order_id)?;
            }
            ticket::freeze_for_order(state, order_id);
        }
        OrderStatus::Delivered => {
            if let Some(rider_id) = released_rider {
                registry::release(state, rider_id, order_id)?;
            }
            ticket::freeze_for_order(state, order_id);
        }
        _ => {}
    }

    Ok(updated)
}

/// Claims the rider, then records the assignment. Caller holds the order
/// lock; a lost claim race surfaces as `RiderUnavailable`.
pub(crate) async fn assign(
    state: &AppState,
    order_id: Uuid,
    rider_id: Uuid,
    actor: Actor,
) -> Result<Order, AppError> {
    registry::claim(state, rider_id, order_id)?;

    match apply_transition(state, order_id, OrderStatus::Assigned, actor, None, Some(rider_id))
        .await
    {
        Ok(order) => Ok(order),
        Err(err) => {
            registry::release(state, rider_id, order_id)?;
            Err(err)
        }
    }
}

/// Moves an already-assigned order to a different rider without leaving
/// the Assigned/PickedUp/OutForDelivery leg. Caller holds the order lock.
pub(crate) fn reassign(
    state: &AppState,
    order_id: Uuid,
    new_rider: Uuid,
    actor: Actor,
) -> Result<Order, AppError> {
    let previous = {
        let order = state
            .orders
            .get(&order_id)
            .ok_or_else(|| AppError::NotFound(format!("order {} not found", order_id)))?;
        match order.rider_id {
            Some(current) if current == new_rider => {
                return Err(AppError::Conflict(format!(
                    "order {} is already assigned to rider {}",
                    order_id, new_rider
                )));
            }
            Some(current) => current,
            None => {
                return Err(AppError::Conflict(format!(
                    "order {} carries no rider to reassign",
                    order_id
                )));
            }
        }
    };

    registry::claim(state, new_rider, order_id)?;
    if let Err(err) = registry::release(state, previous, order_id) {
        registry::release(state, new_rider, order_id)?;
        return Err(err);
    }

    let updated = {
        let mut order = state
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| AppError::NotFound(format!("order {} not found", order_id)))?;
        order.rider_id = Some(new_rider);
        order.version += 1;
        let status = order.status;
        order.status_history.push(StatusEntry {
            status,
            at: Utc::now(),
            actor,
        });
        order.clone()
    };

    state.emit(DomainEvent::OrderStatusChanged {
        order_id,
        status: updated.status,
        at: updated
            .status_history
            .last()
            .map(|entry| entry.at)
            .unwrap_or_else(Utc::now),
        actor,
    });
    info!(order_id = %order_id, from_rider = %previous, to_rider = %new_rider, "order reassigned");
    Ok(updated)
}

fn cancel_pending_offer(state: &AppState, order_id: Uuid) {
    let Some(pending) = state.pending_offer_for(order_id) else {
        return;
    };
    offer::resolve(state, &pending, OfferOutcome::Expired);
    warn!(order_id = %order_id, offer_id = %pending.id, "pending offer cancelled with order");
}
