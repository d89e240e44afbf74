use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::lifecycle::order::apply_transition;
use crate::models::event::DomainEvent;
use crate::models::order::{Actor, Order, OrderStatus};
use crate::models::ticket::{ItemStatus, KitchenTicket, TicketItem, TicketStatus};
use crate::state::AppState;

/// One ticket per order, created at the Pending -> Confirmed transition.
pub(crate) fn spawn_ticket(state: &AppState, order: &Order) {
    if state.ticket_by_order.contains_key(&order.id) {
        return;
    }

    let ticket = KitchenTicket {
        id: Uuid::new_v4(),
        order_id: order.id,
        vendor_id: order.vendor_id,
        items: order
            .items
            .iter()
            .enumerate()
            .map(|(line_index, item)| TicketItem {
                line_index,
                product_id: item.product_id,
                status: ItemStatus::Pending,
                rush: false,
            })
            .collect(),
        frozen: false,
        created_at: Utc::now(),
    };

    info!(order_id = %order.id, ticket_id = %ticket.id, items = ticket.items.len(), "kitchen ticket created");
    state.ticket_by_order.insert(order.id, ticket.id);
    state.tickets.insert(ticket.id, ticket);
}

pub(crate) fn freeze_for_order(state: &AppState, order_id: Uuid) {
    let Some(ticket_id) = state.ticket_by_order.get(&order_id).map(|id| *id) else {
        return;
    };
    if let Some(mut ticket) = state.tickets.get_mut(&ticket_id) {
        ticket.frozen = true;
    }
}

fn item_step_allowed(from: ItemStatus, to: ItemStatus) -> bool {
    matches!(
        (from, to),
        (ItemStatus::Pending, ItemStatus::Cooking) | (ItemStatus::Cooking, ItemStatus::Done)
    )
}

pub async fn advance_item(
    state: &AppState,
    ticket_id: Uuid,
    item_index: usize,
    target: ItemStatus,
) -> Result<KitchenTicket, AppError> {
    let order_id = state
        .tickets
        .get(&ticket_id)
        .map(|ticket| ticket.order_id)
        .ok_or_else(|| AppError::NotFound(format!("ticket {} not found", ticket_id)))?;

    let lock = state.order_lock(order_id);
    let _guard = lock.lock().await;

    let updated = {
        let mut ticket = state
            .tickets
            .get_mut(&ticket_id)
            .ok_or_else(|| AppError::NotFound(format!("ticket {} not found", ticket_id)))?;

        if ticket.frozen {
            return Err(AppError::Conflict(format!(
                "ticket {} is frozen",
                ticket_id
            )));
        }

        let item = ticket
            .items
            .get_mut(item_index)
            .ok_or_else(|| AppError::NotFound(format!("ticket item {} not found", item_index)))?;

        if !item_step_allowed(item.status, target) {
            return Err(AppError::InvalidItemTransition {
                from: item.status,
                to: target,
            });
        }

        item.status = target;
        ticket.clone()
    };

    state.emit(DomainEvent::TicketItemStatusChanged {
        ticket_id,
        item_index,
        status: target,
    });
    info!(ticket_id = %ticket_id, item_index, status = ?target, "ticket item advanced");

    let order_status = state
        .orders
        .get(&order_id)
        .map(|order| order.status)
        .ok_or_else(|| AppError::NotFound(format!("order {} not found", order_id)))?;

    // Kitchen activity drives the order forward; no direct status call
    // is needed from the vendor for these two edges.
    if order_status == OrderStatus::Confirmed {
        apply_transition(
            state,
            order_id,
            OrderStatus::Preparing,
            Actor::System,
            None,
            None,
        )
        .await?;
    }

    if updated.ticket_status() == TicketStatus::Ready {
        let current = state
            .orders
            .get(&order_id)
            .map(|order| order.status)
            .unwrap_or(order_status);
        if current == OrderStatus::Preparing {
            apply_transition(
                state,
                order_id,
                OrderStatus::ReadyForPickup,
                Actor::System,
                None,
                None,
            )
            .await?;
        }
    }

    Ok(updated)
}

/// Rush affects dispatch candidate ordering only; item-state legality is
/// unchanged.
pub async fn set_rush(
    state: &AppState,
    ticket_id: Uuid,
    item_index: usize,
) -> Result<KitchenTicket, AppError> {
    let order_id = state
        .tickets
        .get(&ticket_id)
        .map(|ticket| ticket.order_id)
        .ok_or_else(|| AppError::NotFound(format!("ticket {} not found", ticket_id)))?;

    let lock = state.order_lock(order_id);
    let _guard = lock.lock().await;

    let updated = {
        let mut ticket = state
            .tickets
            .get_mut(&ticket_id)
            .ok_or_else(|| AppError::NotFound(format!("ticket {} not found", ticket_id)))?;

        if ticket.frozen {
            return Err(AppError::Conflict(format!(
                "ticket {} is frozen",
                ticket_id
            )));
        }

        let item = ticket
            .items
            .get_mut(item_index)
            .ok_or_else(|| AppError::NotFound(format!("ticket item {} not found", item_index)))?;
        item.rush = true;

        ticket.clone()
    };

    if let Some(mut order) = state.orders.get_mut(&order_id) {
        order.rush = true;
    }

    Ok(updated)
}
