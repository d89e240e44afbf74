use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::offer::OfferOutcome;
use crate::models::order::{Actor, OrderStatus};
use crate::models::ticket::ItemStatus;

/// Events broadcast to notification/analytics consumers. Delivery is
/// fire-and-forget from the core's perspective; consumers are expected
/// to be idempotent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DomainEvent {
    OrderStatusChanged {
        order_id: Uuid,
        status: OrderStatus,
        at: DateTime<Utc>,
        actor: Actor,
    },
    TicketItemStatusChanged {
        ticket_id: Uuid,
        item_index: usize,
        status: ItemStatus,
    },
    AssignmentOffered {
        offer_id: Uuid,
        order_id: Uuid,
        rider_id: Uuid,
        expires_at: DateTime<Utc>,
    },
    AssignmentResolved {
        offer_id: Uuid,
        order_id: Uuid,
        rider_id: Uuid,
        outcome: OfferOutcome,
    },
}
