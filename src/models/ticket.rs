use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemStatus {
    Pending,
    Cooking,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TicketStatus {
    Pending,
    InProgress,
    Ready,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketItem {
    pub line_index: usize,
    pub product_id: Uuid,
    pub status: ItemStatus,
    pub rush: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KitchenTicket {
    pub id: Uuid,
    pub order_id: Uuid,
    pub vendor_id: Uuid,
    pub items: Vec<TicketItem>,
    pub frozen: bool,
    pub created_at: DateTime<Utc>,
}

impl KitchenTicket {
    pub fn ticket_status(&self) -> TicketStatus {
        if self.items.iter().all(|item| item.status == ItemStatus::Done) {
            TicketStatus::Ready
        } else if self.items.iter().any(|item| item.status != ItemStatus::Pending) {
            TicketStatus::InProgress
        } else {
            TicketStatus::Pending
        }
    }

    pub fn age_seconds(&self, now: DateTime<Utc>) -> i64 {
        (now - self.created_at).num_seconds()
    }
}
