use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OfferOutcome {
    Pending,
    Accepted,
    Rejected,
    Expired,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentOffer {
    pub id: Uuid,
    pub order_id: Uuid,
    pub rider_id: Uuid,
    pub offered_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub outcome: OfferOutcome,
    pub attempt_number: u32,
}

impl AssignmentOffer {
    pub fn is_pending(&self) -> bool {
        self.outcome == OfferOutcome::Pending
    }
}
