use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::rider::GeoPoint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Preparing,
    ReadyForPickup,
    Assigned,
    PickedUp,
    OutForDelivery,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    pub fn carries_rider(&self) -> bool {
        matches!(
            self,
            OrderStatus::Assigned | OrderStatus::PickedUp | OrderStatus::OutForDelivery
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Actor {
    Customer,
    Vendor,
    Rider,
    Admin,
    System,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusEntry {
    pub status: OrderStatus,
    pub at: DateTime<Utc>,
    pub actor: Actor,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: Uuid,
    pub quantity: u32,
    pub unit_price: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub vendor_id: Uuid,
    pub customer_id: Uuid,
    pub vendor_location: GeoPoint,
    pub dropoff: GeoPoint,
    pub zone: Option<String>,
    pub items: Vec<LineItem>,
    pub status: OrderStatus,
    pub rider_id: Option<Uuid>,
    pub status_history: Vec<StatusEntry>,
    pub is_batch_eligible: bool,
    pub needs_manual_assignment: bool,
    pub rush: bool,
    pub version: u64,
    pub created_at: DateTime<Utc>,
}
