use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rider {
    pub id: Uuid,
    pub name: String,
    pub online: bool,
    pub available: bool,
    pub location: GeoPoint,
    pub location_updated_at: DateTime<Utc>,
    pub rating: f64,
    pub active_order_ids: Vec<Uuid>,
    pub max_batch_size: u8,
    pub assigned_zone: Option<String>,
    pub idle_since: DateTime<Utc>,
}

impl Rider {
    // `available` is cached for candidate queries; call after every
    // mutation of `online` or `active_order_ids`.
    pub fn recompute_available(&mut self) {
        self.available = self.online && self.active_order_ids.len() < self.max_batch_size as usize;
    }

    pub fn is_mid_delivery(&self) -> bool {
        !self.active_order_ids.is_empty()
    }
}
