use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, RwLock, broadcast, mpsc};
use uuid::Uuid;

use crate::config::AssignmentSettings;
use crate::engine::dispatch::DispatchRequest;
use crate::models::event::DomainEvent;
use crate::models::offer::AssignmentOffer;
use crate::models::order::Order;
use crate::models::rider::Rider;
use crate::models::ticket::KitchenTicket;
use crate::observability::metrics::Metrics;

pub struct AppState {
    pub orders: DashMap<Uuid, Order>,
    pub tickets: DashMap<Uuid, KitchenTicket>,
    pub ticket_by_order: DashMap<Uuid, Uuid>,
    pub riders: DashMap<Uuid, Rider>,
    pub offers: DashMap<Uuid, AssignmentOffer>,
    order_locks: DashMap<Uuid, Arc<Mutex<()>>>,
    pub dispatch_tx: mpsc::Sender<DispatchRequest>,
    pub events_tx: broadcast::Sender<DomainEvent>,
    pub settings: RwLock<AssignmentSettings>,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(
        settings: AssignmentSettings,
        dispatch_queue_size: usize,
        event_buffer_size: usize,
    ) -> (Self, mpsc::Receiver<DispatchRequest>) {
        let (dispatch_tx, dispatch_rx) = mpsc::channel(dispatch_queue_size);
        let (events_tx, _unused_rx) = broadcast::channel(event_buffer_size);

        (
            Self {
                orders: DashMap::new(),
                tickets: DashMap::new(),
                ticket_by_order: DashMap::new(),
                riders: DashMap::new(),
                offers: DashMap::new(),
                order_locks: DashMap::new(),
                dispatch_tx,
                events_tx,
                settings: RwLock::new(settings),
                metrics: Metrics::new(),
            },
            dispatch_rx,
        )
    }

    /// Serialization point for everything touching one order: its status,
    /// its kitchen ticket, and its in-flight offer. Different orders
    /// proceed in parallel.
    pub fn order_lock(&self, order_id: Uuid) -> Arc<Mutex<()>> {
        self.order_locks
            .entry(order_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    pub fn emit(&self, event: DomainEvent) {
        let _ = self.events_tx.send(event);
    }

    pub fn pending_offer_for(&self, order_id: Uuid) -> Option<AssignmentOffer> {
        self.offers
            .iter()
            .find(|entry| entry.order_id == order_id && entry.is_pending())
            .map(|entry| entry.value().clone())
    }

    /// Riders that already resolved an offer for this order; they are
    /// excluded from later attempts.
    pub fn exhausted_riders_for(&self, order_id: Uuid) -> Vec<Uuid> {
        self.offers
            .iter()
            .filter(|entry| entry.order_id == order_id && !entry.is_pending())
            .map(|entry| entry.rider_id)
            .collect()
    }

    pub fn resolved_attempts_for(&self, order_id: Uuid) -> u32 {
        self.offers
            .iter()
            .filter(|entry| entry.order_id == order_id && !entry.is_pending())
            .count() as u32
    }
}
