use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

use crate::models::courier::Kurir;
use crate::models::notification::{DispatchEvent, Notification, StatusLog};
use crate::models::order::Order;
use crate::models::rules::CodRules;
use crate::models::user::User;
use crate::observability::metrics::Metrics;

pub struct AppState {
    pub users: DashMap<Uuid, User>,
    pub couriers: DashMap<Uuid, Kurir>,
    pub orders: DashMap<Uuid, Order>,
    pub status_log: DashMap<Uuid, StatusLog>,
    pub notifications: DashMap<Uuid, Notification>,
    pub rules: RwLock<CodRules>,
    pub dispatch_events_tx: broadcast::Sender<DispatchEvent>,
    pub metrics: Metrics,
    log_seq: AtomicU64,
}

impl AppState {
    pub fn new(rules: CodRules, event_buffer_size: usize) -> Self {
        let (dispatch_events_tx, _unused_rx) = broadcast::channel(event_buffer_size);

        Self {
            users: DashMap::new(),
            couriers: DashMap::new(),
            orders: DashMap::new(),
            status_log: DashMap::new(),
            notifications: DashMap::new(),
            rules: RwLock::new(rules),
            dispatch_events_tx,
            metrics: Metrics::new(),
            log_seq: AtomicU64::new(0),
        }
    }

    pub fn next_log_seq(&self) -> u64 {
        self.log_seq.fetch_add(1, Ordering::Relaxed)
    }

    pub fn find_order_by_number(&self, order_number: &str) -> Option<Order> {
        self.orders
            .iter()
            .find(|entry| entry.value().order_number == order_number)
            .map(|entry| entry.value().clone())
    }
}
