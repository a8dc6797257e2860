use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A courier with this many active orders is flipped to `Busy`.
pub const BUSY_THRESHOLD: u8 = 3;

/// Hard cap for the load-balanced selection path.
pub const MAX_ACTIVE_ORDERS: u8 = 5;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum KurirStatus {
    Available,
    Busy,
    Offline,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Kurir {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub status: KurirStatus,
    pub is_active: bool,
    pub active_orders: u8,
    pub total_deliveries: u32,
    pub rating: f64,
    pub updated_at: DateTime<Utc>,
}

impl Kurir {
    /// Candidate filter for the random-assign path (COD approval).
    pub fn takes_random_assignment(&self) -> bool {
        self.is_active && self.status == KurirStatus::Available
    }

    /// Candidate filter for the load-balanced path (payment webhooks).
    pub fn takes_balanced_assignment(&self) -> bool {
        self.is_active
            && matches!(self.status, KurirStatus::Available | KurirStatus::Busy)
            && self.active_orders < MAX_ACTIVE_ORDERS
    }

    /// Recomputes `status` from the active-order count. An offline courier
    /// stays offline until it reports back in.
    pub fn refresh_status(&mut self) {
        if self.status == KurirStatus::Offline {
            return;
        }
        self.status = if self.active_orders >= BUSY_THRESHOLD {
            KurirStatus::Busy
        } else {
            KurirStatus::Available
        };
    }
}
