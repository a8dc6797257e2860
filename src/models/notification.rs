use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::order::OrderStatus;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Actor {
    System,
    Admin,
    Webhook,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RecipientKind {
    User,
    Kurir,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    OrderConfirmed,
    OrderCancelled,
    CourierAssigned,
    NewOrder,
    Reassigned,
    OrderCompleted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub recipient_kind: RecipientKind,
    pub recipient_id: Uuid,
    pub kind: NotificationKind,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Audit row written alongside every order status mutation. `seq` gives a
/// stable ordering when two rows land on the same timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusLog {
    pub id: Uuid,
    pub seq: u64,
    pub order_id: Uuid,
    pub from_status: OrderStatus,
    pub to_status: OrderStatus,
    pub actor: Actor,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Event published on the broadcast channel whenever a courier is attached
/// to an order; the websocket feed streams these to admin dashboards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchEvent {
    pub order_id: Uuid,
    pub order_number: String,
    pub kurir_id: Uuid,
    pub kurir_name: String,
    pub actor: Actor,
    pub assigned_at: DateTime<Utc>,
}
