use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::Json;
use axum::Router;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

use crate::engine::apply::{
    apply_assignment, cancel_order, push_notification, record_transition,
};
use crate::engine::dispatch::{pick_least_loaded, DispatchOutcome};
use crate::error::AppError;
use crate::models::notification::{Actor, NotificationKind, RecipientKind};
use crate::models::order::{Order, OrderStatus, PaymentStatus};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/webhooks/xendit", post(xendit_webhook))
        .route("/webhooks/midtrans", post(midtrans_webhook))
        .route("/webhooks/xendit/sync", post(sync_xendit_status))
}

/// What a provider event did to the order; also the metric label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WebhookOutcome {
    PaidAssigned,
    PaidUnassigned,
    Duplicate,
    Cancelled,
    Ignored,
    UnknownOrder,
}

impl WebhookOutcome {
    fn as_str(&self) -> &'static str {
        match self {
            WebhookOutcome::PaidAssigned => "paid_assigned",
            WebhookOutcome::PaidUnassigned => "paid_unassigned",
            WebhookOutcome::Duplicate => "duplicate",
            WebhookOutcome::Cancelled => "cancelled",
            WebhookOutcome::Ignored => "ignored",
            WebhookOutcome::UnknownOrder => "unknown_order",
        }
    }
}

#[derive(Deserialize)]
pub struct XenditWebhook {
    pub external_id: String,
    pub status: String,
}

/// Xendit posts the invoice status with our order number as `external_id`.
/// The provider retries until it sees a 200, so anything past payload
/// parsing is acknowledged; the real outcome lands in logs and metrics.
async fn xendit_webhook(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<XenditWebhook>,
) -> Json<Value> {
    let outcome = match state.find_order_by_number(&payload.external_id) {
        None => {
            warn!(external_id = %payload.external_id, "xendit webhook for unknown order");
            WebhookOutcome::UnknownOrder
        }
        Some(order) => apply_provider_status(&state, order.id, &payload.status).0,
    };

    state
        .metrics
        .webhook_events_total
        .with_label_values(&["xendit", outcome.as_str()])
        .inc();

    Json(json!({ "received": true }))
}

#[derive(Deserialize)]
pub struct MidtransNotification {
    pub order_id: String,
    pub transaction_status: String,
    pub fraud_status: Option<String>,
}

async fn midtrans_webhook(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<MidtransNotification>,
) -> Json<Value> {
    let outcome = match state.find_order_by_number(&payload.order_id) {
        None => {
            warn!(order_number = %payload.order_id, "midtrans notification for unknown order");
            WebhookOutcome::UnknownOrder
        }
        Some(order) => {
            let denied = payload.fraud_status.as_deref() == Some("deny");
            match payload.transaction_status.as_str() {
                "settlement" | "capture" if !denied => mark_paid_and_dispatch(&state, order.id),
                "deny" | "cancel" | "expire" | "failure" => cancel_from_provider(&state, order.id),
                _ if denied => cancel_from_provider(&state, order.id),
                other => {
                    info!(order_number = %order.order_number, status = %other, "midtrans status ignored");
                    WebhookOutcome::Ignored
                }
            }
        }
    };

    state
        .metrics
        .webhook_events_total
        .with_label_values(&["midtrans", outcome.as_str()])
        .inc();

    Json(json!({ "received": true }))
}

#[derive(Deserialize)]
pub struct SyncXenditRequest {
    pub order_id: Uuid,
    pub status: String,
}

/// Admin-triggered reconciliation: the back office polls Xendit out of band
/// and posts the reported invoice status here. Shares the webhook paid path,
/// including its idempotence.
async fn sync_xendit_status(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SyncXenditRequest>,
) -> Result<Json<Value>, AppError> {
    if !state.orders.contains_key(&payload.order_id) {
        return Err(AppError::NotFound(format!(
            "order {} not found",
            payload.order_id
        )));
    }

    let (outcome, updated) = apply_provider_status(&state, payload.order_id, &payload.status);

    state
        .metrics
        .webhook_events_total
        .with_label_values(&["xendit_sync", outcome.as_str()])
        .inc();

    let updated = updated.ok_or_else(|| {
        AppError::NotFound(format!("order {} not found", payload.order_id))
    })?;

    Ok(Json(json!({
        "success": true,
        "outcome": outcome.as_str(),
        "order_status": updated.status,
        "payment_status": updated.payment_status,
    })))
}

fn apply_provider_status(
    state: &AppState,
    order_id: Uuid,
    status: &str,
) -> (WebhookOutcome, Option<Order>) {
    let outcome = match status {
        "PAID" | "SETTLED" => mark_paid_and_dispatch(state, order_id),
        "EXPIRED" | "FAILED" => cancel_from_provider(state, order_id),
        other => {
            info!(order_id = %order_id, status = %other, "provider status ignored");
            WebhookOutcome::Ignored
        }
    };

    let updated = state
        .orders
        .get(&order_id)
        .map(|entry| entry.value().clone());
    (outcome, updated)
}

/// The paid transition: mark the payment, confirm a pending order, then run
/// the load-balanced dispatcher. Replays of an already-paid order are a
/// no-op so provider retries cannot double-assign or re-notify.
fn mark_paid_and_dispatch(state: &AppState, order_id: Uuid) -> WebhookOutcome {
    // The duplicate check and the flip to paid share one entry guard;
    // concurrent replays of the same event cannot both pass it.
    let (status, order_number, user_id) = {
        let mut order = match state.orders.get_mut(&order_id) {
            Some(order) => order,
            None => return WebhookOutcome::UnknownOrder,
        };

        if order.payment_status == PaymentStatus::Paid {
            info!(order_number = %order.order_number, "duplicate paid event");
            return WebhookOutcome::Duplicate;
        }
        if order.status.is_terminal() {
            warn!(order_number = %order.order_number, status = ?order.status, "paid event on a closed order");
            return WebhookOutcome::Ignored;
        }

        order.payment_status = PaymentStatus::Paid;
        (order.status, order.order_number.clone(), order.user_id)
    };

    if status == OrderStatus::Pending {
        if let Err(err) = record_transition(
            state,
            order_id,
            OrderStatus::Confirmed,
            Actor::Webhook,
            Some("payment received".to_string()),
        ) {
            warn!(order_number = %order_number, error = %err, "failed to confirm paid order");
            return WebhookOutcome::Ignored;
        }
        push_notification(
            state,
            RecipientKind::User,
            user_id,
            NotificationKind::OrderConfirmed,
            format!("Payment received for order {order_number}"),
        );
    }

    // An order that was already manually assigned keeps its courier.
    let already_assigned = state
        .orders
        .get(&order_id)
        .map(|order| order.kurir_id.is_some())
        .unwrap_or(false);
    if already_assigned {
        return WebhookOutcome::PaidAssigned;
    }

    match pick_least_loaded(state) {
        DispatchOutcome::Assigned(candidate) => {
            match apply_assignment(state, order_id, candidate.id, Actor::Webhook, None) {
                Ok(_) => {
                    state
                        .metrics
                        .dispatches_total
                        .with_label_values(&["balanced", "assigned"])
                        .inc();
                    WebhookOutcome::PaidAssigned
                }
                Err(err) => {
                    warn!(order_number = %order_number, error = %err, "balanced assignment lost the claim");
                    state
                        .metrics
                        .dispatches_total
                        .with_label_values(&["balanced", "unassigned"])
                        .inc();
                    WebhookOutcome::PaidUnassigned
                }
            }
        }
        DispatchOutcome::Unassigned { reason } => {
            info!(order_number = %order_number, reason = %reason, "paid order left without courier");
            state
                .metrics
                .dispatches_total
                .with_label_values(&["balanced", "unassigned"])
                .inc();
            WebhookOutcome::PaidUnassigned
        }
    }
}

fn cancel_from_provider(state: &AppState, order_id: Uuid) -> WebhookOutcome {
    match cancel_order(state, order_id, Actor::Webhook, Some("payment failed".to_string())) {
        Ok(_) => WebhookOutcome::Cancelled,
        Err(err) => {
            // Already terminal; nothing to unwind.
            info!(order_id = %order_id, error = %err, "provider cancellation ignored");
            WebhookOutcome::Ignored
        }
    }
}
