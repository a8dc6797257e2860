use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::engine::apply::{apply_assignment, cancel_order, push_notification, record_transition};
use crate::engine::dispatch::{pick_least_loaded, pick_random, DispatchOutcome};
use crate::error::AppError;
use crate::models::notification::{Actor, NotificationKind, RecipientKind};
use crate::models::order::{Order, OrderStatus, PaymentMethod};
use crate::models::rules::CodRules;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/admin/cod/confirm", post(confirm_cod))
        .route("/admin/orders/assign", post(manual_assign))
        .route("/admin/orders/unassigned", get(list_unassigned))
        .route("/admin/orders/:id/dispatch", post(retry_dispatch))
        .route("/admin/cod/rules", get(get_rules).put(put_rules))
}

#[derive(Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodAction {
    Approve,
    Reject,
}

#[derive(Deserialize)]
pub struct ConfirmCodRequest {
    pub order_id: Uuid,
    pub action: CodAction,
    pub reason: Option<String>,
    pub is_fraud: Option<bool>,
}

#[derive(Serialize)]
pub struct ConfirmCodResponse {
    pub success: bool,
    pub order_status: OrderStatus,
    pub kurir_assigned: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kurir_name: Option<String>,
}

async fn confirm_cod(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ConfirmCodRequest>,
) -> Result<Json<ConfirmCodResponse>, AppError> {
    let order = state
        .orders
        .get(&payload.order_id)
        .ok_or_else(|| AppError::NotFound(format!("order {} not found", payload.order_id)))?
        .value()
        .clone();

    if order.payment_method != PaymentMethod::Cod {
        return Err(AppError::Conflict(format!(
            "order {} is not a COD order",
            order.order_number
        )));
    }

    match payload.action {
        CodAction::Approve => approve(&state, &order),
        CodAction::Reject => reject(&state, &order, payload.reason, payload.is_fraud),
    }
}

fn approve(state: &AppState, order: &Order) -> Result<Json<ConfirmCodResponse>, AppError> {
    if order.status != OrderStatus::Pending {
        return Err(AppError::Conflict(format!(
            "order {} is not awaiting COD approval",
            order.order_number
        )));
    }

    record_transition(
        state,
        order.id,
        OrderStatus::Confirmed,
        Actor::Admin,
        Some("COD approved".to_string()),
    )?;
    push_notification(
        state,
        RecipientKind::User,
        order.user_id,
        NotificationKind::OrderConfirmed,
        format!("Order {} has been confirmed", order.order_number),
    );

    match pick_random(state) {
        DispatchOutcome::Assigned(candidate) => {
            match apply_assignment(state, order.id, candidate.id, Actor::Admin, None) {
                Ok(kurir) => {
                    state
                        .metrics
                        .dispatches_total
                        .with_label_values(&["random", "assigned"])
                        .inc();
                    Ok(Json(ConfirmCodResponse {
                        success: true,
                        order_status: OrderStatus::Processing,
                        kurir_assigned: true,
                        kurir_name: Some(kurir.name),
                    }))
                }
                Err(err) => {
                    // Candidate got claimed in between; leave the order
                    // confirmed for the unassigned poll.
                    warn!(order_number = %order.order_number, error = %err, "random assignment lost the claim");
                    state
                        .metrics
                        .dispatches_total
                        .with_label_values(&["random", "unassigned"])
                        .inc();
                    Ok(Json(ConfirmCodResponse {
                        success: true,
                        order_status: OrderStatus::Confirmed,
                        kurir_assigned: false,
                        kurir_name: None,
                    }))
                }
            }
        }
        DispatchOutcome::Unassigned { reason } => {
            info!(order_number = %order.order_number, reason = %reason, "cod order confirmed without courier");
            state
                .metrics
                .dispatches_total
                .with_label_values(&["random", "unassigned"])
                .inc();
            Ok(Json(ConfirmCodResponse {
                success: true,
                order_status: OrderStatus::Confirmed,
                kurir_assigned: false,
                kurir_name: None,
            }))
        }
    }
}

fn reject(
    state: &AppState,
    order: &Order,
    reason: Option<String>,
    is_fraud: Option<bool>,
) -> Result<Json<ConfirmCodResponse>, AppError> {
    if order.status.is_terminal() {
        return Err(AppError::Conflict(format!(
            "order {} is already {:?}",
            order.order_number, order.status
        )));
    }

    if is_fraud.unwrap_or(false) {
        if let Some(mut user) = state.users.get_mut(&order.user_id) {
            user.blacklist(
                reason
                    .clone()
                    .unwrap_or_else(|| "fraudulent COD order".to_string()),
            );
            info!(user = %user.name, order_number = %order.order_number, "user blacklisted from COD");
        }
    }

    cancel_order(state, order.id, Actor::Admin, reason)?;

    Ok(Json(ConfirmCodResponse {
        success: true,
        order_status: OrderStatus::Cancelled,
        kurir_assigned: false,
        kurir_name: None,
    }))
}

#[derive(Deserialize)]
pub struct ManualAssignRequest {
    pub order_id: Uuid,
    pub kurir_id: Uuid,
    pub admin_id: Uuid,
    pub notes: Option<String>,
}

#[derive(Serialize)]
pub struct KurirContact {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
}

#[derive(Serialize)]
pub struct ManualAssignResponse {
    pub success: bool,
    pub kurir: KurirContact,
}

async fn manual_assign(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ManualAssignRequest>,
) -> Result<Json<ManualAssignResponse>, AppError> {
    let note = match &payload.notes {
        Some(notes) => format!("manual assignment by admin {}: {notes}", payload.admin_id),
        None => format!("manual assignment by admin {}", payload.admin_id),
    };

    let kurir = apply_assignment(
        &state,
        payload.order_id,
        payload.kurir_id,
        Actor::Admin,
        Some(note),
    )?;

    state
        .metrics
        .dispatches_total
        .with_label_values(&["manual", "assigned"])
        .inc();

    Ok(Json(ManualAssignResponse {
        success: true,
        kurir: KurirContact {
            id: kurir.id,
            name: kurir.name,
            phone: kurir.phone,
        },
    }))
}

async fn list_unassigned(State(state): State<Arc<AppState>>) -> Json<Vec<Order>> {
    let mut orders: Vec<Order> = state
        .orders
        .iter()
        .map(|entry| entry.value().clone())
        .filter(|order| order.status == OrderStatus::Confirmed && order.kurir_id.is_none())
        .collect();
    orders.sort_by_key(|order| order.created_at);

    Json(orders)
}

#[derive(Serialize)]
pub struct RetryDispatchResponse {
    pub success: bool,
    pub kurir_assigned: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kurir_name: Option<String>,
}

/// Poll-based recovery for orders the auto-assign left behind.
async fn retry_dispatch(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<RetryDispatchResponse>, AppError> {
    let order = state
        .orders
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("order {id} not found")))?
        .value()
        .clone();

    if order.status != OrderStatus::Confirmed || order.kurir_id.is_some() {
        return Err(AppError::Conflict(format!(
            "order {} is not waiting for a courier",
            order.order_number
        )));
    }

    match pick_least_loaded(&state) {
        DispatchOutcome::Assigned(candidate) => {
            let kurir = apply_assignment(&state, id, candidate.id, Actor::Admin, None)?;
            state
                .metrics
                .dispatches_total
                .with_label_values(&["balanced", "assigned"])
                .inc();
            Ok(Json(RetryDispatchResponse {
                success: true,
                kurir_assigned: true,
                kurir_name: Some(kurir.name),
            }))
        }
        DispatchOutcome::Unassigned { reason } => {
            info!(order_number = %order.order_number, reason = %reason, "retry dispatch found no courier");
            state
                .metrics
                .dispatches_total
                .with_label_values(&["balanced", "unassigned"])
                .inc();
            Ok(Json(RetryDispatchResponse {
                success: true,
                kurir_assigned: false,
                kurir_name: None,
            }))
        }
    }
}

async fn get_rules(State(state): State<Arc<AppState>>) -> Json<CodRules> {
    Json(state.rules.read().await.clone())
}

async fn put_rules(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CodRules>,
) -> Result<Json<CodRules>, AppError> {
    payload.validate()?;

    *state.rules.write().await = payload.clone();
    info!("cod validation rules updated");

    Ok(Json(payload))
}
