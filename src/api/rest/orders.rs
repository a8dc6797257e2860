use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, patch, post};
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::engine::apply::{cancel_order, complete_order, record_transition};
use crate::error::AppError;
use crate::models::notification::{Actor, StatusLog};
use crate::models::order::{Order, OrderStatus, PaymentMethod, PaymentStatus};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/orders", post(create_order))
        .route("/orders/:id", get(get_order))
        .route("/orders/:id/log", get(get_order_log))
        .route("/orders/:id/status", patch(update_order_status))
}

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub user_id: Uuid,
    pub amount: u64,
    pub delivery_distance_km: f64,
    pub payment_method: PaymentMethod,
    pub order_number: Option<String>,
}

async fn create_order(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<Json<Order>, AppError> {
    if !state.users.contains_key(&payload.user_id) {
        return Err(AppError::NotFound(format!(
            "user {} not found",
            payload.user_id
        )));
    }
    if payload.amount == 0 {
        return Err(AppError::BadRequest(
            "amount must be greater than zero".to_string(),
        ));
    }
    if !payload.delivery_distance_km.is_finite() || payload.delivery_distance_km < 0.0 {
        return Err(AppError::BadRequest(
            "delivery_distance_km must be a non-negative number".to_string(),
        ));
    }

    let order_number = payload.order_number.unwrap_or_else(|| {
        let tag = Uuid::new_v4().simple().to_string();
        format!("ORD-{}", &tag[..8].to_uppercase())
    });
    if state.find_order_by_number(&order_number).is_some() {
        return Err(AppError::Conflict(format!(
            "order number {order_number} already exists"
        )));
    }

    let order = Order {
        id: Uuid::new_v4(),
        order_number,
        user_id: payload.user_id,
        amount: payload.amount,
        delivery_distance_km: payload.delivery_distance_km,
        payment_method: payload.payment_method,
        payment_status: PaymentStatus::Unpaid,
        status: OrderStatus::Pending,
        kurir_id: None,
        created_at: Utc::now(),
        confirmed_at: None,
        assigned_at: None,
        completed_at: None,
        cancelled_at: None,
    };

    state.orders.insert(order.id, order.clone());
    Ok(Json(order))
}

async fn get_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    let order = state
        .orders
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("order {id} not found")))?;

    Ok(Json(order.value().clone()))
}

async fn get_order_log(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<StatusLog>>, AppError> {
    if !state.orders.contains_key(&id) {
        return Err(AppError::NotFound(format!("order {id} not found")));
    }

    let mut rows: Vec<StatusLog> = state
        .status_log
        .iter()
        .map(|entry| entry.value().clone())
        .filter(|row| row.order_id == id)
        .collect();
    rows.sort_by_key(|row| row.seq);

    Ok(Json(rows))
}

#[derive(Deserialize)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
    pub actor: Option<Actor>,
}

/// Courier/admin driven transitions along the delivery chain. Assignment and
/// confirmation have their own endpoints; this one covers ready, delivering,
/// completed and cancelled.
async fn update_order_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateOrderStatusRequest>,
) -> Result<Json<Order>, AppError> {
    let actor = payload.actor.unwrap_or(Actor::System);

    let current = state
        .orders
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("order {id} not found")))?
        .status;

    let updated = match payload.status {
        OrderStatus::Ready => {
            if current != OrderStatus::Processing {
                return Err(AppError::Conflict(format!(
                    "cannot move to ready from {current:?}"
                )));
            }
            record_transition(&state, id, OrderStatus::Ready, actor, None)?
        }
        OrderStatus::Delivering => {
            if current != OrderStatus::Ready {
                return Err(AppError::Conflict(format!(
                    "cannot move to delivering from {current:?}"
                )));
            }
            record_transition(&state, id, OrderStatus::Delivering, actor, None)?
        }
        OrderStatus::Completed => complete_order(&state, id, actor)?,
        OrderStatus::Cancelled => cancel_order(&state, id, actor, None)?,
        other => {
            return Err(AppError::BadRequest(format!(
                "status {other:?} cannot be set through this endpoint"
            )));
        }
    };

    Ok(Json(updated))
}
