use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, patch, post};
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::courier::{Kurir, KurirStatus};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/kurir", post(create_kurir).get(list_kurir))
        .route("/kurir/:id", get(get_kurir))
        .route("/kurir/:id/status", patch(update_kurir_status))
        .route("/kurir/:id/active", patch(update_kurir_active))
}

#[derive(Deserialize)]
pub struct CreateKurirRequest {
    pub name: String,
    pub phone: String,
    pub rating: Option<f64>,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: KurirStatus,
}

#[derive(Deserialize)]
pub struct UpdateActiveRequest {
    pub is_active: bool,
}

async fn create_kurir(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateKurirRequest>,
) -> Result<Json<Kurir>, AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("name cannot be empty".to_string()));
    }
    if payload.phone.trim().is_empty() {
        return Err(AppError::BadRequest("phone cannot be empty".to_string()));
    }

    let kurir = Kurir {
        id: Uuid::new_v4(),
        name: payload.name,
        phone: payload.phone,
        status: KurirStatus::Available,
        is_active: true,
        active_orders: 0,
        total_deliveries: 0,
        rating: payload.rating.unwrap_or(5.0).clamp(0.0, 5.0),
        updated_at: Utc::now(),
    };

    state.couriers.insert(kurir.id, kurir.clone());
    Ok(Json(kurir))
}

async fn list_kurir(State(state): State<Arc<AppState>>) -> Json<Vec<Kurir>> {
    let couriers = state
        .couriers
        .iter()
        .map(|entry| entry.value().clone())
        .collect();
    Json(couriers)
}

async fn get_kurir(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Kurir>, AppError> {
    let kurir = state
        .couriers
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("kurir {id} not found")))?;

    Ok(Json(kurir.value().clone()))
}

async fn update_kurir_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<Kurir>, AppError> {
    let mut kurir = state
        .couriers
        .get_mut(&id)
        .ok_or_else(|| AppError::NotFound(format!("kurir {id} not found")))?;

    kurir.status = payload.status;
    if payload.status != KurirStatus::Offline {
        // Busy/available is derived from load; only offline sticks.
        kurir.refresh_status();
    }
    kurir.updated_at = Utc::now();

    Ok(Json(kurir.clone()))
}

async fn update_kurir_active(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateActiveRequest>,
) -> Result<Json<Kurir>, AppError> {
    let mut kurir = state
        .couriers
        .get_mut(&id)
        .ok_or_else(|| AppError::NotFound(format!("kurir {id} not found")))?;

    kurir.is_active = payload.is_active;
    kurir.updated_at = Utc::now();

    Ok(Json(kurir.clone()))
}
