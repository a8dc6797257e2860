use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::engine::eligibility::{evaluate, CodVerdict};
use crate::error::AppError;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/cod/validate", post(validate_cod))
}

#[derive(Deserialize)]
pub struct ValidateCodRequest {
    pub user_id: Uuid,
    pub order_amount: u64,
    pub delivery_distance: f64,
}

async fn validate_cod(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ValidateCodRequest>,
) -> Result<Json<CodVerdict>, AppError> {
    if !payload.delivery_distance.is_finite() || payload.delivery_distance < 0.0 {
        return Err(AppError::BadRequest(
            "delivery_distance must be a non-negative number".to_string(),
        ));
    }

    let user = state
        .users
        .get(&payload.user_id)
        .ok_or_else(|| AppError::NotFound(format!("user {} not found", payload.user_id)))?
        .value()
        .clone();

    let rules = state.rules.read().await.clone();
    let verdict = evaluate(
        &user,
        payload.order_amount,
        payload.delivery_distance,
        &rules,
        Utc::now(),
    );

    let label = if !verdict.eligible {
        "rejected"
    } else if verdict.has_warnings {
        "eligible_with_warnings"
    } else {
        "eligible"
    };
    state
        .metrics
        .cod_validations_total
        .with_label_values(&[label])
        .inc();

    Ok(Json(verdict))
}
