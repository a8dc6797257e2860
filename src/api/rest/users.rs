use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::notification::{Notification, RecipientKind};
use crate::models::user::User;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users", post(create_user))
        .route("/users/:id", get(get_user))
        .route("/notifications/:kind/:id", get(list_notifications))
}

#[derive(Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub phone: Option<String>,
    #[serde(default)]
    pub is_verified_user: bool,
    /// Seed value for imported profiles; fresh signups start at 50.
    pub trust_score: Option<u8>,
    pub total_successful_orders: Option<u32>,
}

async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<Json<User>, AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("name cannot be empty".to_string()));
    }
    if let Some(score) = payload.trust_score {
        if score > 100 {
            return Err(AppError::BadRequest(
                "trust_score must be within 0..=100".to_string(),
            ));
        }
    }

    let user = User {
        id: Uuid::new_v4(),
        name: payload.name,
        phone: payload.phone,
        trust_score: payload.trust_score.unwrap_or(50),
        total_successful_orders: payload.total_successful_orders.unwrap_or(0),
        is_verified_user: payload.is_verified_user,
        cod_blacklisted: false,
        blacklist_reason: None,
        cod_cancellations: Vec::new(),
        created_at: Utc::now(),
    };

    state.users.insert(user.id, user.clone());
    Ok(Json(user))
}

async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<User>, AppError> {
    let user = state
        .users
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("user {id} not found")))?;

    Ok(Json(user.value().clone()))
}

async fn list_notifications(
    State(state): State<Arc<AppState>>,
    Path((kind, id)): Path<(String, Uuid)>,
) -> Result<Json<Vec<Notification>>, AppError> {
    let recipient_kind = match kind.as_str() {
        "user" => RecipientKind::User,
        "kurir" => RecipientKind::Kurir,
        other => {
            return Err(AppError::BadRequest(format!(
                "unknown recipient kind: {other}"
            )))
        }
    };

    let mut notifications: Vec<Notification> = state
        .notifications
        .iter()
        .map(|entry| entry.value().clone())
        .filter(|n| n.recipient_kind == recipient_kind && n.recipient_id == id)
        .collect();
    notifications.sort_by_key(|n| n.created_at);

    Ok(Json(notifications))
}
