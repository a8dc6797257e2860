pub mod admin;
pub mod cod;
pub mod couriers;
pub mod orders;
pub mod users;
pub mod webhooks;
pub mod ws;

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Json;
use axum::Router;
use serde::Serialize;
use tower_http::cors::CorsLayer;

use crate::models::order::OrderStatus;
use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(couriers::router())
        .merge(orders::router())
        .merge(users::router())
        .merge(admin::router())
        .merge(webhooks::router())
        .merge(cod::router())
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/ws", get(ws::ws_handler))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    users: usize,
    couriers: usize,
    orders: usize,
    unassigned_orders: usize,
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let unassigned = state
        .orders
        .iter()
        .filter(|entry| {
            entry.value().status == OrderStatus::Confirmed && entry.value().kurir_id.is_none()
        })
        .count();

    Json(HealthResponse {
        status: "ok",
        users: state.users.len(),
        couriers: state.couriers.len(),
        orders: state.orders.len(),
        unassigned_orders: unassigned,
    })
}

async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err).into_response(),
    }
}
