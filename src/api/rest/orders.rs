use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{patch, post};
use axum::Json;
use axum::Router;
use serde::Deserialize;
use uuid::Uuid;

use crate::engine::assignment::{self, CreateOrderRequest};
use crate::engine::completion;
use crate::error::AppError;
use crate::models::order::{Order, OrderStatus};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/users/:user_id/orders",
            post(create_order).get(list_user_orders),
        )
        .route("/orders/:order_id/status", patch(update_order_status))
        .route("/orders/:order_id/complete", post(complete_order))
}

async fn create_order(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<Json<Order>, AppError> {
    let start = Instant::now();
    let result = assignment::create_order(&state, user_id, payload).await;

    let outcome = match &result {
        Ok(_) => "success",
        Err(AppError::RestaurantUnavailable) => "unavailable",
        Err(_) => "error",
    };
    state
        .metrics
        .order_creation_seconds
        .with_label_values(&[outcome])
        .observe(start.elapsed().as_secs_f64());
    state
        .metrics
        .orders_created_total
        .with_label_values(&[outcome])
        .inc();

    result.map(Json)
}

async fn list_user_orders(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> Json<Vec<Order>> {
    Json(assignment::user_orders(&state, user_id))
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
}

async fn update_order_status(
    State(state): State<Arc<AppState>>,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<Order>, AppError> {
    let order = assignment::update_order_status(&state, order_id, payload.status)?;
    Ok(Json(order))
}

async fn complete_order(
    State(state): State<Arc<AppState>>,
    Path(order_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    completion::complete_order(&state, order_id, "manual").await?;
    Ok(StatusCode::NO_CONTENT)
}
