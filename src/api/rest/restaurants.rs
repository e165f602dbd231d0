use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/restaurants/:restaurant_id/busy", post(mark_busy))
        .route("/restaurants/:restaurant_id/availability", get(availability))
        .route(
            "/restaurants/:restaurant_id/busy/remaining",
            get(remaining_busy),
        )
        .route("/restaurants/:restaurant_id/busy/order", get(busy_order))
}

#[derive(Deserialize)]
pub struct MarkBusyRequest {
    pub order_id: Uuid,
    pub until: DateTime<Utc>,
}

async fn mark_busy(
    State(state): State<Arc<AppState>>,
    Path(restaurant_id): Path<Uuid>,
    Json(payload): Json<MarkBusyRequest>,
) -> Result<StatusCode, AppError> {
    state
        .locks
        .mark_busy(restaurant_id, payload.order_id, payload.until)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Serialize)]
struct AvailabilityResponse {
    available: bool,
}

async fn availability(
    State(state): State<Arc<AppState>>,
    Path(restaurant_id): Path<Uuid>,
) -> Result<Json<AvailabilityResponse>, AppError> {
    Ok(Json(AvailabilityResponse {
        available: state.locks.is_available(restaurant_id).await?,
    }))
}

#[derive(Serialize)]
struct RemainingBusyResponse {
    minutes: i64,
}

async fn remaining_busy(
    State(state): State<Arc<AppState>>,
    Path(restaurant_id): Path<Uuid>,
) -> Result<Json<RemainingBusyResponse>, AppError> {
    Ok(Json(RemainingBusyResponse {
        minutes: state.locks.remaining_busy_minutes(restaurant_id).await?,
    }))
}

#[derive(Serialize)]
struct BusyOrderResponse {
    order_id: Option<Uuid>,
}

async fn busy_order(
    State(state): State<Arc<AppState>>,
    Path(restaurant_id): Path<Uuid>,
) -> Result<Json<BusyOrderResponse>, AppError> {
    Ok(Json(BusyOrderResponse {
        order_id: state.locks.order_id_for(restaurant_id).await?,
    }))
}
