use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("user has no delivery address and none was supplied")]
    AddressNotFound,

    #[error("food {0} not found")]
    FoodNotFound(Uuid),

    #[error("order {0} not found")]
    OrderNotFound(Uuid),

    #[error("order {0} is already delivered")]
    OrderAlreadyDelivered(Uuid),

    #[error("no restaurant available")]
    RestaurantUnavailable,

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::AddressNotFound
            | AppError::FoodNotFound(_)
            | AppError::OrderNotFound(_) => StatusCode::NOT_FOUND,
            AppError::OrderAlreadyDelivered(_) => StatusCode::CONFLICT,
            AppError::RestaurantUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}
