use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::models::order::{Actor, OrderStatus};
use crate::models::ticket::ItemStatus;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid transition {from:?} -> {to:?} for actor {actor:?}")]
    InvalidTransition {
        from: OrderStatus,
        to: OrderStatus,
        actor: Actor,
    },

    #[error("invalid item transition {from:?} -> {to:?}")]
    InvalidItemTransition { from: ItemStatus, to: ItemStatus },

    #[error("stale state: expected version {expected}, found {actual}")]
    StaleState { expected: u64, actual: u64 },

    #[error("rider {0} is not available")]
    RiderUnavailable(Uuid),

    #[error("offer {0} is no longer open")]
    OfferExpired(Uuid),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::InvalidTransition { .. } | AppError::InvalidItemTransition { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::StaleState { .. }
            | AppError::RiderUnavailable(_)
            | AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::OfferExpired(_) => StatusCode::GONE,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}
