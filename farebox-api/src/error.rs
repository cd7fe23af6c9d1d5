use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use farebox_ticketing::{PurchaseError, TicketError, ValidationError};
use serde_json::json;

#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Internal(anyhow::Error),
}

impl AppError {
    pub fn from_purchase(err: PurchaseError) -> Self {
        match err {
            PurchaseError::Pricing(e) => AppError::BadRequest(e.to_string()),
            other => AppError::Internal(anyhow::anyhow!(other)),
        }
    }

    pub fn from_validation(err: ValidationError) -> Self {
        match err {
            ValidationError::UnknownToken(token) => {
                AppError::NotFound(format!("Invalid scan token: {}", token))
            }
            // State-machine rejections are final; retrying the scan would
            // not change the outcome.
            ValidationError::Ticket(e) => AppError::Conflict(e.to_string()),
            ValidationError::Store(e) => AppError::Internal(anyhow::anyhow!(e)),
        }
    }

    pub fn from_ticket(err: TicketError) -> Self {
        AppError::Conflict(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Internal(err) => {
                tracing::error!("Internal Server Error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}
