use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;

use crate::models::booking::{Booking, BookingStatus};

/// Problems caught before anything is sent to the backend.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("A cancellation reason is required")]
    MissingCancellationReason,
    #[error("A rating is required")]
    MissingRating,
    #[error("Rating must be a whole number, got {0}")]
    RatingNotInteger(String),
    #[error("Rating must be between 1 and 5, got {0}")]
    RatingOutOfRange(String),
    #[error("Unknown review type: {0}")]
    UnknownReviewType(String),
    #[error("Decision must be `confirmed` or `cancelled`, got {0:?}")]
    UnknownDecision(String),
    #[error("Cannot {action} a booking that is {status}")]
    ActionNotAllowed {
        action: &'static str,
        status: BookingStatus,
    },
    #[error("Booking is not completed yet")]
    BookingNotCompleted,
    #[error("Unknown booking status: {0}")]
    UnknownStatus(String),
    #[error("Malformed request: {0}")]
    MalformedBody(String),
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Could not reach the booking service: {0}")]
    Transport(String),
    #[error("{message}")]
    Application { status: u16, message: String },
    #[error("{message}")]
    StaleState {
        message: String,
        booking: Option<Box<Booking>>,
    },
    #[error("{0}")]
    Unauthorized(String),
    #[error("Insufficient permissions")]
    Forbidden,
    #[error("Another action on this booking is still in progress")]
    InFlight,
    #[error("Unexpected response from the booking service: {0}")]
    Decode(String),
}

impl AppError {
    fn kind(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation",
            AppError::Transport(_) => "transport",
            AppError::Application { .. } => "application",
            AppError::StaleState { .. } => "stale-state",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::Forbidden => "forbidden",
            AppError::InFlight => "in-flight",
            AppError::Decode(_) => "decode",
        }
    }

    /// Whether the backend refused the request because of the booking's
    /// state: `success:false` on a 2xx, or a 4xx that is not about the
    /// caller's credentials or the backend's own load. Outages and auth
    /// failures are not rejections.
    pub fn is_rejection(&self) -> bool {
        match self {
            AppError::Application { status, .. } => match *status {
                200..=299 => true,
                401 | 403 | 408 | 429 => false,
                400..=499 => true,
                _ => false,
            },
            _ => false,
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            AppError::Decode(err.to_string())
        } else {
            AppError::Transport(err.to_string())
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::InFlight | AppError::StaleState { .. } => StatusCode::CONFLICT,
            AppError::Application { status, .. } => match StatusCode::from_u16(*status) {
                Ok(code) if code.is_client_error() || code.is_server_error() => code,
                // success:false on an otherwise successful response
                _ => StatusCode::UNPROCESSABLE_ENTITY,
            },
            AppError::Transport(_) | AppError::Decode(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut body = json!({
            "success": false,
            "message": self.to_string(),
            "kind": self.kind(),
        });
        if let AppError::StaleState {
            booking: Some(booking),
            ..
        } = self
        {
            body["data"] = json!({ "booking": booking });
        }
        HttpResponse::build(self.status_code()).json(body)
    }
}
