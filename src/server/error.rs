use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use super::cart::ServerCartError;

/// Errors returned by the HTTP handlers, rendered as `{ "error": ... }`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("No token provided")]
    MissingToken,

    #[error("Invalid token")]
    InvalidToken,

    /// Malformed request body or query parameters.
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Cart(#[from] ServerCartError),

    /// The upstream exchange-rate service failed.
    #[error("Failed to fetch exchange rates")]
    Upstream(String),

    #[error("Failed to convert currency")]
    Conversion(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingToken | Self::InvalidToken => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Cart(err) => match err {
                ServerCartError::Validation(_) => StatusCode::BAD_REQUEST,
                ServerCartError::UserNotFound => StatusCode::NOT_FOUND,
                ServerCartError::Contended => StatusCode::CONFLICT,
                ServerCartError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Upstream(_) | Self::Conversion(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            Self::Cart(ServerCartError::Repository(e)) => {
                tracing::error!(error = %e, "Request failed");
                json!({ "error": "Internal server error" })
            }
            Self::Upstream(message) | Self::Conversion(message) => {
                tracing::error!(error = %message, "{}", self);
                json!({ "error": self.to_string(), "message": message })
            }
            _ => json!({ "error": self.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}
