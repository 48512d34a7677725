use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::usecases::{login_codes::LoginCodeError, payments::PaymentError};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,
}

impl IntoResponse for PaymentError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            PaymentError::Internal(err) => {
                error!(error = ?err, "http: internal payment error");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(ErrorResponse {
            error: self.code().to_string(),
            message,
            payment_id: self.payment_id().map(str::to_string),
        });

        (status, body).into_response()
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            AppError::Internal(err) => {
                error!(error = ?err, "http: internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error.to_string(),
            message,
            payment_id: None,
        });

        (status, body).into_response()
    }
}

impl From<LoginCodeError> for AppError {
    fn from(value: LoginCodeError) -> Self {
        match value {
            LoginCodeError::Internal(err) => AppError::Internal(err),
            other => AppError::BadRequest(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_error_uses_its_status() {
        let response = PaymentError::Expired("abc".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::GONE);

        let response = PaymentError::Internal(anyhow::anyhow!("db down")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn login_code_errors_become_bad_requests() {
        let app_error = AppError::from(LoginCodeError::InvalidCode);
        assert!(matches!(app_error, AppError::BadRequest(ref msg) if msg == "Invalid code"));
        assert_eq!(app_error.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
