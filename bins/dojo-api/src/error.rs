// API error type and its JSON rendering: { error, code, statusCode }

use crate::rate_limit::RateLimitDecision;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use dojo_grader::GradeError;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{message}")]
    Validation { message: String, details: Vec<String> },

    #[error("{resource} not found")]
    NotFound { resource: &'static str },

    #[error("Rate limit exceeded")]
    RateLimited(RateLimitDecision),

    #[error("Grading did not finish within {0} ms")]
    GradingTimeout(u64),

    #[error(transparent)]
    Grading(#[from] GradeError),

    #[error("{0}")]
    Unavailable(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation {
            message: message.into(),
            details: Vec::new(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Validation { .. } => "VALIDATION_ERROR",
            ApiError::NotFound { .. } => "NOT_FOUND",
            ApiError::RateLimited(_) => "RATE_LIMIT_EXCEEDED",
            ApiError::GradingTimeout(_) => "GATEWAY_TIMEOUT",
            ApiError::Grading(e) if e.is_execution_service() => "PISTON_ERROR",
            ApiError::Grading(_) | ApiError::Unavailable(_) => "SERVICE_UNAVAILABLE",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } => StatusCode::BAD_REQUEST,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::GradingTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Grading(_) | ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut body = json!({
            "error": self.to_string(),
            "code": self.code(),
            "statusCode": status.as_u16(),
        });

        match &self {
            ApiError::Validation { details, .. } if !details.is_empty() => {
                body["details"] = json!(details);
            }
            ApiError::RateLimited(decision) => {
                body["retryAfter"] = json!(decision.retry_after_secs);
                return (status, decision.headers(), Json(body)).into_response();
            }
            _ => {}
        }

        (status, Json(body)).into_response()
    }
}
