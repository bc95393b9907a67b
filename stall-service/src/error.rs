use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shared::StallStatus;
use std::collections::BTreeMap;

pub type FieldErrors = BTreeMap<String, String>;

#[derive(Debug, thiserror::Error)]
pub enum StallError {
    #[error("Stall not found with id: {0}")]
    NotFound(i64),

    #[error("Stall not found with code: {0}")]
    CodeNotFound(String),

    #[error("Stall with code {0} already exists")]
    DuplicateCode(String),

    #[error("Cannot {action} stall with status: {current}. Only {allowed} stalls can be {outcome}.")]
    InvalidStateTransition {
        action: &'static str,
        outcome: &'static str,
        current: StallStatus,
        allowed: String,
    },

    #[error("Stall {0} was modified concurrently, retry the request")]
    ConcurrentModification(i64),

    #[error("Validation failed")]
    Validation(FieldErrors),

    #[error("{0}")]
    MalformedRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("Access denied")]
    Forbidden,

    #[error("storage failure: {0:#}")]
    Storage(#[from] anyhow::Error),
}

impl StallError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field.to_string(), message.into());
        Self::Validation(errors)
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) | Self::CodeNotFound(_) => StatusCode::NOT_FOUND,
            Self::DuplicateCode(_) | Self::ConcurrentModification(_) => StatusCode::CONFLICT,
            Self::InvalidStateTransition { .. } | Self::Validation(_) | Self::MalformedRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) | Self::CodeNotFound(_) => "STALL_NOT_FOUND",
            Self::DuplicateCode(_) => "DUPLICATE_STALL_CODE",
            Self::InvalidStateTransition { .. } => "INVALID_STALL_STATUS",
            Self::ConcurrentModification(_) => "CONCURRENT_MODIFICATION",
            Self::Validation(_) => "VALIDATION_FAILED",
            Self::MalformedRequest(_) => "BAD_REQUEST",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Forbidden => "FORBIDDEN",
            Self::Storage(_) => "INTERNAL_SERVER_ERROR",
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_errors: Option<FieldErrors>,
}

impl IntoResponse for StallError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            Self::Storage(source) => {
                let detail = format!("{source:#}");
                tracing::error!(error = %detail, "Request failed with a storage error");
                "An internal error occurred".to_string()
            }
            other => other.to_string(),
        };

        let body = ErrorResponse {
            error: self.code().to_string(),
            message,
            field_errors: match self {
                Self::Validation(errors) => Some(errors),
                _ => None,
            },
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_message_names_current_and_allowed_status() {
        let err = StallError::InvalidStateTransition {
            action: "reserve",
            outcome: "reserved",
            current: StallStatus::Available,
            allowed: "HELD".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Cannot reserve stall with status: AVAILABLE. Only HELD stalls can be reserved."
        );
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn lookup_and_conflict_errors_map_to_distinct_statuses() {
        assert_eq!(StallError::NotFound(999).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            StallError::NotFound(999).to_string(),
            "Stall not found with id: 999"
        );
        assert_eq!(
            StallError::DuplicateCode("A-001".to_string()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(StallError::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            StallError::Unauthorized("Missing bearer token".to_string()).status_code(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[tokio::test]
    async fn storage_errors_hide_their_source() {
        let response = StallError::Storage(anyhow::anyhow!("connection refused")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "INTERNAL_SERVER_ERROR");
        assert_eq!(body["message"], "An internal error occurred");
        assert!(!String::from_utf8_lossy(&bytes).contains("connection refused"));
    }
}
