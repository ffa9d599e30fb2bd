pub mod emails;
pub mod health;
pub mod schedules;

// Common response types
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Standard API error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        let status = match self.error.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "validation_error" => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(self)).into_response()
    }
}

impl From<common::errors::SchedulerError> for ErrorResponse {
    fn from(err: common::errors::SchedulerError) -> Self {
        use common::errors::SchedulerError;
        match &err {
            SchedulerError::Validation(v) => {
                let field = match v {
                    common::errors::ValidationError::MissingField(f) => Some(f.clone()),
                    common::errors::ValidationError::InvalidFieldValue { field, .. } => {
                        Some(field.clone())
                    }
                    common::errors::ValidationError::InvalidJson(_) => None,
                };
                let mut response = ErrorResponse::new("validation_error", err.to_string());
                if let Some(field) = field {
                    response = response.with_details(serde_json::json!({ "field": field }));
                }
                response
            }
            SchedulerError::Schedule(_) => {
                ErrorResponse::new("validation_error", err.to_string())
                    .with_details(serde_json::json!({ "field": "pattern" }))
            }
            SchedulerError::Queue(_) => ErrorResponse::new("queue_error", err.to_string()),
        }
    }
}

impl From<common::errors::QueueError> for ErrorResponse {
    fn from(err: common::errors::QueueError) -> Self {
        ErrorResponse::new("queue_error", err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::errors::{QueueError, SchedulerError, ValidationError};

    #[test]
    fn test_validation_error_maps_to_field_detail() {
        let err: SchedulerError = ValidationError::InvalidFieldValue {
            field: "recipientEmail".to_string(),
            reason: "not a well-formed email address".to_string(),
        }
        .into();
        let response: ErrorResponse = err.into();
        assert_eq!(response.error, "validation_error");
        assert_eq!(
            response.details.unwrap()["field"],
            serde_json::json!("recipientEmail")
        );
    }

    #[test]
    fn test_queue_error_is_not_a_client_error() {
        let err: SchedulerError = QueueError::Unavailable("down".to_string()).into();
        let response: ErrorResponse = err.into();
        assert_eq!(response.error, "queue_error");
    }
}
