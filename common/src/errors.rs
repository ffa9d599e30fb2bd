// Error handling framework

use thiserror::Error;

/// Schedule-related errors
#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error("Invalid cron expression '{expression}': {reason}")]
    InvalidCronExpression { expression: String, reason: String },

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("No next execution time available for '{pattern}'")]
    NoNextExecution { pattern: String },
}

/// Validation errors
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid field value for {field}: {reason}")]
    InvalidFieldValue { field: String, reason: String },

    #[error("Invalid JSON: {0}")]
    InvalidJson(String),
}

/// Queue-related errors
///
/// The backing store is the only shared mutable resource; any store failure
/// surfaces here and callers treat the whole operation as not having
/// happened (mutations are single commands or MULTI/EXEC pipelines).
#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Queue backing store unavailable: {0}")]
    Unavailable(String),

    #[error("Job not found: {0}")]
    JobNotFound(u64),

    #[error("Message serialization failed: {0}")]
    SerializationFailed(String),

    #[error("Message deserialization failed: {0}")]
    DeserializationFailed(String),
}

/// Weather provider errors
#[derive(Error, Debug)]
pub enum WeatherError {
    #[error("Weather request failed: {0}")]
    RequestFailed(String),

    #[error("Weather provider returned {status} for city '{city}': {body}")]
    ProviderRejected {
        status: u16,
        city: String,
        body: String,
    },

    #[error("Unexpected weather payload: {0}")]
    InvalidResponse(String),
}

/// Mail transport errors
#[derive(Error, Debug)]
pub enum MailError {
    #[error("Invalid mail address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Failed to build message: {0}")]
    BuildFailed(String),

    #[error("SMTP transport failed: {0}")]
    TransportFailed(String),
}

/// Errors surfaced by schedule management operations
#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    #[error(transparent)]
    Queue(#[from] QueueError),
}

impl SchedulerError {
    /// Whether the failure was rejected before any queue mutation.
    pub fn is_rejected_input(&self) -> bool {
        matches!(
            self,
            SchedulerError::Validation(_) | SchedulerError::Schedule(_)
        )
    }
}

impl From<redis::RedisError> for QueueError {
    fn from(err: redis::RedisError) -> Self {
        QueueError::Unavailable(err.to_string())
    }
}

impl From<serde_json::Error> for QueueError {
    fn from(err: serde_json::Error) -> Self {
        QueueError::SerializationFailed(err.to_string())
    }
}

impl From<serde_json::Error> for ValidationError {
    fn from(err: serde_json::Error) -> Self {
        ValidationError::InvalidJson(err.to_string())
    }
}

impl From<reqwest::Error> for WeatherError {
    fn from(err: reqwest::Error) -> Self {
        WeatherError::RequestFailed(err.to_string())
    }
}

impl From<lettre::transport::smtp::Error> for MailError {
    fn from(err: lettre::transport::smtp::Error) -> Self {
        MailError::TransportFailed(err.to_string())
    }
}

impl From<lettre::error::Error> for MailError {
    fn from(err: lettre::error::Error) -> Self {
        MailError::BuildFailed(err.to_string())
    }
}
