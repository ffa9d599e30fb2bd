use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default recurrence for new schedules: every day at 17:00.
pub const DEFAULT_CRON_PATTERN: &str = "0 17 * * *";

// ============================================================================
// Schedule Models
// ============================================================================

/// Payload carried verbatim from a recurring rule into every job it
/// materializes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailJobData {
    pub city: String,
    pub recipient_email: String,
}

/// A recurring job template, stored by key in the queue's rules hash.
///
/// At most one active definition exists per `scheduler_key`; installing a
/// definition under an existing key replaces the prior rule in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleDefinition {
    pub scheduler_key: String,
    pub cron_pattern: String,
    pub payload: EmailJobData,
    /// Next instant at which the rule materializes a job. Advanced by the
    /// scheduler engine after each trigger; trigger times per rule are
    /// monotonically increasing.
    pub next_run_at: DateTime<Utc>,
}

// ============================================================================
// Job Models
// ============================================================================

/// Job lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Waiting,
    Active,
    Completed,
    Failed,
    Delayed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Waiting => "waiting",
            JobState::Active => "active",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
            JobState::Delayed => "delayed",
        }
    }
}

impl std::str::FromStr for JobState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "waiting" => Ok(JobState::Waiting),
            "active" => Ok(JobState::Active),
            "completed" => Ok(JobState::Completed),
            "failed" => Ok(JobState::Failed),
            "delayed" => Ok(JobState::Delayed),
            other => Err(format!("unknown job state: {}", other)),
        }
    }
}

/// One concrete unit of work, materialized from a recurring rule or
/// enqueued directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobInstance {
    /// Queue-assigned identifier.
    pub id: u64,
    pub data: EmailJobData,
    pub state: JobState,
    /// Textual outcome recorded by the worker on completion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    /// Failure message recorded by the worker when the pipeline fails.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Weather Models
// ============================================================================

/// Current conditions for one city, as returned by the weather provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherReport {
    /// Degrees Celsius.
    pub temperature: f64,
    /// Degrees Celsius.
    pub feels_like: f64,
    pub description: String,
    /// Relative humidity, percent.
    pub humidity: u32,
    /// Metres per second.
    pub wind_speed: f64,
    pub icon: String,
}
