// Job outcome notifications

use async_trait::async_trait;
use tracing::{error, info};

/// Receives completed/failed notifications for processed jobs.
///
/// The worker pool calls this after the outcome is recorded on the queue,
/// so a slow or failing hook can never lose a job result.
#[async_trait]
pub trait JobEventHook: Send + Sync {
    async fn on_completed(&self, job_id: u64, result: &str);
    async fn on_failed(&self, job_id: u64, error: &str);
}

/// Default hook: structured log lines only.
pub struct LoggingEventHook;

#[async_trait]
impl JobEventHook for LoggingEventHook {
    async fn on_completed(&self, job_id: u64, result: &str) {
        info!(job_id, result = %result, "Job completed");
    }

    async fn on_failed(&self, job_id: u64, error: &str) {
        error!(job_id, error = %error, "Job failed");
    }
}
