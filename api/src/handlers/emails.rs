use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use crate::handlers::ErrorResponse;
use crate::state::AppState;
use common::scheduler::validate_job_data;

/// Request for a one-off weather email
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendEmailRequest {
    pub city: String,
    pub recipient_email: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendEmailResponse {
    pub job_id: u64,
}

/// Enqueue one immediate weather email job.
///
/// Fire-and-confirm: the handler returns as soon as the job is durably
/// queued; a worker picks it up and runs the pipeline.
#[tracing::instrument(skip(state, req))]
pub async fn send_email(
    State(state): State<AppState>,
    Json(req): Json<SendEmailRequest>,
) -> Result<(StatusCode, Json<SendEmailResponse>), ErrorResponse> {
    let data = validate_job_data(&req.city, &req.recipient_email).map_err(|e| {
        ErrorResponse::from(common::errors::SchedulerError::Validation(e))
    })?;

    let job = state.queue.enqueue(data).await?;

    tracing::info!(job_id = job.id, "Ad-hoc email job enqueued");
    Ok((
        StatusCode::ACCEPTED,
        Json(SendEmailResponse { job_id: job.id }),
    ))
}
