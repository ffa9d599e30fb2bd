use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::handlers::ErrorResponse;
use crate::state::AppState;
use common::models::EmailJobData;

/// Request to create or replace a schedule
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateScheduleRequest {
    pub city: String,
    pub recipient_email: String,
    #[serde(default)]
    pub pattern: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateScheduleResponse {
    pub scheduler_key: String,
    pub pattern: String,
}

/// One schedule as shown to API callers
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleView {
    pub scheduler_key: String,
    pub pattern: String,
    pub payload: EmailJobData,
    pub next_run_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListSchedulesResponse {
    pub count: usize,
    pub schedules: Vec<ScheduleView>,
}

#[derive(Debug, Serialize)]
pub struct DeleteScheduleResponse {
    pub removed: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteAllSchedulesResponse {
    pub schedulers_removed: usize,
    pub drained: bool,
}

/// Install or replace the recurring rule for a (city, recipient) pair
#[tracing::instrument(skip(state, req))]
pub async fn create_schedule(
    State(state): State<AppState>,
    Json(req): Json<CreateScheduleRequest>,
) -> Result<(StatusCode, Json<CreateScheduleResponse>), ErrorResponse> {
    let definition = state
        .manager
        .create(&req.city, &req.recipient_email, req.pattern.as_deref())
        .await?;

    tracing::info!(scheduler_key = %definition.scheduler_key, "Schedule created");
    Ok((
        StatusCode::CREATED,
        Json(CreateScheduleResponse {
            scheduler_key: definition.scheduler_key,
            pattern: definition.cron_pattern,
        }),
    ))
}

/// Remove one schedule by key
#[tracing::instrument(skip(state))]
pub async fn delete_schedule(
    State(state): State<AppState>,
    Path(scheduler_key): Path<String>,
) -> Result<Json<DeleteScheduleResponse>, ErrorResponse> {
    let removed = state.manager.remove(&scheduler_key).await?;

    if !removed {
        return Err(ErrorResponse::new(
            "not_found",
            format!("No schedule found with key: {}", scheduler_key),
        ));
    }

    Ok(Json(DeleteScheduleResponse { removed: true }))
}

/// List all active schedules
#[tracing::instrument(skip(state))]
pub async fn list_schedules(
    State(state): State<AppState>,
) -> Result<Json<ListSchedulesResponse>, ErrorResponse> {
    let definitions = state.manager.list().await?;

    let schedules: Vec<ScheduleView> = definitions
        .into_iter()
        .map(|def| ScheduleView {
            scheduler_key: def.scheduler_key,
            pattern: def.cron_pattern,
            payload: def.payload,
            next_run_at: def.next_run_at,
        })
        .collect();

    Ok(Json(ListSchedulesResponse {
        count: schedules.len(),
        schedules,
    }))
}

/// Remove every schedule and drain pending jobs
#[tracing::instrument(skip(state))]
pub async fn delete_all_schedules(
    State(state): State<AppState>,
) -> Result<Json<DeleteAllSchedulesResponse>, ErrorResponse> {
    let schedulers_removed = state.manager.remove_all().await?;

    if schedulers_removed == 0 {
        return Err(ErrorResponse::new("not_found", "No schedules found"));
    }

    Ok(Json(DeleteAllSchedulesResponse {
        schedulers_removed,
        drained: true,
    }))
}
