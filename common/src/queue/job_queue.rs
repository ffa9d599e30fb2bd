// Durable job queue on Redis primitives
//
// Key layout, one namespace per deployment:
//   {prefix}:id          counter for job ids
//   {prefix}:waiting     list of job ids ready to claim
//   {prefix}:active      list of job ids claimed by a worker
//   {prefix}:delayed     sorted set of job ids, scored by run-at millis
//   {prefix}:job:{id}    hash holding one job record
//   {prefix}:schedulers  hash of recurring rules, field = scheduler key
//
// Every multi-key mutation goes through a MULTI/EXEC pipeline so a store
// failure leaves either the whole mutation or none of it.

use crate::errors::QueueError;
use crate::models::{EmailJobData, JobInstance, JobState, ScheduleDefinition};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::{AsyncCommands, Direction};
use std::collections::HashMap;
use std::str::FromStr;
use tracing::{debug, info, instrument, warn};

use super::redis::RedisPool;

/// Contract between the scheduling core and the durable queue.
///
/// Delivery is at least once: a claimed job whose worker dies may be
/// redelivered by operational tooling, and consumers must tolerate
/// duplicates. A given job id is claimed by at most one worker at a time.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Append a job for immediate processing.
    async fn enqueue(&self, data: EmailJobData) -> Result<JobInstance, QueueError>;

    /// Append a job that becomes claimable at `run_at`.
    async fn enqueue_delayed(
        &self,
        data: EmailJobData,
        run_at: DateTime<Utc>,
    ) -> Result<JobInstance, QueueError>;

    /// Claim the next waiting job, marking it active. `None` when nothing
    /// is ready.
    async fn claim(&self) -> Result<Option<JobInstance>, QueueError>;

    /// Move delayed jobs whose run-at instant has passed into the waiting
    /// list. Returns how many were promoted.
    async fn promote_due(&self) -> Result<usize, QueueError>;

    /// Record a successful outcome and release the job from the active list.
    async fn complete(&self, job_id: u64, result: &str) -> Result<(), QueueError>;

    /// Record a failure outcome and release the job from the active list.
    async fn fail(&self, job_id: u64, error: &str) -> Result<(), QueueError>;

    /// Fetch one job record.
    async fn job(&self, job_id: u64) -> Result<Option<JobInstance>, QueueError>;

    /// Install or replace the recurring rule identified by the definition's
    /// scheduler key. Idempotent: exactly one active rule per key afterwards.
    async fn upsert_scheduler(&self, definition: &ScheduleDefinition) -> Result<(), QueueError>;

    /// Remove a recurring rule. `false` means the key was unknown.
    async fn remove_scheduler(&self, scheduler_key: &str) -> Result<bool, QueueError>;

    /// Enumerate the currently active recurring rules. Ordering is not
    /// stable across calls.
    async fn list_schedulers(&self) -> Result<Vec<ScheduleDefinition>, QueueError>;

    /// Discard every waiting and delayed job without executing it. Active
    /// jobs and recurring rules are untouched.
    async fn drain(&self) -> Result<(), QueueError>;

    /// Current (waiting, delayed) backlog sizes.
    async fn pending_counts(&self) -> Result<(usize, usize), QueueError>;
}

/// Redis-backed queue implementation.
#[derive(Clone)]
pub struct RedisJobQueue {
    pool: RedisPool,
    prefix: String,
}

impl RedisJobQueue {
    pub fn new(pool: RedisPool, key_prefix: impl Into<String>) -> Self {
        Self {
            pool,
            prefix: key_prefix.into(),
        }
    }

    fn key(&self, suffix: &str) -> String {
        format!("{}:{}", self.prefix, suffix)
    }

    fn job_key(&self, job_id: u64) -> String {
        format!("{}:job:{}", self.prefix, job_id)
    }

    async fn next_job_id(&self) -> Result<u64, QueueError> {
        let mut conn = self.pool.get_connection();
        let id: u64 = conn.incr(self.key("id"), 1u64).await?;
        Ok(id)
    }

    fn parse_job(&self, job_id: u64, fields: HashMap<String, String>) -> Result<JobInstance, QueueError> {
        let data_json = fields
            .get("data")
            .ok_or_else(|| QueueError::DeserializationFailed(format!("job {} has no data", job_id)))?;
        let data: EmailJobData = serde_json::from_str(data_json)
            .map_err(|e| QueueError::DeserializationFailed(e.to_string()))?;

        let state = fields
            .get("state")
            .map(|s| JobState::from_str(s))
            .transpose()
            .map_err(QueueError::DeserializationFailed)?
            .unwrap_or(JobState::Waiting);

        let created_at = fields
            .get("created_at")
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);

        Ok(JobInstance {
            id: job_id,
            data,
            state,
            result: fields.get("result").cloned(),
            error: fields.get("error").cloned(),
            created_at,
        })
    }

    async fn write_job(
        &self,
        data: &EmailJobData,
        state: JobState,
        run_at: Option<DateTime<Utc>>,
    ) -> Result<JobInstance, QueueError> {
        let job_id = self.next_job_id().await?;
        let created_at = Utc::now();
        let data_json = serde_json::to_string(data)?;

        let mut pipe = redis::pipe();
        pipe.atomic()
            .hset_multiple(
                self.job_key(job_id),
                &[
                    ("data", data_json),
                    ("state", state.as_str().to_string()),
                    ("created_at", created_at.to_rfc3339()),
                ],
            )
            .ignore();

        match run_at {
            Some(at) => {
                pipe.zadd(self.key("delayed"), job_id, at.timestamp_millis())
                    .ignore();
            }
            None => {
                pipe.lpush(self.key("waiting"), job_id).ignore();
            }
        }

        let mut conn = self.pool.get_connection();
        pipe.query_async::<_, ()>(&mut conn).await?;

        Ok(JobInstance {
            id: job_id,
            data: data.clone(),
            state,
            result: None,
            error: None,
            created_at,
        })
    }

    async fn finish_job(
        &self,
        job_id: u64,
        state: JobState,
        field: &str,
        message: &str,
    ) -> Result<(), QueueError> {
        let mut conn = self.pool.get_connection();
        redis::pipe()
            .atomic()
            .lrem(self.key("active"), 1, job_id)
            .ignore()
            .hset(self.job_key(job_id), "state", state.as_str())
            .ignore()
            .hset(self.job_key(job_id), field, message)
            .ignore()
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl JobQueue for RedisJobQueue {
    #[instrument(skip(self, data), fields(city = %data.city))]
    async fn enqueue(&self, data: EmailJobData) -> Result<JobInstance, QueueError> {
        let job = self.write_job(&data, JobState::Waiting, None).await?;
        info!(job_id = job.id, "Job enqueued");
        Ok(job)
    }

    #[instrument(skip(self, data), fields(city = %data.city, run_at = %run_at))]
    async fn enqueue_delayed(
        &self,
        data: EmailJobData,
        run_at: DateTime<Utc>,
    ) -> Result<JobInstance, QueueError> {
        let job = self.write_job(&data, JobState::Delayed, Some(run_at)).await?;
        info!(job_id = job.id, "Delayed job enqueued");
        Ok(job)
    }

    async fn claim(&self) -> Result<Option<JobInstance>, QueueError> {
        let mut conn = self.pool.get_connection();

        // LMOVE is the claim point: the id leaves waiting and lands in
        // active in one command, so no two workers see the same job.
        let job_id: Option<u64> = conn
            .lmove(
                self.key("waiting"),
                self.key("active"),
                Direction::Right,
                Direction::Left,
            )
            .await?;

        let Some(job_id) = job_id else {
            return Ok(None);
        };

        let fields: HashMap<String, String> = conn.hgetall(self.job_key(job_id)).await?;
        if fields.is_empty() {
            // Record was purged between enqueue and claim; drop the orphan id.
            warn!(job_id, "Claimed job has no record, discarding");
            let _: i64 = conn.lrem(self.key("active"), 1, job_id).await?;
            return Ok(None);
        }

        let _: () = conn
            .hset(self.job_key(job_id), "state", JobState::Active.as_str())
            .await?;

        let mut job = self.parse_job(job_id, fields)?;
        job.state = JobState::Active;
        debug!(job_id, "Job claimed");
        Ok(Some(job))
    }

    async fn promote_due(&self) -> Result<usize, QueueError> {
        let mut conn = self.pool.get_connection();
        let now_ms = Utc::now().timestamp_millis();

        let due: Vec<u64> = conn
            .zrangebyscore(self.key("delayed"), 0i64, now_ms)
            .await?;

        for job_id in &due {
            redis::pipe()
                .atomic()
                .zrem(self.key("delayed"), *job_id)
                .ignore()
                .lpush(self.key("waiting"), *job_id)
                .ignore()
                .hset(self.job_key(*job_id), "state", JobState::Waiting.as_str())
                .ignore()
                .query_async::<_, ()>(&mut conn)
                .await?;
        }

        if !due.is_empty() {
            debug!(promoted = due.len(), "Promoted delayed jobs");
        }
        Ok(due.len())
    }

    #[instrument(skip(self, result))]
    async fn complete(&self, job_id: u64, result: &str) -> Result<(), QueueError> {
        self.finish_job(job_id, JobState::Completed, "result", result)
            .await
    }

    #[instrument(skip(self, error))]
    async fn fail(&self, job_id: u64, error: &str) -> Result<(), QueueError> {
        self.finish_job(job_id, JobState::Failed, "error", error)
            .await
    }

    async fn job(&self, job_id: u64) -> Result<Option<JobInstance>, QueueError> {
        let mut conn = self.pool.get_connection();
        let fields: HashMap<String, String> = conn.hgetall(self.job_key(job_id)).await?;
        if fields.is_empty() {
            return Ok(None);
        }
        self.parse_job(job_id, fields).map(Some)
    }

    #[instrument(skip(self, definition), fields(scheduler_key = %definition.scheduler_key))]
    async fn upsert_scheduler(&self, definition: &ScheduleDefinition) -> Result<(), QueueError> {
        let entry = serde_json::to_string(definition)?;
        let mut conn = self.pool.get_connection();

        // A single HSET is the whole upsert: the field either holds the old
        // rule or the new one, never both and never a partial write.
        let _: () = conn
            .hset(self.key("schedulers"), &definition.scheduler_key, entry)
            .await?;

        info!("Recurring rule installed");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn remove_scheduler(&self, scheduler_key: &str) -> Result<bool, QueueError> {
        let mut conn = self.pool.get_connection();
        let removed: i64 = conn.hdel(self.key("schedulers"), scheduler_key).await?;
        Ok(removed > 0)
    }

    async fn list_schedulers(&self) -> Result<Vec<ScheduleDefinition>, QueueError> {
        let mut conn = self.pool.get_connection();
        let entries: HashMap<String, String> = conn.hgetall(self.key("schedulers")).await?;

        let mut definitions = Vec::with_capacity(entries.len());
        for (key, entry) in entries {
            match serde_json::from_str::<ScheduleDefinition>(&entry) {
                Ok(def) => definitions.push(def),
                Err(e) => {
                    // A corrupt entry must not hide the healthy ones.
                    warn!(scheduler_key = %key, error = %e, "Skipping unreadable rule entry");
                }
            }
        }
        Ok(definitions)
    }

    #[instrument(skip(self))]
    async fn drain(&self) -> Result<(), QueueError> {
        let mut conn = self.pool.get_connection();

        let waiting_ids: Vec<u64> = conn.lrange(self.key("waiting"), 0, -1).await?;
        let delayed_ids: Vec<u64> = conn.zrange(self.key("delayed"), 0, -1).await?;

        let mut pipe = redis::pipe();
        pipe.atomic()
            .del(self.key("waiting"))
            .ignore()
            .del(self.key("delayed"))
            .ignore();
        for job_id in waiting_ids.iter().chain(delayed_ids.iter()) {
            pipe.del(self.job_key(*job_id)).ignore();
        }
        pipe.query_async::<_, ()>(&mut conn).await?;

        info!(
            waiting = waiting_ids.len(),
            delayed = delayed_ids.len(),
            "Drained pending jobs"
        );
        Ok(())
    }

    async fn pending_counts(&self) -> Result<(usize, usize), QueueError> {
        let mut conn = self.pool.get_connection();
        let waiting: usize = conn.llen(self.key("waiting")).await?;
        let delayed: usize = conn.zcard(self.key("delayed")).await?;
        Ok((waiting, delayed))
    }
}
