//! In-memory JobQueue implementation.
//!
//! Mirrors the Redis queue's semantics (claim exclusivity, drain scope,
//! upsert-by-key rules) without requiring a running store. Used by tests
//! and local development.

use crate::errors::QueueError;
use crate::models::{EmailJobData, JobInstance, JobState, ScheduleDefinition};
use crate::queue::JobQueue;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Default)]
struct QueueInner {
    next_id: u64,
    jobs: HashMap<u64, JobInstance>,
    waiting: VecDeque<u64>,
    delayed: Vec<(u64, DateTime<Utc>)>,
    active: Vec<u64>,
    schedulers: HashMap<String, ScheduleDefinition>,
}

/// In-memory queue with the same observable behavior as `RedisJobQueue`.
#[derive(Default)]
pub struct InMemoryJobQueue {
    inner: Mutex<QueueInner>,
    upsert_calls: AtomicUsize,
    fail_next: AtomicBool,
}

impl InMemoryJobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next queue operation fail with `QueueError::Unavailable`.
    pub fn fail_next_operation(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    /// How many upsert calls have reached the store.
    pub fn upsert_calls(&self) -> usize {
        self.upsert_calls.load(Ordering::SeqCst)
    }

    pub fn active_count(&self) -> usize {
        self.inner.lock().unwrap().active.len()
    }

    fn check_failure(&self) -> Result<(), QueueError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            Err(QueueError::Unavailable("injected failure".to_string()))
        } else {
            Ok(())
        }
    }

    fn new_job(inner: &mut QueueInner, data: EmailJobData, state: JobState) -> JobInstance {
        inner.next_id += 1;
        let job = JobInstance {
            id: inner.next_id,
            data,
            state,
            result: None,
            error: None,
            created_at: Utc::now(),
        };
        inner.jobs.insert(job.id, job.clone());
        job
    }
}

#[async_trait]
impl JobQueue for InMemoryJobQueue {
    async fn enqueue(&self, data: EmailJobData) -> Result<JobInstance, QueueError> {
        self.check_failure()?;
        let mut inner = self.inner.lock().unwrap();
        let job = Self::new_job(&mut inner, data, JobState::Waiting);
        inner.waiting.push_back(job.id);
        Ok(job)
    }

    async fn enqueue_delayed(
        &self,
        data: EmailJobData,
        run_at: DateTime<Utc>,
    ) -> Result<JobInstance, QueueError> {
        self.check_failure()?;
        let mut inner = self.inner.lock().unwrap();
        let job = Self::new_job(&mut inner, data, JobState::Delayed);
        inner.delayed.push((job.id, run_at));
        Ok(job)
    }

    async fn claim(&self) -> Result<Option<JobInstance>, QueueError> {
        self.check_failure()?;
        let mut inner = self.inner.lock().unwrap();
        let Some(job_id) = inner.waiting.pop_front() else {
            return Ok(None);
        };
        inner.active.push(job_id);
        let Some(job) = inner.jobs.get_mut(&job_id) else {
            inner.active.retain(|id| *id != job_id);
            return Ok(None);
        };
        job.state = JobState::Active;
        Ok(Some(job.clone()))
    }

    async fn promote_due(&self) -> Result<usize, QueueError> {
        self.check_failure()?;
        let mut inner = self.inner.lock().unwrap();
        let now = Utc::now();
        let (due, later): (Vec<_>, Vec<_>) =
            inner.delayed.drain(..).partition(|(_, at)| *at <= now);
        inner.delayed = later;
        let count = due.len();
        for (job_id, _) in due {
            if let Some(job) = inner.jobs.get_mut(&job_id) {
                job.state = JobState::Waiting;
            }
            inner.waiting.push_back(job_id);
        }
        Ok(count)
    }

    async fn complete(&self, job_id: u64, result: &str) -> Result<(), QueueError> {
        self.check_failure()?;
        let mut inner = self.inner.lock().unwrap();
        inner.active.retain(|id| *id != job_id);
        if let Some(job) = inner.jobs.get_mut(&job_id) {
            job.state = JobState::Completed;
            job.result = Some(result.to_string());
        }
        Ok(())
    }

    async fn fail(&self, job_id: u64, error: &str) -> Result<(), QueueError> {
        self.check_failure()?;
        let mut inner = self.inner.lock().unwrap();
        inner.active.retain(|id| *id != job_id);
        if let Some(job) = inner.jobs.get_mut(&job_id) {
            job.state = JobState::Failed;
            job.error = Some(error.to_string());
        }
        Ok(())
    }

    async fn job(&self, job_id: u64) -> Result<Option<JobInstance>, QueueError> {
        self.check_failure()?;
        Ok(self.inner.lock().unwrap().jobs.get(&job_id).cloned())
    }

    async fn upsert_scheduler(&self, definition: &ScheduleDefinition) -> Result<(), QueueError> {
        self.check_failure()?;
        self.upsert_calls.fetch_add(1, Ordering::SeqCst);
        self.inner
            .lock()
            .unwrap()
            .schedulers
            .insert(definition.scheduler_key.clone(), definition.clone());
        Ok(())
    }

    async fn remove_scheduler(&self, scheduler_key: &str) -> Result<bool, QueueError> {
        self.check_failure()?;
        Ok(self
            .inner
            .lock()
            .unwrap()
            .schedulers
            .remove(scheduler_key)
            .is_some())
    }

    async fn list_schedulers(&self) -> Result<Vec<ScheduleDefinition>, QueueError> {
        self.check_failure()?;
        Ok(self
            .inner
            .lock()
            .unwrap()
            .schedulers
            .values()
            .cloned()
            .collect())
    }

    async fn drain(&self) -> Result<(), QueueError> {
        self.check_failure()?;
        let mut inner = self.inner.lock().unwrap();
        let mut pending: Vec<u64> = inner.waiting.drain(..).collect();
        pending.extend(inner.delayed.drain(..).map(|(id, _)| id));
        for job_id in pending {
            inner.jobs.remove(&job_id);
        }
        Ok(())
    }

    async fn pending_counts(&self) -> Result<(usize, usize), QueueError> {
        self.check_failure()?;
        let inner = self.inner.lock().unwrap();
        Ok((inner.waiting.len(), inner.delayed.len()))
    }
}
