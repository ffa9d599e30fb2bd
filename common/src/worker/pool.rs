// Worker pool: concurrent consumers pulling due jobs from the queue

use crate::models::JobInstance;
use crate::pipeline::EmailPipeline;
use crate::queue::JobQueue;
use crate::worker::events::JobEventHook;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{debug, error, info, instrument};

/// Configuration for the worker pool
#[derive(Debug, Clone)]
pub struct WorkerPoolConfig {
    /// Number of concurrent consumer tasks
    pub concurrency: u32,
    /// How long an idle consumer sleeps before polling again
    pub poll_interval: Duration,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            poll_interval: Duration::from_secs(1),
        }
    }
}

/// Pool of consumers, each single-threaded within one job execution.
///
/// The queue guarantees a job is claimed by at most one consumer; the pool
/// guarantees every claimed job reaches a terminal state on the queue,
/// even when the pipeline fails.
pub struct WorkerPool {
    config: WorkerPoolConfig,
    queue: Arc<dyn JobQueue>,
    pipeline: Arc<EmailPipeline>,
    events: Arc<dyn JobEventHook>,
    shutdown_flag: Arc<AtomicBool>,
    shutdown_notify: Arc<Notify>,
}

impl WorkerPool {
    pub fn new(
        config: WorkerPoolConfig,
        queue: Arc<dyn JobQueue>,
        pipeline: Arc<EmailPipeline>,
        events: Arc<dyn JobEventHook>,
    ) -> Self {
        Self {
            config,
            queue,
            pipeline,
            events,
            shutdown_flag: Arc::new(AtomicBool::new(false)),
            shutdown_notify: Arc::new(Notify::new()),
        }
    }

    /// Start all consumers and wait until every one of them has stopped.
    #[instrument(skip(self))]
    pub async fn start(&self) {
        info!(concurrency = self.config.concurrency, "Starting worker pool");

        let mut handles = Vec::with_capacity(self.config.concurrency as usize);
        for worker_index in 0..self.config.concurrency {
            let consumer = Consumer {
                worker_index,
                queue: Arc::clone(&self.queue),
                pipeline: Arc::clone(&self.pipeline),
                events: Arc::clone(&self.events),
                poll_interval: self.config.poll_interval,
                shutdown_flag: Arc::clone(&self.shutdown_flag),
                shutdown_notify: Arc::clone(&self.shutdown_notify),
            };
            handles.push(tokio::spawn(async move { consumer.run().await }));
        }

        for handle in handles {
            if let Err(e) = handle.await {
                error!(error = %e, "Consumer task panicked");
            }
        }

        info!("Worker pool stopped");
    }

    /// Request graceful shutdown; in-flight jobs finish first.
    pub fn shutdown(&self) {
        info!("Requesting worker pool shutdown");
        self.shutdown_flag.store(true, Ordering::Relaxed);
        self.shutdown_notify.notify_waiters();
    }
}

struct Consumer {
    worker_index: u32,
    queue: Arc<dyn JobQueue>,
    pipeline: Arc<EmailPipeline>,
    events: Arc<dyn JobEventHook>,
    poll_interval: Duration,
    shutdown_flag: Arc<AtomicBool>,
    shutdown_notify: Arc<Notify>,
}

impl Consumer {
    #[instrument(skip(self), fields(worker = self.worker_index))]
    async fn run(&self) {
        info!("Consumer started, waiting for jobs");

        loop {
            if self.shutdown_flag.load(Ordering::Relaxed) {
                info!("Shutdown requested, stopping consumer");
                break;
            }

            match self.queue.claim().await {
                Ok(Some(job)) => {
                    self.process_job(job).await;
                }
                Ok(None) => {
                    self.idle(self.poll_interval).await;
                }
                Err(e) => {
                    // Connection loss is not fatal to the pool; keep
                    // polling until the store comes back.
                    error!(error = %e, "Failed to claim job, retrying");
                    self.idle(self.poll_interval).await;
                }
            }
        }

        info!("Consumer stopped gracefully");
    }

    async fn idle(&self, duration: Duration) {
        tokio::select! {
            _ = tokio::time::sleep(duration) => {}
            _ = self.shutdown_notify.notified() => {}
        }
    }

    #[instrument(skip(self, job), fields(job_id = job.id, city = %job.data.city))]
    async fn process_job(&self, job: JobInstance) {
        debug!("Processing job");

        let state = self.pipeline.run(&job.data).await;

        match (&state.error, &state.result) {
            (None, Some(result)) => {
                if let Err(e) = self.queue.complete(job.id, result).await {
                    error!(error = %e, "Failed to record job completion");
                }
                self.events.on_completed(job.id, result).await;
            }
            _ => {
                let error = state
                    .error
                    .unwrap_or_else(|| "pipeline produced no result".to_string());
                if let Err(e) = self.queue.fail(job.id, &error).await {
                    error!(error = %e, "Failed to record job failure");
                }
                self.events.on_failed(job.id, &error).await;
            }
        }
    }
}
