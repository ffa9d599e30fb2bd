// Scheduler engine: materializes due recurring rules into queue jobs

use crate::errors::QueueError;
use crate::queue::JobQueue;
use crate::schedule;
use chrono::Utc;
use chrono_tz::Tz;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, sleep};
use tracing::{debug, error, info, instrument, warn};

/// Configuration for the scheduler engine
#[derive(Debug, Clone)]
pub struct SchedulerEngineConfig {
    /// How often to scan the rule set (in seconds)
    pub poll_interval_seconds: u64,
    /// Timezone in which cron expressions are evaluated
    pub timezone: Tz,
}

impl Default for SchedulerEngineConfig {
    fn default() -> Self {
        Self {
            poll_interval_seconds: 10,
            timezone: chrono_tz::UTC,
        }
    }
}

/// Scheduler trait for the materialization loop
#[async_trait::async_trait]
pub trait Scheduler: Send + Sync {
    /// Start the polling loop; returns once shutdown is requested
    async fn start(&self) -> Result<(), QueueError>;

    /// Stop the scheduler gracefully
    async fn stop(&self);

    /// One scan: promote delayed jobs, then enqueue every due rule.
    /// Returns how many jobs were materialized.
    async fn materialize_due(&self) -> Result<usize, QueueError>;
}

/// Main scheduler engine implementation.
///
/// A slow job never blocks the next trigger: materialization only appends
/// to the queue, so overlapping executions of one rule are possible and
/// run independently.
pub struct SchedulerEngine {
    config: SchedulerEngineConfig,
    queue: Arc<dyn JobQueue>,
    shutdown_tx: tokio::sync::broadcast::Sender<()>,
}

impl SchedulerEngine {
    pub fn new(config: SchedulerEngineConfig, queue: Arc<dyn JobQueue>) -> Self {
        let (shutdown_tx, _shutdown_rx) = tokio::sync::broadcast::channel(1);

        Self {
            config,
            queue,
            shutdown_tx,
        }
    }

    /// Get a shutdown signal receiver
    pub fn shutdown_receiver(&self) -> tokio::sync::broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }
}

#[async_trait::async_trait]
impl Scheduler for SchedulerEngine {
    #[instrument(skip(self))]
    async fn start(&self) -> Result<(), QueueError> {
        info!(
            poll_interval_seconds = self.config.poll_interval_seconds,
            timezone = %self.config.timezone,
            "Starting scheduler engine"
        );

        let mut poll_interval = interval(Duration::from_secs(self.config.poll_interval_seconds));
        let mut shutdown_rx = self.shutdown_receiver();

        loop {
            tokio::select! {
                _ = poll_interval.tick() => {
                    match self.materialize_due().await {
                        Ok(count) => {
                            if count > 0 {
                                info!(jobs_materialized = count, "Materialized due jobs");
                            } else {
                                debug!("No rules due");
                            }
                        }
                        Err(e) => {
                            // Store unavailability is transient; keep polling.
                            error!(error = %e, "Error materializing due jobs");
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received, stopping scheduler");
                    break;
                }
            }
        }

        info!("Scheduler engine stopped");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn stop(&self) {
        info!("Stopping scheduler engine");

        let _ = self.shutdown_tx.send(());

        // Give in-flight materialization a moment to finish
        sleep(Duration::from_millis(200)).await;

        info!("Scheduler engine stopped gracefully");
    }

    #[instrument(skip(self))]
    async fn materialize_due(&self) -> Result<usize, QueueError> {
        // Delayed jobs whose run-at has passed become claimable first, so
        // an ad-hoc delayed send is never starved by rule scanning.
        if let Err(e) = self.queue.promote_due().await {
            warn!(error = %e, "Failed to promote delayed jobs");
        }

        let definitions = self.queue.list_schedulers().await?;
        let now = Utc::now();

        let mut materialized = 0;

        for mut definition in definitions {
            if definition.next_run_at > now {
                continue;
            }

            // Enqueue before advancing the rule: a crash in between yields
            // a duplicate on the next scan, never a lost trigger.
            match self.queue.enqueue(definition.payload.clone()).await {
                Ok(job) => {
                    info!(
                        scheduler_key = %definition.scheduler_key,
                        job_id = job.id,
                        "Rule trigger materialized"
                    );
                    materialized += 1;
                }
                Err(e) => {
                    error!(
                        scheduler_key = %definition.scheduler_key,
                        error = %e,
                        "Failed to enqueue job for rule, will retry next scan"
                    );
                    continue;
                }
            }

            let next_run_at =
                match schedule::next_occurrence(&definition.cron_pattern, self.config.timezone, now)
                {
                    Ok(at) => at,
                    Err(e) => {
                        // An unreadable pattern should never loop forever;
                        // drop the rule and say so loudly.
                        error!(
                            scheduler_key = %definition.scheduler_key,
                            error = %e,
                            "Rule has an unusable cron pattern, removing it"
                        );
                        let _ = self
                            .queue
                            .remove_scheduler(&definition.scheduler_key)
                            .await;
                        continue;
                    }
                };

            definition.next_run_at = next_run_at;
            self.queue.upsert_scheduler(&definition).await?;
        }

        Ok(materialized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EmailJobData, JobState, ScheduleDefinition};
    use crate::queue::InMemoryJobQueue;
    use chrono::Duration as ChronoDuration;

    fn rule(key: &str, pattern: &str, due: bool) -> ScheduleDefinition {
        let offset = if due {
            ChronoDuration::seconds(-5)
        } else {
            ChronoDuration::hours(1)
        };
        ScheduleDefinition {
            scheduler_key: key.to_string(),
            cron_pattern: pattern.to_string(),
            payload: EmailJobData {
                city: "London".to_string(),
                recipient_email: "a@b.com".to_string(),
            },
            next_run_at: Utc::now() + offset,
        }
    }

    fn engine(queue: Arc<InMemoryJobQueue>) -> SchedulerEngine {
        SchedulerEngine::new(SchedulerEngineConfig::default(), queue)
    }

    #[tokio::test]
    async fn test_due_rule_materializes_one_job_and_advances() {
        let queue = Arc::new(InMemoryJobQueue::new());
        queue
            .upsert_scheduler(&rule("london:a@b.com", "* * * * *", true))
            .await
            .unwrap();

        let engine = engine(queue.clone());
        let count = engine.materialize_due().await.unwrap();
        assert_eq!(count, 1);

        let (waiting, _) = queue.pending_counts().await.unwrap();
        assert_eq!(waiting, 1);

        let rules = queue.list_schedulers().await.unwrap();
        assert!(rules[0].next_run_at > Utc::now());

        // Advanced rule is no longer due on the next scan.
        assert_eq!(engine.materialize_due().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_not_due_rule_is_untouched() {
        let queue = Arc::new(InMemoryJobQueue::new());
        queue
            .upsert_scheduler(&rule("london:a@b.com", "* * * * *", false))
            .await
            .unwrap();

        let engine = engine(queue.clone());
        assert_eq!(engine.materialize_due().await.unwrap(), 0);
        assert_eq!(queue.pending_counts().await.unwrap(), (0, 0));
    }

    #[tokio::test]
    async fn test_unusable_pattern_is_dropped_after_firing() {
        let queue = Arc::new(InMemoryJobQueue::new());
        // A rule whose pattern no longer parses (e.g. written by an older
        // deployment) fires once and is then removed.
        queue
            .upsert_scheduler(&rule("broken", "not a cron", true))
            .await
            .unwrap();

        let engine = engine(queue.clone());
        assert_eq!(engine.materialize_due().await.unwrap(), 1);
        assert!(queue.list_schedulers().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_materialize_promotes_delayed_jobs() {
        let queue = Arc::new(InMemoryJobQueue::new());
        queue
            .enqueue_delayed(
                EmailJobData {
                    city: "Hanoi".to_string(),
                    recipient_email: "x@y.vn".to_string(),
                },
                Utc::now() - ChronoDuration::seconds(1),
            )
            .await
            .unwrap();

        let engine = engine(queue.clone());
        engine.materialize_due().await.unwrap();

        let job = queue.claim().await.unwrap().unwrap();
        assert_eq!(job.state, JobState::Active);
        assert_eq!(job.data.city, "Hanoi");
    }

    #[tokio::test]
    async fn test_overlapping_triggers_enqueue_independent_jobs() {
        let queue = Arc::new(InMemoryJobQueue::new());
        queue
            .upsert_scheduler(&rule("london:a@b.com", "* * * * *", true))
            .await
            .unwrap();

        let engine = engine(queue.clone());
        engine.materialize_due().await.unwrap();

        // Force the rule due again without the first job being claimed.
        let mut def = queue.list_schedulers().await.unwrap().remove(0);
        def.next_run_at = Utc::now() - ChronoDuration::seconds(1);
        queue.upsert_scheduler(&def).await.unwrap();
        engine.materialize_due().await.unwrap();

        let (waiting, _) = queue.pending_counts().await.unwrap();
        assert_eq!(waiting, 2);

        let a = queue.claim().await.unwrap().unwrap();
        let b = queue.claim().await.unwrap().unwrap();
        assert_ne!(a.id, b.id);
    }
}
