// Schedule management: CRUD over recurring rules, built on queue primitives

use crate::errors::{QueueError, SchedulerError, ValidationError};
use crate::models::{EmailJobData, ScheduleDefinition, DEFAULT_CRON_PATTERN};
use crate::queue::JobQueue;
use crate::schedule;
use chrono::Utc;
use chrono_tz::Tz;
use regex::Regex;
use std::sync::{Arc, OnceLock};
use tracing::{info, instrument, warn};

fn email_regex() -> &'static Regex {
    static EMAIL_RE: OnceLock<Regex> = OnceLock::new();
    EMAIL_RE.get_or_init(|| {
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex is valid")
    })
}

/// Derive the rule key for a (city, recipient) pair.
///
/// Keys are normalized so "London"/"london " address the same rule:
/// lowercased, trimmed, inner whitespace collapsed to `-`. Distinct pairs
/// get distinct rules, so several recipients and cities can coexist.
pub fn derive_scheduler_key(city: &str, recipient_email: &str) -> String {
    let city = city
        .trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-");
    let email = recipient_email.trim().to_lowercase();
    format!("{}:{}", city, email)
}

/// Validate and normalize a job payload before it reaches the queue.
pub fn validate_job_data(
    city: &str,
    recipient_email: &str,
) -> Result<EmailJobData, ValidationError> {
    let city = city.trim();
    if city.is_empty() {
        return Err(ValidationError::MissingField("city".to_string()));
    }

    let recipient_email = recipient_email.trim();
    if recipient_email.is_empty() {
        return Err(ValidationError::MissingField("recipientEmail".to_string()));
    }
    if !email_regex().is_match(recipient_email) {
        return Err(ValidationError::InvalidFieldValue {
            field: "recipientEmail".to_string(),
            reason: "not a well-formed email address".to_string(),
        });
    }

    Ok(EmailJobData {
        city: city.to_string(),
        recipient_email: recipient_email.to_string(),
    })
}

/// CRUD over recurring schedule definitions.
///
/// Validation happens before any queue call, so invalid input can never
/// leave partial state behind.
pub struct ScheduleManager {
    queue: Arc<dyn JobQueue>,
    timezone: Tz,
}

impl ScheduleManager {
    pub fn new(queue: Arc<dyn JobQueue>, timezone: Tz) -> Self {
        Self { queue, timezone }
    }

    /// Install or replace the recurring rule for a (city, recipient) pair.
    #[instrument(skip(self), fields(city = %city, recipient = %recipient_email))]
    pub async fn create(
        &self,
        city: &str,
        recipient_email: &str,
        pattern: Option<&str>,
    ) -> Result<ScheduleDefinition, SchedulerError> {
        let payload = validate_job_data(city, recipient_email)?;

        let pattern = pattern.unwrap_or(DEFAULT_CRON_PATTERN);
        schedule::parse_cron_pattern(pattern)?;

        let next_run_at = schedule::next_occurrence(pattern, self.timezone, Utc::now())?;

        let definition = ScheduleDefinition {
            scheduler_key: derive_scheduler_key(&payload.city, &payload.recipient_email),
            cron_pattern: pattern.to_string(),
            payload,
            next_run_at,
        };

        self.queue.upsert_scheduler(&definition).await?;

        info!(
            scheduler_key = %definition.scheduler_key,
            pattern = %definition.cron_pattern,
            next_run_at = %definition.next_run_at,
            "Schedule installed"
        );
        Ok(definition)
    }

    /// Remove one rule by key. `false` means the key was unknown.
    #[instrument(skip(self))]
    pub async fn remove(&self, scheduler_key: &str) -> Result<bool, QueueError> {
        let removed = self.queue.remove_scheduler(scheduler_key).await?;
        if removed {
            info!("Schedule removed");
        } else {
            info!("No schedule found for key");
        }
        Ok(removed)
    }

    /// Enumerate the currently active rules.
    pub async fn list(&self) -> Result<Vec<ScheduleDefinition>, QueueError> {
        self.queue.list_schedulers().await
    }

    /// Remove every rule, then discard all pending jobs once.
    ///
    /// Individual removal failures are skipped and the rest of the rules
    /// are still attempted; the returned count holds only rules actually
    /// removed.
    #[instrument(skip(self))]
    pub async fn remove_all(&self) -> Result<usize, QueueError> {
        let definitions = self.queue.list_schedulers().await?;

        let mut removed = 0;
        for definition in &definitions {
            match self.queue.remove_scheduler(&definition.scheduler_key).await {
                Ok(true) => removed += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!(
                        scheduler_key = %definition.scheduler_key,
                        error = %e,
                        "Failed to remove rule, continuing"
                    );
                }
            }
        }

        self.queue.drain().await?;

        info!(schedulers_removed = removed, "All schedules removed and queue drained");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SchedulerError;
    use crate::queue::InMemoryJobQueue;

    fn manager() -> (ScheduleManager, Arc<InMemoryJobQueue>) {
        let queue = Arc::new(InMemoryJobQueue::new());
        (
            ScheduleManager::new(queue.clone(), chrono_tz::UTC),
            queue,
        )
    }

    #[test]
    fn test_key_derivation_is_normalized() {
        assert_eq!(
            derive_scheduler_key("London", "A@B.com"),
            "london:a@b.com"
        );
        assert_eq!(
            derive_scheduler_key("  Ho Chi Minh City ", "x@y.vn"),
            "ho-chi-minh-city:x@y.vn"
        );
        assert_eq!(
            derive_scheduler_key("London", "a@b.com"),
            derive_scheduler_key("LONDON ", " a@b.com ")
        );
    }

    #[tokio::test]
    async fn test_create_installs_rule_with_default_pattern() {
        let (manager, _queue) = manager();
        let def = manager.create("London", "a@b.com", None).await.unwrap();

        assert_eq!(def.scheduler_key, "london:a@b.com");
        assert_eq!(def.cron_pattern, DEFAULT_CRON_PATTERN);
        assert_eq!(def.payload.city, "London");
        assert!(def.next_run_at > Utc::now() - chrono::Duration::seconds(1));

        let listed = manager.list().await.unwrap();
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test]
    async fn test_create_twice_same_pair_yields_one_rule() {
        let (manager, _queue) = manager();
        manager.create("London", "a@b.com", None).await.unwrap();
        manager
            .create("London", "a@b.com", Some("*/5 * * * *"))
            .await
            .unwrap();

        let listed = manager.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].cron_pattern, "*/5 * * * *");
    }

    #[tokio::test]
    async fn test_create_distinct_pairs_coexist() {
        let (manager, _queue) = manager();
        manager.create("London", "a@b.com", None).await.unwrap();
        manager.create("Hanoi", "a@b.com", None).await.unwrap();
        manager.create("London", "c@d.com", None).await.unwrap();

        assert_eq!(manager.list().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_create_rejects_before_any_queue_call() {
        let (manager, queue) = manager();

        let cases = [
            ("", "a@b.com", None),
            ("London", "", None),
            ("London", "not-an-email", None),
            ("London", "a@b.com", Some("not a cron")),
            ("London", "a@b.com", Some("0 0 17 * * *")),
        ];
        for (city, email, pattern) in cases {
            let err = manager.create(city, email, pattern).await.unwrap_err();
            assert!(err.is_rejected_input(), "expected rejection for {:?}", (city, email, pattern));
        }

        assert!(queue.upsert_calls() == 0);
        assert!(manager.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_unknown_key_is_false_not_error() {
        let (manager, _queue) = manager();
        assert!(!manager.remove("nobody:nowhere@x.com").await.unwrap());
    }

    #[tokio::test]
    async fn test_remove_all_counts_and_drains() {
        let (manager, queue) = manager();
        manager.create("London", "a@b.com", None).await.unwrap();
        manager.create("Hanoi", "b@c.com", None).await.unwrap();
        queue
            .enqueue(EmailJobData {
                city: "London".to_string(),
                recipient_email: "a@b.com".to_string(),
            })
            .await
            .unwrap();

        let removed = manager.remove_all().await.unwrap();
        assert_eq!(removed, 2);
        assert!(manager.list().await.unwrap().is_empty());
        assert_eq!(queue.pending_counts().await.unwrap(), (0, 0));
    }

    #[tokio::test]
    async fn test_queue_failure_is_not_misreported_as_invalid_input() {
        let (manager, queue) = manager();
        queue.fail_next_operation();

        let err = manager.create("London", "a@b.com", None).await.unwrap_err();
        assert!(matches!(err, SchedulerError::Queue(_)));
        assert!(!err.is_rejected_input());
    }
}
