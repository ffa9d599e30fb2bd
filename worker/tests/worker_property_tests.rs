// Property-based tests for the worker pool

use async_trait::async_trait;
use common::errors::{MailError, WeatherError};
use common::mailer::{MailTransport, SEND_CONFIRMATION};
use common::models::{EmailJobData, JobState, WeatherReport};
use common::pipeline::EmailPipeline;
use common::queue::{InMemoryJobQueue, JobQueue};
use common::weather::WeatherProvider;
use common::worker::{LoggingEventHook, WorkerPool, WorkerPoolConfig};
use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;

struct StubProvider {
    fail: bool,
}

#[async_trait]
impl WeatherProvider for StubProvider {
    async fn fetch(&self, _city: &str) -> Result<WeatherReport, WeatherError> {
        if self.fail {
            Err(WeatherError::RequestFailed("unreachable".to_string()))
        } else {
            Ok(WeatherReport {
                temperature: 20.0,
                feels_like: 19.0,
                description: "Clear".to_string(),
                humidity: 50,
                wind_speed: 3.0,
                icon: "01d".to_string(),
            })
        }
    }
}

struct StubTransport;

#[async_trait]
impl MailTransport for StubTransport {
    async fn send(&self, _to: &str, _subject: &str, _body: &str) -> Result<String, MailError> {
        Ok(SEND_CONFIRMATION.to_string())
    }
}

async fn run_pool_until_drained(queue: Arc<InMemoryJobQueue>, provider_fails: bool) {
    let pipeline = Arc::new(EmailPipeline::new(
        Arc::new(StubProvider {
            fail: provider_fails,
        }),
        Arc::new(StubTransport),
    ));
    let pool = WorkerPool::new(
        WorkerPoolConfig {
            concurrency: 3,
            poll_interval: Duration::from_millis(5),
        },
        queue.clone(),
        pipeline,
        Arc::new(LoggingEventHook),
    );

    let waiter = async {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            let (waiting, _) = queue.pending_counts().await.unwrap();
            if waiting == 0 && queue.active_count() == 0 {
                break;
            }
            assert!(tokio::time::Instant::now() < deadline, "pool did not drain");
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        pool.shutdown();
    };
    tokio::join!(pool.start(), waiter);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    // Every enqueued job ends in a terminal state with an outcome recorded,
    // no matter how many jobs or whether the pipeline succeeds.
    #[test]
    fn prop_every_job_reaches_terminal_state(count in 0usize..12, provider_fails: bool) {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let queue = Arc::new(InMemoryJobQueue::new());
            let mut ids = Vec::new();
            for i in 0..count {
                let job = queue
                    .enqueue(EmailJobData {
                        city: format!("City{}", i),
                        recipient_email: format!("user{}@example.com", i),
                    })
                    .await
                    .unwrap();
                ids.push(job.id);
            }

            run_pool_until_drained(queue.clone(), provider_fails).await;

            for id in ids {
                let job = queue.job(id).await.unwrap().unwrap();
                if provider_fails {
                    prop_assert_eq!(job.state, JobState::Failed);
                    prop_assert!(job.error.unwrap().starts_with("Failed to fetch weather:"));
                } else {
                    prop_assert_eq!(job.state, JobState::Completed);
                    prop_assert_eq!(job.result.as_deref(), Some(SEND_CONFIRMATION));
                }
            }
            Ok(())
        })?;
    }
}
