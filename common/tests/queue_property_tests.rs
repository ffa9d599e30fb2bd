// Property-based tests for queue semantics, exercised on the in-memory
// implementation (same observable behavior as the Redis queue)

use common::models::EmailJobData;
use common::queue::{InMemoryJobQueue, JobQueue};
use proptest::prelude::*;

fn data(i: usize) -> EmailJobData {
    EmailJobData {
        city: format!("City{}", i),
        recipient_email: format!("user{}@example.com", i),
    }
}

proptest! {
    // Every enqueued job is claimed exactly once, and ids never repeat.
    #[test]
    fn prop_each_job_claimed_exactly_once(count in 0usize..20) {
        let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        rt.block_on(async {
            let queue = InMemoryJobQueue::new();
            for i in 0..count {
                queue.enqueue(data(i)).await.unwrap();
            }

            let mut seen = std::collections::HashSet::new();
            while let Some(job) = queue.claim().await.unwrap() {
                prop_assert!(seen.insert(job.id), "job {} claimed twice", job.id);
            }
            prop_assert_eq!(seen.len(), count);
            Ok(())
        })?;
    }

    // Drain leaves no pending jobs behind, regardless of the mix of
    // waiting and delayed entries.
    #[test]
    fn prop_drain_clears_all_pending(waiting in 0usize..10, delayed in 0usize..10) {
        let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        rt.block_on(async {
            let queue = InMemoryJobQueue::new();
            for i in 0..waiting {
                queue.enqueue(data(i)).await.unwrap();
            }
            for i in 0..delayed {
                queue
                    .enqueue_delayed(data(100 + i), chrono::Utc::now() + chrono::Duration::hours(1))
                    .await
                    .unwrap();
            }

            queue.drain().await.unwrap();
            prop_assert_eq!(queue.pending_counts().await.unwrap(), (0, 0));
            prop_assert!(queue.claim().await.unwrap().is_none());
            Ok(())
        })?;
    }
}
