// Operational helper: print the active rules and queue backlog.
//
// Usage: cargo run -p common --example inspect_queue

use common::config::Settings;
use common::queue::{JobQueue, RedisJobQueue, RedisPool};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = Settings::load()?;

    let pool = RedisPool::new(&settings.redis).await?;
    pool.health_check().await?;

    let queue = RedisJobQueue::new(pool, settings.redis.key_prefix.clone());

    let rules = queue.list_schedulers().await?;
    println!("Active rules: {}", rules.len());
    for rule in &rules {
        println!(
            "  {} pattern={:?} city={:?} recipient={:?} next_run_at={}",
            rule.scheduler_key,
            rule.cron_pattern,
            rule.payload.city,
            rule.payload.recipient_email,
            rule.next_run_at
        );
    }

    let (waiting, delayed) = queue.pending_counts().await?;
    println!("Backlog: waiting={} delayed={}", waiting, delayed);

    Ok(())
}
