// Scheduler binary entry point

use common::config::Settings;
use common::queue::{RedisJobQueue, RedisPool};
use common::schedule::parse_timezone;
use common::scheduler::{Scheduler, SchedulerEngine, SchedulerEngineConfig};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize tracing/logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scheduler=info,common=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting weather email scheduler");

    // Load configuration
    let settings = Settings::load().map_err(|e| {
        error!(error = %e, "Failed to load configuration");
        e
    })?;
    settings.validate().map_err(|e| {
        error!(error = %e, "Invalid configuration");
        e
    })?;

    info!(
        redis_url = %settings.redis.url,
        poll_interval_seconds = settings.scheduler.poll_interval_seconds,
        "Configuration loaded"
    );

    // Initialize Redis connection pool
    info!("Initializing Redis connection pool");
    let redis_pool = RedisPool::new(&settings.redis).await.map_err(|e| {
        error!(error = %e, "Failed to initialize Redis pool");
        e
    })?;
    redis_pool.health_check().await.map_err(|e| {
        error!(error = %e, "Redis health check failed");
        e
    })?;
    info!("Redis connection pool initialized");

    // Create the job queue handle
    let queue = Arc::new(RedisJobQueue::new(
        redis_pool,
        settings.redis.key_prefix.clone(),
    ));

    // Create scheduler configuration
    let timezone = parse_timezone(&settings.scheduler.timezone)?;
    let scheduler_config = SchedulerEngineConfig {
        poll_interval_seconds: settings.scheduler.poll_interval_seconds,
        timezone,
    };

    // Create scheduler engine
    let scheduler = Arc::new(SchedulerEngine::new(scheduler_config, queue));
    info!("Scheduler engine created");

    // Set up graceful shutdown
    let scheduler_for_shutdown = scheduler.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to listen for Ctrl+C");
        info!("Received Ctrl+C signal, initiating graceful shutdown");
        scheduler_for_shutdown.stop().await;
    });

    // Start the materialization loop
    info!("Starting scheduler polling loop");
    if let Err(e) = scheduler.start().await {
        error!(error = %e, "Scheduler error");
        return Err(Box::new(e) as Box<dyn std::error::Error + Send + Sync>);
    }

    info!("Scheduler stopped");
    Ok(())
}
