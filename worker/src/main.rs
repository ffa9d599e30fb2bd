// Worker binary entry point

use anyhow::Result;
use common::config::Settings;
use common::mailer::{MailTransport, SmtpMailer};
use common::pipeline::EmailPipeline;
use common::queue::{RedisJobQueue, RedisPool};
use common::weather::{OpenWeatherClient, WeatherProvider};
use common::worker::{JobEventHook, LoggingEventHook, WorkerPool, WorkerPoolConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(true)
        .with_level(true)
        .json()
        .init();

    info!("Starting weather email worker");

    // Load configuration
    let settings = Settings::load().map_err(|e| {
        error!(error = %e, "Failed to load configuration");
        anyhow::anyhow!("Configuration error: {}", e)
    })?;
    settings.validate().map_err(|e| {
        error!(error = %e, "Invalid configuration");
        anyhow::anyhow!("Configuration error: {}", e)
    })?;

    info!("Configuration loaded successfully");

    // Initialize Redis connection pool
    let redis_pool = RedisPool::new(&settings.redis).await.map_err(|e| {
        error!(error = %e, "Failed to initialize Redis pool");
        anyhow::anyhow!("Redis initialization error: {}", e)
    })?;
    redis_pool.health_check().await.map_err(|e| {
        error!(error = %e, "Redis health check failed");
        anyhow::anyhow!("Redis health check error: {}", e)
    })?;

    info!("Redis connection pool initialized");

    // Create the job queue handle
    let queue = Arc::new(RedisJobQueue::new(
        redis_pool,
        settings.redis.key_prefix.clone(),
    ));

    // Initialize pipeline collaborators
    let provider: Arc<dyn WeatherProvider> =
        Arc::new(OpenWeatherClient::new(&settings.weather).map_err(|e| {
            error!(error = %e, "Failed to initialize weather client");
            anyhow::anyhow!("Weather client initialization error: {}", e)
        })?);
    let transport: Arc<dyn MailTransport> =
        Arc::new(SmtpMailer::new(&settings.smtp).map_err(|e| {
            error!(error = %e, "Failed to initialize SMTP mailer");
            anyhow::anyhow!("SMTP mailer initialization error: {}", e)
        })?);

    info!("Pipeline collaborators initialized");

    // Assemble the pipeline and the pool
    let pipeline = Arc::new(EmailPipeline::new(provider, transport));
    let events: Arc<dyn JobEventHook> = Arc::new(LoggingEventHook);

    let pool_config = WorkerPoolConfig {
        concurrency: settings.worker.concurrency,
        poll_interval: Duration::from_secs(settings.worker.poll_interval_seconds),
    };
    let pool = Arc::new(WorkerPool::new(pool_config, queue, pipeline, events));

    info!("Worker pool created, starting job processing");

    // Start the pool in a separate task
    let pool_for_run = pool.clone();
    let pool_handle = tokio::spawn(async move {
        pool_for_run.start().await;
    });

    // Wait for shutdown signal
    info!("Worker is running. Press Ctrl+C to shutdown gracefully");

    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Shutdown signal received, initiating graceful shutdown");
        }
        Err(e) => {
            error!(error = %e, "Failed to listen for shutdown signal");
        }
    }

    // Stop consumers and wait for in-flight jobs
    pool.shutdown();
    info!("Waiting for workers to complete in-flight jobs");
    let _ = pool_handle.await;

    info!("Worker shutdown complete");
    Ok(())
}
