// Scheduling module: rule CRUD and cron materialization

pub mod engine;
pub mod manager;

pub use engine::{Scheduler, SchedulerEngine, SchedulerEngineConfig};
pub use manager::{derive_scheduler_key, validate_job_data, ScheduleManager};
