// Common library for shared code across scheduler, worker, and API

pub mod config;
pub mod errors;
pub mod mailer;
pub mod models;
pub mod pipeline;
pub mod queue;
pub mod schedule;
pub mod scheduler;
pub mod weather;
pub mod worker;
