// Queue module: recurring rules and pending jobs on a durable store

pub mod job_queue;
pub mod memory;
pub mod redis;

pub use job_queue::{JobQueue, RedisJobQueue};
pub use memory::InMemoryJobQueue;
pub use redis::RedisPool;
