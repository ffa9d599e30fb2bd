// Worker module: concurrent consumers driving the email pipeline

pub mod events;
pub mod pool;

pub use events::{JobEventHook, LoggingEventHook};
pub use pool::{WorkerPool, WorkerPoolConfig};
