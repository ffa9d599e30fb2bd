use std::sync::Arc;

use common::config::Settings;
use common::queue::JobQueue;
use common::scheduler::ScheduleManager;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<ScheduleManager>,
    pub queue: Arc<dyn JobQueue>,
    pub config: Arc<Settings>,
}

impl AppState {
    /// Create a new AppState instance
    pub fn new(manager: Arc<ScheduleManager>, queue: Arc<dyn JobQueue>, config: Settings) -> Self {
        Self {
            manager,
            queue,
            config: Arc::new(config),
        }
    }
}
