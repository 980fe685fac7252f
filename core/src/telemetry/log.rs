use log::{debug, info, warn};
use std::time::Instant;

/// Component-scoped logger used by every pipeline stage.
#[derive(Debug, Clone, Copy)]
pub struct LogManager {
    component: &'static str,
}

impl LogManager {
    pub fn new(component: &'static str) -> Self {
        Self { component }
    }

    pub fn record(&self, message: &str) {
        info!("[{}] {}", self.component, message);
    }

    pub fn detail(&self, message: &str) {
        debug!("[{}] {}", self.component, message);
    }

    pub fn warn(&self, message: &str) {
        warn!("[{}] {}", self.component, message);
    }

    /// Runs `work` and records how long it took alongside `label`.
    pub fn timed<T>(&self, label: &str, work: impl FnOnce() -> T) -> T {
        let started = Instant::now();
        let output = work();
        info!(
            "[{}] {} [execution time: {:?}]",
            self.component,
            label,
            started.elapsed()
        );
        output
    }
}

impl Default for LogManager {
    fn default() -> Self {
        Self::new("tracking")
    }
}
