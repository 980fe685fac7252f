use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// Counters gathered while detecting and linking one frame stack.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub frames: usize,
    pub detections: usize,
    pub trajectories_seeded: usize,
    pub links_accepted: usize,
    pub links_rejected: usize,
}

pub struct MetricsRecorder {
    inner: Mutex<MetricsSnapshot>,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MetricsSnapshot::default()),
        }
    }

    pub fn record_frame(&self, detections: usize) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.frames += 1;
            metrics.detections += detections;
        }
    }

    pub fn record_seeded(&self, count: usize) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.trajectories_seeded += count;
        }
    }

    pub fn record_links(&self, accepted: usize, rejected: usize) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.links_accepted += accepted;
            metrics.links_rejected += rejected;
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        if let Ok(metrics) = self.inner.lock() {
            *metrics
        } else {
            MetricsSnapshot::default()
        }
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}
