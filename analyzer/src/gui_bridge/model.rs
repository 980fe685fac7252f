use browniancore::analysis::{MsdSeries, PhysicalEstimate};
use browniancore::telemetry::MetricsSnapshot;
use browniancore::tracking::TrajectoryStore;
use serde::{Deserialize, Serialize};

use crate::workflow::runner::WorkflowResult;

/// Serializable view of one analysis run, consumed by plotting and animation tools.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AnalysisModel {
    pub frame_count: usize,
    pub frame_shape: (usize, usize),
    pub trajectories: TrajectoryStore,
    pub step_lengths_um: Vec<Vec<f64>>,
    pub msd: MsdSeries,
    pub metrics: MetricsSnapshot,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimate: Option<PhysicalEstimate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimate_error: Option<String>,
}

impl AnalysisModel {
    pub fn from_result(result: &WorkflowResult) -> Self {
        let report = &result.report;
        let (estimate, estimate_error) = match &report.estimate {
            Ok(estimate) => (Some(*estimate), None),
            Err(err) => (None, Some(err.to_string())),
        };

        Self {
            frame_count: report.frame_count,
            frame_shape: report.frame_shape,
            trajectories: report.trajectories.clone(),
            step_lengths_um: result.step_lengths_um.clone(),
            msd: report.msd.clone(),
            metrics: report.metrics,
            estimate,
            estimate_error,
        }
    }
}
