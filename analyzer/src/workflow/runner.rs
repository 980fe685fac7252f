use crate::workflow::config::WorkflowConfig;
use anyhow::Context;
use browniancore::{analyze, AnalysisReport};
use ndarray::Array2;

#[derive(Debug)]
pub struct WorkflowResult {
    pub report: AnalysisReport,
    /// Frame-to-frame step lengths in µm, per trajectory.
    pub step_lengths_um: Vec<Vec<f64>>,
}

#[derive(Clone)]
pub struct Runner {
    config: WorkflowConfig,
}

impl Runner {
    pub fn new(config: WorkflowConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self, frames: &[Array2<u8>]) -> anyhow::Result<WorkflowResult> {
        let analysis_config = self.config.to_analysis_config();
        let report = analyze(frames, &analysis_config).context("running tracking pipeline")?;
        let step_lengths_um = report
            .trajectories
            .step_lengths(analysis_config.pixel_to_micron);

        Ok(WorkflowResult {
            report,
            step_lengths_um,
        })
    }
}
