use ndarray::Array2;

use crate::analysis::{compute_msd, estimate, MsdSeries, PhysicalEstimate};
use crate::detection::detect_frames;
use crate::prelude::{AnalysisConfig, EstimationError, TrackingError, TrackingResult};
use crate::telemetry::{LogManager, MetricsSnapshot};
use crate::tracking::{TrajectoryLinker, TrajectoryStore};

/// Everything one run over a frame stack produces.
///
/// Estimation failures are kept separately so detection and linking output
/// stays usable when the data cannot support a diffusion fit.
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub frame_count: usize,
    /// `(rows, columns)` of every frame in the stack.
    pub frame_shape: (usize, usize),
    pub trajectories: TrajectoryStore,
    pub msd: MsdSeries,
    pub metrics: MetricsSnapshot,
    pub estimate: Result<PhysicalEstimate, EstimationError>,
}

/// Detects, links and measures particles across a complete frame stack.
pub fn analyze(frames: &[Array2<u8>], config: &AnalysisConfig) -> TrackingResult<AnalysisReport> {
    config.validate()?;
    let first = frames
        .first()
        .ok_or_else(|| TrackingError::InvalidInput("frame stack is empty".into()))?;
    let frame_shape = first.dim();
    if let Some((idx, frame)) = frames
        .iter()
        .enumerate()
        .find(|(_, frame)| frame.dim() != frame_shape)
    {
        return Err(TrackingError::InvalidInput(format!(
            "frame {} has shape {:?}, expected {:?}",
            idx,
            frame.dim(),
            frame_shape
        )));
    }

    let logger = LogManager::new("pipeline");
    logger.record(&format!(
        "tracking {} frames of {}x{} px (max distance {} px, {:?} matching)",
        frames.len(),
        frame_shape.1,
        frame_shape.0,
        config.max_distance,
        config.matching
    ));

    let detections = logger.timed("calculated particle coordinates", || {
        detect_frames(frames, config)
    });
    let most = detections.iter().map(Vec::len).max().unwrap_or(0);
    logger.record(&format!("maximal particle number in one frame is {}", most));

    let mut linker = TrajectoryLinker::new(config)?;
    logger.timed("linked particle trajectories", || -> TrackingResult<()> {
        for (frame_index, frame_detections) in detections.iter().enumerate() {
            linker.push_frame(frame_index, frame_detections)?;
        }
        Ok(())
    })?;
    let metrics = linker.metrics();
    let trajectories = linker.finish();
    logger.detail(&format!(
        "{} trajectories, longest spans {} samples",
        trajectories.len(),
        trajectories.longest_len()
    ));

    let msd = logger.timed("computed mean squared displacement", || {
        compute_msd(&trajectories, config.framerate, config.pixel_to_micron)
    })?;

    let estimate = estimate(&msd, config);
    match &estimate {
        Ok(result) => {
            logger.record(&format!(
                "mean particle radius {:.4} µm (D = {:.4} µm²/s over {} lags)",
                result.radius_m * 1e6,
                result.diffusion.coefficient_um2_per_s,
                result.diffusion.lags_used
            ));
            if let Some(avogadro) = result.avogadro_estimate {
                logger.record(&format!("Avogadro's number (approximation) {:.4e} mol⁻¹", avogadro));
            }
        }
        Err(err) => logger.warn(&format!("physical estimate unavailable: {}", err)),
    }

    Ok(AnalysisReport {
        frame_count: frames.len(),
        frame_shape,
        trajectories,
        msd,
        metrics,
        estimate,
    })
}
