//! Brownian-motion particle tracking core.
//!
//! Frames flow through detection, trajectory linking, and the MSD and
//! Stokes–Einstein estimators. Every stage only reads the output of the one
//! before it.

pub mod analysis;
pub mod detection;
pub mod math;
pub mod pipeline;
pub mod prelude;
pub mod telemetry;
pub mod tracking;

pub use pipeline::{analyze, AnalysisReport};
pub use prelude::{AnalysisConfig, EstimationError, TrackingError, TrackingResult};
