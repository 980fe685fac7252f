use serde::{Deserialize, Serialize};

/// Pixel adjacency used when grouping foreground pixels into regions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Connectivity {
    Four,
    #[default]
    Eight,
}

/// How detections in a new frame are assigned to open trajectories.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MatchingStrategy {
    /// Nearest available detection, trajectories visited in ascending id.
    #[default]
    Greedy,
    /// Minimum total distance one-to-one assignment per frame.
    Optimal,
}

/// Run-scoped configuration shared by every stage of one analysis.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Frames per second of the recording.
    pub framerate: f64,
    /// Micrometers covered by one pixel.
    pub pixel_to_micron: f64,
    pub temperature_celsius: f64,
    /// Dynamic viscosity of the medium in mPa·s.
    pub viscosity_mpa_s: f64,
    /// Largest accepted displacement between two linked positions, in pixels.
    pub max_distance: f64,
    /// Pixels at or above this value are foreground.
    pub threshold: u8,
    /// Regions smaller than this many pixels are treated as noise.
    pub min_area: usize,
    pub connectivity: Connectivity,
    pub matching: MatchingStrategy,
    /// Start new trajectories from detections no open trajectory claimed.
    pub seed_unmatched: bool,
    /// Number of leading MSD lags used to fit the diffusion coefficient.
    pub fit_lags: usize,
    pub estimate_avogadro: bool,
    /// Reference particle radius in meters for the Avogadro estimate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub known_radius_m: Option<f64>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            framerate: 10.0,
            pixel_to_micron: 1.0,
            temperature_celsius: 25.0,
            viscosity_mpa_s: 0.89,
            max_distance: 50.0,
            threshold: 200,
            min_area: 1,
            connectivity: Connectivity::Eight,
            matching: MatchingStrategy::Greedy,
            seed_unmatched: true,
            fit_lags: 10,
            estimate_avogadro: true,
            known_radius_m: None,
        }
    }
}

impl AnalysisConfig {
    /// Rejects configurations that would make any stage produce nonphysical output.
    pub fn validate(&self) -> TrackingResult<()> {
        require_positive("framerate", self.framerate)?;
        require_positive("pixel_to_micron", self.pixel_to_micron)?;
        require_positive("viscosity_mpa_s", self.viscosity_mpa_s)?;
        require_positive("max_distance", self.max_distance)?;

        let kelvin = crate::analysis::physics::celsius_to_kelvin(self.temperature_celsius);
        if !kelvin.is_finite() || kelvin <= 0.0 {
            return Err(TrackingError::InvalidConfig(format!(
                "temperature {} °C is below absolute zero",
                self.temperature_celsius
            )));
        }
        if self.min_area == 0 {
            return Err(TrackingError::InvalidConfig(
                "min_area must be at least 1 pixel".into(),
            ));
        }
        if self.fit_lags < 2 {
            return Err(TrackingError::InvalidConfig(
                "fit_lags must cover at least 2 lags".into(),
            ));
        }
        if let Some(radius) = self.known_radius_m {
            require_positive("known_radius_m", radius)?;
        }
        Ok(())
    }

    /// Viscosity converted to Pa·s.
    pub fn viscosity_pa_s(&self) -> f64 {
        self.viscosity_mpa_s * 1e-3
    }
}

pub(crate) fn require_positive(name: &str, value: f64) -> TrackingResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(TrackingError::InvalidConfig(format!(
            "{} must be a positive number, got {}",
            name, value
        )))
    }
}

/// Failures of the diffusion fit and the estimators built on it.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum EstimationError {
    #[error("insufficient MSD data: {usable} usable lags, {required} required")]
    InsufficientData { usable: usize, required: usize },
    #[error("non-positive diffusion coefficient {0}")]
    NonPositiveDiffusion(f64),
    #[error("invalid particle radius {0}")]
    InvalidRadius(f64),
    #[error("invalid physical conditions: {0}")]
    InvalidConditions(String),
}

/// Common error type for the tracking pipeline.
#[derive(thiserror::Error, Debug)]
pub enum TrackingError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("estimation failed: {0}")]
    Estimation(#[from] EstimationError),
}

pub type TrackingResult<T> = Result<T, TrackingError>;
