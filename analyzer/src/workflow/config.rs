use anyhow::Context;
use browniancore::prelude::{AnalysisConfig, MatchingStrategy};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

fn default_max_distance() -> f64 {
    50.0
}

/// Measurement conditions of one recording plus optional tracking overrides.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WorkflowConfig {
    pub framerate: f64,
    /// Micrometers per pixel.
    pub ratio: f64,
    /// Sample temperature in °C.
    pub temperature: f64,
    /// Dynamic viscosity in mPa·s.
    pub viscosity: f64,
    #[serde(default = "default_max_distance")]
    pub max_distance: f64,
    #[serde(default)]
    pub matching: MatchingStrategy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_area: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fit_lags: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub known_radius_m: Option<f64>,
}

impl WorkflowConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading workflow config {}", path_ref.display()))?;
        let config: WorkflowConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing workflow config {}", path_ref.display()))?;
        Ok(config)
    }

    pub fn from_args(
        framerate: f64,
        ratio: f64,
        temperature: f64,
        viscosity: f64,
        max_distance: f64,
        matching: MatchingStrategy,
    ) -> Self {
        Self {
            framerate,
            ratio,
            temperature,
            viscosity,
            max_distance,
            matching,
            threshold: None,
            min_area: None,
            fit_lags: None,
            known_radius_m: None,
        }
    }

    pub fn to_analysis_config(&self) -> AnalysisConfig {
        let defaults = AnalysisConfig::default();
        AnalysisConfig {
            framerate: self.framerate,
            pixel_to_micron: self.ratio,
            temperature_celsius: self.temperature,
            viscosity_mpa_s: self.viscosity,
            max_distance: self.max_distance,
            matching: self.matching,
            threshold: self.threshold.unwrap_or(defaults.threshold),
            min_area: self.min_area.unwrap_or(defaults.min_area),
            fit_lags: self.fit_lags.unwrap_or(defaults.fit_lags),
            known_radius_m: self.known_radius_m,
            ..defaults
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn config_from_args_produces_analysis_config() {
        let cfg = WorkflowConfig::from_args(30.0, 0.32, 22.0, 1.0, 20.0, MatchingStrategy::Greedy);
        let analysis = cfg.to_analysis_config();
        assert_eq!(analysis.framerate, 30.0);
        assert_eq!(analysis.pixel_to_micron, 0.32);
        assert_eq!(analysis.max_distance, 20.0);
        assert_eq!(analysis.threshold, 200);
        assert!(analysis.validate().is_ok());
    }

    #[test]
    fn config_load_reads_yaml() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(
            b"framerate: 25\nratio: 0.5\ntemperature: 20\nviscosity: 1.002\nmatching: optimal\nmin_area: 4\n",
        )
        .unwrap();
        let path = temp.into_temp_path();
        let cfg = WorkflowConfig::load(&path).unwrap();
        assert_eq!(cfg.framerate, 25.0);
        assert_eq!(cfg.max_distance, 50.0);
        assert_eq!(cfg.matching, MatchingStrategy::Optimal);
        assert_eq!(cfg.to_analysis_config().min_area, 4);
    }

    #[test]
    fn config_load_reports_missing_fields() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(b"framerate: 25\n").unwrap();
        let path = temp.into_temp_path();
        let err = WorkflowConfig::load(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("parsing workflow config"));
    }
}
