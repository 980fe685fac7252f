use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::prelude::{require_positive, TrackingResult};
use crate::tracking::TrajectoryStore;

/// Averaged squared displacement for one time lag.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct MsdPoint {
    pub lag_frames: usize,
    pub lag_seconds: f64,
    /// Mean squared displacement in µm².
    pub msd_um2: f64,
    /// Number of displacement pairs averaged into `msd_um2`.
    pub samples: usize,
}

/// Mean squared displacement per lag, ordered by ascending lag.
///
/// Lags without any contributing displacement pair have no entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct MsdSeries {
    points: Vec<MsdPoint>,
}

impl MsdSeries {
    /// Wraps externally computed points; they are sorted by lag.
    pub fn from_points(mut points: Vec<MsdPoint>) -> Self {
        points.sort_by_key(|point| point.lag_frames);
        Self { points }
    }

    pub fn get(&self, lag_frames: usize) -> Option<&MsdPoint> {
        self.points
            .binary_search_by_key(&lag_frames, |point| point.lag_frames)
            .ok()
            .map(|idx| &self.points[idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = &MsdPoint> {
        self.points.iter()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Time-averaged MSD over every trajectory and every start offset.
///
/// Lags are measured in frames between the two samples, so trajectories with
/// gaps contribute only the pairs they actually observed. Single-sample
/// trajectories contribute nothing. `framerate` and `pixel_to_micron` must be
/// positive and finite.
pub fn compute_msd(
    store: &TrajectoryStore,
    framerate: f64,
    pixel_to_micron: f64,
) -> TrackingResult<MsdSeries> {
    require_positive("framerate", framerate)?;
    require_positive("pixel_to_micron", pixel_to_micron)?;
    let scale = pixel_to_micron * pixel_to_micron;
    let mut sums: BTreeMap<usize, (f64, usize)> = BTreeMap::new();

    for trajectory in store {
        let positions = trajectory.positions();
        for (start, origin) in positions.iter().enumerate() {
            for later in &positions[start + 1..] {
                let lag = later.frame_index - origin.frame_index;
                let squared = origin.position.distance_squared(&later.position) * scale;
                let entry = sums.entry(lag).or_insert((0.0, 0));
                entry.0 += squared;
                entry.1 += 1;
            }
        }
    }

    let points = sums
        .into_iter()
        .map(|(lag, (sum, samples))| MsdPoint {
            lag_frames: lag,
            lag_seconds: lag as f64 / framerate,
            msd_um2: sum / samples as f64,
            samples,
        })
        .collect();
    Ok(MsdSeries { points })
}
