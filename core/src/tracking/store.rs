use serde::{Deserialize, Serialize};

use crate::detection::Position;
use crate::prelude::{TrackingError, TrackingResult};

/// A trajectory sample: where the particle was in a given frame.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TrackPoint {
    pub frame_index: usize,
    pub position: Position,
}

/// Append-only position history of one particle.
///
/// Frame indices are strictly increasing; gaps mark frames in which no
/// detection was close enough to extend the trajectory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Trajectory {
    id: usize,
    positions: Vec<TrackPoint>,
}

impl Trajectory {
    pub(crate) fn start(id: usize, frame_index: usize, position: Position) -> Self {
        Self {
            id,
            positions: vec![TrackPoint {
                frame_index,
                position,
            }],
        }
    }

    pub(crate) fn extend(&mut self, frame_index: usize, position: Position) -> TrackingResult<()> {
        if frame_index <= self.last_frame() {
            return Err(TrackingError::InvalidInput(format!(
                "trajectory {} cannot take frame {} after frame {}",
                self.id,
                frame_index,
                self.last_frame()
            )));
        }
        self.positions.push(TrackPoint {
            frame_index,
            position,
        });
        Ok(())
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn positions(&self) -> &[TrackPoint] {
        &self.positions
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Always false for trajectories built by the linker.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn first_frame(&self) -> usize {
        self.positions.first().map_or(0, |point| point.frame_index)
    }

    pub fn last_frame(&self) -> usize {
        self.positions.last().map_or(0, |point| point.frame_index)
    }

    pub fn last_position(&self) -> Option<Position> {
        self.positions.last().map(|point| point.position)
    }

    pub fn position_at(&self, frame_index: usize) -> Option<Position> {
        self.positions
            .binary_search_by_key(&frame_index, |point| point.frame_index)
            .ok()
            .map(|idx| self.positions[idx].position)
    }
}

/// Read-only collection of trajectories produced by one linking run.
///
/// Trajectory ids are dense and equal to their index in the store.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct TrajectoryStore {
    trajectories: Vec<Trajectory>,
}

impl TrajectoryStore {
    pub(crate) fn new(trajectories: Vec<Trajectory>) -> Self {
        Self { trajectories }
    }

    /// Builds a store from externally supplied `(frame_index, position)` sequences.
    pub fn from_positions(tracks: Vec<Vec<(usize, Position)>>) -> TrackingResult<Self> {
        let mut trajectories = Vec::with_capacity(tracks.len());
        for (id, track) in tracks.into_iter().enumerate() {
            let mut points = track.into_iter();
            let Some((frame_index, position)) = points.next() else {
                return Err(TrackingError::InvalidInput(format!(
                    "trajectory {} has no positions",
                    id
                )));
            };
            let mut trajectory = Trajectory::start(id, frame_index, position);
            for (frame_index, position) in points {
                trajectory.extend(frame_index, position)?;
            }
            trajectories.push(trajectory);
        }
        Ok(Self { trajectories })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Trajectory> {
        self.trajectories.iter()
    }

    pub fn get(&self, id: usize) -> Option<&Trajectory> {
        self.trajectories.get(id)
    }

    pub fn len(&self) -> usize {
        self.trajectories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trajectories.is_empty()
    }

    pub fn longest_len(&self) -> usize {
        self.trajectories.iter().map(Trajectory::len).max().unwrap_or(0)
    }

    /// Distances in micrometers between consecutive samples of each trajectory.
    pub fn step_lengths(&self, pixel_to_micron: f64) -> Vec<Vec<f64>> {
        self.trajectories
            .iter()
            .map(|trajectory| {
                trajectory
                    .positions
                    .windows(2)
                    .map(|pair| pair[0].position.distance(&pair[1].position) * pixel_to_micron)
                    .collect()
            })
            .collect()
    }
}

impl<'a> IntoIterator for &'a TrajectoryStore {
    type Item = &'a Trajectory;
    type IntoIter = std::slice::Iter<'a, Trajectory>;

    fn into_iter(self) -> Self::IntoIter {
        self.trajectories.iter()
    }
}
