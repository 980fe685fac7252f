use ndarray::Array2;

use crate::detection::Detection;
use crate::prelude::{
    require_positive, AnalysisConfig, MatchingStrategy, TrackingError, TrackingResult,
};
use crate::telemetry::log::LogManager;
use crate::telemetry::metrics::{MetricsRecorder, MetricsSnapshot};
use crate::tracking::assignment::min_cost_assignment;
use crate::tracking::store::{Trajectory, TrajectoryStore};

/// Frame-by-frame linker that grows trajectories from per-frame detections.
///
/// The first frame pushed seeds one trajectory per detection. Every later frame
/// offers its detections to all trajectories, which stay open even after frames
/// without a match. A match is accepted only within `max_distance` pixels of the
/// trajectory's last known position.
pub struct TrajectoryLinker {
    max_distance: f64,
    matching: MatchingStrategy,
    seed_unmatched: bool,
    trajectories: Vec<Trajectory>,
    last_frame: Option<usize>,
    initial_count: usize,
    untracked: usize,
    logger: LogManager,
    metrics: MetricsRecorder,
}

impl TrajectoryLinker {
    /// Fails when `max_distance` is not a positive, finite pixel distance.
    pub fn new(config: &AnalysisConfig) -> TrackingResult<Self> {
        require_positive("max_distance", config.max_distance)?;
        Ok(Self {
            max_distance: config.max_distance,
            matching: config.matching,
            seed_unmatched: config.seed_unmatched,
            trajectories: Vec::new(),
            last_frame: None,
            initial_count: 0,
            untracked: 0,
            logger: LogManager::new("linker"),
            metrics: MetricsRecorder::new(),
        })
    }

    pub fn trajectory_count(&self) -> usize {
        self.trajectories.len()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Feeds the detections of one frame. Frame indices must strictly increase.
    pub fn push_frame(&mut self, frame_index: usize, detections: &[Detection]) -> TrackingResult<()> {
        if let Some(last) = self.last_frame {
            if frame_index <= last {
                return Err(TrackingError::InvalidInput(format!(
                    "frame {} pushed after frame {}",
                    frame_index, last
                )));
            }
        }
        if let Some(stray) = detections.iter().find(|d| d.frame_index != frame_index) {
            return Err(TrackingError::InvalidInput(format!(
                "detection from frame {} offered as part of frame {}",
                stray.frame_index, frame_index
            )));
        }
        self.metrics.record_frame(detections.len());

        if self.last_frame.is_none() {
            self.last_frame = Some(frame_index);
            self.initial_count = detections.len();
            self.seed(detections.iter());
            self.logger.record(&format!(
                "initialized {} trajectories from frame {}",
                detections.len(),
                frame_index
            ));
            return Ok(());
        }
        self.last_frame = Some(frame_index);

        let claims = match self.matching {
            MatchingStrategy::Greedy => self.greedy_claims(detections),
            MatchingStrategy::Optimal => self.optimal_claims(detections),
        };

        let mut claimed = vec![false; detections.len()];
        let mut accepted = 0usize;
        for (trajectory, claim) in self.trajectories.iter_mut().zip(&claims) {
            if let Some(idx) = *claim {
                trajectory.extend(frame_index, detections[idx].position)?;
                claimed[idx] = true;
                accepted += 1;
            }
        }
        self.metrics
            .record_links(accepted, claims.len().saturating_sub(accepted));

        let unclaimed = detections
            .iter()
            .zip(&claimed)
            .filter(|(_, taken)| !**taken)
            .map(|(detection, _)| detection);
        if self.seed_unmatched {
            self.seed(unclaimed);
        } else {
            self.untracked += unclaimed.count();
        }

        self.logger.detail(&format!(
            "frame {}: {} links, {} open trajectories",
            frame_index,
            accepted,
            self.trajectories.len()
        ));
        Ok(())
    }

    /// Consumes the linker and hands over the finished trajectories.
    pub fn finish(self) -> TrajectoryStore {
        if self.untracked > 0 {
            self.logger.warn(&format!(
                "{} detections did not match any of the {} particles present in the first frame and were not tracked",
                self.untracked, self.initial_count
            ));
        }
        self.logger.record(&format!(
            "linked {} trajectories over {} frames",
            self.trajectories.len(),
            self.metrics.snapshot().frames
        ));
        TrajectoryStore::new(self.trajectories)
    }

    fn seed<'a>(&mut self, detections: impl Iterator<Item = &'a Detection>) {
        let before = self.trajectories.len();
        for detection in detections {
            let id = self.trajectories.len();
            self.trajectories.push(Trajectory::start(
                id,
                detection.frame_index,
                detection.position,
            ));
        }
        self.metrics.record_seeded(self.trajectories.len() - before);
    }

    /// Trajectories in ascending id each take their nearest unclaimed detection.
    fn greedy_claims(&self, detections: &[Detection]) -> Vec<Option<usize>> {
        let mut taken = vec![false; detections.len()];
        let mut claims = Vec::with_capacity(self.trajectories.len());

        for trajectory in &self.trajectories {
            let Some(last) = trajectory.last_position() else {
                claims.push(None);
                continue;
            };

            let mut nearest: Option<(usize, f64)> = None;
            for (idx, detection) in detections.iter().enumerate() {
                if taken[idx] {
                    continue;
                }
                let distance = last.distance(&detection.position);
                if nearest.map_or(true, |(_, best)| distance < best) {
                    nearest = Some((idx, distance));
                }
            }

            match nearest {
                Some((idx, distance)) if distance <= self.max_distance => {
                    taken[idx] = true;
                    claims.push(Some(idx));
                }
                _ => claims.push(None),
            }
        }
        claims
    }

    fn optimal_claims(&self, detections: &[Detection]) -> Vec<Option<usize>> {
        let mut cost = Array2::from_elem((self.trajectories.len(), detections.len()), f64::INFINITY);
        for (row, trajectory) in self.trajectories.iter().enumerate() {
            let Some(last) = trajectory.last_position() else {
                continue;
            };
            for (col, detection) in detections.iter().enumerate() {
                let distance = last.distance(&detection.position);
                if distance <= self.max_distance {
                    cost[[row, col]] = distance;
                }
            }
        }
        min_cost_assignment(cost.view())
    }
}

/// Links a complete, frame-ordered detection sequence into trajectories.
pub fn link<'a, I>(detections_by_frame: I, config: &AnalysisConfig) -> TrackingResult<TrajectoryStore>
where
    I: IntoIterator<Item = (usize, &'a [Detection])>,
{
    let mut linker = TrajectoryLinker::new(config)?;
    for (frame_index, detections) in detections_by_frame {
        linker.push_frame(frame_index, detections)?;
    }
    Ok(linker.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::Position;

    fn frame(frame_index: usize, points: &[(f64, f64)]) -> Vec<Detection> {
        points
            .iter()
            .map(|&(x, y)| Detection::new(frame_index, Position::new(x, y), 4.0))
            .collect()
    }

    fn config(max_distance: f64) -> AnalysisConfig {
        AnalysisConfig {
            max_distance,
            ..Default::default()
        }
    }

    fn run(frames: &[Vec<Detection>], config: &AnalysisConfig) -> TrajectoryStore {
        link(
            frames.iter().enumerate().map(|(idx, d)| (idx, d.as_slice())),
            config,
        )
        .unwrap()
    }

    #[test]
    fn nearby_detections_extend_their_own_trajectories() {
        let frames = vec![
            frame(0, &[(10.0, 10.0), (100.0, 100.0)]),
            frame(1, &[(98.0, 101.0), (12.0, 11.0)]),
        ];
        let store = run(&frames, &config(10.0));

        assert_eq!(store.len(), 2);
        let first = store.get(0).unwrap();
        let second = store.get(1).unwrap();
        assert_eq!(first.position_at(1), Some(Position::new(12.0, 11.0)));
        assert_eq!(second.position_at(1), Some(Position::new(98.0, 101.0)));
    }

    #[test]
    fn distant_detection_seeds_new_trajectory() {
        let frames = vec![frame(0, &[(10.0, 10.0)]), frame(1, &[(60.0, 10.0)])];
        let store = run(&frames, &config(5.0));

        assert_eq!(store.len(), 2);
        assert_eq!(store.get(0).unwrap().len(), 1);
        let seeded = store.get(1).unwrap();
        assert_eq!(seeded.first_frame(), 1);
        assert_eq!(seeded.last_position(), Some(Position::new(60.0, 10.0)));
    }

    #[test]
    fn unmatched_trajectory_stays_open_across_gaps() {
        let frames = vec![
            frame(0, &[(10.0, 10.0)]),
            frame(1, &[]),
            frame(2, &[(13.0, 14.0)]),
        ];
        let store = run(&frames, &config(10.0));

        assert_eq!(store.len(), 1);
        let trajectory = store.get(0).unwrap();
        let frames: Vec<usize> = trajectory.positions().iter().map(|p| p.frame_index).collect();
        assert_eq!(frames, vec![0, 2]);
    }

    #[test]
    fn distance_equal_to_limit_is_accepted() {
        let frames = vec![frame(0, &[(0.0, 0.0)]), frame(1, &[(3.0, 4.0)])];
        let store = run(&frames, &config(5.0));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(0).unwrap().len(), 2);
    }

    #[test]
    fn greedy_gives_contested_detection_to_lower_id() {
        // Both trajectories are nearest to (5, 0); trajectory 0 is processed first.
        let frames = vec![
            frame(0, &[(0.0, 0.0), (9.0, 0.0)]),
            frame(1, &[(5.0, 0.0), (30.0, 0.0)]),
        ];
        let store = run(&frames, &config(10.0));

        assert_eq!(store.get(0).unwrap().position_at(1), Some(Position::new(5.0, 0.0)));
        assert_eq!(store.get(1).unwrap().position_at(1), None);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn optimal_matching_minimises_total_displacement() {
        // Greedy: t0 takes (2,0), leaving t1 11 px from (-5,0) and unmatched.
        // Optimal: t0 -> (-5,0) at 5 and t1 -> (2,0) at 4.
        let frames = vec![
            frame(0, &[(0.0, 0.0), (6.0, 0.0)]),
            frame(1, &[(2.0, 0.0), (-5.0, 0.0)]),
        ];

        let greedy = run(&frames, &config(10.0));
        assert_eq!(greedy.get(0).unwrap().position_at(1), Some(Position::new(2.0, 0.0)));
        assert_eq!(greedy.get(1).unwrap().position_at(1), None);
        assert_eq!(greedy.len(), 3);

        let optimal_config = AnalysisConfig {
            matching: MatchingStrategy::Optimal,
            ..config(10.0)
        };
        let optimal = run(&frames, &optimal_config);
        assert_eq!(optimal.get(0).unwrap().position_at(1), Some(Position::new(-5.0, 0.0)));
        assert_eq!(optimal.get(1).unwrap().position_at(1), Some(Position::new(2.0, 0.0)));
        assert_eq!(optimal.len(), 2);
    }

    #[test]
    fn disabling_seeding_keeps_only_initial_particles() {
        let frames = vec![
            frame(0, &[(10.0, 10.0)]),
            frame(1, &[(11.0, 10.0), (80.0, 80.0)]),
        ];
        let config = AnalysisConfig {
            seed_unmatched: false,
            ..config(10.0)
        };
        let store = run(&frames, &config);
        assert_eq!(store.len(), 1);
        assert!(store.iter().all(|t| t.first_frame() == 0));
    }

    #[test]
    fn linking_is_deterministic() {
        let frames = vec![
            frame(0, &[(0.0, 0.0), (5.0, 5.0), (20.0, 20.0)]),
            frame(1, &[(2.0, 2.0), (3.0, 3.0), (21.0, 19.0)]),
            frame(2, &[(4.0, 4.0), (1.0, 1.0), (60.0, 60.0)]),
        ];
        let config = config(10.0);
        assert_eq!(run(&frames, &config), run(&frames, &config));
    }

    #[test]
    fn frame_indices_stay_strictly_increasing() {
        let frames = vec![
            frame(0, &[(0.0, 0.0), (30.0, 30.0)]),
            frame(1, &[(1.0, 0.0), (31.0, 31.0), (70.0, 70.0)]),
            frame(2, &[(2.0, 1.0)]),
            frame(3, &[(3.0, 1.0), (32.0, 30.0), (71.0, 70.0)]),
        ];
        let store = run(&frames, &config(10.0));
        for trajectory in &store {
            assert!(trajectory
                .positions()
                .windows(2)
                .all(|pair| pair[0].frame_index < pair[1].frame_index));
        }
    }

    #[test]
    fn out_of_order_frames_are_rejected() {
        let mut linker = TrajectoryLinker::new(&config(10.0)).unwrap();
        linker.push_frame(1, &frame(1, &[(0.0, 0.0)])).unwrap();
        let err = linker.push_frame(1, &frame(1, &[(0.0, 0.0)]));
        assert!(matches!(err, Err(TrackingError::InvalidInput(_))));
    }

    #[test]
    fn mislabelled_detections_are_rejected() {
        let mut linker = TrajectoryLinker::new(&config(10.0)).unwrap();
        assert!(linker.push_frame(0, &frame(3, &[(0.0, 0.0)])).is_err());
    }

    #[test]
    fn metrics_count_links_and_seeds() {
        let mut linker = TrajectoryLinker::new(&config(5.0)).unwrap();
        linker.push_frame(0, &frame(0, &[(0.0, 0.0), (50.0, 50.0)])).unwrap();
        linker.push_frame(1, &frame(1, &[(1.0, 0.0), (90.0, 90.0)])).unwrap();

        let metrics = linker.metrics();
        assert_eq!(metrics.frames, 2);
        assert_eq!(metrics.detections, 4);
        assert_eq!(metrics.links_accepted, 1);
        assert_eq!(metrics.links_rejected, 1);
        assert_eq!(metrics.trajectories_seeded, 3);
        assert_eq!(linker.trajectory_count(), 3);
    }

    #[test]
    fn non_positive_max_distance_is_rejected() {
        let frames = vec![frame(0, &[(0.0, 0.0)]), frame(1, &[(0.0, 0.0)])];
        for max_distance in [0.0, -5.0, f64::NAN] {
            let result = link(
                frames.iter().map(|f| (f[0].frame_index, f.as_slice())),
                &config(max_distance),
            );
            assert!(matches!(result, Err(TrackingError::InvalidConfig(_))));
        }
        assert!(TrajectoryLinker::new(&config(f64::INFINITY)).is_err());
    }
}
