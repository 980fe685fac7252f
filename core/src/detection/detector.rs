use ndarray::{Array2, ArrayView2};
use rayon::prelude::*;

use crate::detection::record::{Detection, Position};
use crate::prelude::{AnalysisConfig, Connectivity};
use crate::telemetry::log::LogManager;

const FOUR_NEIGHBOURS: [(isize, isize); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];
const EIGHT_NEIGHBOURS: [(isize, isize); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// Converts a grayscale frame to pure black (0) and white (255) pixels.
pub fn binarize(frame: ArrayView2<u8>, threshold: u8) -> Array2<u8> {
    frame.mapv(|value| if value >= threshold { 255 } else { 0 })
}

/// Finds bright connected regions in a single frame and reports their centroids.
///
/// Frames are indexed `[row, column]`; a detection's `x` is the column and `y`
/// the row of the region's first moment. Regions that touch are merged into one
/// detection carrying the combined area.
#[derive(Debug, Clone)]
pub struct FrameDetector {
    threshold: u8,
    min_area: usize,
    connectivity: Connectivity,
    logger: LogManager,
}

impl FrameDetector {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            threshold: config.threshold,
            min_area: config.min_area.max(1),
            connectivity: config.connectivity,
            logger: LogManager::new("detector"),
        }
    }

    fn neighbours(&self) -> &'static [(isize, isize)] {
        match self.connectivity {
            Connectivity::Four => &FOUR_NEIGHBOURS,
            Connectivity::Eight => &EIGHT_NEIGHBOURS,
        }
    }

    /// Detections are emitted in raster order of each region's first pixel.
    pub fn detect(&self, frame_index: usize, frame: ArrayView2<u8>) -> Vec<Detection> {
        let (rows, cols) = frame.dim();
        if rows == 0 || cols == 0 {
            self.logger
                .detail(&format!("frame {} is empty, no detections", frame_index));
            return Vec::new();
        }

        // Foreground pixels are cleared as soon as a region claims them.
        let mut mask = binarize(frame, self.threshold);
        let mut stack = Vec::new();
        let mut detections = Vec::new();
        let mut discarded = 0usize;

        for row in 0..rows {
            for col in 0..cols {
                if mask[[row, col]] == 0 {
                    continue;
                }

                mask[[row, col]] = 0;
                stack.push((row, col));
                let mut area = 0usize;
                let mut sum_x = 0.0;
                let mut sum_y = 0.0;

                while let Some((y, x)) = stack.pop() {
                    area += 1;
                    sum_x += x as f64;
                    sum_y += y as f64;

                    for &(dy, dx) in self.neighbours() {
                        let ny = y as isize + dy;
                        let nx = x as isize + dx;
                        if ny < 0 || nx < 0 || ny >= rows as isize || nx >= cols as isize {
                            continue;
                        }
                        let (ny, nx) = (ny as usize, nx as usize);
                        if mask[[ny, nx]] != 0 {
                            mask[[ny, nx]] = 0;
                            stack.push((ny, nx));
                        }
                    }
                }

                if area < self.min_area {
                    discarded += 1;
                    continue;
                }

                let centroid = Position::new(sum_x / area as f64, sum_y / area as f64);
                detections.push(Detection::new(frame_index, centroid, area as f64));
            }
        }

        self.logger.detail(&format!(
            "frame {} -> {} detections ({} below min area)",
            frame_index,
            detections.len(),
            discarded
        ));
        detections
    }
}

/// Runs the detector over every frame concurrently; output stays in frame order.
pub fn detect_frames(frames: &[Array2<u8>], config: &AnalysisConfig) -> Vec<Vec<Detection>> {
    let detector = FrameDetector::new(config);
    frames
        .par_iter()
        .enumerate()
        .map(|(frame_index, frame)| detector.detect(frame_index, frame.view()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_with_squares(rows: usize, cols: usize, squares: &[(usize, usize, usize)]) -> Array2<u8> {
        let mut frame = Array2::zeros((rows, cols));
        for &(top, left, size) in squares {
            for y in top..top + size {
                for x in left..left + size {
                    frame[[y, x]] = 255;
                }
            }
        }
        frame
    }

    #[test]
    fn detector_reports_centroid_and_area() {
        let frame = frame_with_squares(20, 20, &[(2, 4, 3), (10, 12, 2)]);
        let detector = FrameDetector::new(&AnalysisConfig::default());
        let detections = detector.detect(0, frame.view());

        assert_eq!(detections.len(), 2);
        assert_eq!(detections[0].area, 9.0);
        assert_eq!(detections[0].position, Position::new(5.0, 3.0));
        assert_eq!(detections[1].area, 4.0);
        assert_eq!(detections[1].position, Position::new(12.5, 10.5));
    }

    #[test]
    fn detector_ignores_dim_pixels() {
        let mut frame = Array2::zeros((5, 5));
        frame[[1, 1]] = 199;
        frame[[3, 3]] = 200;
        let detector = FrameDetector::new(&AnalysisConfig::default());
        let detections = detector.detect(4, frame.view());
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].frame_index, 4);
        assert_eq!(detections[0].position, Position::new(3.0, 3.0));
    }

    #[test]
    fn diagonal_pixels_depend_on_connectivity() {
        let mut frame = Array2::zeros((4, 4));
        frame[[1, 1]] = 255;
        frame[[2, 2]] = 255;

        let eight = FrameDetector::new(&AnalysisConfig::default());
        assert_eq!(eight.detect(0, frame.view()).len(), 1);

        let four = FrameDetector::new(&AnalysisConfig {
            connectivity: Connectivity::Four,
            ..Default::default()
        });
        assert_eq!(four.detect(0, frame.view()).len(), 2);
    }

    #[test]
    fn small_regions_are_filtered_as_noise() {
        let frame = frame_with_squares(12, 12, &[(1, 1, 1), (5, 5, 3)]);
        let detector = FrameDetector::new(&AnalysisConfig {
            min_area: 4,
            ..Default::default()
        });
        let detections = detector.detect(0, frame.view());
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].area, 9.0);
    }

    #[test]
    fn touching_particles_merge_into_one_detection() {
        let frame = frame_with_squares(10, 10, &[(2, 2, 2), (2, 4, 2)]);
        let detector = FrameDetector::new(&AnalysisConfig::default());
        let detections = detector.detect(0, frame.view());
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].area, 8.0);
    }

    #[test]
    fn empty_and_dark_frames_yield_no_detections() {
        let detector = FrameDetector::new(&AnalysisConfig::default());
        assert!(detector.detect(0, Array2::<u8>::zeros((0, 0)).view()).is_empty());
        assert!(detector.detect(0, Array2::<u8>::zeros((8, 8)).view()).is_empty());
    }

    #[test]
    fn detection_count_is_independent_of_layout_order() {
        let frame = frame_with_squares(16, 16, &[(1, 1, 2), (6, 9, 3), (12, 3, 2)]);
        let mirrored = frame.slice(ndarray::s![.., ..;-1]).to_owned();
        let detector = FrameDetector::new(&AnalysisConfig::default());

        let original = detector.detect(0, frame.view());
        let flipped = detector.detect(0, mirrored.view());
        assert_eq!(original.len(), flipped.len());

        let mut areas: Vec<f64> = original.iter().map(|d| d.area).collect();
        let mut flipped_areas: Vec<f64> = flipped.iter().map(|d| d.area).collect();
        areas.sort_by(|a, b| a.total_cmp(b));
        flipped_areas.sort_by(|a, b| a.total_cmp(b));
        assert_eq!(areas, flipped_areas);
    }

    #[test]
    fn binarize_maps_to_black_and_white() {
        let frame = ndarray::arr2(&[[0u8, 199], [200, 255]]);
        assert_eq!(binarize(frame.view(), 200), ndarray::arr2(&[[0u8, 0], [255, 255]]));
    }

    #[test]
    fn detect_frames_preserves_frame_order() {
        let frames = vec![
            frame_with_squares(10, 10, &[(1, 1, 2)]),
            frame_with_squares(10, 10, &[(1, 1, 2), (6, 6, 2)]),
            Array2::zeros((10, 10)),
        ];
        let detections = detect_frames(&frames, &AnalysisConfig::default());
        assert_eq!(detections.len(), 3);
        assert_eq!(detections[0].len(), 1);
        assert_eq!(detections[1].len(), 2);
        assert!(detections[2].is_empty());
        assert!(detections[1].iter().all(|d| d.frame_index == 1));
    }
}
