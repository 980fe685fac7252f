use anyhow::{ensure, Context};
use ndarray::Array2;
use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::generator::template::draw_disc;

/// Configuration for rendering a synthetic Brownian-motion video.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub width: usize,
    pub height: usize,
    pub frames: usize,
    pub particles: usize,
    pub particle_radius_px: f64,
    /// Standard deviation of the per-frame step along each axis, in pixels.
    pub step_sigma_px: f64,
    pub intensity: u8,
    pub background: u8,
    pub seed: u64,
    pub description: Option<String>,
    pub scenario: Option<String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            width: 256,
            height: 256,
            frames: 50,
            particles: 12,
            particle_radius_px: 3.0,
            step_sigma_px: 1.5,
            intensity: 255,
            background: 0,
            seed: 0,
            description: None,
            scenario: None,
        }
    }
}

impl GeneratorConfig {
    fn margin(&self) -> f64 {
        (self.particle_radius_px * 4.0).min(self.width.min(self.height) as f64 / 4.0)
    }
}

/// True particle centres `(x, y)` per particle and frame.
pub fn simulate_tracks(config: &GeneratorConfig) -> anyhow::Result<Vec<Vec<(f64, f64)>>> {
    ensure!(
        config.width > 0 && config.height > 0,
        "generator frame size must be non-zero"
    );
    ensure!(config.frames > 0, "generator needs at least one frame");
    ensure!(
        config.step_sigma_px.is_finite() && config.step_sigma_px >= 0.0,
        "generator step sigma must be a finite non-negative number, got {}",
        config.step_sigma_px
    );
    ensure!(
        config.particle_radius_px.is_finite() && config.particle_radius_px > 0.0,
        "generator particle radius must be a positive number, got {}",
        config.particle_radius_px
    );
    let steps = Normal::new(0.0, config.step_sigma_px)
        .context("building step distribution for generator")?;

    let mut rng = StdRng::seed_from_u64(config.seed);
    let margin = config.margin();
    let mut tracks = Vec::with_capacity(config.particles);

    for _ in 0..config.particles {
        let mut x = rng.gen_range(margin..=(config.width as f64 - margin));
        let mut y = rng.gen_range(margin..=(config.height as f64 - margin));
        let mut track = Vec::with_capacity(config.frames);
        track.push((x, y));
        for _ in 1..config.frames {
            x += steps.sample(&mut rng);
            y += steps.sample(&mut rng);
            track.push((x, y));
        }
        tracks.push(track);
    }

    Ok(tracks)
}

/// Renders the simulated particles as bright discs, one frame per timestep.
pub fn render_frames(config: &GeneratorConfig) -> anyhow::Result<Vec<Array2<u8>>> {
    let tracks = simulate_tracks(config)?;
    let frames = (0..config.frames)
        .map(|frame_index| {
            let mut frame = Array2::from_elem((config.height, config.width), config.background);
            for track in &tracks {
                draw_disc(
                    &mut frame,
                    track[frame_index],
                    config.particle_radius_px,
                    config.intensity,
                );
            }
            frame
        })
        .collect();
    Ok(frames)
}
