pub mod msd;
pub mod physics;

pub use msd::{compute_msd, MsdPoint, MsdSeries};
pub use physics::{
    celsius_to_kelvin, estimate, estimate_avogadro, estimate_radius, fit_diffusion,
    stokes_einstein_radius, DiffusionFit, PhysicalEstimate, BOLTZMANN_CONSTANT,
    IDEAL_GAS_CONSTANT,
};
