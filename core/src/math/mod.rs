pub mod stats;

pub use stats::{LineFit, StatsHelper};
