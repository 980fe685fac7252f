pub mod assignment;
pub mod linker;
pub mod store;

pub use assignment::min_cost_assignment;
pub use linker::{link, TrajectoryLinker};
pub use store::{TrackPoint, Trajectory, TrajectoryStore};
