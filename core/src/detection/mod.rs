pub mod detector;
pub mod record;

pub use detector::{binarize, detect_frames, FrameDetector};
pub use record::{Detection, Position};
