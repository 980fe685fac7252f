use serde::{Deserialize, Serialize};

/// Sub-pixel location in image coordinates (x = column, y = row).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_squared(&self, other: &Position) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        dx * dx + dy * dy
    }

    pub fn distance(&self, other: &Position) -> f64 {
        self.distance_squared(other).sqrt()
    }
}

/// One connected foreground region found in a frame.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Detection {
    pub frame_index: usize,
    pub position: Position,
    /// Region size in pixels.
    pub area: f64,
}

impl Detection {
    pub fn new(frame_index: usize, position: Position, area: f64) -> Self {
        Self {
            frame_index,
            position,
            area,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_is_euclidean() {
        let a = Position::new(0.0, 0.0);
        let b = Position::new(3.0, 4.0);
        assert_eq!(a.distance(&b), 5.0);
        assert_eq!(b.distance_squared(&a), 25.0);
    }
}
