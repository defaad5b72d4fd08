use serde::{Deserialize, Serialize};

/// Pixel coordinate in frame space. `y` grows downward.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn midpoint(self, other: Point) -> Point {
        Point {
            x: (self.x + other.x) / 2.0,
            y: (self.y + other.y) / 2.0,
        }
    }
}

/// Keypoints detected for one frame. Absent points failed detection.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KeypointFrame {
    /// Monotonic clock reading in seconds.
    pub timestamp: f64,
    #[serde(default)]
    pub nose: Option<Point>,
    #[serde(default)]
    pub left_shoulder: Option<Point>,
    #[serde(default)]
    pub right_shoulder: Option<Point>,
    #[serde(default)]
    pub left_hip: Option<Point>,
    #[serde(default)]
    pub right_hip: Option<Point>,
}

impl KeypointFrame {
    pub fn is_complete(&self) -> bool {
        self.nose.is_some()
            && self.left_shoulder.is_some()
            && self.right_shoulder.is_some()
            && self.left_hip.is_some()
            && self.right_hip.is_some()
    }
}
