use serde::{Deserialize, Serialize};

/// How the occluded-fall condition is recognised.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum OcclusionRule {
    /// Pose lost for this many consecutive frames.
    MissingStreak { frames: u32 },
    /// Nose position unchanged while vertical velocity is non-zero. Velocity
    /// is derived from the same nose delta, so this never fires in practice.
    FrozenNose,
}

impl Default for OcclusionRule {
    fn default() -> Self {
        OcclusionRule::MissingStreak { frames: 20 }
    }
}

/// Tunable thresholds for signal extraction and the fall state machine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct DetectionConfig {
    /// Torso pixel height of the calibration subject at unit distance.
    pub reference_torso_px: f64,
    /// Log-distance slope of the calibration model.
    pub distance_slope: f64,
    /// Alert line (pixel y) for a subject at unit distance.
    pub base_threshold_y: f64,
    /// Pixels the alert line rises per unit of distance.
    pub threshold_gain: f64,

    /// Vertical velocities with magnitude below this are treated as zero.
    pub vertical_deadband: f64,
    /// Horizontal velocities with magnitude below this are treated as zero.
    pub horizontal_deadband: f64,
    /// Downward nose velocity (px/s) required to trigger a fall.
    pub fall_velocity: f64,

    pub occlusion: OcclusionRule,

    /// Frame rate the movement tally is divided by to get seconds.
    pub movement_sample_rate_hz: f64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            reference_torso_px: 968.0,
            distance_slope: 0.314,
            base_threshold_y: 800.0,
            threshold_gain: 20.0,
            vertical_deadband: 200.0,
            horizontal_deadband: 100.0,
            fall_velocity: 1000.0,
            occlusion: OcclusionRule::default(),
            movement_sample_rate_hz: 30.0,
        }
    }
}
