use crate::models::FallStatus;

use super::config::{DetectionConfig, OcclusionRule};

/// Per-frame inputs, velocities already deadbanded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInput {
    pub nose_y: f64,
    pub hip_center_x: f64,
    pub vertical_velocity: f64,
    pub horizontal_velocity: f64,
    pub alert_threshold_y: f64,
    /// Last nose height seen with a usable pose. `None` until the first one.
    pub previous_nose_y: Option<f64>,
    pub previous_hip_center_x: Option<f64>,
}

/// Side effects the owner of the evidence buffer must carry out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    /// Switch the buffer to capturing and raise an alert for the new event.
    StartCapture,
    /// Clear the buffer, dropping any in-flight capture unfinished.
    AbandonCapture,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub previous: FallStatus,
    pub status: FallStatus,
    pub directives: Vec<Directive>,
    pub moved: bool,
}

impl Transition {
    pub fn changed(&self) -> bool {
        self.previous != self.status
    }
}

#[derive(Debug, Clone)]
pub struct FallStateMachine {
    config: DetectionConfig,
    recovery_abandons_capture: bool,
    status: FallStatus,
    capturing: bool,
    movement_tally: u64,
    missing_streak: u32,
}

impl FallStateMachine {
    pub fn new(config: DetectionConfig, recovery_abandons_capture: bool) -> Self {
        Self {
            config,
            recovery_abandons_capture,
            status: FallStatus::Normal,
            capturing: false,
            movement_tally: 0,
            missing_streak: 0,
        }
    }

    pub fn status(&self) -> FallStatus {
        self.status
    }

    pub fn is_capturing(&self) -> bool {
        self.capturing
    }

    pub fn movement_tally(&self) -> u64 {
        self.movement_tally
    }

    pub fn movement_seconds(&self) -> f64 {
        if self.config.movement_sample_rate_hz <= 0.0 {
            return 0.0;
        }
        self.movement_tally as f64 / self.config.movement_sample_rate_hz
    }

    pub fn reset_movement(&mut self) {
        self.movement_tally = 0;
    }

    /// The evidence buffer finished its clip and is rolling again.
    pub fn capture_finished(&mut self) {
        self.capturing = false;
    }

    /// Apply the transition rules, in order, to a frame with a usable pose.
    pub fn step(&mut self, input: &FrameInput) -> Transition {
        let previous = self.status;
        let mut directives = Vec::new();
        self.missing_streak = 0;

        // Fall trigger.
        if self.status != FallStatus::FallDetected
            && input.nose_y > input.alert_threshold_y
            && input.vertical_velocity > self.config.fall_velocity
        {
            self.status = FallStatus::FallDetected;
            if !self.capturing {
                self.capturing = true;
                directives.push(Directive::StartCapture);
            }
        }

        // Recovery from fall.
        if self.status == FallStatus::FallDetected && input.nose_y < input.alert_threshold_y {
            self.status = FallStatus::RecoveredFromFall;
            if !self.capturing || self.recovery_abandons_capture {
                self.capturing = false;
                directives.push(Directive::AbandonCapture);
            }
        }

        // Occlusion trigger, frozen-nose form. The streak form runs in
        // `observe_missing` because it needs frames without a pose.
        if self.config.occlusion == OcclusionRule::FrozenNose
            && input.previous_nose_y == Some(input.nose_y)
            && input.vertical_velocity != 0.0
        {
            self.status = FallStatus::OccludedFallDetected;
        }

        // Recovery from occlusion. A nose seen for the first time after an
        // occlusion from startup counts as having moved.
        if self.status == FallStatus::OccludedFallDetected
            && input.previous_nose_y != Some(input.nose_y)
        {
            self.status = FallStatus::RecoveredFromOccludedFall;
        }

        let moved = input.horizontal_velocity != 0.0
            && input
                .previous_hip_center_x
                .is_some_and(|previous| previous != input.hip_center_x);
        if moved {
            self.movement_tally += 1;
        }

        Transition {
            previous,
            status: self.status,
            directives,
            moved,
        }
    }

    /// Record a frame without a usable pose. Returns the new status when the
    /// missing-streak rule fires.
    pub fn observe_missing(&mut self) -> Option<FallStatus> {
        self.missing_streak = self.missing_streak.saturating_add(1);

        let OcclusionRule::MissingStreak { frames } = self.config.occlusion else {
            return None;
        };

        if frames > 0
            && self.missing_streak >= frames
            && self.status != FallStatus::OccludedFallDetected
        {
            self.status = FallStatus::OccludedFallDetected;
            return Some(self.status);
        }
        None
    }
}
