use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::{FallStatus, RecordingMode};

/// What the operator overlay would show, published by the frame loop after
/// every frame.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MonitorSnapshot {
    pub status: FallStatus,
    pub recording_mode: RecordingMode,
    pub buffer_len: usize,
    /// Frames the buffer holds in its current mode.
    pub buffer_capacity: usize,
    pub fps: f64,
    /// Movement on `movement_date` so far.
    pub movement_seconds: f64,
    pub movement_date: Option<NaiveDate>,
    /// Most recent day that ended while monitoring.
    pub closed_day: Option<DailyMovement>,
    pub alert_threshold_y: f64,
    pub frames_processed: u64,
    pub frames_without_pose: u64,
    pub clips_completed: u64,
    pub clips_dropped: u64,
}

impl Default for MonitorSnapshot {
    fn default() -> Self {
        Self {
            status: FallStatus::Normal,
            recording_mode: RecordingMode::Rolling,
            buffer_len: 0,
            buffer_capacity: 0,
            fps: 0.0,
            movement_seconds: 0.0,
            movement_date: None,
            closed_day: None,
            alert_threshold_y: 0.0,
            frames_processed: 0,
            frames_without_pose: 0,
            clips_completed: 0,
            clips_dropped: 0,
        }
    }
}

/// Movement total for one finished local calendar day.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DailyMovement {
    pub date: NaiveDate,
    pub movement_seconds: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct SystemMetrics {
    pub cpu_percent: f32,
    pub memory_mb: f64,
}
