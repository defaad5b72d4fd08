use chrono::NaiveDate;

use crate::models::{AlertPayload, MovementSummary};

/// Alert for an automatic trigger. Pure.
pub fn construct_alert(camera_id: u32, trigger_time: &str, clip_reference: &str) -> AlertPayload {
    AlertPayload {
        camera_id,
        trigger_time: trigger_time.to_string(),
        video_reference: clip_reference.to_string(),
        is_manual: false,
    }
}

/// Movement summary payload. Fractional seconds are dropped.
pub fn construct_movement_summary(
    camera_id: u32,
    total_movement_seconds: f64,
    user_id: u32,
    date: NaiveDate,
) -> MovementSummary {
    MovementSummary {
        camera_id,
        date: date.format("%Y-%m-%d").to_string(),
        total_movement: total_movement_seconds.max(0.0).floor() as u64,
        user_id,
    }
}

/// Public URL of an uploaded clip.
pub fn video_reference(video_base_url: &str, clip_filename: &str) -> String {
    format!("{}/{}", video_base_url.trim_end_matches('/'), clip_filename)
}
