use serde::{Deserialize, Serialize};

/// Alert for one confirmed fall. Immutable once built.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AlertPayload {
    pub camera_id: u32,
    pub trigger_time: String,
    #[serde(rename = "videoData")]
    pub video_reference: String,
    pub is_manual: bool,
}

/// Movement for one camera over one local calendar day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MovementSummary {
    pub camera_id: u32,
    /// Local calendar date, `YYYY-MM-DD`.
    pub date: String,
    /// Whole seconds spent moving on `date`.
    pub total_movement: u64,
    pub user_id: u32,
}

/// A triggered fall waiting for its evidence clip to complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallEvent {
    /// Trigger wall clock floored to seconds, `YYYYMMDD-HHMMSS`.
    pub event_id: String,
    pub clip_filename: String,
    pub alert: AlertPayload,
}
