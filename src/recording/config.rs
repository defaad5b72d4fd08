use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Evidence buffer sizing and clip encoding settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct RecordingConfig {
    /// Frames kept while nothing is happening.
    pub rolling_capacity: usize,
    /// Total frames in a finished clip, pre-event frames included.
    pub capture_capacity: usize,
    /// Drop the in-flight clip when the subject gets back up before it fills.
    pub recovery_abandons_capture: bool,

    pub clip_fps: u32,
    pub clip_width: u32,
    pub clip_height: u32,
    /// The encoder is killed if a clip takes longer than this.
    pub encode_timeout_secs: u64,
    pub output_dir: PathBuf,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            rolling_capacity: 100,
            capture_capacity: 200,
            recovery_abandons_capture: true,
            clip_fps: 20,
            clip_width: 1920,
            clip_height: 1080,
            encode_timeout_secs: 120,
            output_dir: PathBuf::from("clips"),
        }
    }
}
