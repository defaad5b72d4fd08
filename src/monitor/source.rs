use anyhow::Result;

use crate::models::{KeypointFrame, VideoFrame};

/// Blocking camera-like input. `Ok(None)` means the stream ended.
pub trait FrameSource: Send {
    fn next_frame(&mut self) -> Result<Option<VideoFrame>>;
}

/// Maps a frame to keypoints in that frame's pixel space; `None` when no
/// subject was found.
pub trait PoseEstimator: Send {
    fn detect(&mut self, frame: &VideoFrame) -> Option<KeypointFrame>;
}
