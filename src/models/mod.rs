mod event;
mod frame;
mod keypoints;
mod status;

pub use event::{AlertPayload, FallEvent, MovementSummary};
pub use frame::VideoFrame;
pub use keypoints::{KeypointFrame, Point};
pub use status::{FallStatus, RecordingMode};
