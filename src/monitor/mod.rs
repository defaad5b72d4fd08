pub mod controller;
pub mod loop_worker;
pub mod replay;
pub mod session;
pub mod source;

pub use controller::{MonitorCollaborators, MonitorController, MonitorInput, MonitorSummary};
pub use loop_worker::{LoopExit, LoopSummary};
pub use replay::{Pacing, ReplayTrack};
pub use session::{FrameOutcome, MonitorSession, SessionIdentity};
pub use source::{FrameSource, PoseEstimator};
