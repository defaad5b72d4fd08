pub mod config;
pub mod signals;
pub mod state_machine;
pub mod velocity;

pub use config::{DetectionConfig, OcclusionRule};
pub use signals::{adaptive_threshold, body_anchors, extract, DerivedSignals, SignalError};
pub use state_machine::{Directive, FallStateMachine, FrameInput, Transition};
pub use velocity::{deadband, velocity, VelocityState};
