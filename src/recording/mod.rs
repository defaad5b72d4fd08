pub mod buffer;
pub mod clip;
pub mod config;

pub use buffer::EvidenceBuffer;
pub use clip::{clip_filename, event_id, ClipSink, FfmpegClipSink, LoggingClipSink};
pub use config::RecordingConfig;
