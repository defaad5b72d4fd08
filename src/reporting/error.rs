use thiserror::Error;

/// Failures of the collaborators that receive a finished event. None of
/// these stop the frame loop.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("clip finalization failed: {0}")]
    ClipFinalization(String),

    #[error("clip upload failed: {0}")]
    Upload(String),

    #[error("alert delivery failed: {0}")]
    AlertDelivery(String),

    #[error("delivery not configured: {0}")]
    Config(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type DeliveryResult<T> = Result<T, DeliveryError>;
