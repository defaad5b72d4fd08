pub mod alert;
pub mod config;
pub mod error;
pub mod movement;
pub mod payload;
pub mod upload;
pub mod worker;

pub use alert::{AlertSender, HttpAlertSender, LoggingAlertSender};
pub use config::{BlobStorageConfig, ReportingConfig};
pub use error::{DeliveryError, DeliveryResult};
pub use movement::{LoggingMovementReporter, MovementReporter};
pub use payload::{construct_alert, construct_movement_summary, video_reference};
pub use upload::{BlobUploader, ClipUploader, LocalOnlyUploader};
pub use worker::{spawn_delivery_worker, DeliveryCollaborators, DeliveryJob, DeliveryReport};
