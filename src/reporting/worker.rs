use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::models::{FallEvent, VideoFrame};
use crate::recording::ClipSink;

use super::alert::AlertSender;
use super::error::DeliveryError;
use super::upload::ClipUploader;

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

/// A finished evidence clip and the event it documents. The frames are owned
/// by the job; the live buffer has already moved on.
#[derive(Debug)]
pub struct DeliveryJob {
    pub id: Uuid,
    pub event: FallEvent,
    pub frames: Vec<VideoFrame>,
}

impl DeliveryJob {
    pub fn new(event: FallEvent, frames: Vec<VideoFrame>) -> Self {
        Self {
            id: Uuid::new_v4(),
            event,
            frames,
        }
    }
}

#[derive(Clone)]
pub struct DeliveryCollaborators {
    pub sink: Arc<dyn ClipSink>,
    pub uploader: Arc<dyn ClipUploader>,
    pub alerts: Arc<dyn AlertSender>,
    pub output_dir: PathBuf,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryReport {
    pub clips_written: u32,
    pub clips_uploaded: u32,
    pub alerts_sent: u32,
    pub failures: u32,
}

/// Consume jobs until every sender is dropped, then return what was done.
pub fn spawn_delivery_worker(
    mut rx: mpsc::Receiver<DeliveryJob>,
    collaborators: DeliveryCollaborators,
) -> JoinHandle<DeliveryReport> {
    tokio::spawn(async move {
        let mut report = DeliveryReport::default();
        while let Some(job) = rx.recv().await {
            deliver(job, &collaborators, &mut report).await;
        }
        log_info!(
            "delivery worker drained: {} clips, {} uploads, {} alerts, {} failures",
            report.clips_written,
            report.clips_uploaded,
            report.alerts_sent,
            report.failures
        );
        report
    })
}

async fn deliver(job: DeliveryJob, c: &DeliveryCollaborators, report: &mut DeliveryReport) {
    let DeliveryJob { id, event, frames } = job;
    let path = c.output_dir.join(&event.clip_filename);
    log_info!(
        "delivery {id}: event {} with {} frames",
        event.event_id,
        frames.len()
    );

    let sink = Arc::clone(&c.sink);
    let clip_path = path.clone();
    let written = tokio::task::spawn_blocking(move || sink.finalize_clip(&frames, &clip_path))
        .await
        .map_err(|e| DeliveryError::ClipFinalization(format!("encoder task failed: {e}")))
        .and_then(|res| res.map_err(|e| DeliveryError::ClipFinalization(format!("{e:#}"))));

    match written {
        Ok(()) => {
            report.clips_written += 1;
            match c.uploader.upload(&path, &event.clip_filename).await {
                Ok(()) => report.clips_uploaded += 1,
                Err(err) => {
                    report.failures += 1;
                    log_error!("delivery {id}: {err}");
                }
            }
        }
        Err(err) => {
            report.failures += 1;
            log_error!("delivery {id}: {err}; alerting without a clip");
        }
    }

    // A fall is reported even when the evidence did not make it.
    match c.alerts.send(&event.alert).await {
        Ok(()) => report.alerts_sent += 1,
        Err(err) => {
            report.failures += 1;
            log_warn!("delivery {id}: {err}");
        }
    }
}
