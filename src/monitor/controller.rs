use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use log::{info, warn};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::detection::OcclusionRule;
use crate::metrics::MonitorSnapshot;
use crate::reporting::{spawn_delivery_worker, DeliveryCollaborators, DeliveryReport, MovementReporter};
use crate::settings::MonitorSettings;

use super::loop_worker::{monitor_loop, reporting_loop, LoopSummary, ReportTarget};
use super::session::{MonitorSession, SessionIdentity};
use super::source::{FrameSource, PoseEstimator};

/// Where frames and poses come from.
pub struct MonitorInput {
    pub source: Box<dyn FrameSource>,
    pub estimator: Box<dyn PoseEstimator>,
}

/// Where clips, alerts and movement summaries go.
#[derive(Clone)]
pub struct MonitorCollaborators {
    pub delivery: DeliveryCollaborators,
    pub movement: Arc<dyn MovementReporter>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorSummary {
    pub loop_summary: LoopSummary,
    pub delivery: DeliveryReport,
}

/// Owns the frame loop, the delivery worker and the reporting ticker for one
/// monitoring run.
#[derive(Default)]
pub struct MonitorController {
    cancel_token: Option<CancellationToken>,
    finished: Option<CancellationToken>,
    loop_handle: Option<JoinHandle<LoopSummary>>,
    delivery_handle: Option<JoinHandle<DeliveryReport>>,
    reporting_handle: Option<JoinHandle<()>>,
    snapshots: Option<watch::Receiver<MonitorSnapshot>>,
}

impl MonitorController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.loop_handle.is_some()
    }

    /// Must be called from within a tokio runtime.
    pub fn start(
        &mut self,
        settings: &MonitorSettings,
        input: MonitorInput,
        collaborators: MonitorCollaborators,
    ) -> Result<()> {
        if self.is_active() {
            bail!("monitor already active");
        }

        match settings.detection.occlusion {
            OcclusionRule::MissingStreak { frames } => {
                info!("occlusion flagged after {frames} consecutive frames without a pose")
            }
            OcclusionRule::FrozenNose => warn!(
                "frozen-nose occlusion rule selected; deadbanded velocity is zero whenever the nose is still, so it will not fire"
            ),
        }

        let identity = SessionIdentity {
            patient_name: settings.patient_name.clone(),
            camera_id: settings.camera_id,
            video_base_url: settings.reporting.video_base_url(),
        };
        let session = MonitorSession::new(
            identity,
            settings.detection.clone(),
            &settings.recording,
        );

        let cancel_token = CancellationToken::new();
        let finished = CancellationToken::new();

        let (jobs_tx, jobs_rx) = mpsc::channel(settings.reporting.queue_depth.max(1));
        let delivery_handle = spawn_delivery_worker(jobs_rx, collaborators.delivery);

        let (snap_tx, snap_rx) = watch::channel(MonitorSnapshot::default());

        let loop_handle = tokio::task::spawn_blocking({
            let token = cancel_token.clone();
            let finished = finished.clone();
            let MonitorInput { source, estimator } = input;
            move || {
                let _done = finished.drop_guard();
                monitor_loop(session, source, estimator, jobs_tx, snap_tx, token)
            }
        });

        let reporting_handle = tokio::spawn(reporting_loop(
            snap_rx.clone(),
            collaborators.movement,
            ReportTarget {
                camera_id: settings.camera_id,
                user_id: settings.user_id,
            },
            secs(settings.diagnostics_interval_secs),
            secs(settings.reporting.movement_report_interval_secs),
            cancel_token.clone(),
        ));

        info!(
            "monitoring camera {} for {}",
            settings.camera_id, settings.patient_name
        );

        self.cancel_token = Some(cancel_token);
        self.finished = Some(finished);
        self.loop_handle = Some(loop_handle);
        self.delivery_handle = Some(delivery_handle);
        self.reporting_handle = Some(reporting_handle);
        self.snapshots = Some(snap_rx);
        Ok(())
    }

    /// Latest per-frame snapshot, if a run has been started.
    pub fn snapshot(&self) -> Option<MonitorSnapshot> {
        self.snapshots.as_ref().map(|rx| rx.borrow().clone())
    }

    /// Resolves when the frame loop exits on its own (stream end or source
    /// failure) or after `stop`. Immediately when not started.
    pub async fn finished(&self) {
        if let Some(finished) = &self.finished {
            finished.cancelled().await;
        }
    }

    /// Stop the loop, let the delivery worker drain clips already handed off,
    /// and send a last movement summary. `None` when not started.
    pub async fn stop(&mut self) -> Result<Option<MonitorSummary>> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        let Some(loop_handle) = self.loop_handle.take() else {
            return Ok(None);
        };
        let loop_summary = loop_handle
            .await
            .context("monitor loop task failed to join")?;

        // The loop owned the only job sender, so the worker is draining now.
        let delivery = match self.delivery_handle.take() {
            Some(handle) => handle
                .await
                .context("delivery worker task failed to join")?,
            None => DeliveryReport::default(),
        };

        if let Some(handle) = self.reporting_handle.take() {
            handle
                .await
                .context("reporting task failed to join")?;
        }
        self.finished = None;

        Ok(Some(MonitorSummary {
            loop_summary,
            delivery,
        }))
    }
}

fn secs(value: u64) -> Option<Duration> {
    (value > 0).then_some(Duration::from_secs(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt::Write as _;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    use crate::models::VideoFrame;
    use crate::monitor::loop_worker::LoopExit;
    use crate::monitor::replay::{Pacing, ReplayTrack};
    use crate::recording::ClipSink;
    use crate::reporting::{LocalOnlyUploader, LoggingAlertSender, LoggingMovementReporter};

    #[derive(Default)]
    struct CountingSink {
        clips: Mutex<Vec<(usize, PathBuf)>>,
    }

    impl ClipSink for CountingSink {
        fn finalize_clip(&self, frames: &[VideoFrame], path: &Path) -> anyhow::Result<()> {
            self.clips
                .lock()
                .unwrap()
                .push((frames.len(), path.to_path_buf()));
            Ok(())
        }
    }

    fn collaborators(sink: Arc<CountingSink>) -> MonitorCollaborators {
        MonitorCollaborators {
            delivery: DeliveryCollaborators {
                sink,
                uploader: Arc::new(LocalOnlyUploader),
                alerts: Arc::new(LoggingAlertSender),
                output_dir: PathBuf::from("out"),
            },
            movement: Arc::new(LoggingMovementReporter),
        }
    }

    /// 20 standing frames, a fast drop, then lying still for `after` frames.
    fn fall_track(after: usize) -> ReplayTrack {
        let mut raw = String::new();
        for i in 0..(21 + after) {
            let t = i as f64 / 30.0;
            let nose_y = if i < 20 { 300.0 } else { 850.0 };
            writeln!(
                raw,
                r#"{{"timestamp":{t},"nose":{{"x":960,"y":{nose_y}}},"leftShoulder":{{"x":900,"y":-100}},"rightShoulder":{{"x":1020,"y":-100}},"leftHip":{{"x":920,"y":868}},"rightHip":{{"x":1000,"y":868}}}}"#
            )
            .unwrap();
        }
        ReplayTrack::parse(&raw, PathBuf::new()).unwrap()
    }

    fn input(track: ReplayTrack) -> MonitorInput {
        let (source, estimator) = track.into_parts(4, 4, Pacing::AsFastAsPossible);
        MonitorInput {
            source: Box::new(source),
            estimator: Box::new(estimator),
        }
    }

    fn settings() -> MonitorSettings {
        MonitorSettings {
            patient_name: "bob".into(),
            diagnostics_interval_secs: 0,
            ..MonitorSettings::default()
        }
    }

    #[tokio::test]
    async fn replay_fall_is_delivered_end_to_end() {
        let sink = Arc::new(CountingSink::default());
        let mut controller = MonitorController::new();
        controller
            .start(&settings(), input(fall_track(250)), collaborators(sink.clone()))
            .unwrap();
        assert!(controller.is_active());

        controller.finished().await;
        let summary = controller.stop().await.unwrap().unwrap();

        assert_eq!(summary.loop_summary.exit, LoopExit::StreamEnded);
        assert_eq!(summary.loop_summary.frames, 271);
        assert_eq!(summary.loop_summary.clips_handed_off, 1);
        assert_eq!(summary.delivery.clips_written, 1);
        assert_eq!(summary.delivery.clips_uploaded, 1);
        assert_eq!(summary.delivery.alerts_sent, 1);

        let clips = sink.clips.lock().unwrap();
        assert_eq!(clips.len(), 1);
        assert_eq!(clips[0].0, 200);
        assert!(clips[0].1.starts_with("out"));
        assert!(!controller.is_active());
    }

    #[tokio::test]
    async fn stop_mid_capture_discards_clip() {
        let sink = Arc::new(CountingSink::default());
        let mut controller = MonitorController::new();
        // Paced so the loop is still running when stop arrives.
        let (source, estimator) = fall_track(600).into_parts(4, 4, Pacing::Realtime);
        controller
            .start(
                &settings(),
                MonitorInput {
                    source: Box::new(source),
                    estimator: Box::new(estimator),
                },
                collaborators(sink.clone()),
            )
            .unwrap();

        tokio::time::sleep(Duration::from_millis(1500)).await;
        let summary = controller.stop().await.unwrap().unwrap();

        assert_eq!(summary.loop_summary.exit, LoopExit::Cancelled);
        assert_eq!(summary.delivery, DeliveryReport::default());
        assert!(sink.clips.lock().unwrap().is_empty());
        let snapshot = controller.snapshot().unwrap();
        assert_eq!(snapshot.buffer_len, 0);
    }

    #[tokio::test]
    async fn second_start_is_rejected() {
        let sink = Arc::new(CountingSink::default());
        let mut controller = MonitorController::new();
        controller
            .start(&settings(), input(fall_track(0)), collaborators(sink.clone()))
            .unwrap();
        assert!(controller
            .start(&settings(), input(fall_track(0)), collaborators(sink))
            .is_err());
        controller.stop().await.unwrap();
    }

    #[tokio::test]
    async fn stop_without_start_is_a_no_op() {
        let mut controller = MonitorController::new();
        controller.finished().await;
        assert!(controller.stop().await.unwrap().is_none());
    }
}
