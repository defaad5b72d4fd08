use std::sync::Arc;

use chrono::{Local, NaiveDate};
use tokio::sync::{mpsc, watch};
use tokio::time::{Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::metrics::{diagnostics_line, FpsMeter, MonitorSnapshot, SystemSampler};
use crate::reporting::{construct_movement_summary, DeliveryJob, MovementReporter};

use super::session::MonitorSession;
use super::source::{FrameSource, PoseEstimator};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    Cancelled,
    StreamEnded,
    SourceFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopSummary {
    pub exit: LoopExit,
    pub frames: u64,
    pub clips_handed_off: u64,
    pub clips_dropped: u64,
}

/// Per-frame loop. Blocking: run it on `spawn_blocking`.
///
/// One frame is fully processed before the next is read. Finished clips are
/// offered to the delivery queue without waiting; when the queue is full the
/// clip is dropped so frame admission never stalls.
pub fn monitor_loop(
    mut session: MonitorSession,
    mut source: Box<dyn FrameSource>,
    mut estimator: Box<dyn PoseEstimator>,
    jobs: mpsc::Sender<DeliveryJob>,
    snapshots: watch::Sender<MonitorSnapshot>,
    cancel_token: CancellationToken,
) -> LoopSummary {
    let mut meter = FpsMeter::new();
    let mut frames = 0u64;
    let mut clips_handed_off = 0u64;
    let mut clips_dropped = 0u64;

    let exit = loop {
        if cancel_token.is_cancelled() {
            break LoopExit::Cancelled;
        }

        let frame = match source.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => break LoopExit::StreamEnded,
            Err(err) => {
                log_error!("frame source failed: {err:?}");
                break LoopExit::SourceFailed;
            }
        };
        frames += 1;

        let keypoints = estimator.detect(&frame);
        let outcome = session.process_frame(frame, keypoints.as_ref(), Local::now());

        if let Some(job) = outcome.completed {
            let clip = job.event.clip_filename.clone();
            match jobs.try_send(job) {
                Ok(()) => clips_handed_off += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    clips_dropped += 1;
                    log_error!("delivery queue full; dropping clip {clip}");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    clips_dropped += 1;
                    log_error!("delivery worker gone; dropping clip {clip}");
                }
            }
        }

        let fps = meter.tick();
        snapshots.send_replace(session.snapshot(fps, clips_dropped));
    };

    if let Some(event) = session.abandon_capture() {
        log_warn!(
            "monitor stopped mid-capture; discarding unfinished clip {}",
            event.clip_filename
        );
    }
    snapshots.send_replace(session.snapshot(meter.fps(), clips_dropped));

    log_info!(
        "monitor loop exiting ({exit:?}) after {frames} frames, {clips_handed_off} clips handed off, {clips_dropped} dropped"
    );

    LoopSummary {
        exit,
        frames,
        clips_handed_off,
        clips_dropped,
    }
}

/// Identity stamped on movement summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportTarget {
    pub camera_id: u32,
    pub user_id: u32,
}

/// Periodic diagnostics line and movement summary, read off the latest
/// snapshot. A final movement summary goes out on shutdown.
pub async fn reporting_loop(
    snapshots: watch::Receiver<MonitorSnapshot>,
    reporter: Arc<dyn MovementReporter>,
    target: ReportTarget,
    diagnostics_every: Option<Duration>,
    movement_every: Option<Duration>,
    cancel_token: CancellationToken,
) {
    let mut sampler = SystemSampler::new();
    let mut reported_day: Option<NaiveDate> = None;

    // A disabled ticker still needs a period; its branch is never polled.
    let fallback = Duration::from_secs(3600);
    let mut movement_ticker =
        tokio::time::interval(movement_every.unwrap_or(fallback).max(Duration::from_secs(1)));
    movement_ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    movement_ticker.tick().await;

    let mut diagnostics_ticker =
        tokio::time::interval(diagnostics_every.unwrap_or(fallback).max(Duration::from_secs(1)));
    diagnostics_ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    diagnostics_ticker.tick().await;

    loop {
        tokio::select! {
            _ = diagnostics_ticker.tick(), if diagnostics_every.is_some() => {
                let snapshot = snapshots.borrow().clone();
                let system = sampler.sample();
                log_info!("{}", diagnostics_line(&snapshot, &system));
            }
            _ = movement_ticker.tick(), if movement_every.is_some() => {
                report_movement(&snapshots, reporter.as_ref(), target, &mut reported_day).await;
            }
            _ = cancel_token.cancelled() => {
                report_movement(&snapshots, reporter.as_ref(), target, &mut reported_day).await;
                log_info!("reporting loop shutting down");
                break;
            }
        }
    }
}

/// A day that closed since the last report goes out once with its final
/// total, then the day in progress.
async fn report_movement(
    snapshots: &watch::Receiver<MonitorSnapshot>,
    reporter: &dyn MovementReporter,
    target: ReportTarget,
    reported_day: &mut Option<NaiveDate>,
) {
    let snapshot = snapshots.borrow().clone();

    if let Some(closed) = snapshot.closed_day {
        if *reported_day != Some(closed.date) {
            let summary = construct_movement_summary(
                target.camera_id,
                closed.movement_seconds,
                target.user_id,
                closed.date,
            );
            match reporter.report(&summary).await {
                Ok(()) => *reported_day = Some(closed.date),
                Err(err) => log_warn!("movement summary for {} not delivered: {err}", closed.date),
            }
        }
    }

    let summary = construct_movement_summary(
        target.camera_id,
        snapshot.movement_seconds,
        target.user_id,
        snapshot
            .movement_date
            .unwrap_or_else(|| Local::now().date_naive()),
    );
    if let Err(err) = reporter.report(&summary).await {
        log_warn!("movement summary not delivered: {err}");
    }
}
