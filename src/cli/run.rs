use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use log::{info, warn};

use crate::monitor::{
    MonitorCollaborators, MonitorController, MonitorInput, MonitorSummary, Pacing, ReplayTrack,
};
use crate::recording::{ClipSink, FfmpegClipSink, LoggingClipSink};
use crate::reporting::{
    AlertSender, BlobUploader, ClipUploader, DeliveryCollaborators, HttpAlertSender,
    LocalOnlyUploader, LoggingAlertSender, LoggingMovementReporter,
};
use crate::settings::{MonitorSettings, SettingsStore};

use super::args::Cli;

/// Settings file, then environment, then command line.
pub fn resolve_settings(cli: &Cli) -> Result<MonitorSettings> {
    let first_run = !cli.settings.exists();
    let store = SettingsStore::new(cli.settings.clone())?;
    if first_run {
        // Written before env overrides so credentials never land on disk.
        store.update(store.settings())?;
        info!("wrote default settings to {}", cli.settings.display());
    }
    let mut settings = store.settings();
    settings.apply_env_overrides();
    if let Some(dir) = &cli.output_dir {
        settings.recording.output_dir = dir.clone();
    }
    Ok(settings)
}

pub fn build_collaborators(
    settings: &MonitorSettings,
    dry_run: bool,
) -> Result<MonitorCollaborators> {
    let recording = &settings.recording;
    let encoder = FfmpegClipSink::new(recording.clip_fps, recording.clip_width, recording.clip_height)
        .map(|sink| sink.with_timeout(Duration::from_secs(recording.encode_timeout_secs)));
    let sink = clip_sink(encoder, dry_run)?;

    let (uploader, alerts): (Arc<dyn ClipUploader>, Arc<dyn AlertSender>) = if dry_run {
        info!("dry run: clips stay in {}, alerts are logged", recording.output_dir.display());
        (Arc::new(LocalOnlyUploader), Arc::new(LoggingAlertSender))
    } else {
        let timeout = Duration::from_secs(settings.reporting.request_timeout_secs.max(1));
        let uploader: Arc<dyn ClipUploader> =
            match BlobUploader::new(&settings.reporting.storage, timeout) {
                Ok(uploader) => Arc::new(uploader),
                Err(err) => {
                    warn!("clip upload disabled ({err}); clips stay local");
                    Arc::new(LocalOnlyUploader)
                }
            };
        let alerts = HttpAlertSender::new(settings.reporting.alert_url.clone(), timeout)
            .context("failed to build alert client")?;
        (uploader, Arc::new(alerts))
    };

    Ok(MonitorCollaborators {
        delivery: DeliveryCollaborators {
            sink,
            uploader,
            alerts,
            output_dir: recording.output_dir.clone(),
        },
        movement: Arc::new(LoggingMovementReporter),
    })
}

/// A dry run tolerates a missing encoder and only logs clips.
fn clip_sink(encoder: Result<FfmpegClipSink>, dry_run: bool) -> Result<Arc<dyn ClipSink>> {
    match encoder {
        Ok(sink) => Ok(Arc::new(sink)),
        Err(err) if dry_run => {
            warn!("{err:#}; dry run will not encode clips");
            Ok(Arc::new(LoggingClipSink))
        }
        Err(err) => Err(err),
    }
}

/// Replay a recorded track through the monitor until it ends or Ctrl-C.
pub async fn run_monitor(cli: Cli) -> Result<MonitorSummary> {
    let settings = resolve_settings(&cli)?;
    let collaborators = build_collaborators(&settings, cli.dry_run)?;

    let track = ReplayTrack::load(&cli.replay)?;
    let pacing = if cli.realtime {
        Pacing::Realtime
    } else {
        Pacing::AsFastAsPossible
    };
    let (source, estimator) = track.into_parts(settings.frame_width, settings.frame_height, pacing);

    let mut controller = MonitorController::new();
    controller.start(
        &settings,
        MonitorInput {
            source: Box::new(source),
            estimator: Box::new(estimator),
        },
        collaborators,
    )?;

    tokio::select! {
        _ = controller.finished() => info!("replay finished"),
        res = tokio::signal::ctrl_c() => {
            res.context("failed to listen for Ctrl-C")?;
            info!("interrupted, stopping monitor");
        }
    }

    let summary = controller
        .stop()
        .await?
        .context("monitor was not running")?;
    info!(
        "{} frames, {} clips delivered, {} alerts sent, {} clips dropped, {} delivery failures",
        summary.loop_summary.frames,
        summary.delivery.clips_written,
        summary.delivery.alerts_sent,
        summary.loop_summary.clips_dropped,
        summary.delivery.failures
    );
    Ok(summary)
}
