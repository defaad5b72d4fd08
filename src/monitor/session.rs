//! Everything carried from one frame to the next, in one place.
//!
//! `MonitorSession::process_frame` is the whole per-frame pipeline minus the
//! collaborators: evidence buffer admission, signal extraction, velocity,
//! state machine, and the buffer mode changes the machine asks for.

use chrono::{DateTime, Local, NaiveDate};

use crate::detection::{
    adaptive_threshold, body_anchors, deadband, DetectionConfig, Directive, FallStateMachine,
    FrameInput, SignalError, Transition, VelocityState,
};
use crate::metrics::{DailyMovement, MonitorSnapshot};
use crate::models::{FallEvent, FallStatus, KeypointFrame, RecordingMode, VideoFrame};
use crate::recording::{clip_filename, event_id, EvidenceBuffer, RecordingConfig};
use crate::reporting::{construct_alert, video_reference, DeliveryJob};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

/// Who and where, stamped into clip names and alerts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    pub patient_name: String,
    pub camera_id: u32,
    pub video_base_url: String,
}

#[derive(Debug, Default)]
pub struct FrameOutcome {
    /// Present when the frame carried a usable pose.
    pub transition: Option<Transition>,
    /// Why the frame did not update some or all signals.
    pub signal_error: Option<SignalError>,
    /// Set when a missing-pose streak flagged an occlusion.
    pub occlusion: Option<FallStatus>,
    /// A capture reached full length on this frame.
    pub completed: Option<DeliveryJob>,
}

pub struct MonitorSession {
    identity: SessionIdentity,
    detection: DetectionConfig,
    machine: FallStateMachine,
    buffer: EvidenceBuffer,
    nose_velocity: VelocityState,
    hip_velocity: VelocityState,
    last_nose_y: Option<f64>,
    last_hip_center_x: Option<f64>,
    alert_threshold_y: f64,
    pending: Option<FallEvent>,
    movement_date: Option<NaiveDate>,
    closed_day: Option<DailyMovement>,
    frames_processed: u64,
    frames_without_pose: u64,
    clips_completed: u64,
}

impl MonitorSession {
    pub fn new(
        identity: SessionIdentity,
        detection: DetectionConfig,
        recording: &RecordingConfig,
    ) -> Self {
        let machine =
            FallStateMachine::new(detection.clone(), recording.recovery_abandons_capture);
        Self {
            identity,
            alert_threshold_y: detection.base_threshold_y,
            detection,
            machine,
            buffer: EvidenceBuffer::new(recording.rolling_capacity, recording.capture_capacity),
            nose_velocity: VelocityState::new(),
            hip_velocity: VelocityState::new(),
            last_nose_y: None,
            last_hip_center_x: None,
            pending: None,
            movement_date: None,
            closed_day: None,
            frames_processed: 0,
            frames_without_pose: 0,
            clips_completed: 0,
        }
    }

    pub fn status(&self) -> FallStatus {
        self.machine.status()
    }

    pub fn recording_mode(&self) -> RecordingMode {
        self.buffer.mode()
    }

    pub fn buffer_len(&self) -> usize {
        self.buffer.len()
    }

    pub fn alert_threshold_y(&self) -> f64 {
        self.alert_threshold_y
    }

    pub fn movement_seconds(&self) -> f64 {
        self.machine.movement_seconds()
    }

    pub fn pending_event(&self) -> Option<&FallEvent> {
        self.pending.as_ref()
    }

    pub fn process_frame(
        &mut self,
        frame: VideoFrame,
        keypoints: Option<&KeypointFrame>,
        wall_clock: DateTime<Local>,
    ) -> FrameOutcome {
        self.frames_processed += 1;
        self.roll_day(wall_clock.date_naive());
        let mut outcome = FrameOutcome {
            completed: self.admit(frame),
            ..FrameOutcome::default()
        };

        let pose = keypoints.map(|k| (k, body_anchors(k)));
        let (keypoints, anchors) = match pose {
            Some((keypoints, Ok(anchors))) => (keypoints, anchors),
            Some((_, Err(err))) => return self.skip_frame(outcome, err),
            None => return self.skip_frame(outcome, SignalError::MissingKeypoints),
        };

        match adaptive_threshold(anchors.torso_height(), &self.detection) {
            Ok(estimate) => self.alert_threshold_y = estimate.alert_threshold_y,
            Err(err) => {
                log_debug!("keeping threshold {:.1}: {err}", self.alert_threshold_y);
                outcome.signal_error = Some(err);
            }
        }

        let nose_y = anchors.nose.y;
        let hip_center_x = anchors.hip_center_x();
        let vertical_velocity = deadband(
            self.nose_velocity.update(nose_y, keypoints.timestamp),
            self.detection.vertical_deadband,
        );
        let horizontal_velocity = deadband(
            self.hip_velocity.update(hip_center_x, keypoints.timestamp),
            self.detection.horizontal_deadband,
        );

        let input = FrameInput {
            nose_y,
            hip_center_x,
            vertical_velocity,
            horizontal_velocity,
            alert_threshold_y: self.alert_threshold_y,
            previous_nose_y: self.last_nose_y,
            previous_hip_center_x: self.last_hip_center_x,
        };
        let transition = self.machine.step(&input);

        for directive in &transition.directives {
            match directive {
                Directive::StartCapture => {
                    self.buffer.start_capture();
                    let event = self.new_event(&wall_clock);
                    log_info!(
                        "fall detected: nose_y={nose_y:.1} threshold={:.1} v={vertical_velocity:.0}px/s, capturing {}",
                        self.alert_threshold_y,
                        event.clip_filename
                    );
                    self.pending = Some(event);
                }
                Directive::AbandonCapture => {
                    if let Some(event) = self.pending.take() {
                        log_info!("recovered before clip {} completed; discarding", event.clip_filename);
                    }
                    self.buffer.abandon();
                }
            }
        }

        if transition.changed() {
            if transition.status.is_alarm() {
                log_warn!("status {} -> {}", transition.previous, transition.status);
            } else {
                log_info!("status {} -> {}", transition.previous, transition.status);
            }
        }

        self.last_nose_y = Some(nose_y);
        self.last_hip_center_x = Some(hip_center_x);
        outcome.transition = Some(transition);
        outcome
    }

    /// Drop any in-flight capture. Used on shutdown.
    pub fn abandon_capture(&mut self) -> Option<FallEvent> {
        self.buffer.abandon();
        self.machine.capture_finished();
        self.pending.take()
    }

    pub fn snapshot(&self, fps: f64, clips_dropped: u64) -> MonitorSnapshot {
        MonitorSnapshot {
            status: self.status(),
            recording_mode: self.buffer.mode(),
            buffer_len: self.buffer.len(),
            buffer_capacity: self.buffer.capacity(),
            fps,
            movement_seconds: self.movement_seconds(),
            movement_date: self.movement_date,
            closed_day: self.closed_day,
            alert_threshold_y: self.alert_threshold_y,
            frames_processed: self.frames_processed,
            frames_without_pose: self.frames_without_pose,
            clips_completed: self.clips_completed,
            clips_dropped,
        }
    }

    /// Close out the movement tally when the local date changes.
    fn roll_day(&mut self, today: NaiveDate) {
        match self.movement_date {
            Some(day) if day != today => {
                let closed = DailyMovement {
                    date: day,
                    movement_seconds: self.machine.movement_seconds(),
                };
                log_info!(
                    "movement for {day}: {:.0}s; starting a new tally for {today}",
                    closed.movement_seconds
                );
                self.closed_day = Some(closed);
                self.machine.reset_movement();
                self.movement_date = Some(today);
            }
            Some(_) => {}
            None => self.movement_date = Some(today),
        }
    }

    /// No usable pose: statuses and velocity history carry forward untouched.
    fn skip_frame(&mut self, mut outcome: FrameOutcome, err: SignalError) -> FrameOutcome {
        self.frames_without_pose += 1;
        outcome.signal_error = Some(err);
        outcome.occlusion = self.machine.observe_missing();
        if let Some(status) = outcome.occlusion {
            log_warn!("pose lost for too long, status now {status}");
        }
        outcome
    }

    fn admit(&mut self, frame: VideoFrame) -> Option<DeliveryJob> {
        let frames = self.buffer.admit(frame)?;
        self.machine.capture_finished();
        self.clips_completed += 1;
        match self.pending.take() {
            Some(event) => {
                log_info!("clip {} complete ({} frames)", event.clip_filename, frames.len());
                Some(DeliveryJob::new(event, frames))
            }
            None => {
                log_warn!("capture finished with no pending event; dropping {} frames", frames.len());
                None
            }
        }
    }

    fn new_event(&self, wall_clock: &DateTime<Local>) -> FallEvent {
        let event_id = event_id(wall_clock);
        let clip_filename =
            clip_filename(&self.identity.patient_name, self.identity.camera_id, wall_clock);
        let reference = video_reference(&self.identity.video_base_url, &clip_filename);
        let alert = construct_alert(self.identity.camera_id, &event_id, &reference);
        FallEvent {
            event_id,
            clip_filename,
            alert,
        }
    }
}
