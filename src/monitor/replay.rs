//! File-backed camera and pose estimator, so the pipeline can run headless
//! against a recorded session.
//!
//! A track is JSON lines, one record per frame:
//!
//! ```text
//! {"timestamp":0.033,"nose":{"x":960,"y":310},"leftShoulder":{...},...,"framePath":"f0001.png"}
//! ```
//!
//! Points may be omitted where detection failed. A record with no points at
//! all is a frame where nobody was found. `framePath`, when present, is
//! resolved relative to the track file and loaded with `image`; otherwise the
//! frame is a blank canvas of the configured size.

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::models::{KeypointFrame, VideoFrame};

use super::source::{FrameSource, PoseEstimator};

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReplayRecord {
    #[serde(flatten)]
    pub keypoints: KeypointFrame,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_path: Option<PathBuf>,
}

impl ReplayRecord {
    fn has_subject(&self) -> bool {
        let k = &self.keypoints;
        k.nose.is_some()
            || k.left_shoulder.is_some()
            || k.right_shoulder.is_some()
            || k.left_hip.is_some()
            || k.right_hip.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct ReplayTrack {
    records: Vec<ReplayRecord>,
    base_dir: PathBuf,
}

impl ReplayTrack {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read replay track {}", path.display()))?;
        let base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let track = Self::parse(&raw, base_dir)
            .with_context(|| format!("invalid replay track {}", path.display()))?;
        log_info!("loaded replay track {} ({} frames)", path.display(), track.len());
        Ok(track)
    }

    /// Blank lines and `#` comments are skipped.
    pub fn parse(raw: &str, base_dir: PathBuf) -> Result<Self> {
        let mut records = Vec::new();
        for (idx, line) in raw.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let record: ReplayRecord = serde_json::from_str(line)
                .with_context(|| format!("line {}: malformed record", idx + 1))?;
            records.push(record);
        }
        Ok(Self { records, base_dir })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[ReplayRecord] {
        &self.records
    }

    /// Source and estimator over the same records. The estimator must be
    /// asked about frames in the order the source yields them.
    pub fn into_parts(
        self,
        width: u32,
        height: u32,
        pacing: Pacing,
    ) -> (ReplaySource, ReplayPoseEstimator) {
        let poses = self
            .records
            .iter()
            .map(|r| r.has_subject().then(|| r.keypoints.clone()))
            .collect();
        let source = ReplaySource {
            records: self.records.into(),
            base_dir: self.base_dir,
            width,
            height,
            pacing,
            last_timestamp: None,
        };
        (source, ReplayPoseEstimator { poses })
    }
}

/// Whether the replay sleeps between frames to match recorded timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Pacing {
    #[default]
    AsFastAsPossible,
    Realtime,
}

pub struct ReplaySource {
    records: VecDeque<ReplayRecord>,
    base_dir: PathBuf,
    width: u32,
    height: u32,
    pacing: Pacing,
    last_timestamp: Option<f64>,
}

impl FrameSource for ReplaySource {
    fn next_frame(&mut self) -> Result<Option<VideoFrame>> {
        let Some(record) = self.records.pop_front() else {
            return Ok(None);
        };
        let t = record.keypoints.timestamp;

        if self.pacing == Pacing::Realtime {
            if let Some(prev) = self.last_timestamp {
                let gap = t - prev;
                if gap.is_finite() && gap > 0.0 {
                    thread::sleep(Duration::from_secs_f64(gap));
                }
            }
        }
        self.last_timestamp = Some(t);

        let frame = match &record.frame_path {
            Some(rel) => {
                let path = self.base_dir.join(rel);
                let pixels = image::open(&path)
                    .with_context(|| format!("failed to load frame {}", path.display()))?
                    .to_rgb8();
                VideoFrame::new(pixels, t)
            }
            None => VideoFrame::blank(self.width, self.height, t),
        };
        Ok(Some(frame))
    }
}

pub struct ReplayPoseEstimator {
    poses: VecDeque<Option<KeypointFrame>>,
}

impl PoseEstimator for ReplayPoseEstimator {
    fn detect(&mut self, frame: &VideoFrame) -> Option<KeypointFrame> {
        let pose = self.poses.pop_front()?;
        if let Some(k) = &pose {
            if (k.timestamp - frame.captured_at).abs() > f64::EPSILON {
                log_warn!(
                    "replay pose at t={} paired with frame at t={}",
                    k.timestamp,
                    frame.captured_at
                );
            }
        }
        pose
    }
}
