use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, TimeZone};
use image::imageops::{self, FilterType};

use crate::models::VideoFrame;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

const EVENT_ID_FORMAT: &str = "%Y%m%d-%H%M%S";

/// `YYYYMMDD-HHMMSS` of the trigger time. Sub-second precision is dropped.
pub fn event_id<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    at.format(EVENT_ID_FORMAT).to_string()
}

/// `{patient}-{camera}-{YYYYMMDD-HHMMSS}.mp4`
pub fn clip_filename<Tz: TimeZone>(patient_name: &str, camera_id: u32, at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("{patient_name}-{camera_id}-{}.mp4", event_id(at))
}

/// Encodes a finished clip and persists it before returning.
pub trait ClipSink: Send + Sync {
    fn finalize_clip(&self, frames: &[VideoFrame], path: &Path) -> Result<()>;
}

/// Pipes raw RGB frames into an `ffmpeg` child producing H.264 mp4.
#[derive(Debug, Clone)]
pub struct FfmpegClipSink {
    binary: PathBuf,
    fps: u32,
    width: u32,
    height: u32,
    timeout: Duration,
}

impl FfmpegClipSink {
    const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);
    const POLL_INTERVAL: Duration = Duration::from_millis(50);

    pub fn new(fps: u32, width: u32, height: u32) -> Result<Self> {
        let binary = which::which("ffmpeg").context("ffmpeg not found on PATH")?;
        Ok(Self::with_binary(binary, fps, width, height))
    }

    pub fn with_binary(binary: PathBuf, fps: u32, width: u32, height: u32) -> Self {
        Self {
            binary,
            fps: fps.max(1),
            width,
            height,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Kill the encoder if it has not exited this long after spawning.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout.max(Duration::from_secs(1));
        self
    }

    fn args(&self, path: &Path) -> Vec<String> {
        vec![
            "-y".into(),
            "-loglevel".into(),
            "error".into(),
            "-f".into(),
            "rawvideo".into(),
            "-pix_fmt".into(),
            "rgb24".into(),
            "-s".into(),
            format!("{}x{}", self.width, self.height),
            "-r".into(),
            self.fps.to_string(),
            "-i".into(),
            "-".into(),
            "-c:v".into(),
            "libx264".into(),
            "-pix_fmt".into(),
            "yuv420p".into(),
            "-movflags".into(),
            "+faststart".into(),
            path.to_string_lossy().into_owned(),
        ]
    }

    fn write_frames(&self, mut stdin: ChildStdin, frames: &[VideoFrame]) -> io::Result<()> {
        for frame in frames {
            if frame.width() == self.width && frame.height() == self.height {
                stdin.write_all(frame.pixels.as_raw())?;
            } else {
                let resized =
                    imageops::resize(&*frame.pixels, self.width, self.height, FilterType::Triangle);
                stdin.write_all(resized.as_raw())?;
            }
        }
        stdin.flush()
    }

    /// `None` when the deadline passed and the child was killed.
    fn wait_until_deadline(&self, child: &mut Child) -> Result<Option<ExitStatus>> {
        let deadline = Instant::now() + self.timeout;
        loop {
            if let Some(status) = child.try_wait().context("failed to poll ffmpeg")? {
                return Ok(Some(status));
            }
            if Instant::now() >= deadline {
                log_warn!(
                    "ffmpeg still running after {}s, killing it",
                    self.timeout.as_secs()
                );
                let _ = child.kill();
                let _ = child.wait();
                return Ok(None);
            }
            thread::sleep(Self::POLL_INTERVAL);
        }
    }
}

impl ClipSink for FfmpegClipSink {
    fn finalize_clip(&self, frames: &[VideoFrame], path: &Path) -> Result<()> {
        if frames.is_empty() {
            bail!("refusing to encode an empty clip");
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create clip directory {}", parent.display()))?;
        }

        log_debug!(
            "encoding {} frames to {} at {}fps",
            frames.len(),
            path.display(),
            self.fps
        );

        let mut child = Command::new(&self.binary)
            .args(self.args(path))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .context("failed to spawn ffmpeg")?;

        let stdin = child.stdin.take().ok_or_else(|| anyhow!("ffmpeg stdin unavailable"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| anyhow!("ffmpeg stderr unavailable"))?;

        // Frames are streamed and stderr drained on their own threads so the
        // deadline holds even when ffmpeg stops reading.
        let (status, written, diagnostics) = thread::scope(|scope| {
            let writer = scope.spawn(|| self.write_frames(stdin, frames));
            let reader = scope.spawn(move || {
                let mut text = String::new();
                let _ = stderr.read_to_string(&mut text);
                text
            });

            let status = self.wait_until_deadline(&mut child);
            let written = writer
                .join()
                .unwrap_or_else(|_| Err(io::Error::other("frame writer panicked")));
            let diagnostics = reader.join().unwrap_or_default();
            (status, written, diagnostics)
        });
        let diagnostics = diagnostics.trim();

        let Some(status) = status? else {
            bail!(
                "ffmpeg timed out after {}s: {diagnostics}",
                self.timeout.as_secs()
            );
        };
        if !status.success() {
            bail!("ffmpeg exited with {status}: {diagnostics}");
        }
        written.context("failed to stream frames to ffmpeg")?;

        log_info!("clip written to {}", path.display());
        Ok(())
    }
}

/// Logs clips instead of encoding them. Used for dry runs without ffmpeg.
pub struct LoggingClipSink;

impl ClipSink for LoggingClipSink {
    fn finalize_clip(&self, frames: &[VideoFrame], path: &Path) -> Result<()> {
        log_info!(
            "[dry-run] would encode {} frames to {}",
            frames.len(),
            path.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, NaiveDate};

    fn at() -> DateTime<FixedOffset> {
        let offset = FixedOffset::east_opt(3600).unwrap();
        let naive = NaiveDate::from_ymd_opt(2024, 3, 7)
            .unwrap()
            .and_hms_milli_opt(9, 5, 42, 870)
            .unwrap();
        offset.from_local_datetime(&naive).unwrap()
    }

    #[test]
    fn filename_floors_to_seconds() {
        assert_eq!(event_id(&at()), "20240307-090542");
        assert_eq!(clip_filename("bob", 1, &at()), "bob-1-20240307-090542.mp4");
    }

    #[test]
    fn ffmpeg_args_describe_raw_input() {
        let sink = FfmpegClipSink::with_binary(PathBuf::from("ffmpeg"), 20, 1920, 1080);
        let args = sink.args(Path::new("/tmp/out.mp4"));

        let pos = |flag: &str| args.iter().position(|a| a == flag).unwrap();
        assert_eq!(args[pos("-s") + 1], "1920x1080");
        assert_eq!(args[pos("-r") + 1], "20");
        assert_eq!(args.last().map(String::as_str), Some("/tmp/out.mp4"));
    }

    #[cfg(unix)]
    fn stub_encoder(dir: &Path, script: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("ffmpeg");
        std::fs::write(&path, format!("#!/bin/sh\n{script}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[test]
    fn encoder_failure_reports_its_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let binary = stub_encoder(
            dir.path(),
            "echo \"Unknown encoder 'libx264'\" >&2\nexit 1",
        );
        let sink = FfmpegClipSink::with_binary(binary, 20, 1920, 1080);
        let frames: Vec<VideoFrame> = (0..5)
            .map(|i| VideoFrame::blank(1920, 1080, i as f64))
            .collect();

        let err = sink
            .finalize_clip(&frames, &dir.path().join("out.mp4"))
            .unwrap_err();
        let message = format!("{err:#}");
        assert!(message.contains("Unknown encoder 'libx264'"), "{message}");
        assert!(message.contains("exited with"), "{message}");
    }

    #[cfg(unix)]
    #[test]
    fn hung_encoder_is_killed_at_deadline() {
        let dir = tempfile::tempdir().unwrap();
        let binary = stub_encoder(dir.path(), "exec sleep 30");
        let sink = FfmpegClipSink::with_binary(binary, 20, 4, 4).with_timeout(Duration::from_secs(1));
        let frames = vec![VideoFrame::blank(4, 4, 0.0)];

        let started = Instant::now();
        let err = sink
            .finalize_clip(&frames, &dir.path().join("out.mp4"))
            .unwrap_err();
        assert!(format!("{err:#}").contains("timed out"));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[cfg(unix)]
    #[test]
    fn successful_encoder_consumes_all_frames() {
        let dir = tempfile::tempdir().unwrap();
        let binary = stub_encoder(dir.path(), "cat > /dev/null");
        let sink = FfmpegClipSink::with_binary(binary, 20, 8, 8);
        // Mismatched sizes go through the resize path.
        let frames = vec![VideoFrame::blank(8, 8, 0.0), VideoFrame::blank(16, 4, 0.05)];

        sink.finalize_clip(&frames, &dir.path().join("clips/out.mp4"))
            .unwrap();
        assert!(dir.path().join("clips").is_dir());
    }

    #[test]
    fn logging_sink_accepts_any_clip() {
        let frames = vec![VideoFrame::blank(2, 2, 0.0)];
        assert!(LoggingClipSink
            .finalize_clip(&frames, Path::new("/nonexistent/clip.mp4"))
            .is_ok());
    }

    #[test]
    fn empty_clip_is_rejected() {
        let sink = FfmpegClipSink::with_binary(PathBuf::from("ffmpeg"), 20, 4, 4);
        assert!(sink.finalize_clip(&[], Path::new("/tmp/never.mp4")).is_err());
    }
}
