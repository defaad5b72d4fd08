mod types;

pub use types::{DailyMovement, MonitorSnapshot, SystemMetrics};

use std::time::{Duration, Instant};
use sysinfo::{Pid, ProcessesToUpdate, System};

/// Frames-per-second over roughly one-second windows.
#[derive(Debug)]
pub struct FpsMeter {
    window_start: Instant,
    window_frames: u32,
    fps: f64,
}

impl FpsMeter {
    const WINDOW: Duration = Duration::from_secs(1);

    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    pub fn starting_at(now: Instant) -> Self {
        Self {
            window_start: now,
            window_frames: 0,
            fps: 0.0,
        }
    }

    pub fn tick(&mut self) -> f64 {
        self.tick_at(Instant::now())
    }

    pub fn tick_at(&mut self, now: Instant) -> f64 {
        self.window_frames += 1;
        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed >= Self::WINDOW {
            self.fps = self.window_frames as f64 / elapsed.as_secs_f64();
            self.window_start = now;
            self.window_frames = 0;
        }
        self.fps
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }
}

impl Default for FpsMeter {
    fn default() -> Self {
        Self::new()
    }
}

/// CPU and memory of this process.
pub struct SystemSampler {
    system: System,
    pid: Pid,
}

impl SystemSampler {
    pub fn new() -> Self {
        let mut system = System::new();
        let pid = Pid::from_u32(std::process::id());

        // Initial refresh to establish baseline for CPU calculation
        system.refresh_processes(ProcessesToUpdate::Some(&[pid]));

        Self { system, pid }
    }

    pub fn sample(&mut self) -> SystemMetrics {
        self.system
            .refresh_processes(ProcessesToUpdate::Some(&[self.pid]));

        match self.system.process(self.pid) {
            Some(process) => SystemMetrics {
                cpu_percent: process.cpu_usage(),
                memory_mb: process.memory() as f64 / 1024.0 / 1024.0,
            },
            None => SystemMetrics::default(),
        }
    }
}

impl Default for SystemSampler {
    fn default() -> Self {
        Self::new()
    }
}

/// One-line rendering of the operator overlay.
pub fn diagnostics_line(snapshot: &MonitorSnapshot, system: &SystemMetrics) -> String {
    format!(
        "status={} buf={}/{} ({}) fps={} moving={}s threshold_y={} frames={} no_pose={} clips={} dropped={} cpu={:.1}% mem={:.1}MB",
        snapshot.status,
        snapshot.buffer_len,
        snapshot.buffer_capacity,
        snapshot.recording_mode.as_str(),
        snapshot.fps.floor(),
        snapshot.movement_seconds.floor(),
        snapshot.alert_threshold_y.round(),
        snapshot.frames_processed,
        snapshot.frames_without_pose,
        snapshot.clips_completed,
        snapshot.clips_dropped,
        system.cpu_percent,
        system.memory_mb,
    )
}
