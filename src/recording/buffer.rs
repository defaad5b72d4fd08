//! Evidence buffer: a sliding window of recent frames that turns into an
//! append-only clip once a fall is confirmed.

use std::collections::VecDeque;

use crate::models::{RecordingMode, VideoFrame};

#[derive(Debug)]
pub struct EvidenceBuffer {
    frames: VecDeque<VideoFrame>,
    mode: RecordingMode,
    rolling_capacity: usize,
    capture_capacity: usize,
}

impl EvidenceBuffer {
    pub fn new(rolling_capacity: usize, capture_capacity: usize) -> Self {
        let rolling_capacity = rolling_capacity.max(1);
        let capture_capacity = capture_capacity.max(rolling_capacity);
        Self {
            frames: VecDeque::with_capacity(capture_capacity),
            mode: RecordingMode::Rolling,
            rolling_capacity,
            capture_capacity,
        }
    }

    pub fn mode(&self) -> RecordingMode {
        self.mode
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Capacity for the current mode.
    pub fn capacity(&self) -> usize {
        match self.mode {
            RecordingMode::Rolling => self.rolling_capacity,
            RecordingMode::Capturing => self.capture_capacity,
        }
    }

    /// Add a frame under the current mode's policy. Returns the finished clip
    /// when a capture reaches capacity; the buffer is rolling and empty again
    /// afterwards.
    pub fn admit(&mut self, frame: VideoFrame) -> Option<Vec<VideoFrame>> {
        match self.mode {
            RecordingMode::Rolling => {
                while self.frames.len() >= self.rolling_capacity {
                    self.frames.pop_front();
                }
                self.frames.push_back(frame);
                None
            }
            RecordingMode::Capturing => {
                self.frames.push_back(frame);
                if self.frames.len() >= self.capture_capacity {
                    let clip: Vec<VideoFrame> = self.frames.drain(..).collect();
                    self.mode = RecordingMode::Rolling;
                    Some(clip)
                } else {
                    None
                }
            }
        }
    }

    /// Stop evicting and grow toward the clip length. Frames already in the
    /// window become the clip's pre-event context.
    pub fn start_capture(&mut self) {
        self.mode = RecordingMode::Capturing;
    }

    /// Throw away everything, including an unfinished capture.
    pub fn abandon(&mut self) {
        self.frames.clear();
        self.mode = RecordingMode::Rolling;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(t: f64) -> VideoFrame {
        VideoFrame::blank(4, 4, t)
    }

    fn fill(buffer: &mut EvidenceBuffer, from: usize, count: usize) -> Vec<Vec<VideoFrame>> {
        (from..from + count)
            .filter_map(|i| buffer.admit(frame(i as f64)))
            .collect()
    }

    #[test]
    fn rolling_window_evicts_oldest() {
        let mut buffer = EvidenceBuffer::new(100, 200);
        assert!(fill(&mut buffer, 0, 100).is_empty());
        assert_eq!(buffer.len(), 100);

        assert!(buffer.admit(frame(100.0)).is_none());
        assert_eq!(buffer.len(), 100);
        assert_eq!(buffer.frames.front().map(|f| f.captured_at), Some(1.0));
        assert_eq!(buffer.frames.back().map(|f| f.captured_at), Some(100.0));
    }

    #[test]
    fn capture_completes_at_capture_capacity_with_pre_roll() {
        let mut buffer = EvidenceBuffer::new(100, 200);
        fill(&mut buffer, 0, 150);
        buffer.start_capture();
        assert_eq!(buffer.mode(), RecordingMode::Capturing);
        assert_eq!(buffer.capacity(), 200);

        assert!(fill(&mut buffer, 150, 99).is_empty());
        assert_eq!(buffer.len(), 199);

        let clip = buffer.admit(frame(249.0)).expect("clip should complete");
        assert_eq!(clip.len(), 200);
        assert_eq!(clip.first().map(|f| f.captured_at), Some(50.0));
        assert_eq!(clip.last().map(|f| f.captured_at), Some(249.0));

        assert_eq!(buffer.mode(), RecordingMode::Rolling);
        assert!(buffer.is_empty());
        assert_eq!(buffer.capacity(), 100);
    }

    #[test]
    fn capture_from_empty_takes_full_length() {
        let mut buffer = EvidenceBuffer::new(100, 200);
        buffer.start_capture();
        let clips = fill(&mut buffer, 0, 200);
        assert_eq!(clips.len(), 1);
        assert_eq!(clips[0].len(), 200);
    }

    #[test]
    fn abandon_clears_and_rolls() {
        let mut buffer = EvidenceBuffer::new(100, 200);
        fill(&mut buffer, 0, 120);
        buffer.start_capture();
        fill(&mut buffer, 120, 30);

        buffer.abandon();
        assert!(buffer.is_empty());
        assert_eq!(buffer.mode(), RecordingMode::Rolling);
        assert!(fill(&mut buffer, 150, 250).is_empty());
        assert_eq!(buffer.len(), 100);
    }

    #[test]
    fn clip_shares_pixels_instead_of_copying() {
        let mut buffer = EvidenceBuffer::new(2, 3);
        let first = frame(0.0);
        buffer.admit(first.clone());
        buffer.start_capture();
        buffer.admit(frame(1.0));
        let clip = buffer.admit(frame(2.0)).expect("clip");
        assert!(std::sync::Arc::ptr_eq(&clip[0].pixels, &first.pixels));
    }
}
