//! Bounded per-speaker frame queues with lossy backpressure.
//!
//! Enqueueing never blocks and never fails: when a speaker's queue is full
//! the oldest frame is evicted before the new one is inserted, bounding
//! memory while prioritizing recency over completeness. Overflow is not an
//! error condition and produces no event beyond a drop counter.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::trace;

/// A fixed-format chunk of mono float samples.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrame {
    /// Mono samples in the range [-1.0, 1.0].
    pub samples: Vec<f32>,
    /// Sample rate in Hz (16 kHz for STT).
    pub sample_rate: u32,
}

impl AudioFrame {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Duration of this frame in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Per-speaker bounded queues of inbound audio frames.
pub struct FrameBuffer {
    capacity: usize,
    queues: Mutex<HashMap<String, VecDeque<AudioFrame>>>,
    dropped_frames: AtomicU64,
}

impl FrameBuffer {
    /// Create a frame buffer where each speaker's queue holds at most
    /// `capacity` frames.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            queues: Mutex::new(HashMap::new()),
            dropped_frames: AtomicU64::new(0),
        }
    }

    /// Enqueue a frame for a speaker. Non-blocking; always succeeds.
    ///
    /// Evicts the speaker's oldest frame first when the queue is at capacity.
    pub fn push(&self, speaker_id: &str, frame: AudioFrame) {
        let mut queues = self.queues.lock();
        let queue = queues.entry(speaker_id.to_string()).or_default();
        if queue.len() >= self.capacity {
            queue.pop_front();
            self.dropped_frames.fetch_add(1, Ordering::Relaxed);
            trace!(speaker = %speaker_id, "frame queue full, evicted oldest frame");
        }
        queue.push_back(frame);
    }

    /// Atomically remove and return all buffered frames for a speaker.
    ///
    /// Returns an empty vector for an unknown speaker. The speaker stays
    /// registered until [`FrameBuffer::forget`] so the poll loop keeps
    /// seeing it between bursts.
    pub fn drain(&self, speaker_id: &str) -> Vec<AudioFrame> {
        let mut queues = self.queues.lock();
        match queues.get_mut(speaker_id) {
            Some(queue) => queue.drain(..).collect(),
            None => Vec::new(),
        }
    }

    /// Drop all state for a speaker (transport disconnect).
    pub fn forget(&self, speaker_id: &str) {
        self.queues.lock().remove(speaker_id);
    }

    /// Snapshot of currently known speaker ids.
    pub fn speakers(&self) -> Vec<String> {
        self.queues.lock().keys().cloned().collect()
    }

    /// Number of frames currently buffered for a speaker.
    pub fn len(&self, speaker_id: &str) -> usize {
        self.queues
            .lock()
            .get(speaker_id)
            .map(VecDeque::len)
            .unwrap_or(0)
    }

    /// Total frames evicted due to overflow since startup.
    pub fn dropped_frames(&self) -> u64 {
        self.dropped_frames.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(tag: f32) -> AudioFrame {
        AudioFrame::new(vec![tag; 160], 16_000)
    }

    #[test]
    fn test_frame_duration() {
        let f = AudioFrame::new(vec![0.0; 16_000], 16_000);
        assert_eq!(f.duration_secs(), 1.0);
        let empty = AudioFrame::new(Vec::new(), 0);
        assert_eq!(empty.duration_secs(), 0.0);
    }

    #[test]
    fn test_push_and_drain_preserves_order() {
        let buffer = FrameBuffer::new(8);
        buffer.push("alice", frame(1.0));
        buffer.push("alice", frame(2.0));
        buffer.push("alice", frame(3.0));

        let drained = buffer.drain("alice");
        assert_eq!(drained.len(), 3);
        assert_eq!(drained[0].samples[0], 1.0);
        assert_eq!(drained[2].samples[0], 3.0);

        // Drain is destructive.
        assert!(buffer.drain("alice").is_empty());
    }

    #[test]
    fn test_drain_unknown_speaker_is_empty() {
        let buffer = FrameBuffer::new(8);
        assert!(buffer.drain("nobody").is_empty());
    }

    #[test]
    fn test_overflow_evicts_oldest() {
        // 801 frames pushed with capacity 800: the buffer still holds exactly
        // 800 and frame #1 is the one missing.
        let buffer = FrameBuffer::new(800);
        for i in 0..801 {
            buffer.push("alice", frame(i as f32));
        }
        assert_eq!(buffer.len("alice"), 800);
        assert_eq!(buffer.dropped_frames(), 1);

        let drained = buffer.drain("alice");
        assert_eq!(drained[0].samples[0], 1.0);
        assert_eq!(drained[799].samples[0], 800.0);
    }

    #[test]
    fn test_speakers_are_isolated() {
        let buffer = FrameBuffer::new(2);
        buffer.push("alice", frame(1.0));
        buffer.push("alice", frame(2.0));
        buffer.push("alice", frame(3.0)); // evicts alice's oldest
        buffer.push("bob", frame(9.0));

        assert_eq!(buffer.len("alice"), 2);
        assert_eq!(buffer.len("bob"), 1);
        assert_eq!(buffer.drain("bob")[0].samples[0], 9.0);
    }

    #[test]
    fn test_forget_removes_speaker() {
        let buffer = FrameBuffer::new(4);
        buffer.push("alice", frame(1.0));
        assert_eq!(buffer.speakers(), vec!["alice".to_string()]);

        buffer.forget("alice");
        assert!(buffer.speakers().is_empty());
        assert!(buffer.drain("alice").is_empty());
    }

    #[test]
    fn test_speaker_stays_known_after_drain() {
        let buffer = FrameBuffer::new(4);
        buffer.push("alice", frame(1.0));
        let _ = buffer.drain("alice");
        // Still known to the poll loop until forget().
        assert_eq!(buffer.speakers(), vec!["alice".to_string()]);
    }
}
