//! Per-speaker utterance state.
//!
//! At most one utterance is live per speaker at a time. The state is
//! interior-mutable (atomics for flags and counters, locks for the buffer
//! and timestamps) because it is shared between the segmenter loop, the
//! partial transcriber task, and the finalizer snapshot.
//!
//! # Invariants
//!
//! - `partial_sequence` is strictly increasing within one `utterance_id` and
//!   is reset at every activation.
//! - The buffer is cleared and the id regenerated exactly at the
//!   IDLE -> ACTIVE transition.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

use parking_lot::RwLock;
use uuid::Uuid;

use super::frame_buffer::AudioFrame;

/// Snapshot taken at utterance end, consumed by the finalizer.
#[derive(Debug)]
pub struct FinalizedUtterance {
    pub utterance_id: String,
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub started_at: Instant,
}

impl FinalizedUtterance {
    /// Duration of the buffered audio in seconds.
    pub fn audio_duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// State of one speaker's in-progress utterance.
pub struct UtteranceState {
    sample_rate: u32,
    utterance_id: RwLock<String>,

    /// Flat sample buffer accumulated since utterance start. Distinct from
    /// the inbound frame queue; owned by this state while active.
    buffer: RwLock<Vec<f32>>,

    is_active: AtomicBool,
    started_at: RwLock<Option<Instant>>,
    last_audio_at: RwLock<Option<Instant>>,
    total_samples: AtomicU64,

    first_partial_sent: AtomicBool,
    last_partial_sent_at: RwLock<Option<Instant>>,
    /// Incremented only on successful partial emission; emitted values
    /// therefore start at 1.
    partial_sequence: AtomicU64,
    /// Records whether the first partial beat the aggressive threshold.
    /// Observability only.
    ultra_fast_triggered: AtomicBool,
    /// Last emitted partial text, for consecutive-duplicate suppression.
    last_partial_text: RwLock<Option<String>>,
}

impl UtteranceState {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            utterance_id: RwLock::new(Uuid::new_v4().to_string()),
            buffer: RwLock::new(Vec::new()),
            is_active: AtomicBool::new(false),
            started_at: RwLock::new(None),
            last_audio_at: RwLock::new(None),
            total_samples: AtomicU64::new(0),
            first_partial_sent: AtomicBool::new(false),
            last_partial_sent_at: RwLock::new(None),
            partial_sequence: AtomicU64::new(0),
            ultra_fast_triggered: AtomicBool::new(false),
            last_partial_text: RwLock::new(None),
        }
    }

    /// IDLE -> ACTIVE: start a new utterance seeded with the triggering frame.
    ///
    /// Generates a fresh `utterance_id`, clears the buffer, and resets all
    /// partial-emission bookkeeping.
    pub fn activate(&self, frame: &AudioFrame) {
        let now = Instant::now();
        *self.utterance_id.write() = Uuid::new_v4().to_string();
        {
            let mut buffer = self.buffer.write();
            buffer.clear();
            buffer.extend_from_slice(&frame.samples);
        }
        self.total_samples
            .store(frame.samples.len() as u64, Ordering::Release);
        *self.started_at.write() = Some(now);
        *self.last_audio_at.write() = Some(now);
        self.first_partial_sent.store(false, Ordering::Release);
        *self.last_partial_sent_at.write() = None;
        self.partial_sequence.store(0, Ordering::Release);
        self.ultra_fast_triggered.store(false, Ordering::Release);
        *self.last_partial_text.write() = None;
        self.is_active.store(true, Ordering::Release);
    }

    /// ACTIVE -> ACTIVE: append a frame to the running utterance.
    pub fn append(&self, frame: &AudioFrame) {
        self.buffer.write().extend_from_slice(&frame.samples);
        self.total_samples
            .fetch_add(frame.samples.len() as u64, Ordering::AcqRel);
        *self.last_audio_at.write() = Some(Instant::now());
    }

    /// ACTIVE -> IDLE: snapshot the full buffer and reset to an idle
    /// placeholder. A fresh `utterance_id` is generated at the next
    /// activation.
    pub fn deactivate(&self) -> FinalizedUtterance {
        self.is_active.store(false, Ordering::Release);
        let utterance_id = self.utterance_id.read().clone();
        let samples = std::mem::take(&mut *self.buffer.write());
        let started_at = self.started_at.write().take().unwrap_or_else(Instant::now);
        *self.last_audio_at.write() = None;
        self.total_samples.store(0, Ordering::Release);

        FinalizedUtterance {
            utterance_id,
            samples,
            sample_rate: self.sample_rate,
            started_at,
        }
    }

    pub fn is_active(&self) -> bool {
        self.is_active.load(Ordering::Acquire)
    }

    pub fn utterance_id(&self) -> String {
        self.utterance_id.read().clone()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn total_samples(&self) -> u64 {
        self.total_samples.load(Ordering::Acquire)
    }

    /// Wall-clock age of the utterance in seconds; 0 when idle.
    pub fn duration_secs(&self) -> f64 {
        self.started_at
            .read()
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    /// Wall-clock age of the utterance in milliseconds; 0 when idle.
    pub fn duration_ms(&self) -> u64 {
        self.started_at
            .read()
            .map(|t| t.elapsed().as_millis() as u64)
            .unwrap_or(0)
    }

    /// Seconds since the last appended frame; 0 when idle.
    pub fn silence_secs(&self) -> f64 {
        self.last_audio_at
            .read()
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    pub fn first_partial_sent(&self) -> bool {
        self.first_partial_sent.load(Ordering::Acquire)
    }

    pub fn partial_sequence(&self) -> u64 {
        self.partial_sequence.load(Ordering::Acquire)
    }

    pub fn ultra_fast_triggered(&self) -> bool {
        self.ultra_fast_triggered.load(Ordering::Acquire)
    }

    pub fn last_partial_text(&self) -> Option<String> {
        self.last_partial_text.read().clone()
    }

    /// Milliseconds since the last successful partial emission, if any.
    pub fn ms_since_last_partial(&self) -> Option<u64> {
        self.last_partial_sent_at
            .read()
            .map(|t| t.elapsed().as_millis() as u64)
    }

    /// Record a successful partial emission and return its sequence number.
    ///
    /// Sequences start at 1 and increase strictly within one utterance.
    pub fn record_partial_emission(&self, text: &str, ultra_fast: bool) -> u64 {
        let sequence = self.partial_sequence.fetch_add(1, Ordering::AcqRel) + 1;
        *self.last_partial_sent_at.write() = Some(Instant::now());
        if ultra_fast && !self.first_partial_sent.load(Ordering::Acquire) {
            self.ultra_fast_triggered.store(true, Ordering::Release);
        }
        self.first_partial_sent.store(true, Ordering::Release);
        *self.last_partial_text.write() = Some(text.to_string());
        sequence
    }

    /// Trailing window of the buffer covering at most `window_secs` seconds.
    pub fn tail_window(&self, window_secs: f64) -> Vec<f32> {
        let buffer = self.buffer.read();
        let max_samples = (window_secs * self.sample_rate as f64) as usize;
        let start = buffer.len().saturating_sub(max_samples);
        buffer[start..].to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(n: usize) -> AudioFrame {
        AudioFrame::new(vec![0.1; n], 16_000)
    }

    #[test]
    fn test_initial_state_is_idle() {
        let state = UtteranceState::new(16_000);
        assert!(!state.is_active());
        assert_eq!(state.total_samples(), 0);
        assert_eq!(state.duration_secs(), 0.0);
        assert_eq!(state.partial_sequence(), 0);
        assert!(state.ms_since_last_partial().is_none());
    }

    #[test]
    fn test_activate_seeds_buffer_and_fresh_id() {
        let state = UtteranceState::new(16_000);
        let id_before = state.utterance_id();

        state.activate(&frame(160));
        assert!(state.is_active());
        assert_eq!(state.total_samples(), 160);
        assert_ne!(state.utterance_id(), id_before);
    }

    #[test]
    fn test_append_accumulates() {
        let state = UtteranceState::new(16_000);
        state.activate(&frame(160));
        state.append(&frame(160));
        state.append(&frame(80));
        assert_eq!(state.total_samples(), 400);
        assert_eq!(state.tail_window(10.0).len(), 400);
    }

    #[test]
    fn test_deactivate_snapshots_and_resets() {
        let state = UtteranceState::new(16_000);
        state.activate(&frame(160));
        state.append(&frame(160));
        let id = state.utterance_id();

        let finalized = state.deactivate();
        assert_eq!(finalized.utterance_id, id);
        assert_eq!(finalized.samples.len(), 320);
        assert_eq!(finalized.sample_rate, 16_000);

        assert!(!state.is_active());
        assert_eq!(state.total_samples(), 0);
        assert!(state.tail_window(10.0).is_empty());
    }

    #[test]
    fn test_partial_sequence_starts_at_one_and_resets_per_utterance() {
        let state = UtteranceState::new(16_000);
        state.activate(&frame(160));

        assert_eq!(state.record_partial_emission("hello", false), 1);
        assert_eq!(state.record_partial_emission("hello world", false), 2);
        assert!(state.first_partial_sent());
        assert_eq!(state.last_partial_text().as_deref(), Some("hello world"));

        // New utterance: counter restarts.
        state.deactivate();
        state.activate(&frame(160));
        assert!(!state.first_partial_sent());
        assert!(state.last_partial_text().is_none());
        assert_eq!(state.record_partial_emission("again", false), 1);
    }

    #[test]
    fn test_ultra_fast_flag_only_for_first_partial() {
        let state = UtteranceState::new(16_000);
        state.activate(&frame(160));

        state.record_partial_emission("hi", true);
        assert!(state.ultra_fast_triggered());

        // Re-arming clears the flag; a non-first emission cannot set it.
        state.deactivate();
        state.activate(&frame(160));
        assert!(!state.ultra_fast_triggered());
        state.record_partial_emission("one", false);
        state.record_partial_emission("one two", true);
        assert!(!state.ultra_fast_triggered());
    }

    #[test]
    fn test_tail_window_takes_most_recent_samples() {
        let state = UtteranceState::new(10);
        // 30 samples at 10Hz = 3 seconds, values 0..30.
        let samples: Vec<f32> = (0..30).map(|i| i as f32).collect();
        state.activate(&AudioFrame::new(samples, 10));

        let tail = state.tail_window(1.0);
        assert_eq!(tail.len(), 10);
        assert_eq!(tail[0], 20.0);
        assert_eq!(tail[9], 29.0);

        // Window larger than the buffer returns everything.
        assert_eq!(state.tail_window(100.0).len(), 30);
    }

    #[test]
    fn test_duration_and_silence_track_wall_clock() {
        let state = UtteranceState::new(16_000);
        state.activate(&frame(160));
        std::thread::sleep(std::time::Duration::from_millis(30));
        assert!(state.duration_ms() >= 30);
        assert!(state.silence_secs() >= 0.03);

        state.append(&frame(160));
        assert!(state.silence_secs() < 0.03);
    }
}
