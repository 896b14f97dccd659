//! Configuration for the segmentation engine.
//!
//! Configuration is loaded from environment variables (see `env`) with
//! defaults tuned for conversational speech at 16 kHz. All thresholds that
//! drive segmentation and partial emission are plain data here; the state
//! machines never hard-code them.
//!
//! # Modules
//! - `env`: Environment variable loading
//! - `utils`: Utility functions for configuration parsing

use std::collections::HashSet;
use std::time::Duration;

use crate::errors::{EngineError, EngineResult};

mod env;
mod utils;

/// Filler tokens that recognizers commonly hallucinate from silence or
/// breathing. Candidates matching one of these (case-insensitively, after
/// trimming and stripping one trailing punctuation mark) are never emitted.
///
/// This is configuration data, not logic: override via
/// [`EngineConfig::noise_words`] if a deployment needs a different set.
pub const DEFAULT_NOISE_WORDS: [&str; 9] = [
    "you", "uh", "um", "mm", "hmm", "yeah", "mhm", "ah", "oh",
];

/// Timing and filtering parameters for partial transcript emission.
///
/// The first partial is treated specially: a lower activation threshold and a
/// shorter trailing window favor latency, while later partials use a wider
/// window to favor accuracy.
#[derive(Debug, Clone)]
pub struct PartialConfig {
    /// Minimum utterance age before the very first partial may be attempted (ms).
    pub ultra_fast_threshold_ms: u64,
    /// Minimum utterance age for partials after the first one (ms).
    /// A first partial emitted under this threshold counts as "ultra-fast".
    pub min_speech_ms: u64,
    /// Minimum spacing between successive partial emissions (ms).
    pub emit_interval_ms: u64,
    /// Spacing reduction applied once the first partial has been sent (ms).
    pub emit_interval_reduction_ms: u64,
    /// Lower bound on the reduced spacing (ms).
    pub emit_interval_floor_ms: u64,
    /// Poll sleep while waiting for the first partial to become possible (ms).
    pub first_poll_sleep_ms: u64,
    /// Trailing audio window transcribed before the first partial (seconds).
    pub early_window_secs: f64,
    /// Trailing audio window transcribed after the first partial (seconds).
    pub late_window_secs: f64,
    /// Minimum candidate length before the first partial has been sent (chars).
    pub min_text_len_first: usize,
    /// Minimum candidate length after the first partial has been sent (chars).
    pub min_text_len: usize,
    /// Maximum candidate length; longer results are discarded as garbage (chars).
    pub max_text_len: usize,
}

impl Default for PartialConfig {
    fn default() -> Self {
        Self {
            ultra_fast_threshold_ms: 150,
            min_speech_ms: 200,
            emit_interval_ms: 200,
            emit_interval_reduction_ms: 50,
            emit_interval_floor_ms: 150,
            first_poll_sleep_ms: 100,
            early_window_secs: 0.8,
            late_window_secs: 1.2,
            min_text_len_first: 2,
            min_text_len: 3,
            max_text_len: 120,
        }
    }
}

impl PartialConfig {
    /// Spacing to enforce before the next partial emission, given whether the
    /// first partial has already been sent.
    pub fn emit_spacing_ms(&self, first_partial_sent: bool) -> u64 {
        if first_partial_sent {
            self.emit_interval_ms
                .saturating_sub(self.emit_interval_reduction_ms)
                .max(self.emit_interval_floor_ms)
        } else {
            self.emit_interval_ms
        }
    }
}

/// Downstream orchestrator endpoint and delivery timeouts.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Base URL of the orchestrator, without trailing slash.
    pub base_url: String,
    /// Room name stamped onto every delivered event.
    pub room_name: String,
    /// Timeout for transcript delivery POSTs.
    pub notify_timeout: Duration,
    /// Timeout for health probe GETs.
    pub health_timeout: Duration,
    /// Interval between background health probes.
    pub health_interval: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            room_name: "default".to_string(),
            notify_timeout: Duration::from_secs(4),
            health_timeout: Duration::from_secs(2),
            health_interval: Duration::from_secs(20),
        }
    }
}

impl OrchestratorConfig {
    /// Create a new config with the specified base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Create a new config with the specified room name.
    pub fn with_room_name(mut self, room_name: impl Into<String>) -> Self {
        self.room_name = room_name.into();
        self
    }

    /// URL of the transcript delivery endpoint.
    pub fn transcript_url(&self) -> String {
        format!("{}/transcript", self.base_url.trim_end_matches('/'))
    }

    /// URL of the health probe endpoint.
    pub fn health_url(&self) -> String {
        format!("{}/healthz", self.base_url.trim_end_matches('/'))
    }
}

/// Top-level configuration for the segmentation engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Hard cap on utterance duration (seconds). An utterance is forcibly
    /// ended once it reaches this age, even while audio is still arriving.
    pub max_utterance_secs: f64,
    /// Minimum utterance duration before silence can end it (seconds).
    pub min_utterance_secs: f64,
    /// Continuous silence needed to end an utterance (seconds).
    pub silence_timeout_secs: f64,
    /// Per-speaker frame queue capacity; oldest frames are evicted on overflow.
    pub frame_buffer_capacity: usize,
    /// Segmenter poll cadence (ms).
    pub poll_interval_ms: u64,
    /// Expected sample rate of inbound audio (Hz).
    pub sample_rate: u32,
    /// Language hint passed to the recognizer, if any.
    pub language: Option<String>,
    /// Speaker ids that are never processed (service/bot participants).
    pub excluded_speakers: HashSet<String>,
    /// Filler tokens that are never emitted as transcripts.
    pub noise_words: HashSet<String>,
    /// Partial emission tuning.
    pub partial: PartialConfig,
    /// Orchestrator delivery settings.
    pub orchestrator: OrchestratorConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_utterance_secs: 8.0,
            min_utterance_secs: 0.4,
            silence_timeout_secs: 1.0,
            frame_buffer_capacity: 800,
            poll_interval_ms: 40,
            sample_rate: 16_000,
            language: None,
            excluded_speakers: HashSet::new(),
            noise_words: DEFAULT_NOISE_WORDS
                .iter()
                .map(|w| w.to_string())
                .collect(),
            partial: PartialConfig::default(),
            orchestrator: OrchestratorConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Create a new config with the specified orchestrator settings.
    pub fn with_orchestrator(mut self, orchestrator: OrchestratorConfig) -> Self {
        self.orchestrator = orchestrator;
        self
    }

    /// Create a new config with the specified segmentation thresholds.
    pub fn with_thresholds(mut self, max_secs: f64, min_secs: f64, silence_secs: f64) -> Self {
        self.max_utterance_secs = max_secs;
        self.min_utterance_secs = min_secs;
        self.silence_timeout_secs = silence_secs;
        self
    }

    /// Create a new config with the specified partial-emission settings.
    pub fn with_partial(mut self, partial: PartialConfig) -> Self {
        self.partial = partial;
        self
    }

    /// Validate threshold and capacity invariants.
    ///
    /// Called once at engine construction; a misconfigured engine must fail
    /// at startup rather than misbehave mid-stream.
    pub fn validate(&self) -> EngineResult<()> {
        // NaN compares false against everything, so the ordering checks
        // below would wave it through.
        if !self.min_utterance_secs.is_finite() || self.min_utterance_secs <= 0.0 {
            return Err(EngineError::Configuration(
                "min_utterance_secs must be a positive finite number".to_string(),
            ));
        }
        if !self.max_utterance_secs.is_finite() || self.max_utterance_secs <= self.min_utterance_secs
        {
            return Err(EngineError::Configuration(format!(
                "max_utterance_secs ({}) must be finite and exceed min_utterance_secs ({})",
                self.max_utterance_secs, self.min_utterance_secs
            )));
        }
        if !self.silence_timeout_secs.is_finite() || self.silence_timeout_secs <= 0.0 {
            return Err(EngineError::Configuration(
                "silence_timeout_secs must be a positive finite number".to_string(),
            ));
        }
        if self.frame_buffer_capacity == 0 {
            return Err(EngineError::Configuration(
                "frame_buffer_capacity must be nonzero".to_string(),
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(EngineError::Configuration(
                "poll_interval_ms must be nonzero".to_string(),
            ));
        }
        if self.sample_rate == 0 {
            return Err(EngineError::Configuration(
                "sample_rate must be nonzero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.frame_buffer_capacity, 800);
        assert_eq!(config.sample_rate, 16_000);
        assert!(config.noise_words.contains("hmm"));
        assert_eq!(config.noise_words.len(), DEFAULT_NOISE_WORDS.len());
    }

    #[test]
    fn test_validate_rejects_inverted_thresholds() {
        let config = EngineConfig::default().with_thresholds(0.2, 0.5, 1.0);
        assert!(matches!(
            config.validate(),
            Err(EngineError::Configuration(_))
        ));
    }

    #[test]
    fn test_validate_rejects_non_finite_thresholds() {
        for config in [
            EngineConfig {
                min_utterance_secs: f64::NAN,
                ..Default::default()
            },
            EngineConfig {
                max_utterance_secs: f64::NAN,
                ..Default::default()
            },
            EngineConfig {
                max_utterance_secs: f64::INFINITY,
                ..Default::default()
            },
            EngineConfig {
                silence_timeout_secs: f64::NAN,
                ..Default::default()
            },
        ] {
            assert!(matches!(
                config.validate(),
                Err(EngineError::Configuration(_))
            ));
        }
    }

    #[test]
    fn test_validate_rejects_zero_capacity() {
        let config = EngineConfig {
            frame_buffer_capacity: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_emit_spacing_reduction_with_floor() {
        let partial = PartialConfig::default();
        // Before any partial: full interval.
        assert_eq!(partial.emit_spacing_ms(false), 200);
        // After the first: reduced by 50ms, still above the floor.
        assert_eq!(partial.emit_spacing_ms(true), 150);

        let tight = PartialConfig {
            emit_interval_ms: 180,
            emit_interval_reduction_ms: 50,
            emit_interval_floor_ms: 150,
            ..Default::default()
        };
        // 180 - 50 = 130 would dip under the floor.
        assert_eq!(tight.emit_spacing_ms(true), 150);
    }

    #[test]
    fn test_orchestrator_urls_strip_trailing_slash() {
        let config = OrchestratorConfig::default().with_base_url("http://orch:9000/");
        assert_eq!(config.transcript_url(), "http://orch:9000/transcript");
        assert_eq!(config.health_url(), "http://orch:9000/healthz");
    }
}
