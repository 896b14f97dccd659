//! Trait seam for the external speech recognizer.
//!
//! Model inference is out of scope for this crate; the engine only needs two
//! capabilities from it, both potentially slow (hundreds of milliseconds) and
//! both safe to invoke concurrently from multiple speakers' tasks. The
//! implementation must not serialize calls behind a global lock; if the
//! backing model requires gating, use a bounded semaphore inside the
//! implementation so the currently loudest speaker keeps its latency.

use std::sync::Arc;

/// Transcription result returned by a recognizer.
#[derive(Debug, Clone, PartialEq)]
pub struct Transcription {
    /// The transcribed text, untrimmed.
    pub text: String,
    /// Detected or configured language, if the recognizer knows it.
    pub language: Option<String>,
}

impl Transcription {
    pub fn new(text: impl Into<String>, language: Option<String>) -> Self {
        Self {
            text: text.into(),
            language,
        }
    }
}

/// Error types for recognizer operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum RecognizerError {
    #[error("Transcription failed: {0}")]
    TranscriptionFailed(String),
    #[error("Recognizer busy: {0}")]
    Busy(String),
    #[error("Invalid audio: {0}")]
    InvalidAudio(String),
}

/// External speech recognition capability.
///
/// Failures are always transient from the engine's point of view: a partial
/// cycle that gets an `Err` simply produces no candidate, and a finalizer
/// that gets an `Err` discards the utterance. Nothing propagates further.
#[async_trait::async_trait]
pub trait Recognizer: Send + Sync {
    /// Voice-activity check over a sample buffer.
    ///
    /// # Arguments
    /// * `samples` - Mono float samples
    /// * `sample_rate` - Sample rate of `samples` in Hz
    async fn has_speech_content(
        &self,
        samples: &[f32],
        sample_rate: u32,
    ) -> Result<bool, RecognizerError>;

    /// Transcribe a sample buffer.
    ///
    /// # Arguments
    /// * `samples` - Mono float samples
    /// * `language` - Optional language hint
    async fn transcribe(
        &self,
        samples: &[f32],
        language: Option<&str>,
    ) -> Result<Transcription, RecognizerError>;
}

/// Shared recognizer handle used throughout the pipeline.
pub type SharedRecognizer = Arc<dyn Recognizer>;
