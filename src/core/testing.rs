//! Shared test doubles for the pipeline modules.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use super::recognizer::{Recognizer, RecognizerError, Transcription};

/// Scripted recognizer: returns the configured texts in order, repeating the
/// last one once the script is exhausted. Counts calls for assertions.
pub(crate) struct ScriptedRecognizer {
    script: Mutex<Vec<String>>,
    cursor: AtomicUsize,
    pub transcribe_calls: AtomicUsize,
    pub speech_checks: AtomicUsize,
    pub has_speech: bool,
    /// When set, every transcribe call fails with this message.
    pub fail_with: Option<String>,
    /// Sample buffers seen by transcribe, most recent last.
    pub seen_audio: Mutex<Vec<Vec<f32>>>,
}

impl ScriptedRecognizer {
    pub fn new(script: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.iter().map(|s| s.to_string()).collect()),
            cursor: AtomicUsize::new(0),
            transcribe_calls: AtomicUsize::new(0),
            speech_checks: AtomicUsize::new(0),
            has_speech: true,
            fail_with: None,
            seen_audio: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(Vec::new()),
            cursor: AtomicUsize::new(0),
            transcribe_calls: AtomicUsize::new(0),
            speech_checks: AtomicUsize::new(0),
            has_speech: true,
            fail_with: Some(message.to_string()),
            seen_audio: Mutex::new(Vec::new()),
        })
    }

    pub fn without_speech(script: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.iter().map(|s| s.to_string()).collect()),
            cursor: AtomicUsize::new(0),
            transcribe_calls: AtomicUsize::new(0),
            speech_checks: AtomicUsize::new(0),
            has_speech: false,
            fail_with: None,
            seen_audio: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait::async_trait]
impl Recognizer for ScriptedRecognizer {
    async fn has_speech_content(
        &self,
        _samples: &[f32],
        _sample_rate: u32,
    ) -> Result<bool, RecognizerError> {
        self.speech_checks.fetch_add(1, Ordering::SeqCst);
        Ok(self.has_speech)
    }

    async fn transcribe(
        &self,
        samples: &[f32],
        _language: Option<&str>,
    ) -> Result<Transcription, RecognizerError> {
        self.transcribe_calls.fetch_add(1, Ordering::SeqCst);
        self.seen_audio.lock().push(samples.to_vec());

        if let Some(message) = &self.fail_with {
            return Err(RecognizerError::TranscriptionFailed(message.clone()));
        }

        let script = self.script.lock();
        if script.is_empty() {
            return Ok(Transcription::new("", None));
        }
        let index = self
            .cursor
            .fetch_add(1, Ordering::SeqCst)
            .min(script.len() - 1);
        Ok(Transcription::new(script[index].clone(), None))
    }
}
