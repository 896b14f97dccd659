//! Final transcription of ended utterances.
//!
//! Finalization runs as a detached task so a slow full-audio transcription
//! never blocks the segmenter poll loop, and a new utterance for the same
//! speaker can begin while the previous one is still being finalized.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::metrics::MetricsCollector;
use crate::notifier::OrchestratorNotifier;

use super::events::TranscriptEvent;
use super::filtering;
use super::recognizer::SharedRecognizer;
use super::utterance::FinalizedUtterance;

/// Utterances with less buffered audio than this are degenerate (a single
/// truncated frame at most) and are discarded without a recognizer call.
const MIN_AUDIO_SECS: f64 = 0.05;

/// Transcribe a complete utterance and deliver the final transcript.
///
/// Every rejection path is terminal for the utterance: too-short audio,
/// no speech content, recognizer failure, and noise-only text all discard
/// it silently (with a debug log) rather than retrying.
pub(crate) async fn finalize(
    speaker_id: String,
    utterance: FinalizedUtterance,
    recognizer: SharedRecognizer,
    notifier: Arc<OrchestratorNotifier>,
    metrics: Arc<MetricsCollector>,
    config: Arc<EngineConfig>,
) {
    let started = Instant::now();
    let duration_secs = utterance.audio_duration_secs();

    if duration_secs < MIN_AUDIO_SECS {
        debug!(
            speaker = %speaker_id,
            utterance = %utterance.utterance_id,
            duration_secs,
            "degenerate utterance, discarding"
        );
        return;
    }

    match recognizer
        .has_speech_content(&utterance.samples, utterance.sample_rate)
        .await
    {
        Ok(true) => {}
        Ok(false) => {
            debug!(
                speaker = %speaker_id,
                utterance = %utterance.utterance_id,
                "no speech content detected, discarding"
            );
            return;
        }
        Err(e) => {
            warn!(
                speaker = %speaker_id,
                utterance = %utterance.utterance_id,
                error = %e,
                "speech content check failed, discarding"
            );
            return;
        }
    }

    let result = match recognizer
        .transcribe(&utterance.samples, config.language.as_deref())
        .await
    {
        Ok(result) => result,
        Err(e) => {
            warn!(
                speaker = %speaker_id,
                utterance = %utterance.utterance_id,
                error = %e,
                "final transcription failed, discarding"
            );
            return;
        }
    };

    let Some(text) = filtering::accept_final(&result.text, &config.noise_words) else {
        debug!(
            speaker = %speaker_id,
            utterance = %utterance.utterance_id,
            raw = %result.text,
            "final transcript rejected as noise"
        );
        return;
    };

    let latency_ms = started.elapsed().as_millis() as f64;
    let language = result.language.or_else(|| config.language.clone());
    let event = TranscriptEvent::final_transcript(
        speaker_id.clone(),
        text.clone(),
        language,
        utterance.utterance_id.clone(),
    );

    metrics.record_final(latency_ms, text.chars().count());
    info!(
        speaker = %speaker_id,
        utterance = %utterance.utterance_id,
        duration_secs,
        latency_ms,
        text_len = text.chars().count(),
        "final transcript emitted"
    );
    notifier.notify(&event).await;
}
