//! Per-utterance partial transcription task.
//!
//! Exactly one of these runs per active utterance. It is spawned by the
//! segmenter at the IDLE -> ACTIVE transition and aborted the instant the
//! utterance ends, so it must be safe to cancel at any await point: all
//! state mutation happens synchronously between awaits, and a partial still
//! in flight when the task is aborted is simply discarded.
//!
//! The cadence is adaptive: before the first partial the task polls fast and
//! transcribes a short trailing window to minimize latency; afterwards it
//! widens the window and paces itself by the emit interval.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::debug;

use crate::config::EngineConfig;
use crate::metrics::MetricsCollector;
use crate::notifier::OrchestratorNotifier;

use super::events::TranscriptEvent;
use super::filtering;
use super::recognizer::SharedRecognizer;
use super::utterance::UtteranceState;

/// Everything a partial transcriber task needs, bundled for the spawn call.
pub(crate) struct PartialContext {
    pub speaker_id: String,
    pub state: Arc<UtteranceState>,
    pub recognizer: SharedRecognizer,
    pub notifier: Arc<OrchestratorNotifier>,
    pub metrics: Arc<MetricsCollector>,
    pub config: Arc<EngineConfig>,
}

/// Spawn the partial transcriber for a freshly activated utterance.
///
/// # Returns
/// A `JoinHandle` the segmenter stores and aborts at utterance end or
/// speaker disconnect.
pub(crate) fn spawn_partial_task(ctx: PartialContext) -> JoinHandle<()> {
    tokio::spawn(async move { run(ctx).await })
}

async fn run(ctx: PartialContext) {
    let pc = &ctx.config.partial;
    // The id this task was spawned for. The segmenter may re-arm the same
    // state for a new utterance while an abort is still in flight, so
    // `is_active` alone is not enough to know this task still owns it.
    let utterance_id = ctx.state.utterance_id();
    debug!(
        speaker = %ctx.speaker_id,
        utterance = %utterance_id,
        "partial transcriber started"
    );

    while ctx.state.is_active() && ctx.state.utterance_id() == utterance_id {
        let first_sent = ctx.state.first_partial_sent();
        let duration_ms = ctx.state.duration_ms();

        // Phase-dependent activation threshold: aggressive for the very
        // first partial, steady-state afterwards.
        let activation_ms = if first_sent {
            pc.min_speech_ms
        } else {
            pc.ultra_fast_threshold_ms
        };
        if duration_ms < activation_ms {
            let nap = if first_sent {
                pc.emit_interval_ms
            } else {
                pc.first_poll_sleep_ms
            };
            sleep(Duration::from_millis(nap)).await;
            continue;
        }

        // Enforce minimum spacing since the previous emission.
        if let Some(since_last) = ctx.state.ms_since_last_partial() {
            let spacing = pc.emit_spacing_ms(first_sent);
            if since_last < spacing {
                sleep(Duration::from_millis(spacing - since_last)).await;
                continue;
            }
        }

        let window_secs = if first_sent {
            pc.late_window_secs
        } else {
            pc.early_window_secs
        };
        let window = ctx.state.tail_window(window_secs);
        if window.is_empty() {
            sleep(Duration::from_millis(pc.first_poll_sleep_ms)).await;
            continue;
        }

        match ctx
            .recognizer
            .transcribe(&window, ctx.config.language.as_deref())
            .await
        {
            Ok(result) => {
                let last = ctx.state.last_partial_text();
                if let Some(text) = filtering::accept_partial(
                    &result.text,
                    first_sent,
                    last.as_deref(),
                    pc,
                    &ctx.config.noise_words,
                ) {
                    // The utterance may have ended, or even been replaced by
                    // a fresh one on this state, while we were awaiting the
                    // recognizer; a stale partial is discarded.
                    if !ctx.state.is_active() || ctx.state.utterance_id() != utterance_id {
                        break;
                    }
                    let latency_ms = ctx.state.duration_ms();
                    let ultra_fast = !first_sent && latency_ms < pc.min_speech_ms;
                    let sequence = ctx.state.record_partial_emission(&text, ultra_fast);
                    let language = result.language.or_else(|| ctx.config.language.clone());
                    let event = TranscriptEvent::partial(
                        ctx.speaker_id.clone(),
                        text,
                        language,
                        utterance_id.clone(),
                        sequence,
                    );

                    ctx.metrics
                        .record_partial(latency_ms as f64, !first_sent, ultra_fast);
                    debug!(
                        speaker = %ctx.speaker_id,
                        utterance = %event.utterance_id,
                        sequence,
                        latency_ms,
                        ultra_fast,
                        "partial transcript emitted"
                    );
                    ctx.notifier.notify(&event).await;
                }
            }
            Err(e) => {
                // Transient by definition: no candidate this cycle.
                debug!(
                    speaker = %ctx.speaker_id,
                    error = %e,
                    "partial transcription failed, skipping cycle"
                );
            }
        }

        let nap = if ctx.state.first_partial_sent() {
            pc.emit_spacing_ms(true)
        } else {
            pc.first_poll_sleep_ms
        };
        sleep(Duration::from_millis(nap)).await;
    }

    debug!(speaker = %ctx.speaker_id, "partial transcriber stopped");
}
