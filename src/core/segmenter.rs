//! Utterance segmentation state machine.
//!
//! The segmenter owns one pipeline per speaker and drives all of them from
//! a single polling loop. Each tick drains the speaker's queued frames and
//! applies the two-state machine: an idle speaker's first frame activates a
//! new utterance; an active utterance ends when it hits the maximum duration
//! or when it has reached the minimum duration and the speaker has been
//! silent past the silence timeout. Ending an utterance aborts its partial
//! transcriber before the finalizer ever sees the audio, so a finalized
//! utterance can never receive further partials.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::metrics::MetricsCollector;
use crate::notifier::OrchestratorNotifier;

use super::finalizer;
use super::frame_buffer::{AudioFrame, FrameBuffer};
use super::partial::{spawn_partial_task, PartialContext};
use super::recognizer::SharedRecognizer;
use super::utterance::UtteranceState;

/// Per-speaker utterance state plus the handle of its partial transcriber.
struct SpeakerPipeline {
    state: Arc<UtteranceState>,
    partial_task: Mutex<Option<JoinHandle<()>>>,
}

impl SpeakerPipeline {
    fn new(sample_rate: u32) -> Self {
        Self {
            state: Arc::new(UtteranceState::new(sample_rate)),
            partial_task: Mutex::new(None),
        }
    }

    fn abort_partial_task(&self) {
        if let Some(handle) = self.partial_task.lock().take() {
            handle.abort();
        }
    }
}

pub(crate) struct Segmenter {
    config: Arc<EngineConfig>,
    frames: Arc<FrameBuffer>,
    recognizer: SharedRecognizer,
    notifier: Arc<OrchestratorNotifier>,
    metrics: Arc<MetricsCollector>,
    registry: RwLock<HashMap<String, Arc<SpeakerPipeline>>>,
}

impl Segmenter {
    pub(crate) fn new(
        config: Arc<EngineConfig>,
        frames: Arc<FrameBuffer>,
        recognizer: SharedRecognizer,
        notifier: Arc<OrchestratorNotifier>,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            config,
            frames,
            recognizer,
            notifier,
            metrics,
            registry: RwLock::new(HashMap::new()),
        }
    }

    /// Spawn the polling loop. Runs until aborted by the engine.
    pub(crate) fn run(self: Arc<Self>) -> JoinHandle<()> {
        let poll_interval = Duration::from_millis(self.config.poll_interval_ms);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                self.tick();
            }
        })
    }

    /// One polling pass over every known speaker.
    ///
    /// Speakers with queued frames and speakers with a registered pipeline
    /// are both visited: an active utterance must be able to end on silence
    /// alone, with no new frames arriving.
    pub(crate) fn tick(&self) {
        let mut speakers = self.frames.speakers();
        for speaker in self.registry.read().keys() {
            if !speakers.contains(speaker) {
                speakers.push(speaker.clone());
            }
        }
        for speaker in speakers {
            let pipeline = self.pipeline_for(&speaker);
            self.process_speaker(&speaker, &pipeline);
        }
    }

    /// Drop a speaker entirely: abort their partial transcriber, discard any
    /// in-flight utterance without finalizing it, and forget queued frames.
    pub(crate) fn disconnect(&self, speaker_id: &str) {
        let removed = self.registry.write().remove(speaker_id);
        if let Some(pipeline) = removed {
            pipeline.abort_partial_task();
            if pipeline.state.is_active() {
                let dropped = pipeline.state.deactivate();
                info!(
                    speaker = %speaker_id,
                    utterance = %dropped.utterance_id,
                    duration_secs = dropped.audio_duration_secs(),
                    "speaker disconnected, dropping in-flight utterance"
                );
            }
        }
        self.frames.forget(speaker_id);
    }

    fn pipeline_for(&self, speaker_id: &str) -> Arc<SpeakerPipeline> {
        if let Some(pipeline) = self.registry.read().get(speaker_id) {
            return pipeline.clone();
        }
        self.registry
            .write()
            .entry(speaker_id.to_string())
            .or_insert_with(|| Arc::new(SpeakerPipeline::new(self.config.sample_rate)))
            .clone()
    }

    fn process_speaker(&self, speaker_id: &str, pipeline: &SpeakerPipeline) {
        for frame in self.frames.drain(speaker_id) {
            if pipeline.state.is_active() {
                pipeline.state.append(&frame);
            } else {
                self.begin_utterance(speaker_id, pipeline, &frame);
            }
            // An end mid-drain lets the remaining frames open a new utterance.
            if pipeline.state.is_active() && self.should_end(&pipeline.state) {
                self.end_utterance(speaker_id, pipeline);
            }
        }
        if pipeline.state.is_active() && self.should_end(&pipeline.state) {
            self.end_utterance(speaker_id, pipeline);
        }
    }

    fn should_end(&self, state: &UtteranceState) -> bool {
        let duration = state.duration_secs();
        duration >= self.config.max_utterance_secs
            || (duration >= self.config.min_utterance_secs
                && state.silence_secs() >= self.config.silence_timeout_secs)
    }

    fn begin_utterance(&self, speaker_id: &str, pipeline: &SpeakerPipeline, frame: &AudioFrame) {
        pipeline.state.activate(frame);
        debug!(
            speaker = %speaker_id,
            utterance = %pipeline.state.utterance_id(),
            "utterance started"
        );
        let handle = spawn_partial_task(PartialContext {
            speaker_id: speaker_id.to_string(),
            state: pipeline.state.clone(),
            recognizer: self.recognizer.clone(),
            notifier: self.notifier.clone(),
            metrics: self.metrics.clone(),
            config: self.config.clone(),
        });
        *pipeline.partial_task.lock() = Some(handle);
    }

    fn end_utterance(&self, speaker_id: &str, pipeline: &SpeakerPipeline) {
        pipeline.abort_partial_task();
        let finalized = pipeline.state.deactivate();
        debug!(
            speaker = %speaker_id,
            utterance = %finalized.utterance_id,
            duration_secs = finalized.audio_duration_secs(),
            "utterance ended"
        );
        tokio::spawn(finalizer::finalize(
            speaker_id.to_string(),
            finalized,
            self.recognizer.clone(),
            self.notifier.clone(),
            self.metrics.clone(),
            self.config.clone(),
        ));
    }
}
