//! Engine facade: the surface the audio source wires into.
//!
//! The host feeds PCM frames through [`SttEngine::on_frame`] and the engine
//! handles everything downstream: buffering, segmentation, partial and final
//! transcription, and delivery to the orchestrator.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::errors::{EngineError, EngineResult};
use crate::metrics::{MetricsCollector, MetricsSnapshot};
use crate::notifier::OrchestratorNotifier;

use super::frame_buffer::{AudioFrame, FrameBuffer};
use super::recognizer::SharedRecognizer;
use super::segmenter::Segmenter;

pub struct SttEngine {
    config: Arc<EngineConfig>,
    frames: Arc<FrameBuffer>,
    segmenter: Arc<Segmenter>,
    notifier: Arc<OrchestratorNotifier>,
    metrics: Arc<MetricsCollector>,
    segmenter_task: Mutex<Option<JoinHandle<()>>>,
    health_task: Mutex<Option<JoinHandle<()>>>,
    started: AtomicBool,
}

impl SttEngine {
    /// Build an engine from a validated configuration and a recognizer.
    pub fn new(config: EngineConfig, recognizer: SharedRecognizer) -> EngineResult<Self> {
        config.validate()?;
        let config = Arc::new(config);
        let metrics = Arc::new(MetricsCollector::default());
        let notifier = Arc::new(OrchestratorNotifier::new(
            config.orchestrator.clone(),
            metrics.clone(),
        )?);
        let frames = Arc::new(FrameBuffer::new(config.frame_buffer_capacity));
        let segmenter = Arc::new(Segmenter::new(
            config.clone(),
            frames.clone(),
            recognizer,
            notifier.clone(),
            metrics.clone(),
        ));
        Ok(Self {
            config,
            frames,
            segmenter,
            notifier,
            metrics,
            segmenter_task: Mutex::new(None),
            health_task: Mutex::new(None),
            started: AtomicBool::new(false),
        })
    }

    /// Start the segmentation poll loop and the orchestrator health poll.
    ///
    /// Must be called from within a tokio runtime. Calling it a second time
    /// without an intervening [`shutdown`](Self::shutdown) is an error.
    pub fn start(&self) -> EngineResult<()> {
        if self.started.swap(true, Ordering::AcqRel) {
            return Err(EngineError::AlreadyStarted);
        }
        *self.segmenter_task.lock() = Some(self.segmenter.clone().run());
        *self.health_task.lock() = Some(self.notifier.clone().spawn_health_poll());
        info!(
            poll_interval_ms = self.config.poll_interval_ms,
            orchestrator = %self.config.orchestrator.base_url,
            "engine started"
        );
        Ok(())
    }

    /// Ingest one audio frame for a speaker.
    ///
    /// Frames from excluded speakers are dropped here, before they touch the
    /// buffer. Never blocks on transcription or delivery.
    pub fn on_frame(&self, speaker_id: &str, frame: AudioFrame) {
        if self.config.excluded_speakers.contains(speaker_id) {
            debug!(speaker = %speaker_id, "frame from excluded speaker dropped");
            return;
        }
        self.frames.push(speaker_id, frame);
    }

    /// Handle a speaker leaving: their in-flight utterance is dropped, not
    /// finalized, and their queued frames are forgotten.
    pub fn on_disconnect(&self, speaker_id: &str) {
        info!(speaker = %speaker_id, "speaker disconnected");
        self.segmenter.disconnect(speaker_id);
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn orchestrator_available(&self) -> bool {
        self.notifier.is_available()
    }

    /// Frames evicted from the buffer since startup.
    pub fn dropped_frames(&self) -> u64 {
        self.frames.dropped_frames()
    }

    /// Stop the background tasks. In-flight finalizer tasks are detached and
    /// allowed to complete on the runtime.
    pub fn shutdown(&self) {
        if let Some(handle) = self.segmenter_task.lock().take() {
            handle.abort();
        }
        if let Some(handle) = self.health_task.lock().take() {
            handle.abort();
        }
        if self.started.swap(false, Ordering::AcqRel) {
            info!("engine stopped");
        }
    }
}

impl Drop for SttEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}
