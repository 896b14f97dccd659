//! Real-time utterance segmentation and streaming transcript delivery.
//!
//! `segna` turns per-speaker streams of raw audio frames into timely partial
//! and final transcript events. Frames arrive from an external transport via
//! [`SttEngine::on_frame`], the segmenter decides utterance boundaries from
//! timing alone, a per-utterance task emits low-latency partials from a
//! trailing audio window, and a finalizer transcribes the full utterance once
//! it ends. Events are delivered best-effort to a downstream orchestrator
//! over HTTP; a missed event is dropped, never retried.
//!
//! Speech recognition itself is an external capability behind the
//! [`Recognizer`] trait.

pub mod config;
pub mod core;
pub mod errors;
pub mod metrics;
pub mod notifier;

// Re-export commonly used items for convenience
pub use config::{EngineConfig, OrchestratorConfig, PartialConfig};
pub use crate::core::engine::SttEngine;
pub use crate::core::events::{EventKind, TranscriptEvent};
pub use crate::core::frame_buffer::AudioFrame;
pub use crate::core::recognizer::{Recognizer, RecognizerError, Transcription};
pub use errors::{EngineError, EngineResult};
pub use metrics::MetricsSnapshot;
