//! Transcript events and their orchestrator wire format.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Value, json};
use uuid::Uuid;

/// Kind of transcript event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Low-latency transcript of an utterance still in progress.
    Partial,
    /// Transcript produced once the utterance has ended.
    Final,
}

impl EventKind {
    /// Wire name used in the orchestrator payload's `event` field.
    pub fn wire_name(self) -> &'static str {
        match self {
            EventKind::Partial => "partial_transcript",
            EventKind::Final => "transcript",
        }
    }

    pub fn is_partial(self) -> bool {
        matches!(self, EventKind::Partial)
    }
}

/// A partial or final transcript, immutable once constructed.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptEvent {
    pub transcript_id: String,
    pub speaker_id: String,
    pub kind: EventKind,
    pub text: String,
    pub language: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub utterance_id: String,
    /// Present on partials only; strictly increasing per utterance, from 1.
    pub partial_sequence: Option<u64>,
}

impl TranscriptEvent {
    /// Build a partial transcript event.
    pub fn partial(
        speaker_id: impl Into<String>,
        text: impl Into<String>,
        language: Option<String>,
        utterance_id: impl Into<String>,
        sequence: u64,
    ) -> Self {
        Self {
            transcript_id: Uuid::new_v4().to_string(),
            speaker_id: speaker_id.into(),
            kind: EventKind::Partial,
            text: text.into(),
            language,
            timestamp: Utc::now(),
            utterance_id: utterance_id.into(),
            partial_sequence: Some(sequence),
        }
    }

    /// Build a final transcript event.
    pub fn final_transcript(
        speaker_id: impl Into<String>,
        text: impl Into<String>,
        language: Option<String>,
        utterance_id: impl Into<String>,
    ) -> Self {
        Self {
            transcript_id: Uuid::new_v4().to_string(),
            speaker_id: speaker_id.into(),
            kind: EventKind::Final,
            text: text.into(),
            language,
            timestamp: Utc::now(),
            utterance_id: utterance_id.into(),
            partial_sequence: None,
        }
    }

    /// JSON payload POSTed to the orchestrator.
    ///
    /// `utterance_id` and `partial_sequence` are carried on partials only.
    pub fn wire_payload(&self, room_name: &str) -> Value {
        let mut payload = json!({
            "transcript_id": self.transcript_id,
            "user_id": self.speaker_id,
            "participant": self.speaker_id,
            "event": self.kind.wire_name(),
            "text": self.text,
            "language": self.language,
            "timestamp": self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            "room_name": room_name,
            "partial": self.kind.is_partial(),
        });
        if self.kind.is_partial() {
            if let Value::Object(object) = &mut payload {
                object.insert("utterance_id".to_string(), json!(self.utterance_id));
                object.insert(
                    "partial_sequence".to_string(),
                    json!(self.partial_sequence),
                );
            }
        }
        payload
    }
}
