//! Best-effort transcript delivery to the downstream orchestrator.
//!
//! `notify` never fails and never blocks the pipeline beyond its bounded
//! timeout: a delivery failure marks the orchestrator unavailable, drops the
//! event, and moves on. Partial and final transcripts are ephemeral, each
//! superseded by the next, so there is no retry queue. A background health
//! probe keeps the availability flag honest during quiet periods.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use parking_lot::RwLock;
use reqwest::{Client, StatusCode};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::config::OrchestratorConfig;
use crate::core::events::TranscriptEvent;
use crate::errors::{EngineError, EngineResult};
use crate::metrics::MetricsCollector;

/// Process-wide orchestrator reachability state.
///
/// Initialized unavailable; refreshed both by delivery outcomes and by the
/// periodic health probe. Never persisted.
#[derive(Debug, Default)]
pub struct OrchestratorAvailability {
    available: AtomicBool,
    last_checked: RwLock<Option<Instant>>,
}

impl OrchestratorAvailability {
    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::Acquire)
    }

    pub fn last_checked(&self) -> Option<Instant> {
        *self.last_checked.read()
    }

    fn set(&self, available: bool) {
        self.available.store(available, Ordering::Release);
        *self.last_checked.write() = Some(Instant::now());
    }
}

/// Delivers transcript events to the orchestrator and tracks its health.
pub struct OrchestratorNotifier {
    config: OrchestratorConfig,
    client: Client,
    availability: OrchestratorAvailability,
    metrics: Arc<MetricsCollector>,
}

impl OrchestratorNotifier {
    pub fn new(config: OrchestratorConfig, metrics: Arc<MetricsCollector>) -> EngineResult<Self> {
        let client = Client::builder()
            .timeout(config.notify_timeout)
            .build()
            .map_err(|e| EngineError::HttpClient(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            config,
            client,
            availability: OrchestratorAvailability::default(),
            metrics,
        })
    }

    /// Whether the orchestrator looked reachable at last contact.
    pub fn is_available(&self) -> bool {
        self.availability.is_available()
    }

    /// When availability was last refreshed, if ever.
    pub fn last_checked(&self) -> Option<Instant> {
        self.availability.last_checked()
    }

    /// Deliver an event, best-effort.
    ///
    /// HTTP 200 and 429 both mean the orchestrator is reachable; any other
    /// status, timeout, or connection error marks it unavailable and drops
    /// the event.
    pub async fn notify(&self, event: &TranscriptEvent) {
        let payload = event.wire_payload(&self.config.room_name);
        let url = self.config.transcript_url();

        match self.client.post(&url).json(&payload).send().await {
            Ok(response) => {
                let status = response.status();
                if status == StatusCode::OK || status == StatusCode::TOO_MANY_REQUESTS {
                    self.availability.set(true);
                    debug!(
                        speaker = %event.speaker_id,
                        kind = event.kind.wire_name(),
                        status = %status,
                        "transcript delivered"
                    );
                } else {
                    self.availability.set(false);
                    self.metrics.record_dropped_delivery();
                    warn!(
                        speaker = %event.speaker_id,
                        kind = event.kind.wire_name(),
                        status = %status,
                        "orchestrator rejected transcript, dropping event"
                    );
                }
            }
            Err(e) => {
                self.availability.set(false);
                self.metrics.record_dropped_delivery();
                debug!(
                    speaker = %event.speaker_id,
                    kind = event.kind.wire_name(),
                    error = %e,
                    "transcript delivery failed, dropping event"
                );
            }
        }
    }

    /// Probe the orchestrator's health endpoint once and refresh availability.
    pub async fn check_health(&self) -> bool {
        let url = self.config.health_url();
        let available = match self
            .client
            .get(&url)
            .timeout(self.config.health_timeout)
            .send()
            .await
        {
            Ok(response) => response.status() == StatusCode::OK,
            Err(e) => {
                debug!(error = %e, "orchestrator health probe failed");
                false
            }
        };
        self.availability.set(available);
        available
    }

    /// Spawn the periodic health-poll task. The first probe fires
    /// immediately so availability reflects reality soon after startup.
    pub fn spawn_health_poll(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.config.health_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let available = self.check_health().await;
                debug!(available, "orchestrator health poll");
            }
        })
    }
}
