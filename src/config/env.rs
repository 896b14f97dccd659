use std::env;

use super::utils::parse_list;
use super::{EngineConfig, OrchestratorConfig};
use crate::errors::{EngineError, EngineResult};
use std::time::Duration;

fn parse_var<T: std::str::FromStr>(name: &str, raw: String) -> EngineResult<T>
where
    T::Err: std::fmt::Display,
{
    raw.parse::<T>()
        .map_err(|e| EngineError::Configuration(format!("Invalid {name}: {e}")))
}

/// Parse a duration given in (possibly fractional) seconds.
///
/// Negative, NaN, and overflowing values are configuration errors, not
/// panics: `Duration::from_secs_f64` would abort on them.
fn parse_duration_secs(name: &str, raw: String) -> EngineResult<Duration> {
    let secs: f64 = parse_var(name, raw)?;
    Duration::try_from_secs_f64(secs)
        .map_err(|e| EngineError::Configuration(format!("Invalid {name}: {e}")))
}

impl EngineConfig {
    /// Load configuration from environment variables
    ///
    /// Reads configuration from environment variables, with sensible defaults.
    /// Also loads from .env file if present using dotenvy.
    ///
    /// # Errors
    /// Returns an error if a variable is present but malformed, or if the
    /// resulting thresholds fail [`EngineConfig::validate`]. Misconfiguration
    /// is surfaced here, once, at startup - never mid-stream.
    pub fn from_env() -> EngineResult<Self> {
        // Load .env file if it exists
        let _ = dotenvy::dotenv();

        let mut config = EngineConfig::default();

        // Segmentation thresholds
        if let Ok(raw) = env::var("MAX_UTTERANCE_SEC") {
            config.max_utterance_secs = parse_var("MAX_UTTERANCE_SEC", raw)?;
        }
        if let Ok(raw) = env::var("MIN_UTTERANCE_SEC") {
            config.min_utterance_secs = parse_var("MIN_UTTERANCE_SEC", raw)?;
        }
        if let Ok(raw) = env::var("SILENCE_TIMEOUT_SEC") {
            config.silence_timeout_secs = parse_var("SILENCE_TIMEOUT_SEC", raw)?;
        }

        // Ingestion
        if let Ok(raw) = env::var("FRAME_BUFFER_CAPACITY") {
            config.frame_buffer_capacity = parse_var("FRAME_BUFFER_CAPACITY", raw)?;
        }
        if let Ok(raw) = env::var("POLL_INTERVAL_MS") {
            config.poll_interval_ms = parse_var("POLL_INTERVAL_MS", raw)?;
        }
        if let Ok(raw) = env::var("STT_SAMPLE_RATE") {
            config.sample_rate = parse_var("STT_SAMPLE_RATE", raw)?;
        }
        config.language = env::var("STT_LANGUAGE").ok();
        if let Ok(raw) = env::var("EXCLUDED_SPEAKERS") {
            config.excluded_speakers = parse_list(&raw).into_iter().collect();
        }

        // Orchestrator delivery
        let mut orchestrator = OrchestratorConfig::default();
        if let Ok(url) = env::var("ORCHESTRATOR_URL") {
            orchestrator.base_url = url;
        }
        if let Ok(room) = env::var("ROOM_NAME") {
            orchestrator.room_name = room;
        }
        if let Ok(raw) = env::var("ORCHESTRATOR_NOTIFY_TIMEOUT_SEC") {
            orchestrator.notify_timeout =
                parse_duration_secs("ORCHESTRATOR_NOTIFY_TIMEOUT_SEC", raw)?;
        }
        if let Ok(raw) = env::var("ORCHESTRATOR_HEALTH_TIMEOUT_SEC") {
            orchestrator.health_timeout =
                parse_duration_secs("ORCHESTRATOR_HEALTH_TIMEOUT_SEC", raw)?;
        }
        if let Ok(raw) = env::var("ORCHESTRATOR_HEALTH_INTERVAL_SEC") {
            orchestrator.health_interval =
                parse_duration_secs("ORCHESTRATOR_HEALTH_INTERVAL_SEC", raw)?;
        }
        config.orchestrator = orchestrator;

        config.validate()?;
        Ok(config)
    }
}
