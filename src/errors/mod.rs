//! Error types for engine lifecycle and configuration.
//!
//! Nothing in the streaming pipeline itself returns these: pipeline
//! failures degrade to fewer events emitted and are logged where they
//! occur. `EngineError` only surfaces unrecoverable conditions at startup.

/// Error type for engine construction and startup.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("HTTP client error: {0}")]
    HttpClient(String),
    #[error("Engine already started")]
    AlreadyStarted,
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
