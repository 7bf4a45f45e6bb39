//! Error types for trip-crew.

use std::time::Duration;

/// Top-level error type for the service.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Job error: {0}")]
    Job(#[from] JobError),

    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Job execution errors.
///
/// `PoolSaturated` and `ShuttingDown` are returned synchronously from
/// `JobExecutor::submit`. The remaining variants never leave a worker: they
/// are rendered into the stored `Outcome::Error`.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("job queue is full ({capacity} jobs waiting), try again later")]
    PoolSaturated { capacity: usize },

    #[error("job executor is shutting down")]
    ShuttingDown,

    #[error("job timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("job panicked: {reason}")]
    Panicked { reason: String },

    #[error("job failed: {reason}")]
    Failed { reason: String },
}

/// Errors surfaced by the request gateway.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("missing field(s): {}", missing.join(", "))]
    Validation { missing: Vec<&'static str> },

    #[error(transparent)]
    Job(#[from] JobError),
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },
}

/// Result type alias for the service.
pub type Result<T> = std::result::Result<T, Error>;
