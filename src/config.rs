//! Configuration types.

use std::str::FromStr;
use std::time::Duration;

/// HTTP server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind.
    pub bind: String,
    /// Port to listen on.
    pub port: u16,
    /// Single origin allowed by CORS. `None` allows any origin.
    pub allowed_origin: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 5000,
            allowed_origin: None,
        }
    }
}

impl ServerConfig {
    /// Load from `PORT`, `TRIP_CREW_BIND` and `TRIP_CREW_ALLOWED_ORIGIN`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind: std::env::var("TRIP_CREW_BIND").unwrap_or(defaults.bind),
            port: env_or("PORT", defaults.port),
            allowed_origin: std::env::var("TRIP_CREW_ALLOWED_ORIGIN")
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty() && s != "*"),
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

/// Job pool configuration.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Number of worker tasks.
    pub workers: usize,
    /// Maximum jobs waiting for a worker before submissions are rejected.
    pub queue_capacity: usize,
    /// Per-job time limit. `None` lets jobs run forever.
    pub job_timeout: Option<Duration>,
    /// Maximum buffered log lines (0 = unbounded).
    pub log_capacity: usize,
    /// How long completed results are kept. `None` keeps them for the
    /// process lifetime.
    pub result_ttl: Option<Duration>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            workers: 5,
            queue_capacity: 64,
            job_timeout: Some(Duration::from_secs(900)), // 15 minutes
            log_capacity: 10_000,
            result_ttl: None,
        }
    }
}

impl ExecutorConfig {
    /// Load from `TRIP_CREW_*` environment variables, falling back to
    /// defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let default_timeout = defaults.job_timeout.map(|d| d.as_secs()).unwrap_or(0);

        Self {
            workers: env_or("TRIP_CREW_WORKERS", defaults.workers).max(1),
            queue_capacity: env_or("TRIP_CREW_QUEUE_CAPACITY", defaults.queue_capacity).max(1),
            job_timeout: secs(env_or("TRIP_CREW_JOB_TIMEOUT_SECS", default_timeout)),
            log_capacity: env_or("TRIP_CREW_LOG_CAPACITY", defaults.log_capacity),
            result_ttl: secs(env_or("TRIP_CREW_RESULT_TTL_SECS", 0)),
        }
    }
}

/// Zero disables.
fn secs(value: u64) -> Option<Duration> {
    (value > 0).then(|| Duration::from_secs(value))
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}
