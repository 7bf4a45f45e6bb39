//! Trip research crew — the job function behind `/analyze`.
//!
//! Two LLM "agents" run in sequence: a local city expert researches the
//! destination, then a trip maker compiles the final report from that
//! research. Web search results (Serper, Tavily) ground the research when
//! configured.
//!
//! Uses rig-core for HTTP transport; [`RigBackend`] adapts rig's clients to
//! the [`CompletionBackend`] trait so tests can swap in a stub.

pub mod crew;
mod rig_backend;
pub mod search;

pub use crew::{AgentRole, TripCrew};
pub use rig_backend::RigBackend;
pub use search::{SearchConfig, SearchHit, SerperSearch, TavilySearch, WebSearch};

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{ConfigError, LlmError};

/// Something that can answer a prompt in the voice of an agent role.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    fn model_name(&self) -> &str;

    async fn ask(&self, role: &AgentRole, prompt: &str) -> Result<String, LlmError>;
}

/// Supported LLM backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmBackend {
    Anthropic,
    OpenAi,
    Groq,
}

impl std::str::FromStr for LlmBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anthropic" => Ok(Self::Anthropic),
            "openai" => Ok(Self::OpenAi),
            "groq" => Ok(Self::Groq),
            other => Err(ConfigError::InvalidValue {
                key: "TRIP_CREW_LLM_BACKEND".to_string(),
                message: format!("unknown backend '{other}', expected 'anthropic', 'openai' or 'groq'"),
            }),
        }
    }
}

/// Configuration for creating an LLM backend.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub backend: LlmBackend,
    pub api_key: secrecy::SecretString,
    pub model: String,
}

impl LlmConfig {
    /// Read `TRIP_CREW_LLM_BACKEND` (default `anthropic`), the matching API key
    /// (`ANTHROPIC_API_KEY` / `OPENAI_API_KEY` / `GROQ_API_KEY`) and
    /// `TRIP_CREW_MODEL`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let backend: LlmBackend = std::env::var("TRIP_CREW_LLM_BACKEND")
            .unwrap_or_else(|_| "anthropic".to_string())
            .parse()?;

        let (key_var, default_model) = match backend {
            LlmBackend::Anthropic => ("ANTHROPIC_API_KEY", "claude-sonnet-4-20250514"),
            LlmBackend::OpenAi => ("OPENAI_API_KEY", "gpt-4o"),
            // Groq retired llama3-8b-8192; this is its successor.
            LlmBackend::Groq => ("GROQ_API_KEY", "llama-3.1-8b-instant"),
        };

        let api_key = std::env::var(key_var)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(key_var.to_string()))?;

        let model = std::env::var("TRIP_CREW_MODEL").unwrap_or_else(|_| default_model.to_string());

        Ok(Self {
            backend,
            api_key: secrecy::SecretString::from(api_key),
            model,
        })
    }
}

/// Create a completion backend from configuration.
pub fn create_backend(config: &LlmConfig) -> Result<Arc<dyn CompletionBackend>, LlmError> {
    let backend = RigBackend::new(config)?;
    tracing::info!(backend = ?config.backend, model = %config.model, "LLM backend ready");
    Ok(Arc::new(backend))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_parses_case_insensitively() {
        assert_eq!("OpenAI".parse::<LlmBackend>().unwrap(), LlmBackend::OpenAi);
        assert_eq!(" anthropic ".parse::<LlmBackend>().unwrap(), LlmBackend::Anthropic);
        assert_eq!("groq".parse::<LlmBackend>().unwrap(), LlmBackend::Groq);
        assert!("gemini".parse::<LlmBackend>().is_err());
    }

    #[test]
    fn create_backend_constructs_without_network() {
        // rig clients accept any key at construction; auth fails on first request.
        let config = LlmConfig {
            backend: LlmBackend::OpenAi,
            api_key: secrecy::SecretString::from("sk-test"),
            model: "gpt-4o".to_string(),
        };
        let backend = create_backend(&config).unwrap();
        assert_eq!(backend.model_name(), "gpt-4o");

        let config = LlmConfig {
            backend: LlmBackend::Groq,
            api_key: secrecy::SecretString::from("gsk-test"),
            model: "llama-3.1-8b-instant".to_string(),
        };
        assert!(create_backend(&config).is_ok());
    }
}
