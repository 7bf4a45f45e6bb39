//! rig-core adapter for [`CompletionBackend`].

use async_trait::async_trait;
use rig::client::CompletionClient;
use rig::completion::Prompt;
use rig::providers::{anthropic, groq, openai};
use secrecy::ExposeSecret;

use super::{AgentRole, CompletionBackend, LlmBackend, LlmConfig};
use crate::error::LlmError;

/// Upper bound on tokens per agent answer.
const MAX_TOKENS: u64 = 4096;

enum Client {
    Anthropic(rig::client::Client<anthropic::client::AnthropicExt>),
    OpenAi(rig::client::Client<openai::client::OpenAIResponsesExt>),
    Groq(groq::Client),
}

/// Completion backend over a rig provider client.
pub struct RigBackend {
    client: Client,
    model: String,
}

impl RigBackend {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let key = config.api_key.expose_secret();
        let client = match config.backend {
            LlmBackend::Anthropic => {
                Client::Anthropic(anthropic::Client::new(key).map_err(|e| LlmError::RequestFailed {
                    provider: "anthropic".to_string(),
                    reason: format!("Failed to create Anthropic client: {e}"),
                })?)
            }
            LlmBackend::OpenAi => {
                Client::OpenAi(openai::Client::new(key).map_err(|e| LlmError::RequestFailed {
                    provider: "openai".to_string(),
                    reason: format!("Failed to create OpenAI client: {e}"),
                })?)
            }
            LlmBackend::Groq => Client::Groq(groq::Client::new(key).map_err(|e| LlmError::RequestFailed {
                provider: "groq".to_string(),
                reason: format!("Failed to create Groq client: {e}"),
            })?),
        };

        Ok(Self {
            client,
            model: config.model.clone(),
        })
    }

    fn provider(&self) -> &'static str {
        match self.client {
            Client::Anthropic(_) => "anthropic",
            Client::OpenAi(_) => "openai",
            Client::Groq(_) => "groq",
        }
    }
}

#[async_trait]
impl CompletionBackend for RigBackend {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn ask(&self, role: &AgentRole, prompt: &str) -> Result<String, LlmError> {
        let preamble = role.preamble();
        let answer = match &self.client {
            Client::Anthropic(client) => {
                let agent = client
                    .agent(&self.model)
                    .preamble(&preamble)
                    .max_tokens(MAX_TOKENS)
                    .build();
                agent.prompt(prompt).await
            }
            Client::OpenAi(client) => {
                let agent = client
                    .agent(&self.model)
                    .preamble(&preamble)
                    .max_tokens(MAX_TOKENS)
                    .build();
                agent.prompt(prompt).await
            }
            Client::Groq(client) => {
                let agent = client
                    .agent(&self.model)
                    .preamble(&preamble)
                    .max_tokens(MAX_TOKENS)
                    .build();
                agent.prompt(prompt).await
            }
        }
        .map_err(|e| LlmError::RequestFailed {
            provider: self.provider().to_string(),
            reason: e.to_string(),
        })?;

        if answer.trim().is_empty() {
            return Err(LlmError::InvalidResponse {
                provider: self.provider().to_string(),
                reason: format!("empty answer from {}", role.name),
            });
        }

        Ok(answer)
    }
}
