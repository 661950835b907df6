//! LLM provider abstraction
//!
//! The research loop talks to the model through `LLMProvider`: one system
//! prompt, one user message, one text answer. `OpenAIProvider` implements it
//! over rig-core's OpenAI client; tests substitute scripted doubles.

use async_trait::async_trait;
use rig::client::{CompletionClient, ProviderClient};
use rig::completion::Prompt;
use rig::providers::openai::Client;
use serde_json::{json, Value};
use tracing::debug;

use crate::error::ResearchError;

pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo-16k";

/// Requested shape of the model's answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseFormat {
    #[default]
    Text,
    /// Ask the provider for a single JSON object
    JsonObject,
}

/// Text-in, text-out completion
#[async_trait]
pub trait LLMProvider: Send + Sync {
    async fn complete(
        &self,
        system: &str,
        user: &str,
        format: ResponseFormat,
    ) -> Result<String, ResearchError>;

    fn name(&self) -> &str;
}

/// OpenAI chat completions via rig
pub struct OpenAIProvider {
    api_key: Option<String>,
    model: String,
    temperature: Option<f64>,
}

impl OpenAIProvider {
    /// The key is checked when a completion is requested, not here
    pub fn new(api_key: Option<String>, model: impl Into<String>) -> Self {
        Self {
            api_key,
            model: model.into(),
            temperature: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl LLMProvider for OpenAIProvider {
    async fn complete(
        &self,
        system: &str,
        user: &str,
        format: ResponseFormat,
    ) -> Result<String, ResearchError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            ResearchError::Config(
                "OpenAI API key not found. Please set the OPENAI_API_KEY environment variable."
                    .to_string(),
            )
        })?;

        let client = Client::from_val(api_key.to_string().into());
        let mut agent_builder = client.agent(&self.model).preamble(system);

        if let Some(temp) = self.temperature {
            agent_builder = agent_builder.temperature(temp);
        }

        if format == ResponseFormat::JsonObject {
            agent_builder =
                agent_builder.additional_params(json!({"response_format": {"type": "json_object"}}));
        }

        let agent = agent_builder.build();

        debug!(model = %self.model, ?format, "Requesting completion");
        agent
            .prompt(user)
            .await
            .map_err(|e| ResearchError::Llm(format!("OpenAI completion failed: {}", e)))
    }

    fn name(&self) -> &str {
        "openai"
    }
}

/// Pull the search query out of a JSON-mode answer.
///
/// A `"query"` string is used as is, any other `"query"` value is
/// stringified, and anything unparseable falls back to the raw answer.
pub fn parse_query_response(content: &str) -> String {
    let query = serde_json::from_str::<Value>(content)
        .ok()
        .and_then(|v| v.get("query").cloned());

    match query {
        Some(Value::String(q)) => q,
        Some(Value::Null) | None => content.to_string(),
        Some(other) => other.to_string(),
    }
}
