//! Groq Provider - Implementation of AIProvider for Groq's API.
//!
//! Groq exposes an OpenAI-compatible chat completions endpoint serving
//! hosted open models (Llama 3, Mixtral, Gemma).
//!
//! # Configuration
//!
//! ```ignore
//! let config = GroqConfig::new(api_key)
//!     .with_model("llama3-70b-8192")
//!     .with_base_url("https://api.groq.com/openai/v1");
//!
//! let provider = GroqProvider::new(config);
//! ```

use async_trait::async_trait;
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;

use crate::ports::{
    AIError, AIProvider, CompletionRequest, CompletionResponse, FinishReason, ProviderInfo,
    TokenUsage,
};

/// Configuration for the Groq provider.
#[derive(Debug, Clone)]
pub struct GroqConfig {
    /// API key for authentication.
    api_key: Secret<String>,
    /// Model to use (e.g., "llama3-8b-8192", "mixtral-8x7b-32768").
    pub model: String,
    /// Base URL for the API (default: https://api.groq.com/openai/v1).
    pub base_url: String,
    /// Request timeout.
    pub timeout: Duration,
    /// Maximum retries on transient failures.
    pub max_retries: u32,
}

impl GroqConfig {
    /// Creates a new configuration with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Secret::new(api_key.into()),
            model: "llama3-8b-8192".to_string(),
            base_url: "https://api.groq.com/openai/v1".to_string(),
            timeout: Duration::from_secs(30),
            max_retries: 3,
        }
    }

    /// Sets the model to use.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the maximum retry count.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Exposes the API key (for making requests).
    fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }
}

/// Groq API provider implementation.
pub struct GroqProvider {
    config: GroqConfig,
    client: Client,
}

impl GroqProvider {
    /// Creates a new Groq provider with the given configuration.
    pub fn new(config: GroqConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }

    /// Builds the chat completions endpoint URL.
    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url)
    }

    /// Converts our request to Groq's wire format.
    fn to_groq_request(&self, request: &CompletionRequest) -> GroqRequest {
        let mut messages = Vec::new();

        // Add system prompt if present
        if let Some(ref prompt) = request.system_prompt {
            messages.push(GroqMessage {
                role: "system".to_string(),
                content: prompt.clone(),
            });
        }

        // Add conversation messages
        for msg in &request.messages {
            messages.push(GroqMessage {
                role: match msg.role {
                    crate::ports::MessageRole::System => "system",
                    crate::ports::MessageRole::User => "user",
                    crate::ports::MessageRole::Assistant => "assistant",
                }
                .to_string(),
                content: msg.content.clone(),
            });
        }

        GroqRequest {
            model: self.config.model.clone(),
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        }
    }

    /// Sends a request and handles transport errors.
    async fn send_request(&self, request: &CompletionRequest) -> Result<Response, AIError> {
        let groq_request = self.to_groq_request(request);

        self.client
            .post(self.completions_url())
            .header("Authorization", format!("Bearer {}", self.config.api_key()))
            .header("Content-Type", "application/json")
            .json(&groq_request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AIError::Timeout {
                        timeout_secs: self.config.timeout.as_secs() as u32,
                    }
                } else if e.is_connect() {
                    AIError::network(format!("Connection failed: {}", e))
                } else {
                    AIError::network(e.to_string())
                }
            })
    }

    /// Parses the API response status and handles errors.
    async fn handle_response_status(&self, response: Response) -> Result<Response, AIError> {
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        // Try to parse error body
        let error_body = response.text().await.unwrap_or_default();

        match status.as_u16() {
            401 => Err(AIError::AuthenticationFailed),
            429 => {
                let retry_after = Self::parse_retry_after(&error_body);
                Err(AIError::rate_limited(retry_after))
            }
            400 => Err(AIError::InvalidRequest(error_body)),
            500..=599 => Err(AIError::unavailable(format!(
                "Server error {}: {}",
                status, error_body
            ))),
            _ => Err(AIError::network(format!(
                "Unexpected status {}: {}",
                status, error_body
            ))),
        }
    }

    /// Parses retry-after from an error response.
    fn parse_retry_after(error_body: &str) -> u32 {
        // Groq includes "try again in Xs" in rate-limit messages sometimes.
        // Default to 30 seconds if we can't parse it out.
        if let Ok(parsed) = serde_json::from_str::<serde_json::Value>(error_body) {
            if let Some(msg) = parsed.get("error").and_then(|e| e.get("message")) {
                if let Some(s) = msg.as_str() {
                    if let Some(idx) = s.find("try again in ") {
                        let rest = &s[idx + 13..];
                        if let Some(num_end) = rest.find(|c: char| !c.is_ascii_digit()) {
                            if let Ok(secs) = rest[..num_end].parse::<u32>() {
                                return secs;
                            }
                        }
                    }
                }
            }
        }
        30
    }

    /// Parses a completion response.
    async fn parse_response(&self, response: Response) -> Result<CompletionResponse, AIError> {
        let response = self.handle_response_status(response).await?;

        let groq_response: GroqResponse = response
            .json()
            .await
            .map_err(|e| AIError::parse(format!("Failed to parse response: {}", e)))?;

        let choice = groq_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AIError::parse("No choices in response"))?;

        if choice.message.content.trim().is_empty() {
            return Err(AIError::EmptyCompletion);
        }

        let finish_reason = match choice.finish_reason.as_deref() {
            Some("stop") => FinishReason::Stop,
            Some("length") => FinishReason::Length,
            Some("content_filter") => FinishReason::ContentFilter,
            _ => FinishReason::Stop,
        };

        let usage = groq_response
            .usage
            .map(|u| TokenUsage::new(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();

        Ok(CompletionResponse {
            content: choice.message.content,
            usage,
            model: groq_response.model,
            finish_reason,
        })
    }
}

#[async_trait]
impl AIProvider for GroqProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, AIError> {
        let mut last_error = AIError::network("No attempts made");
        let mut retry_count = 0;

        while retry_count <= self.config.max_retries {
            match self.send_request(&request).await {
                Ok(response) => match self.parse_response(response).await {
                    Ok(completion) => return Ok(completion),
                    Err(err) => {
                        if !err.is_retryable() || retry_count >= self.config.max_retries {
                            return Err(err);
                        }
                        last_error = err;
                    }
                },
                Err(err) => {
                    if !err.is_retryable() || retry_count >= self.config.max_retries {
                        return Err(err);
                    }
                    last_error = err;
                }
            }

            // Exponential backoff: 1s, 2s, 4s, ...
            let delay = Duration::from_secs(1 << retry_count);
            sleep(delay).await;
            retry_count += 1;
        }

        Err(last_error)
    }

    fn provider_info(&self) -> ProviderInfo {
        let max_context = match self.config.model.as_str() {
            "mixtral-8x7b-32768" => 32768,
            m if m.starts_with("llama3") => 8192,
            m if m.starts_with("gemma") => 8192,
            _ => 8192,
        };

        ProviderInfo::new("groq", &self.config.model, max_context)
    }
}

// ----- Groq API Types -----

#[derive(Debug, Serialize)]
struct GroqRequest {
    model: String,
    messages: Vec<GroqMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GroqMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct GroqResponse {
    model: String,
    choices: Vec<GroqChoice>,
    usage: Option<GroqUsage>,
}

#[derive(Debug, Deserialize)]
struct GroqChoice {
    message: GroqMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GroqUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::SessionId;
    use crate::ports::{MessageRole, RequestMetadata};

    fn test_request() -> CompletionRequest {
        let metadata = RequestMetadata::new(SessionId::new("groq-test").unwrap(), "profesor");
        CompletionRequest::new(metadata)
            .with_system_prompt("Eres un profesor de retiro.")
            .with_message(MessageRole::User, "hola")
            .with_message(MessageRole::Assistant, "buenas")
            .with_temperature(0.2)
            .with_max_tokens(800)
    }

    #[test]
    fn config_builder_works() {
        let config = GroqConfig::new("test-key")
            .with_model("llama3-70b-8192")
            .with_base_url("https://custom.api.com")
            .with_timeout(Duration::from_secs(10))
            .with_max_retries(5);

        assert_eq!(config.model, "llama3-70b-8192");
        assert_eq!(config.base_url, "https://custom.api.com");
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.api_key(), "test-key");
    }

    #[test]
    fn request_mapping_prepends_system_prompt() {
        let provider = GroqProvider::new(GroqConfig::new("test"));

        let wire = provider.to_groq_request(&test_request());

        assert_eq!(wire.model, "llama3-8b-8192");
        assert_eq!(wire.messages.len(), 3);
        assert_eq!(wire.messages[0].role, "system");
        assert_eq!(wire.messages[0].content, "Eres un profesor de retiro.");
        assert_eq!(wire.messages[1].role, "user");
        assert_eq!(wire.messages[2].role, "assistant");
        assert_eq!(wire.max_tokens, Some(800));
        assert_eq!(wire.temperature, Some(0.2));
    }

    #[test]
    fn provider_info_llama3() {
        let provider = GroqProvider::new(GroqConfig::new("test"));

        let info = provider.provider_info();
        assert_eq!(info.name, "groq");
        assert_eq!(info.model, "llama3-8b-8192");
        assert_eq!(info.max_context_tokens, 8192);
    }

    #[test]
    fn provider_info_mixtral() {
        let provider =
            GroqProvider::new(GroqConfig::new("test").with_model("mixtral-8x7b-32768"));

        let info = provider.provider_info();
        assert_eq!(info.max_context_tokens, 32768);
    }

    #[test]
    fn parse_retry_after_from_message() {
        let error = r#"{"error":{"message":"Rate limit reached. Please try again in 12s."}}"#;
        let retry = GroqProvider::parse_retry_after(error);
        assert_eq!(retry, 12);
    }

    #[test]
    fn parse_retry_after_default() {
        let error = r#"{"error":{"message":"Something went wrong"}}"#;
        let retry = GroqProvider::parse_retry_after(error);
        assert_eq!(retry, 30);
    }
}
