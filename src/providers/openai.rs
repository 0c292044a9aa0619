/*!
 * OpenAI-compatible chat completions client.
 *
 * Works against the public OpenAI API as well as any compatible endpoint
 * (LM Studio, vLLM, llama.cpp server) by pointing `endpoint` elsewhere.
 */

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::errors::ProviderError;
use crate::providers::Provider;

/// OpenAI-compatible client
#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    /// HTTP client for API requests
    client: Client,
    /// API key for authentication
    api_key: String,
    /// Base endpoint URL, e.g. "https://api.openai.com/v1"
    endpoint: String,
    /// Model identifier
    model: String,
    /// Sampling temperature
    temperature: f32,
    /// Number of times to retry transport-level failures
    retry_count: u32,
    /// Base backoff between retries, doubled each time
    retry_backoff_ms: u64,
}

/// Chat completion request body
#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

/// Chat message
#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    /// Role of the message sender (system, user, assistant)
    role: String,
    /// Content of the message
    content: String,
}

/// Chat completion response body
#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

impl OpenAiProvider {
    /// Create a new client
    pub fn new(api_key: impl Into<String>, endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self::with_retry_config(api_key, endpoint, model, 2, 1000)
    }

    /// Create a new client with explicit retry configuration
    pub fn with_retry_config(
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
        model: impl Into<String>,
        retry_count: u32,
        retry_backoff_ms: u64,
    ) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(300))
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            endpoint: endpoint.into(),
            model: model.into(),
            temperature: 0.3,
            retry_count,
            retry_backoff_ms,
        }
    }

    /// Set the sampling temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.endpoint.trim_end_matches('/'))
    }

    async fn send_once(&self, request: &ChatRequest) -> Result<String, ProviderError> {
        let response = self
            .client
            .post(self.completions_url())
            .header("Content-Type", "application/json")
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    ProviderError::ConnectionError(e.to_string())
                } else {
                    ProviderError::RequestFailed(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            if status.as_u16() == 401 || status.as_u16() == 403 {
                return Err(ProviderError::AuthenticationError(message));
            }
            return Err(ProviderError::ApiError {
                status_code: status.as_u16(),
                message,
            });
        }

        let body = response
            .json::<ChatResponse>()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        body.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| ProviderError::ParseError("response contained no choices".to_string()))
    }

    /// Whether an error is worth retrying at the transport level.
    ///
    /// Content-level problems are handled by the session's own attempt
    /// budget; only transient transport failures are retried here.
    fn is_retryable(error: &ProviderError) -> bool {
        matches!(
            error,
            ProviderError::ConnectionError(_)
                | ProviderError::RequestFailed(_)
                | ProviderError::ApiError { status_code: 429 | 500 | 502 | 503, .. }
        )
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature: Some(self.temperature),
        };

        let mut backoff_ms = self.retry_backoff_ms;
        let mut last_error = None;

        for attempt in 0..=self.retry_count {
            match self.send_once(&request).await {
                Ok(text) => {
                    debug!("OpenAI-compatible response received ({} chars)", text.len());
                    return Ok(text);
                }
                Err(error) if Self::is_retryable(&error) && attempt < self.retry_count => {
                    warn!(
                        "Transport error from provider (attempt {}/{}): {}",
                        attempt + 1,
                        self.retry_count + 1,
                        error
                    );
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    backoff_ms = backoff_ms.saturating_mul(2);
                    last_error = Some(error);
                }
                Err(error) => return Err(error),
            }
        }

        Err(last_error.unwrap_or_else(|| ProviderError::RequestFailed("no attempts made".to_string())))
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: "Reply with OK.".to_string(),
            }],
            temperature: Some(0.0),
        };
        self.send_once(&request).await.map(|_| ())
    }
}
