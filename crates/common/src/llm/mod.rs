//! LLM provider abstraction
//!
//! One uniform "generate text from messages" contract over heterogeneous
//! backends, dispatched on a tagged provider enum rather than per-provider
//! subclassing:
//! - Local inference servers and Azure OpenAI speak the OpenAI-compatible
//!   chat completions shape over HTTPS (TLS verification always on)
//! - AWS Bedrock goes through the SDK Converse API
//! - Azure AI Foundry agent flows take a single input string and return an
//!   `output` field
//!
//! Every call gets bounded retries with exponential backoff and passes a
//! per-purpose circuit breaker first. Configuration is looked up per request
//! from the active LlmConfig row; there is no process-wide active provider.

mod breaker;

pub use breaker::BreakerRegistry;

use crate::config::LlmConfig as LlmBehavior;
use crate::db::models::{LlmConfig, LlmProvider};
use crate::errors::{AppError, Result};
use backoff::backoff::Backoff;
use backoff::ExponentialBackoffBuilder;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A single chat message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Client dispatching generation calls to the configured provider
pub struct LlmClient {
    http: reqwest::Client,
    bedrock: Option<aws_sdk_bedrockruntime::Client>,
    timeout_secs: u64,
    max_retries: u32,
    mock: bool,
    breakers: BreakerRegistry,
}

// OpenAI-compatible wire types (local servers and Azure OpenAI)
#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

// Agent-flow wire types (Azure AI Foundry)
#[derive(Serialize)]
struct FlowRequest<'a> {
    input: &'a str,
}

#[derive(Deserialize)]
struct FlowResponse {
    output: String,
}

impl LlmClient {
    /// Create a client. Loads AWS credentials from the environment for
    /// Bedrock-configured purposes; rustls certificate validation is never
    /// disabled.
    pub async fn new(behavior: &LlmBehavior) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(behavior.timeout_secs))
            .build()
            .map_err(|e| AppError::Internal {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        let bedrock = if behavior.mock {
            None
        } else {
            let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
            Some(aws_sdk_bedrockruntime::Client::new(&aws_config))
        };

        Ok(Self {
            http,
            bedrock,
            timeout_secs: behavior.timeout_secs,
            max_retries: behavior.max_retries,
            mock: behavior.mock,
            breakers: BreakerRegistry::new(
                behavior.breaker_threshold,
                Duration::from_secs(behavior.breaker_cooldown_secs),
            ),
        })
    }

    /// Generate text from messages using the given configuration.
    ///
    /// Retries transient failures with exponential backoff, bounded by
    /// `max_retries`; client-side errors (4xx) are not retried.
    pub async fn generate(
        &self,
        config: &LlmConfig,
        messages: &[ChatMessage],
        max_tokens: u32,
    ) -> Result<String> {
        let purpose = config.llm_purpose();
        self.breakers.check(purpose)?;

        if self.mock {
            let text = mock_completion(messages);
            self.breakers.record_success(purpose);
            return Ok(text);
        }

        let started = std::time::Instant::now();
        let mut policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(500))
            .with_max_interval(Duration::from_secs(30))
            .with_max_elapsed_time(None)
            .build();

        let mut last_error = None;
        for attempt in 0..self.max_retries {
            if attempt > 0 {
                let delay = policy.next_backoff().unwrap_or(Duration::from_secs(1));
                tokio::time::sleep(delay).await;
            }

            match self.dispatch(config, messages, max_tokens).await {
                Ok(text) => {
                    self.breakers.record_success(purpose);
                    crate::metrics::record_provider_call(
                        started.elapsed().as_secs_f64(),
                        &config.provider,
                        true,
                    );
                    return Ok(text);
                }
                Err(e) if is_retryable(&e) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        max_retries = self.max_retries,
                        provider = %config.provider,
                        error = %e,
                        "Provider call failed, retrying"
                    );
                    last_error = Some(e);
                }
                Err(e) => {
                    self.breakers.record_failure(purpose);
                    crate::metrics::record_provider_call(
                        started.elapsed().as_secs_f64(),
                        &config.provider,
                        false,
                    );
                    return Err(e);
                }
            }
        }

        self.breakers.record_failure(purpose);
        crate::metrics::record_provider_call(started.elapsed().as_secs_f64(), &config.provider, false);
        Err(last_error.unwrap_or_else(|| AppError::ProviderUnreachable {
            message: "Unknown error after retries".to_string(),
        }))
    }

    async fn dispatch(
        &self,
        config: &LlmConfig,
        messages: &[ChatMessage],
        max_tokens: u32,
    ) -> Result<String> {
        match config.llm_provider() {
            LlmProvider::Local => self.chat_completions(config, messages, max_tokens).await,
            LlmProvider::Azure => self.chat_completions(config, messages, max_tokens).await,
            LlmProvider::Bedrock => self.bedrock_converse(config, messages, max_tokens).await,
            LlmProvider::AzureAiFoundry => self.agent_flow(config, messages).await,
        }
    }

    /// OpenAI-compatible chat completions. Azure authenticates with an
    /// `api-key` header, local servers with an optional bearer token.
    async fn chat_completions(
        &self,
        config: &LlmConfig,
        messages: &[ChatMessage],
        max_tokens: u32,
    ) -> Result<String> {
        let endpoint = config
            .endpoint
            .as_deref()
            .ok_or_else(|| AppError::Configuration {
                message: format!("Provider {} has no endpoint", config.provider),
            })?;

        let request = ChatRequest {
            model: &config.model,
            messages,
            max_tokens,
        };

        let mut builder = self.http.post(endpoint).json(&request);
        if let Some(ref key) = config.api_key {
            builder = match config.llm_provider() {
                LlmProvider::Azure => builder.header("api-key", key),
                _ => builder.header("Authorization", format!("Bearer {}", key)),
            };
        }

        let response = builder.send().await.map_err(map_transport_error(self.timeout_secs))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }

        let chat: ChatResponse = response.json().await.map_err(|e| AppError::ProviderMalformed {
            message: format!("Failed to parse chat response: {}", e),
        })?;

        chat.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| AppError::ProviderMalformed {
                message: "Empty completion".to_string(),
            })
    }

    /// AWS Bedrock via the SDK Converse API
    async fn bedrock_converse(
        &self,
        config: &LlmConfig,
        messages: &[ChatMessage],
        max_tokens: u32,
    ) -> Result<String> {
        use aws_sdk_bedrockruntime::types::{
            ContentBlock, ConversationRole, InferenceConfiguration, Message, SystemContentBlock,
        };

        let client = self.bedrock.as_ref().ok_or_else(|| AppError::Configuration {
            message: "Bedrock client not initialized".to_string(),
        })?;

        let mut system = Vec::new();
        let mut converse_messages = Vec::new();
        for msg in messages {
            if msg.role == "system" {
                system.push(SystemContentBlock::Text(msg.content.clone()));
                continue;
            }
            let role = if msg.role == "assistant" {
                ConversationRole::Assistant
            } else {
                ConversationRole::User
            };
            let message = Message::builder()
                .role(role)
                .content(ContentBlock::Text(msg.content.clone()))
                .build()
                .map_err(|e| AppError::Internal {
                    message: format!("Failed to build Bedrock message: {}", e),
                })?;
            converse_messages.push(message);
        }

        let response = client
            .converse()
            .model_id(&config.model)
            .set_system(Some(system))
            .set_messages(Some(converse_messages))
            .inference_config(
                InferenceConfiguration::builder()
                    .max_tokens(max_tokens as i32)
                    .build(),
            )
            .send()
            .await
            .map_err(|e| AppError::ProviderUnreachable {
                message: format!("Bedrock converse failed: {}", e),
            })?;

        let output = response.output.ok_or_else(|| AppError::ProviderMalformed {
            message: "Bedrock response had no output".to_string(),
        })?;

        let message = output.as_message().map_err(|_| AppError::ProviderMalformed {
            message: "Bedrock output was not a message".to_string(),
        })?;

        let text: String = message
            .content
            .iter()
            .filter_map(|block| block.as_text().ok().cloned())
            .collect::<Vec<_>>()
            .join("");

        if text.trim().is_empty() {
            return Err(AppError::ProviderMalformed {
                message: "Empty completion".to_string(),
            });
        }
        Ok(text)
    }

    /// Azure AI Foundry agent flow: messages collapse to a single input
    /// string, the flow returns an `output` field
    async fn agent_flow(&self, config: &LlmConfig, messages: &[ChatMessage]) -> Result<String> {
        let endpoint = config
            .endpoint
            .as_deref()
            .ok_or_else(|| AppError::Configuration {
                message: "Agent flow config has no endpoint".to_string(),
            })?;

        let input = messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        let mut builder = self.http.post(endpoint).json(&FlowRequest { input: &input });
        if let Some(ref key) = config.api_key {
            builder = builder.header("api-key", key);
        }

        let response = builder.send().await.map_err(map_transport_error(self.timeout_secs))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }

        let flow: FlowResponse = response.json().await.map_err(|e| AppError::ProviderMalformed {
            message: format!("Failed to parse flow response: {}", e),
        })?;

        if flow.output.trim().is_empty() {
            return Err(AppError::ProviderMalformed {
                message: "Empty flow output".to_string(),
            });
        }
        Ok(flow.output)
    }
}

fn map_transport_error(timeout_secs: u64) -> impl Fn(reqwest::Error) -> AppError {
    move |e| {
        if e.is_timeout() {
            AppError::ProviderTimeout { timeout_secs }
        } else {
            AppError::ProviderUnreachable {
                message: e.to_string(),
            }
        }
    }
}

fn status_error(status: reqwest::StatusCode, body: &str) -> AppError {
    if status.is_client_error() {
        AppError::ProviderMalformed {
            message: format!("API rejected request ({}): {}", status, body),
        }
    } else {
        AppError::ProviderUnreachable {
            message: format!("API error {}: {}", status, body),
        }
    }
}

/// Server-side and transport failures are worth retrying; rejected requests
/// are not.
fn is_retryable(error: &AppError) -> bool {
    matches!(
        error,
        AppError::ProviderUnreachable { .. } | AppError::ProviderTimeout { .. }
    )
}

/// Deterministic canned completion for mock mode
fn mock_completion(messages: &[ChatMessage]) -> String {
    let prompt_chars: usize = messages.iter().map(|m| m.content.len()).sum();
    format!(
        "## Assessment\n\nThe responses indicate a developing maturity level. \
        Key strengths and gaps are summarized below.\n\n\
        - Strength: processes exist but are inconsistently applied\n\
        - Gap: ownership and accountability are not formalized\n\n\
        [Mock completion - {} prompt characters, no provider configured]",
        prompt_chars
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn test_config(provider: &str, endpoint: Option<String>) -> LlmConfig {
        LlmConfig {
            id: Uuid::new_v4(),
            purpose: "report".into(),
            provider: provider.into(),
            model: "test-model".into(),
            endpoint,
            api_key: None,
            max_tokens: 1024,
            is_active: true,
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        }
    }

    fn test_behavior(mock: bool) -> LlmBehavior {
        LlmBehavior {
            timeout_secs: 5,
            max_retries: 2,
            breaker_threshold: 3,
            breaker_cooldown_secs: 60,
            context_window_chars: 24_000,
            mock,
        }
    }

    #[tokio::test]
    async fn test_mock_mode_skips_network() {
        let client = LlmClient::new(&test_behavior(true)).await.unwrap();
        let config = test_config("local", None);

        let text = client
            .generate(&config, &[ChatMessage::user("assess data quality")], 512)
            .await
            .unwrap();
        assert!(text.contains("Mock completion"));
    }

    #[tokio::test]
    async fn test_chat_completions_against_mock_server() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"content": "Generated assessment text"}}]
            })))
            .mount(&server)
            .await;

        let client = LlmClient::new(&test_behavior(true)).await.unwrap();
        let config = test_config("local", Some(format!("{}/v1/chat/completions", server.uri())));

        let text = client
            .chat_completions(&config, &[ChatMessage::user("hello")], 64)
            .await
            .unwrap();
        assert_eq!(text, "Generated assessment text");
    }

    #[tokio::test]
    async fn test_malformed_response_is_not_retried() {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": []
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = LlmClient::new(&test_behavior(true)).await.unwrap();
        let config = test_config("local", Some(server.uri()));

        let err = client
            .chat_completions(&config, &[ChatMessage::user("hello")], 64)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ProviderMalformed { .. }));
        assert!(!is_retryable(&err));
    }

    #[test]
    fn test_retryable_classification() {
        assert!(is_retryable(&AppError::ProviderTimeout { timeout_secs: 1 }));
        assert!(is_retryable(&AppError::ProviderUnreachable {
            message: "connection refused".into()
        }));
        assert!(!is_retryable(&AppError::ProviderMalformed {
            message: "bad json".into()
        }));
    }

    #[test]
    fn test_message_constructors() {
        let msg = ChatMessage::system("you are an assessor");
        assert_eq!(msg.role, "system");
        let msg = ChatMessage::user("score these answers");
        assert_eq!(msg.role, "user");
    }
}
