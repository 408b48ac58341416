//! HTTP backends for the LLM collaborator.
//!
//! [`LlmBackend`] dispatches by enum over an OpenAI-compatible chat
//! completions backend and an Anthropic Messages backend. Both share one
//! `reqwest` client whose timeout is `llm.request_timeout_ms`.

use std::time::Duration;

use counterfact_core::config::{LLM_API_KEY_ENV, LlmConfig};
use serde_json::{Value, json};

use crate::error::RunnerError;
use crate::prompt::RenderedPrompt;

/// Supported LLM backend types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    /// `OpenAI`-compatible API (works with `OpenAI`, `DeepSeek`, Ollama).
    OpenAi,
    /// Anthropic Messages API (different request format).
    Anthropic,
}

impl BackendType {
    /// Parse a configured backend name, accepting common aliases.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Config`] for an unknown name.
    pub fn parse(name: &str) -> Result<Self, RunnerError> {
        match name.trim().to_lowercase().as_str() {
            "openai" | "deepseek" | "ollama" => Ok(Self::OpenAi),
            "anthropic" | "claude" => Ok(Self::Anthropic),
            other => Err(RunnerError::Config(format!("unknown backend type: {other}"))),
        }
    }
}

/// Connection details shared by every backend.
#[derive(Debug)]
struct Connection {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl Connection {
    fn new(config: &LlmConfig) -> Result<Self, RunnerError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                RunnerError::Config(format!("no API key set; export {LLM_API_KEY_ENV}"))
            })?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| RunnerError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_owned(),
            api_key,
            model: config.model.clone(),
        })
    }

    /// Send `body` as JSON and return the decoded reply. Non-2xx statuses
    /// are errors carrying the response text.
    async fn send(
        &self,
        provider: &str,
        request: reqwest::RequestBuilder,
        body: &Value,
    ) -> Result<Value, RunnerError> {
        let response = request
            .json(body)
            .send()
            .await
            .map_err(|e| RunnerError::LlmBackend(format!("{provider} request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(RunnerError::LlmBackend(format!(
                "{provider} returned {status}: {detail}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| RunnerError::LlmBackend(format!("{provider} reply is not JSON: {e}")))
    }
}

/// Anthropic API version header value.
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// A configured LLM backend.
#[derive(Debug)]
pub enum LlmBackend {
    /// Chat completions (`OpenAI`, `DeepSeek`, Ollama).
    OpenAi(OpenAiBackend),
    /// Anthropic Messages.
    Anthropic(AnthropicBackend),
}

impl LlmBackend {
    /// Create a backend from the `llm` configuration section.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Config`] for an unknown backend type, a
    /// missing API key, or an HTTP client that cannot be built.
    pub fn from_config(config: &LlmConfig) -> Result<Self, RunnerError> {
        let connection = Connection::new(config)?;
        Ok(match BackendType::parse(&config.backend)? {
            BackendType::OpenAi => Self::OpenAi(OpenAiBackend { connection }),
            BackendType::Anthropic => Self::Anthropic(AnthropicBackend { connection }),
        })
    }

    /// Send a rendered prompt and return the reply text.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::LlmBackend`] on a transport failure, a non-2xx
    /// status, or a reply without text.
    pub async fn complete(&self, prompt: &RenderedPrompt) -> Result<String, RunnerError> {
        match self {
            Self::OpenAi(backend) => backend.complete(prompt).await,
            Self::Anthropic(backend) => backend.complete(prompt).await,
        }
    }

    /// Backend name for logs and health output.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::OpenAi(_) => "openai-compatible",
            Self::Anthropic(_) => "anthropic",
        }
    }

    /// The configured model identifier.
    pub fn model(&self) -> &str {
        match self {
            Self::OpenAi(backend) => &backend.connection.model,
            Self::Anthropic(backend) => &backend.connection.model,
        }
    }
}

// ---------------------------------------------------------------------------
// OpenAI-compatible backend
// ---------------------------------------------------------------------------

/// Backend for OpenAI-compatible chat completions APIs.
///
/// Sends requests to `{api_url}/chat/completions` with a bearer token. JSON
/// prompts ask for `response_format: json_object`.
#[derive(Debug)]
pub struct OpenAiBackend {
    connection: Connection,
}

impl OpenAiBackend {
    async fn complete(&self, prompt: &RenderedPrompt) -> Result<String, RunnerError> {
        let conn = &self.connection;
        let mut body = json!({
            "model": conn.model,
            "messages": [
                {"role": "system", "content": prompt.system},
                {"role": "user", "content": prompt.user},
            ],
            "temperature": 0.7,
            "max_tokens": prompt.max_tokens,
        });
        if prompt.expects_json
            && let Some(fields) = body.as_object_mut()
        {
            fields.insert(
                String::from("response_format"),
                json!({"type": "json_object"}),
            );
        }

        let request = conn
            .client
            .post(format!("{}/chat/completions", conn.api_url))
            .bearer_auth(&conn.api_key);
        let reply = conn.send("OpenAI", request, &body).await?;
        text_at(&reply, "/choices/0/message/content", "OpenAI")
    }
}

// ---------------------------------------------------------------------------
// Anthropic Messages API backend
// ---------------------------------------------------------------------------

/// Backend for the Anthropic Messages API.
///
/// The system prompt is a top-level field, the key travels in `x-api-key`,
/// and the reply text sits at `content[0].text`.
#[derive(Debug)]
pub struct AnthropicBackend {
    connection: Connection,
}

impl AnthropicBackend {
    async fn complete(&self, prompt: &RenderedPrompt) -> Result<String, RunnerError> {
        let conn = &self.connection;
        let body = json!({
            "model": conn.model,
            "max_tokens": prompt.max_tokens,
            "system": prompt.system,
            "messages": [{"role": "user", "content": prompt.user}],
        });

        let request = conn
            .client
            .post(format!("{}/messages", conn.api_url))
            .header("x-api-key", &conn.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION);
        let reply = conn.send("Anthropic", request, &body).await?;
        text_at(&reply, "/content/0/text", "Anthropic")
    }
}

/// The string at a JSON pointer in a provider reply.
fn text_at(reply: &Value, pointer: &str, provider: &str) -> Result<String, RunnerError> {
    reply
        .pointer(pointer)
        .and_then(Value::as_str)
        .map(ToOwned::to_owned)
        .ok_or_else(|| RunnerError::LlmBackend(format!("{provider} reply has no text at {pointer}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(backend: &str, api_key: Option<&str>) -> LlmConfig {
        LlmConfig {
            enabled: true,
            backend: backend.to_owned(),
            api_key: api_key.map(ToOwned::to_owned),
            ..LlmConfig::default()
        }
    }

    #[test]
    fn text_is_read_at_the_provider_pointer() {
        let reply = json!({"choices": [{"message": {"content": "{\"intent\": \"fork\"}"}}]});
        assert_eq!(
            text_at(&reply, "/choices/0/message/content", "OpenAI").ok(),
            Some(String::from("{\"intent\": \"fork\"}"))
        );

        let reply = json!({"content": [{"type": "text", "text": "Paris holds."}]});
        assert_eq!(
            text_at(&reply, "/content/0/text", "Anthropic").ok(),
            Some(String::from("Paris holds."))
        );
    }

    #[test]
    fn missing_text_is_a_backend_error() {
        let err = text_at(&json!({"error": "rate_limit"}), "/choices/0/message/content", "OpenAI");
        assert!(matches!(err, Err(RunnerError::LlmBackend(msg)) if msg.contains("OpenAI")));
        assert!(text_at(&json!({"content": []}), "/content/0/text", "Anthropic").is_err());
    }

    #[test]
    fn backend_aliases() {
        assert_eq!(BackendType::parse("DeepSeek").ok(), Some(BackendType::OpenAi));
        assert_eq!(BackendType::parse("ollama").ok(), Some(BackendType::OpenAi));
        assert_eq!(BackendType::parse("claude").ok(), Some(BackendType::Anthropic));
        assert!(matches!(
            BackendType::parse("gemini"),
            Err(RunnerError::Config(_))
        ));
    }

    #[test]
    fn from_config_dispatches_correctly() {
        let backend = LlmBackend::from_config(&config("openai", Some("test")));
        assert_eq!(backend.map(|b| b.name()).ok(), Some("openai-compatible"));

        let backend = LlmBackend::from_config(&config("anthropic", Some("test")));
        assert_eq!(backend.map(|b| b.name()).ok(), Some("anthropic"));
    }

    #[test]
    fn missing_api_key_is_a_config_error() {
        assert!(matches!(
            LlmBackend::from_config(&config("openai", None)),
            Err(RunnerError::Config(_))
        ));
        assert!(matches!(
            LlmBackend::from_config(&config("openai", Some("  "))),
            Err(RunnerError::Config(_))
        ));
    }
}
