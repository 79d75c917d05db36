//! Remote sentiment classification through an LLM service
//!
//! Sends the mention context to a structured-completion endpoint and validates
//! the JSON judgment it returns. Two wire protocols are supported:
//!
//! - OpenAI-compatible chat completions (`/v1/chat/completions`, JSON mode)
//! - Ollama (`/api/generate` with `format: "json"`)
//!
//! Transient failures are retried with backoff; malformed or incomplete
//! judgments are returned as errors immediately.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use super::{ClassificationError, ClassifyResult, SentimentClassifier};
use crate::models::{
    ClassificationResult, Emotion, Mention, Sentiment, Stance, ToneAndStyle, UnknownLabel,
};
use crate::utils::preview;
use crate::utils::retry::{with_retry_if, RetryConfig};

/// Wire protocol spoken by the remote service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteProtocol {
    /// OpenAI-compatible chat completions
    #[default]
    OpenAi,
    /// Ollama generate API
    Ollama,
}

impl fmt::Display for RemoteProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OpenAi => f.write_str("openai"),
            Self::Ollama => f.write_str("ollama"),
        }
    }
}

impl FromStr for RemoteProtocol {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "ollama" => Ok(Self::Ollama),
            other => anyhow::bail!("Unknown remote protocol: {other}"),
        }
    }
}

/// Configuration for the remote classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub protocol: RemoteProtocol,

    /// Service base URL (default: https://api.openai.com)
    pub endpoint: String,

    /// Model name to use (default: gpt-4o)
    pub model: String,

    /// Environment variable holding the bearer token
    pub api_key_env: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// Temperature for generation
    pub temperature: f32,

    /// Maximum tokens to generate
    pub max_tokens: u32,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            protocol: RemoteProtocol::OpenAi,
            endpoint: "https://api.openai.com".to_string(),
            model: "gpt-4o".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_secs: 60,
            temperature: 0.0,
            max_tokens: 512,
        }
    }
}

impl RemoteConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            protocol: std::env::var("FINMENTION_REMOTE_PROTOCOL")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.protocol),
            endpoint: std::env::var("FINMENTION_REMOTE_ENDPOINT").unwrap_or(defaults.endpoint),
            model: std::env::var("FINMENTION_REMOTE_MODEL").unwrap_or(defaults.model),
            api_key_env: defaults.api_key_env,
            timeout_secs: std::env::var("FINMENTION_REMOTE_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.timeout_secs),
            temperature: std::env::var("FINMENTION_REMOTE_TEMPERATURE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.temperature),
            max_tokens: std::env::var("FINMENTION_REMOTE_MAX_TOKENS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_tokens),
        }
    }

    fn base_url(&self) -> &str {
        self.endpoint.trim_end_matches('/')
    }
}

/// OpenAI chat completion request
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    response_format: ResponseFormat,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

/// OpenAI chat completion response
#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Ollama generate request
#[derive(Debug, Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    format: &'static str,
    options: OllamaOptions,
}

/// Ollama generation options
#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

/// Ollama generate response
#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
}

/// LLM-backed classifier producing the full judgment (sentiment, tone and
/// style, emotion, intent, stance)
pub struct RemoteClassifier {
    client: Client,
    config: RemoteConfig,
    retry: RetryConfig,
    api_key: Option<String>,
    name: String,
}

impl RemoteClassifier {
    /// Create a classifier; the API key is read from `config.api_key_env`
    pub fn with_config(config: RemoteConfig, retry: RetryConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty());

        if api_key.is_none() && config.protocol == RemoteProtocol::OpenAi {
            tracing::warn!(
                env = %config.api_key_env,
                "No API key set, requests will be sent unauthenticated"
            );
        }

        Ok(Self {
            client,
            name: format!("remote:{}", config.model),
            config,
            retry,
            api_key,
        })
    }

    /// Replace the API key
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Check if the service answers at all
    pub async fn is_available(&self) -> bool {
        let url = match self.config.protocol {
            RemoteProtocol::OpenAi => format!("{}/v1/models", self.config.base_url()),
            RemoteProtocol::Ollama => format!("{}/api/tags", self.config.base_url()),
        };

        let mut request = self.client.get(&url);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        request.send().await.is_ok()
    }

    /// Send one prompt and return the raw completion text
    async fn complete(&self, prompt: &str) -> ClassifyResult<String> {
        match self.config.protocol {
            RemoteProtocol::OpenAi => self.complete_openai(prompt).await,
            RemoteProtocol::Ollama => self.complete_ollama(prompt).await,
        }
    }

    async fn complete_openai(&self, prompt: &str) -> ClassifyResult<String> {
        let url = format!("{}/v1/chat/completions", self.config.base_url());

        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            response_format: ResponseFormat {
                kind: "json_object",
            },
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let mut builder = self.client.post(&url).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let body = self.send(builder).await?;
        let response: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| ClassificationError::malformed(format!("invalid completion envelope: {e}")))?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ClassificationError::malformed("completion has no message content"))
    }

    async fn complete_ollama(&self, prompt: &str) -> ClassifyResult<String> {
        let url = format!("{}/api/generate", self.config.base_url());

        let request = OllamaRequest {
            model: &self.config.model,
            prompt,
            stream: false,
            format: "json",
            options: OllamaOptions {
                temperature: self.config.temperature,
                num_predict: self.config.max_tokens,
            },
        };

        let body = self.send(self.client.post(&url).json(&request)).await?;
        let response: OllamaResponse = serde_json::from_str(&body)
            .map_err(|e| ClassificationError::malformed(format!("invalid Ollama envelope: {e}")))?;

        Ok(response.response)
    }

    /// Send a request, mapping transport and status failures to typed errors
    async fn send(&self, builder: reqwest::RequestBuilder) -> ClassifyResult<String> {
        let response = builder.send().await.map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            return Err(ClassificationError::Service {
                status: status.as_u16(),
                body: preview(&body, 200),
            });
        }

        Ok(body)
    }

    fn transport_error(&self, err: reqwest::Error) -> ClassificationError {
        if err.is_timeout() {
            ClassificationError::Timeout(Duration::from_secs(self.config.timeout_secs))
        } else {
            ClassificationError::Http(err)
        }
    }
}

#[async_trait]
impl SentimentClassifier for RemoteClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn extended_fields(&self) -> bool {
        true
    }

    async fn classify(&self, mention: &Mention) -> ClassifyResult<ClassificationResult> {
        if mention.context().trim().is_empty() {
            return Err(ClassificationError::EmptyInput);
        }

        let prompt = build_prompt(&mention.entity, mention.context());

        let raw = with_retry_if(
            &self.retry,
            || self.complete(&prompt),
            ClassificationError::is_recoverable,
        )
        .await?;

        tracing::debug!(
            entity = %mention.entity,
            response = %preview(&raw, 300),
            "Received structured judgment"
        );

        parse_judgment(&raw)
    }
}

/// Prompt asking for the structured judgment of one entity's context
pub fn build_prompt(entity: &str, text: &str) -> String {
    format!(
        r#"Analyze the following text from a financial report related to "{entity}".
The text is: "{text}"
Provide a JSON object with:
"Sentiment": ("Positive", "Negative", or "Neutral"),
"ToneAndStyle": ("Formal", "Cautious", "Informative"),
"Emotion": ("Confident", "Concern", "Neutral"),
"Intent": "Describe the purpose (e.g., risk disclosure, performance summary).",
"Stance": ("Agreement", "Contradiction", "Neutrality")."#
    )
}

/// Validate a structured judgment into a [`ClassificationResult`]
///
/// Keys must match exactly; label values match case-insensitively. A missing
/// key, a non-string value or a label outside its vocabulary is an error.
pub fn parse_judgment(raw: &str) -> ClassifyResult<ClassificationResult> {
    let json = extract_raw_json(raw);

    let value: Value = serde_json::from_str(json)
        .map_err(|e| ClassificationError::malformed(format!("invalid JSON: {e}")))?;

    let object = value
        .as_object()
        .ok_or_else(|| ClassificationError::malformed("expected a JSON object"))?;

    let sentiment: Sentiment = label_field(object, Sentiment::FIELD)?;
    let tone_and_style: ToneAndStyle = label_field(object, ToneAndStyle::FIELD)?;
    let emotion: Emotion = label_field(object, Emotion::FIELD)?;
    let stance: Stance = label_field(object, Stance::FIELD)?;
    let intent = string_field(object, "Intent")?;

    if intent.is_empty() {
        return Err(ClassificationError::InvalidField {
            field: "Intent",
            value: String::new(),
        });
    }

    Ok(ClassificationResult {
        sentiment,
        confidence: None,
        tone_and_style: Some(tone_and_style),
        emotion: Some(emotion),
        intent: Some(intent.to_string()),
        stance: Some(stance),
    })
}

fn string_field<'a>(object: &'a Map<String, Value>, field: &'static str) -> ClassifyResult<&'a str> {
    let value = object
        .get(field)
        .ok_or(ClassificationError::MissingField(field))?;

    value
        .as_str()
        .map(str::trim)
        .ok_or_else(|| ClassificationError::InvalidField {
            field,
            value: value.to_string(),
        })
}

fn label_field<T>(object: &Map<String, Value>, field: &'static str) -> ClassifyResult<T>
where
    T: FromStr<Err = UnknownLabel>,
{
    Ok(string_field(object, field)?.parse::<T>()?)
}

/// Extract the JSON payload from a completion, tolerating code fences and
/// surrounding prose
fn extract_raw_json(text: &str) -> &str {
    // Fenced with a language tag
    if let Some(start) = text.find("```json") {
        if let Some(end) = text[start + 7..].find("```") {
            return text[start + 7..start + 7 + end].trim();
        }
    }

    // Generic fence
    if let Some(start) = text.find("```") {
        let after_start = &text[start + 3..];
        let content_start = after_start.find('\n').map_or(0, |i| i + 1);
        if let Some(end) = after_start[content_start..].find("```") {
            return after_start[content_start..content_start + end].trim();
        }
    }

    // Bare object
    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if end > start {
            return &text[start..=end];
        }
    }

    text.trim()
}
