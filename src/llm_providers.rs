use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, warn};

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_PROXY_BASE_URL: &str = "http://localhost:3000";

/// Sampling parameters forwarded with every prompt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    pub model: Option<String>,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            model: None,
            temperature: 0.2,
            max_output_tokens: 2048,
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum LLMError {
    #[error("upstream returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("request failed: {0}")]
    Transport(String),

    #[error("provider not configured: {0}")]
    Configuration(String),
}

impl From<reqwest::Error> for LLMError {
    fn from(err: reqwest::Error) -> Self {
        LLMError::Transport(err.to_string())
    }
}

/// Anything that turns a prompt into free-form model text
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<String, LLMError>;

    fn provider_name(&self) -> &'static str;

    fn model_name(&self) -> &str;
}

/// Raw upstream reply, relayed verbatim on failure
#[derive(Debug, Clone)]
pub struct UpstreamReply {
    pub status: StatusCode,
    pub body: String,
}

/// Gemini provider implementation
#[derive(Debug, Clone)]
pub struct GeminiProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

/// Gemini-specific request structures
#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiGenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

impl GeminiProvider {
    pub fn new(api_key: String, base_url: Option<String>, model: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: base_url.unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string()),
            model: model.unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
        }
    }

    /// Posts the prompt and returns the upstream status and body untouched
    pub async fn call(&self, prompt: &str, options: &GenerationOptions) -> Result<UpstreamReply, LLMError> {
        let model = options.model.as_deref().unwrap_or(&self.model);
        let request_body = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GeminiGenerationConfig {
                temperature: options.temperature,
                max_output_tokens: options.max_output_tokens,
            },
        };

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url.trim_end_matches('/'),
            model,
            self.api_key
        );

        info!(
            provider = self.provider_name(),
            model = %model,
            base_url = %self.base_url,
            prompt_length = prompt.len(),
            "Making LLM request"
        );

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        info!(
            provider = self.provider_name(),
            status = %status,
            preview = %body.chars().take(200).collect::<String>(),
            "Received upstream response"
        );

        Ok(UpstreamReply { status, body })
    }

    /// Generated text from a successful body. Bodies that are not JSON are
    /// returned as-is; JSON without a candidate yields an empty string.
    pub fn extract_text(body: &str) -> String {
        match serde_json::from_str::<Value>(body) {
            Ok(parsed) => parsed
                .pointer("/candidates/0/content/parts/0/text")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            Err(e) => {
                warn!(error = %e, "Upstream body is not JSON, relaying raw text");
                body.to_string()
            }
        }
    }
}

#[async_trait]
impl TextGenerator for GeminiProvider {
    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<String, LLMError> {
        let reply = self.call(prompt, options).await?;

        if !reply.status.is_success() {
            error!(
                provider = self.provider_name(),
                status = %reply.status,
                error = %reply.body,
                "LLM API request failed"
            );
            return Err(LLMError::Status {
                status: reply.status.as_u16(),
                body: reply.body,
            });
        }

        let text = Self::extract_text(&reply.body);
        info!(
            provider = self.provider_name(),
            response_length = text.len(),
            "Successfully received LLM response"
        );
        Ok(text)
    }

    fn provider_name(&self) -> &'static str {
        "Gemini"
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Client for the `/generate-test` relay; the relay holds the credential
#[derive(Debug, Clone)]
pub struct ProxyClient {
    client: Client,
    base_url: String,
    model: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RelayRequest<'a> {
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    temperature: f32,
    max_output_tokens: u32,
}

impl ProxyClient {
    pub fn new(base_url: Option<String>, model: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.unwrap_or_else(|| DEFAULT_PROXY_BASE_URL.to_string()),
            model,
        }
    }
}

#[async_trait]
impl TextGenerator for ProxyClient {
    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<String, LLMError> {
        let body = RelayRequest {
            prompt,
            model: options.model.as_deref().or(self.model.as_deref()),
            temperature: options.temperature,
            max_output_tokens: options.max_output_tokens,
        };

        info!(
            provider = self.provider_name(),
            base_url = %self.base_url,
            prompt_length = prompt.len(),
            max_output_tokens = options.max_output_tokens,
            "Sending prompt through relay"
        );

        let response = self
            .client
            .post(format!("{}/generate-test", self.base_url.trim_end_matches('/')))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            error!(
                provider = self.provider_name(),
                status = %status,
                error = %text,
                "Relay request failed"
            );
            return Err(LLMError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        info!(
            provider = self.provider_name(),
            response_length = text.len(),
            "Successfully received relay response"
        );
        Ok(text)
    }

    fn provider_name(&self) -> &'static str {
        "Proxy"
    }

    fn model_name(&self) -> &str {
        self.model.as_deref().unwrap_or("relay-default")
    }
}

/// Factory for creating LLM providers based on provider type
pub struct LLMProviderFactory;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum LLMProviderType {
    Proxy,
    Gemini,
}

impl LLMProviderType {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "proxy" | "relay" => Some(LLMProviderType::Proxy),
            "gemini" | "google" => Some(LLMProviderType::Gemini),
            _ => None,
        }
    }
}

impl LLMProviderFactory {
    /// `base_url` is the relay address for `Proxy` and the API root for `Gemini`
    pub fn create_provider(
        provider_type: LLMProviderType,
        api_key: Option<String>,
        base_url: Option<String>,
        model: Option<String>,
    ) -> Result<Arc<dyn TextGenerator>, LLMError> {
        match provider_type {
            LLMProviderType::Proxy => Ok(Arc::new(ProxyClient::new(base_url, model))),
            LLMProviderType::Gemini => {
                let api_key = api_key
                    .filter(|k| !k.trim().is_empty())
                    .ok_or_else(|| LLMError::Configuration("GEMINI_API_KEY is not set".to_string()))?;
                Ok(Arc::new(GeminiProvider::new(api_key, base_url, model)))
            }
        }
    }
}
