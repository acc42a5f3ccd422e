// AI Provider Service
// OpenAI-compatible chat completion calls (DeepSeek by default)

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Instant;
use thiserror::Error;

use crate::services::config_store::{AppConfig, ConfigStore};

pub const DEEPSEEK_DEFAULT_URL: &str = "https://api.deepseek.com/v1/chat/completions";
pub const DEEPSEEK_DEFAULT_MODEL: &str = "deepseek-chat";

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },
    #[error("Missing content in response")]
    MissingContent,
    #[error("JSON parse error: {0}")]
    JsonError(String),
    #[error("API key not configured")]
    MissingApiKey,
}

/// A single system + user prompt exchange
#[derive(Debug, Clone, PartialEq)]
pub struct ChatPrompt {
    pub system: String,
    pub user: String,
    pub temperature: f64,
    pub max_tokens: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResult {
    pub content: String,
    pub latency_ms: i64,
}

/// Boundary to the external language model.
/// One attempt per call; callers decide how failures are handled.
#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn chat(&self, prompt: ChatPrompt) -> Result<ChatResult, ProviderError>;

    fn model_name(&self) -> &str;
}

#[derive(Debug, Clone, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: i32,
    temperature: f64,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatResponse {
    choices: Option<Vec<ChatChoice>>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatChoice {
    message: Option<ChatMessageResponse>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

pub struct ProviderClient {
    client: Client,
    url: String,
    model: String,
    api_key: String,
}

impl ProviderClient {
    /// Build a client from the config file, with `DEEPSEEK_BASE_URL` overriding its URL
    pub fn from_env() -> Result<Self, ProviderError> {
        let config = ConfigStore::open_default()
            .and_then(|store| store.load().ok())
            .unwrap_or_default();
        Self::from_config(&config, env::var("DEEPSEEK_BASE_URL").ok())
    }

    /// Build a client from the `provider` and `apiKeys` config sections
    pub fn from_config(config: &AppConfig, base_url_override: Option<String>) -> Result<Self, ProviderError> {
        let api_key = get_api_key(config, "deepseek").ok_or(ProviderError::MissingApiKey)?;
        let url = base_url_override
            .filter(|v| !v.trim().is_empty())
            .or_else(|| Some(config.provider.base_url.clone()).filter(|v| !v.trim().is_empty()))
            .map(|v| chat_completions_url(&v))
            .unwrap_or_else(|| DEEPSEEK_DEFAULT_URL.to_string());
        let model = Some(config.provider.model.trim())
            .filter(|m| !m.is_empty())
            .unwrap_or(DEEPSEEK_DEFAULT_MODEL)
            .to_string();
        Ok(Self::new(url, model, api_key))
    }

    pub fn new(url: String, model: String, api_key: String) -> Self {
        // No client-side timeout: a caller wanting one wraps the boundary itself.
        let client = Client::builder().build().unwrap_or_default();
        Self {
            client,
            url,
            model,
            api_key,
        }
    }

    async fn call_chat_api(&self, prompt: &ChatPrompt) -> Result<ChatResult, ProviderError> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: prompt.system.clone(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt.user.clone(),
                },
            ],
            max_tokens: prompt.max_tokens,
            temperature: prompt.temperature,
        };

        let start = Instant::now();

        let response = self
            .client
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        let latency_ms = start.elapsed().as_millis() as i64;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        let data: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::JsonError(e.to_string()))?;

        let content = data
            .choices
            .as_ref()
            .and_then(|c| c.first())
            .and_then(|c| c.message.as_ref())
            .and_then(|m| m.content.clone())
            .ok_or(ProviderError::MissingContent)?;

        Ok(ChatResult {
            content,
            latency_ms,
        })
    }
}

#[async_trait]
impl ChatClient for ProviderClient {
    async fn chat(&self, prompt: ChatPrompt) -> Result<ChatResult, ProviderError> {
        self.call_chat_api(&prompt).await
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Accept either a full endpoint or an API base such as `https://api.deepseek.com/v1`
pub fn chat_completions_url(base: &str) -> String {
    let trimmed = base.trim().trim_end_matches('/');
    if trimmed.ends_with("/chat/completions") {
        trimmed.to_string()
    } else {
        format!("{}/chat/completions", trimmed)
    }
}

/// Get API key from environment, falling back to the config file's key map
pub fn get_api_key(config: &AppConfig, provider: &str) -> Option<String> {
    let env_keys: &[&str] = match provider {
        "deepseek" => &["DEEPSEEK_API_KEY", "SPAMLENS_DEEPSEEK_API_KEY"],
        _ => &[],
    };

    for key in env_keys {
        if let Ok(val) = env::var(key) {
            let v = val.trim();
            if !v.is_empty() {
                return Some(v.to_string());
            }
        }
    }

    config
        .api_keys
        .get(provider)
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
}
