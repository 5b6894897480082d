use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::blocking::Client;
use reqwest::header::{self, HeaderValue};
use serde::{Deserialize, Serialize};

use bookgen_core::config::LlmConfig;
use bookgen_core::generation::{GenerationError, GenerationRequest, TextGenerator};

use crate::error::AdapterError;
use crate::retry::{call_with_retry, RetryConfig};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const SYSTEM_PROMPT: &str = "You are a professional book writer and content creator. \
    Write engaging, informative, and well-structured content in the requested language.";

pub fn create_text_adapter(config: &LlmConfig) -> Result<OpenAiTextAdapter, AdapterError> {
    OpenAiTextAdapter::new(config)
}

/// Chat-completions adapter for OpenAI-compatible endpoints. Transient
/// failures are retried with linear backoff before the error escalates.
pub struct OpenAiTextAdapter {
    client: Client,
    url: String,
    api_key: String,
    model_name: String,
    retry: RetryConfig,
}

impl OpenAiTextAdapter {
    pub fn new(config: &LlmConfig) -> Result<Self, AdapterError> {
        if config.api_key.trim().is_empty() {
            return Err(AdapterError::InvalidConfig(
                "text service api_key must not be empty".to_string(),
            ));
        }
        if config.model_name.trim().is_empty() {
            return Err(AdapterError::InvalidConfig(
                "model_name must not be empty".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout.max(1)))
            .build()?;

        let base_url = resolve_base_url(&config.base_url);
        Ok(Self {
            client,
            url: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key: config.api_key.clone(),
            model_name: config.model_name.clone(),
            retry: RetryConfig::default(),
        })
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    fn generate_once(&self, request: &GenerationRequest) -> Result<String, AdapterError> {
        let body = ChatCompletionRequest {
            model: &self.model_name,
            messages: vec![
                ChatMessageRequest {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessageRequest {
                    role: "user",
                    content: &request.prompt,
                },
            ],
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        let response = self
            .client
            .post(&self.url)
            .header(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            )
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(AdapterError::HttpStatus { status, body });
        }

        let parsed: ChatCompletionResponse = response.json()?;
        extract_first_choice(parsed).ok_or(AdapterError::EmptyResponse)
    }
}

impl TextGenerator for OpenAiTextAdapter {
    fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        call_with_retry(|| self.generate_once(request), &self.retry)
            .map(|content| content.trim().to_string())
            .map_err(GenerationError::new)
    }
}

/// Normalizes a configured base URL, appending `/v1` when no version
/// segment is present. An empty value falls back to the public endpoint.
fn resolve_base_url(input: &str) -> String {
    static VERSION_SUFFIX_RE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"/v\d+$").expect("invalid version suffix regex"));

    let trimmed = input.trim();
    if trimmed.is_empty() {
        return DEFAULT_BASE_URL.to_string();
    }

    let without_slash = trimmed.trim_end_matches('/');
    if VERSION_SUFFIX_RE.is_match(without_slash) || without_slash.contains("/v1") {
        without_slash.to_string()
    } else {
        format!("{without_slash}/v1")
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessageRequest<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessageRequest<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    #[serde(default)]
    message: Option<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

fn extract_first_choice(response: ChatCompletionResponse) -> Option<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .and_then(|message| message.content)
        .filter(|content| !content.trim().is_empty())
}
