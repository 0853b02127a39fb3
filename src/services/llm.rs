use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde_json::{Value, json};
use std::time::Duration;
use tracing::debug;

use crate::config::ProviderConfig;
use crate::error::LlmError;

pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const GEMINI_KEY_HEADER: &str = "x-goog-api-key";

/// Parameters of one text-generation call.
#[derive(Debug, Clone, Copy)]
pub struct TextRequest<'a> {
    pub prompt: &'a str,
    pub model: &'a str,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub images: &'a [Vec<u8>],
}

/// A text-generation backend.
#[async_trait]
pub trait TextClient: Send + Sync {
    async fn generate_text(&self, request: TextRequest<'_>) -> Result<String, LlmError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Gemini,
    OpenAiCompatible,
}

impl ProviderKind {
    pub fn parse(kind: &str) -> Option<Self> {
        match kind.to_ascii_lowercase().as_str() {
            "google_gemini" | "gemini" => Some(ProviderKind::Gemini),
            "openai_compatible" | "openai" => Some(ProviderKind::OpenAiCompatible),
            _ => None,
        }
    }
}

/// Builds the HTTP client for a provider entry.
pub fn client_for(kind: ProviderKind, config: &ProviderConfig) -> Box<dyn TextClient> {
    let api_key = config.api_key.clone().unwrap_or_default();
    let timeout = config.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
    let base_url = config.base_url.clone().filter(|b| !b.trim().is_empty());
    match kind {
        ProviderKind::Gemini => Box::new(GeminiClient {
            base_url: base_url.unwrap_or_else(|| GEMINI_BASE_URL.to_string()),
            api_key,
            timeout,
        }),
        ProviderKind::OpenAiCompatible => Box::new(OpenAiClient {
            base_url: base_url.unwrap_or_else(|| OPENAI_BASE_URL.to_string()),
            api_key,
            timeout,
        }),
    }
}

pub struct GeminiClient {
    base_url: String,
    api_key: String,
    timeout: u64,
}

#[async_trait]
impl TextClient for GeminiClient {
    async fn generate_text(&self, request: TextRequest<'_>) -> Result<String, LlmError> {
        const PROVIDER: &str = "gemini";
        let url = format!(
            "{}/models/{}:generateContent",
            normalize_gemini_base(&self.base_url),
            request.model
        );

        let mut parts: Vec<Value> = request
            .images
            .iter()
            .map(|image| {
                json!({
                    "inline_data": {
                        "mime_type": sniff_image_mime(image),
                        "data": BASE64.encode(image),
                    }
                })
            })
            .collect();
        parts.push(json!({ "text": request.prompt }));

        let body = json!({
            "contents": [{ "role": "user", "parts": parts }],
            "generationConfig": {
                "temperature": request.temperature,
                "maxOutputTokens": request.max_output_tokens,
            }
        });

        debug!("gemini request: model={} images={}", request.model, request.images.len());
        let response = http_client(PROVIDER, self.timeout)?
            .post(url)
            .header(GEMINI_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| send_error(PROVIDER, self.timeout, e))?;

        let v = read_json(PROVIDER, self.timeout, response).await?;
        non_empty(PROVIDER, extract_gemini_content(&v))
    }
}

pub struct OpenAiClient {
    base_url: String,
    api_key: String,
    timeout: u64,
}

#[async_trait]
impl TextClient for OpenAiClient {
    async fn generate_text(&self, request: TextRequest<'_>) -> Result<String, LlmError> {
        const PROVIDER: &str = "openai";
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));

        let content = if request.images.is_empty() {
            json!(request.prompt)
        } else {
            let mut items = vec![json!({ "type": "text", "text": request.prompt })];
            items.extend(request.images.iter().map(|image| {
                json!({
                    "type": "image_url",
                    "image_url": {
                        "url": format!("data:{};base64,{}", sniff_image_mime(image), BASE64.encode(image))
                    }
                })
            }));
            Value::Array(items)
        };

        let body = json!({
            "model": request.model,
            "messages": [{ "role": "user", "content": content }],
            "temperature": request.temperature,
            "max_tokens": request.max_output_tokens,
            "stream": false
        });

        debug!("openai request: model={} images={}", request.model, request.images.len());
        let response = http_client(PROVIDER, self.timeout)?
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| send_error(PROVIDER, self.timeout, e))?;

        let v = read_json(PROVIDER, self.timeout, response).await?;
        non_empty(PROVIDER, extract_openai_content(&v))
    }
}

fn http_client(provider: &'static str, timeout: u64) -> Result<reqwest::Client, LlmError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout))
        .build()
        .map_err(|source| LlmError::Transport { provider, source })
}

// The request URL is stripped so endpoint paths never reach the classifier or the caller.
fn send_error(provider: &'static str, timeout: u64, e: reqwest::Error) -> LlmError {
    if e.is_timeout() {
        LlmError::Timeout { provider, timeout }
    } else {
        LlmError::Transport { provider, source: e.without_url() }
    }
}

async fn read_json(
    provider: &'static str,
    timeout: u64,
    response: reqwest::Response,
) -> Result<Value, LlmError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(LlmError::Status { provider, status: status.as_u16(), body });
    }
    response.json().await.map_err(|e| send_error(provider, timeout, e))
}

fn non_empty(provider: &'static str, text: String) -> Result<String, LlmError> {
    if text.trim().is_empty() {
        Err(LlmError::EmptyResponse { provider })
    } else {
        Ok(text)
    }
}

fn normalize_gemini_base(base_url: &str) -> String {
    let trimmed = base_url.trim_end_matches('/');
    if trimmed.ends_with("/v1") || trimmed.ends_with("/v1beta") {
        trimmed.to_string()
    } else {
        format!("{}/v1beta", trimmed)
    }
}

fn extract_gemini_content(v: &Value) -> String {
    v.get("candidates")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.as_array())
        .map(|parts| {
            parts
                .iter()
                .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default()
}

fn extract_openai_content(v: &Value) -> String {
    v.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .unwrap_or("")
        .to_string()
}

/// Guesses an image MIME type from its magic bytes, PNG when unknown.
pub fn sniff_image_mime(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        "image/jpeg"
    } else if bytes.starts_with(b"GIF8") {
        "image/gif"
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        "image/webp"
    } else {
        "image/png"
    }
}
