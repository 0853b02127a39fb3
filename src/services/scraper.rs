//! Web page scraping through a Firecrawl-compatible API.
//!
//! Scraped markdown is what callers later pass to the outline generator as
//! source content.

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{error, info};

use crate::config::FirecrawlConfig;
use crate::error::ScrapeError;
use crate::models::ScrapedPage;

pub const DEFAULT_BASE_URL: &str = "https://api.firecrawl.dev";
pub const SCRAPE_TIMEOUT_SECS: u64 = 60;
const UNKNOWN_TITLE: &str = "未知标题";

#[derive(Debug, Deserialize, Default)]
struct ScrapeResponse {
    #[serde(default)]
    success: bool,
    data: Option<ScrapeData>,
    error: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct ScrapeData {
    #[serde(default)]
    markdown: String,
    #[serde(default)]
    metadata: ScrapeMetadata,
}

#[derive(Debug, Deserialize, Default)]
struct ScrapeMetadata {
    title: Option<String>,
    #[serde(rename = "ogTitle")]
    og_title: Option<String>,
}

pub struct FirecrawlClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl FirecrawlClient {
    pub fn new(config: &FirecrawlConfig) -> Result<Self, ScrapeError> {
        Self::with_timeout(config, Duration::from_secs(SCRAPE_TIMEOUT_SECS))
    }

    pub fn with_timeout(config: &FirecrawlConfig, timeout: Duration) -> Result<Self, ScrapeError> {
        let base_url = config.base_url.trim_end_matches('/');
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(FirecrawlClient {
            client,
            base_url: if base_url.is_empty() { DEFAULT_BASE_URL.to_string() } else { base_url.to_string() },
            api_key: config.api_key.clone(),
        })
    }

    pub async fn scrape(&self, url: &str) -> Result<ScrapedPage, ScrapeError> {
        info!("开始抓取网页: {}", url);

        let mut request_builder = self
            .client
            .post(format!("{}/v1/scrape", self.base_url))
            .header("Content-Type", "application/json")
            .json(&json!({ "url": url, "formats": ["markdown"] }));

        if !self.api_key.is_empty() {
            request_builder = request_builder.header("Authorization", format!("Bearer {}", self.api_key));
        }

        let response = request_builder.send().await.map_err(|e| {
            if e.is_timeout() {
                error!("抓取超时: {}", url);
                ScrapeError::Timeout
            } else if e.is_connect() {
                error!("无法连接 Firecrawl 服务: {}", self.base_url);
                ScrapeError::Connection { base_url: self.base_url.clone() }
            } else {
                ScrapeError::Request(e)
            }
        })?;

        match response.status() {
            StatusCode::OK => {}
            StatusCode::UNAUTHORIZED => {
                error!("Firecrawl API Key 无效");
                return Err(ScrapeError::InvalidCredential);
            }
            StatusCode::PAYMENT_REQUIRED => {
                error!("Firecrawl API 配额已用尽");
                return Err(ScrapeError::QuotaExhausted);
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                error!(
                    "Firecrawl 请求失败: HTTP {} - {}",
                    status.as_u16(),
                    body.chars().take(200).collect::<String>()
                );
                return Err(ScrapeError::Http { status: status.as_u16() });
            }
        }

        let result: ScrapeResponse = response.json().await?;
        let ScrapeResponse { success, data, error } = result;
        if !success && data.is_none() {
            let message = error.unwrap_or_else(|| "未知错误".to_string());
            error!("Firecrawl 返回错误: {}", message);
            return Err(ScrapeError::Upstream(message));
        }

        let page = normalize(url, data.unwrap_or_default());
        info!(
            "网页抓取成功: {}... ({} 字)",
            page.title.chars().take(50).collect::<String>(),
            page.word_count
        );
        Ok(page)
    }
}

fn normalize(url: &str, data: ScrapeData) -> ScrapedPage {
    let ScrapeMetadata { title, og_title } = data.metadata;
    let title = [title, og_title]
        .into_iter()
        .flatten()
        .find(|t| !t.is_empty())
        .unwrap_or_else(|| UNKNOWN_TITLE.to_string());

    ScrapedPage {
        title,
        // CJK text has no word boundaries, so characters are counted.
        word_count: data.markdown.chars().count(),
        content: data.markdown,
        url: url.to_string(),
    }
}
