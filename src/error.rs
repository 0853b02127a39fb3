use std::path::PathBuf;
use thiserror::Error;

/// Configuration problems. These stop an outline request before any LLM call
/// and carry the remediation the user has to apply to their config files.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("读取配置文件失败: {path}\n{source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("配置文件格式错误: {file}\nYAML 解析错误: {source}\n解决方案：检查 YAML 缩进和语法")]
    InvalidYaml {
        file: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error(
        "未找到任何文本生成服务商配置。\n解决方案：\n1. 在 text_providers.yaml 的 providers 下添加文本生成服务商\n2. 并将 active_provider 设置为该服务商名称"
    )]
    NoProvidersConfigured,

    #[error(
        "未找到文本生成服务商配置: {requested}\n可用的服务商: {}\n解决方案：将 text_providers.yaml 中的 active_provider 修改为一个可用的服务商",
        .available.join(", ")
    )]
    UnknownActiveProvider {
        requested: String,
        available: Vec<String>,
    },

    #[error("文本服务商 {provider} 未配置 API Key\n解决方案：在 text_providers.yaml 中为 providers.{provider}.api_key 填写 API Key")]
    MissingCredential { provider: String },

    #[error(
        "文本服务商 {provider} 的类型 {kind} 不受支持\n解决方案：将 providers.{provider}.type 设置为 google_gemini 或 openai_compatible"
    )]
    UnsupportedProviderType { provider: String, kind: String },
}

/// Failures of an upstream text-generation call. The `Display` text is what
/// the outline generator classifies, so it keeps status codes and bodies.
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("{provider} request failed: {status} -> {body}")]
    Status {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("{provider} request timeout after {timeout} seconds")]
    Timeout { provider: &'static str, timeout: u64 },

    #[error("{provider} 连接失败: {source}")]
    Transport {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{provider} returned an empty response")]
    EmptyResponse { provider: &'static str },

    #[error("{0}")]
    Other(String),
}

/// Scraping failures, one per way the remote scrape service can refuse us.
#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error("API Key 无效或未提供")]
    InvalidCredential,

    #[error("API 配额已用尽")]
    QuotaExhausted,

    #[error("抓取超时，请稍后重试")]
    Timeout,

    #[error("无法连接到 Firecrawl 服务: {base_url}")]
    Connection { base_url: String },

    #[error("请求失败: HTTP {status}")]
    Http { status: u16 },

    #[error("抓取失败: {0}")]
    Upstream(String),

    #[error("抓取失败: {0}")]
    Request(#[from] reqwest::Error),
}

pub type Result<T, E = ConfigError> = std::result::Result<T, E>;
