use tracing::{Instrument, debug, error, info, info_span};
use uuid::Uuid;

use crate::config::{ProviderConfig, TextConfig};
use crate::error::ConfigError;
use crate::models::{GenerationRequest, OutlineResult};
use crate::services::llm::{TextClient, TextRequest};
use crate::services::parser::parse_outline;
use crate::services::prompt;
use crate::services::provider::resolve_provider;
use crate::services::summarizer::summarize_content;

/// What went wrong upstream, as far as the error text lets us tell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Authentication,
    ModelAccess,
    Network,
    RateLimit,
    Generic,
}

/// Checked in order; the first category with a matching trigger wins.
/// Triggers are compared against the lowercased message.
const CATEGORY_TRIGGERS: &[(ErrorCategory, &[&str])] = &[
    (ErrorCategory::Authentication, &["api_key", "unauthorized", "401"]),
    (ErrorCategory::ModelAccess, &["model", "404"]),
    (ErrorCategory::Network, &["timeout", "连接"]),
    (ErrorCategory::RateLimit, &["rate", "429", "quota"]),
];

pub fn classify(message: &str) -> ErrorCategory {
    let lowered = message.to_lowercase();
    CATEGORY_TRIGGERS
        .iter()
        .find(|(_, triggers)| triggers.iter().any(|t| lowered.contains(t)))
        .map(|(category, _)| *category)
        .unwrap_or(ErrorCategory::Generic)
}

impl ErrorCategory {
    fn headline(self) -> &'static str {
        match self {
            ErrorCategory::Authentication => "API 认证失败。",
            ErrorCategory::ModelAccess => "模型访问失败。",
            ErrorCategory::Network => "网络连接失败。",
            ErrorCategory::RateLimit => "API 配额限制。",
            ErrorCategory::Generic => "大纲生成失败。",
        }
    }

    fn causes(self) -> &'static [&'static str] {
        match self {
            ErrorCategory::Authentication => &["API Key 无效或已过期", "API Key 没有访问该模型的权限"],
            ErrorCategory::ModelAccess => &["模型名称不正确", "没有访问该模型的权限"],
            ErrorCategory::Network => &["网络连接不稳定", "API 服务暂时不可用", "Base URL 配置错误"],
            ErrorCategory::RateLimit => &["API 调用次数超限", "账户配额用尽"],
            ErrorCategory::Generic => &["Text API 配置错误或密钥无效", "网络连接问题", "模型无法访问或不存在"],
        }
    }

    fn remedy(self) -> &'static str {
        match self {
            ErrorCategory::Authentication => "解决方案：在 text_providers.yaml 中检查并更新 api_key",
            ErrorCategory::ModelAccess => "解决方案：在 text_providers.yaml 中检查 model 配置",
            ErrorCategory::Network => "解决方案：检查网络连接和 base_url 配置，稍后重试",
            ErrorCategory::RateLimit => "解决方案：等待配额重置，或升级 API 套餐",
            ErrorCategory::Generic => "建议：检查配置文件 text_providers.yaml",
        }
    }

    /// Multi-line message: what failed, the upstream detail, likely causes,
    /// and what to do about it.
    pub fn render(self, detail: &str) -> String {
        let mut message = format!("{}\n错误详情: {}\n可能原因：\n", self.headline(), detail);
        for (i, cause) in self.causes().iter().enumerate() {
            message.push_str(&format!("{}. {}\n", i + 1, cause));
        }
        message.push_str(self.remedy());
        message
    }
}

/// Turns a topic and optional references into a parsed outline using one
/// provider's client. Built per request; holds no state between calls.
pub struct OutlineGenerator {
    provider: ProviderConfig,
    client: Box<dyn TextClient>,
}

impl OutlineGenerator {
    pub fn new(provider: ProviderConfig, client: Box<dyn TextClient>) -> Self {
        Self { provider, client }
    }

    /// Resolves the active provider; fails on configuration problems only.
    pub fn from_config(config: &TextConfig) -> Result<Self, ConfigError> {
        let resolved = resolve_provider(config)?;
        debug!("大纲生成器已绑定服务商: {}", resolved.name);
        Ok(Self::new(resolved.config, resolved.client))
    }

    pub async fn generate(
        &self,
        topic: &str,
        images: &[Vec<u8>],
        source_content: Option<&str>,
    ) -> OutlineResult {
        info!(
            "开始生成大纲: topic={}..., images={}, has_source={}",
            topic.chars().take(50).collect::<String>(),
            images.len(),
            source_content.is_some_and(|s| !s.is_empty())
        );

        let model = self.provider.model();
        let reference = match source_content.filter(|s| !s.is_empty()) {
            Some(content) => {
                let material = summarize_content(self.client.as_ref(), model, content).await;
                debug!("添加了网页参考内容到提示词，摘要长度: {} 字", material.chars().count());
                prompt::reference_block(&material)
            }
            None => String::new(),
        };

        let outline_prompt = prompt::outline_prompt(topic, &reference, images.len());
        let temperature = self.provider.temperature();
        let max_output_tokens = self.provider.max_output_tokens();

        info!("调用文本生成 API: model={}, temperature={}", model, temperature);
        let request = TextRequest {
            prompt: &outline_prompt,
            model,
            temperature,
            max_output_tokens,
            images,
        };

        match self.client.generate_text(request).await {
            Ok(outline) => {
                debug!("API 返回文本长度: {} 字符", outline.chars().count());
                let pages = parse_outline(&outline);
                info!("大纲解析完成，共 {} 页", pages.len());
                OutlineResult::success(outline, pages, !images.is_empty())
            }
            Err(e) => {
                let detail = e.to_string();
                error!("大纲生成失败: {}", detail);
                OutlineResult::failure(classify(&detail).render(&detail))
            }
        }
    }
}

/// Entry point for callers holding a config: resolves the provider fresh,
/// then generates. Configuration problems are the only `Err`.
pub async fn generate_outline(
    config: &TextConfig,
    request: &GenerationRequest,
) -> Result<OutlineResult, ConfigError> {
    let span = info_span!("outline", request_id = %Uuid::new_v4());
    async {
        let generator = OutlineGenerator::from_config(config)?;
        Ok::<_, ConfigError>(
            generator
                .generate(&request.topic, &request.images, request.source_content.as_deref())
                .await,
        )
    }
    .instrument(span)
    .await
}
