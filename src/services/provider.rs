use tracing::{error, info};

use crate::config::{ProviderConfig, TextConfig};
use crate::error::{ConfigError, Result};
use crate::services::llm::{self, ProviderKind, TextClient};

/// The active provider, validated and bound to its transport.
pub struct ResolvedProvider {
    pub name: String,
    pub config: ProviderConfig,
    pub client: Box<dyn TextClient>,
}

/// Picks the active provider out of `config` and checks it can be used.
pub fn resolve_provider(config: &TextConfig) -> Result<ResolvedProvider> {
    let (name, provider) = select_active(config)?;

    let kind_name = provider.kind.clone().unwrap_or_else(|| name.clone());
    let kind = ProviderKind::parse(&kind_name).ok_or_else(|| {
        error!("文本服务商 [{}] 类型不受支持: {}", name, kind_name);
        ConfigError::UnsupportedProviderType { provider: name.clone(), kind: kind_name.clone() }
    })?;

    info!("使用文本服务商: {} (type={})", name, kind_name);
    Ok(ResolvedProvider {
        client: llm::client_for(kind, provider),
        name,
        config: provider.clone(),
    })
}

/// Validation shared by every caller that needs the active provider entry.
pub fn select_active(config: &TextConfig) -> Result<(String, &ProviderConfig)> {
    if config.providers.is_empty() {
        error!("未找到任何文本生成服务商配置");
        return Err(ConfigError::NoProvidersConfigured);
    }

    let name = config.active_provider.clone();
    let Some(provider) = config.active() else {
        let available: Vec<String> = config.providers.keys().cloned().collect();
        error!("文本服务商 [{}] 不存在，可用: {}", name, available.join(", "));
        return Err(ConfigError::UnknownActiveProvider { requested: name, available });
    };

    if !provider.is_usable() {
        error!("文本服务商 [{}] 未配置 API Key", name);
        return Err(ConfigError::MissingCredential { provider: name });
    }

    Ok((name, provider))
}
