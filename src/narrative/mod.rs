// ==========================================
// 蛋品冷链溯源分析系统 - 报告生成层
// ==========================================
// 职责: 提示词拼装 / 外部服务调用 / 本地降级报告
// 红线: 服务错误只在编排器边界处理,不向上抛出
// ==========================================

pub mod error;
pub mod fallback;
pub mod gemini;
pub mod openai_compat;
pub mod prompt;
pub mod provider;

pub use error::ProviderError;
pub use fallback::render_fallback_report;
pub use gemini::GeminiProvider;
pub use openai_compat::ChatCompletionsProvider;
pub use prompt::{build_prompt, PromptTemplate};
pub use provider::{GenerationConfig, NarrativeProvider};

use crate::config::error::ConfigError;
use crate::config::pipeline_config::{NarrativeConfig, ProviderKind};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// 按配置构建报告服务
///
/// # 错误
/// - 未选择服务: ConfigError::NoProviderSelected
/// - 缺少凭证: ConfigError::MissingCredentials
pub fn build_provider(config: &NarrativeConfig) -> Result<Arc<dyn NarrativeProvider>, ConfigError> {
    let kind = config.provider.ok_or(ConfigError::NoProviderSelected)?;

    let api_key = config
        .api_key
        .as_deref()
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .ok_or_else(|| ConfigError::MissingCredentials {
            provider: kind.as_str().to_string(),
            env_var: kind.api_key_env().to_string(),
        })?;

    let timeout = Duration::from_secs(config.timeout_secs);
    let base_url = config.base_url.as_deref();
    debug!(provider = kind.as_str(), custom_endpoint = base_url.is_some(), "构建报告服务");

    let provider: Arc<dyn NarrativeProvider> = match (kind, base_url) {
        (ProviderKind::Gemini, Some(url)) => {
            Arc::new(GeminiProvider::with_base_url(url, api_key, timeout).map_err(client_error)?)
        }
        (ProviderKind::Gemini, None) => {
            Arc::new(GeminiProvider::new(api_key, timeout).map_err(client_error)?)
        }
        (other, Some(url)) => Arc::new(
            ChatCompletionsProvider::new(other.as_str(), url, api_key, timeout)
                .map_err(client_error)?,
        ),
        (ProviderKind::OpenAi, None) => {
            Arc::new(ChatCompletionsProvider::openai(api_key, timeout).map_err(client_error)?)
        }
        (ProviderKind::Xai, None) => {
            Arc::new(ChatCompletionsProvider::xai(api_key, timeout).map_err(client_error)?)
        }
        (ProviderKind::Groq, None) => {
            Arc::new(ChatCompletionsProvider::groq(api_key, timeout).map_err(client_error)?)
        }
    };

    Ok(provider)
}

// HTTP 客户端构建失败（TLS 初始化等）归入配置错误
fn client_error(err: ProviderError) -> ConfigError {
    ConfigError::InvalidValue {
        key: "narrative.provider".to_string(),
        value: String::new(),
        reason: err.to_string(),
    }
}

/// 带超时的生成调用,超时视为服务失败
pub async fn generate_with_timeout(
    provider: &dyn NarrativeProvider,
    prompt: &str,
    config: &GenerationConfig,
    timeout_secs: u64,
) -> Result<String, ProviderError> {
    match tokio::time::timeout(
        Duration::from_secs(timeout_secs),
        provider.generate(prompt, config),
    )
    .await
    {
        Ok(result) => result,
        Err(_) => Err(ProviderError::Timeout(timeout_secs)),
    }
}
