// ==========================================
// 蛋品冷链溯源分析系统 - 报告生成服务接口
// ==========================================
// 职责: 多态的文本生成接口,每个后端一个实现
// 红线: 实现只负责一次请求,不做重试；超时由调用方统一控制
// ==========================================

use crate::narrative::error::ProviderError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const USER_AGENT: &str = concat!("egg-trace/", env!("CARGO_PKG_VERSION"));

/// 生成参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub model: String,
    pub max_output_tokens: u32,
    pub temperature: f32,
}

#[async_trait]
pub trait NarrativeProvider: Send + Sync {
    /// 服务名（写入报告来源）
    fn name(&self) -> &'static str;

    /// 生成报告正文
    async fn generate(
        &self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<String, ProviderError>;
}

/// 构建 HTTP 客户端
pub fn build_http_client(timeout: Duration) -> Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(|e| ProviderError::Network(e.to_string()))
}

/// 非 2xx 响应 → ProviderError
pub async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ProviderError::from_status(status.as_u16(), body))
}

/// 空白文本视为空响应
pub fn non_empty(text: String) -> Result<String, ProviderError> {
    if text.trim().is_empty() {
        Err(ProviderError::EmptyResponse)
    } else {
        Ok(text)
    }
}
