// ==========================================
// 蛋品冷链溯源分析系统 - 报告生成服务错误
// ==========================================
// 说明: 所有变体都在编排器边界被捕获并降级为本地报告
// ==========================================

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("网络错误: {0}")]
    Network(String),

    #[error("认证失败: {0}")]
    Authentication(String),

    #[error("配额不足或请求过于频繁: {0}")]
    Quota(String),

    #[error("请求超时（{0} 秒）")]
    Timeout(u64),

    #[error("服务返回错误 {status}: {message}")]
    Api { status: u16, message: String },

    #[error("响应格式无效: {0}")]
    InvalidResponse(String),

    #[error("服务返回空内容")]
    EmptyResponse,
}

impl ProviderError {
    /// HTTP 状态码 → 错误分类
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => ProviderError::Authentication(body),
            429 => ProviderError::Quota(body),
            _ => ProviderError::Api {
                status,
                message: body,
            },
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ProviderError::InvalidResponse(err.to_string())
        } else {
            ProviderError::Network(err.to_string())
        }
    }
}
