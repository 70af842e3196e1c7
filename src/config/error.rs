// ==========================================
// 蛋品冷链溯源分析系统 - 配置层错误类型
// ==========================================
// 说明: 凭证缺失 / 未选择服务 不中断流水线,由编排器降级为本地报告
// ==========================================

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("未选择报告生成服务")]
    NoProviderSelected,

    #[error("缺少 {provider} 的 API 凭证（环境变量 {env_var}）")]
    MissingCredentials { provider: String, env_var: String },

    #[error("配置值无效: {key}={value}（{reason}）")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("未知配置键: {0}")]
    UnknownKey(String),

    #[error("凭证不可写入配置库: {0}")]
    CredentialNotStorable(String),

    #[error("配置存储错误: {0}")]
    Storage(String),
}

impl ConfigError {
    pub fn invalid(key: &str, value: &str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<rusqlite::Error> for ConfigError {
    fn from(err: rusqlite::Error) -> Self {
        ConfigError::Storage(err.to_string())
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;
