// ==========================================
// 蛋品冷链溯源分析系统 - API层错误类型
// ==========================================
// 职责: 汇总各层错误,转换为用户可读的错误消息
// ==========================================

use crate::config::error::ConfigError;
use crate::engine::error::PipelineError;
use crate::importer::error::ImportError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 输入错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("输入数据无法解析: {0}")]
    MalformedInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    // ==========================================
    // 配置错误
    // ==========================================
    #[error("配置错误: {0}")]
    ConfigError(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),
}

// ==========================================
// 从各层错误转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})", entity, id))
            }
            other => ApiError::DatabaseError(other.to_string()),
        }
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Storage(msg) => ApiError::DatabaseError(msg),
            other => ApiError::ConfigError(other.to_string()),
        }
    }
}

impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        ApiError::MalformedInput(err.to_string())
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::MalformedInput(e) => ApiError::MalformedInput(e.to_string()),
            other => ApiError::InternalError(other.to_string()),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;
