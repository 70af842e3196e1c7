// ==========================================
// 蛋品冷链溯源分析系统 - 流水线错误类型
// ==========================================
// 说明: 只有输入不可解析是致命错误；
//       结构歧义、字段解析失败、报告服务失败都作为提示挂在结果包上
// ==========================================

use crate::domain::types::PipelineState;
use crate::importer::error::ImportError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("输入数据无法解析: {0}")]
    MalformedInput(#[from] ImportError),

    #[error("非法状态转换: {from} → {to}")]
    InvalidTransition {
        from: PipelineState,
        to: PipelineState,
    },

    #[error("内部错误: {0}")]
    Internal(String),
}

impl From<tokio::task::JoinError> for PipelineError {
    fn from(err: tokio::task::JoinError) -> Self {
        PipelineError::Internal(format!("后台任务失败: {}", err))
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;
