// ==========================================
// 蛋品冷链溯源分析系统 - API 层
// ==========================================
// 职责: 对外业务接口（CLI 调用入口）
// ==========================================

pub mod analysis_api;
pub mod error;

pub use analysis_api::{AnalysisApi, RunOptions};
pub use error::{ApiError, ApiResult};
