// ==========================================
// 蛋品冷链溯源分析系统 - 引擎层
// ==========================================
// 职责: 合规规则 / 统计汇总 / 风险评分 / 流水线编排
// 红线: 引擎不访问数据库,不发起网络请求（报告服务经编排器调用）
// ==========================================

pub mod aggregator;
pub mod compliance;
pub mod error;
pub mod orchestrator;
pub mod risk;

// 重导出核心引擎
pub use aggregator::{summarize, Aggregator};
pub use compliance::ComplianceEngine;
pub use error::{PipelineError, PipelineResult};
pub use orchestrator::{PipelineOrchestrator, StageTracker};
pub use risk::RiskScorer;
