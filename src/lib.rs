// ==========================================
// 蛋品冷链溯源分析系统 - 核心库
// ==========================================
// 流程: 文件解析 → 形态检测 → 规范化 → 合规评估
//       → 统计汇总 → 风险评分 → 报告生成
// 技术栈: Rust + SQLite + 外部报告生成服务
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "en");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 运行记录
pub mod repository;

// 引擎层 - 合规规则 / 评分 / 编排
pub mod engine;

// 导入层 - 外部数据
pub mod importer;

// 配置层 - 流水线配置
pub mod config;

// 报告生成层
pub mod narrative;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// API 层 - 业务接口
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{DatasetShape, PipelineState, RiskLevel, Stage, ViolationKind};

// 领域实体
pub use domain::{
    BatchRecord, ComplianceReport, Finding, FindingKind, NormalizedDataset, ReportSource,
    ResultBundle, RiskAssessment, RiskOutcome, RunLog, Violation,
};

// 引擎
pub use engine::{
    Aggregator, ComplianceEngine, PipelineError, PipelineOrchestrator, RiskScorer,
};

// 配置
pub use config::{ConfigManager, PipelineConfig, ProviderKind};

// API
pub use api::{AnalysisApi, RunOptions};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "蛋品冷链溯源分析系统";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
