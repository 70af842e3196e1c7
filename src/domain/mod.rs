// ==========================================
// 蛋品冷链溯源分析系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体与类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod batch;
pub mod bundle;
pub mod risk;
pub mod run_log;
pub mod stats;
pub mod types;
pub mod violation;

// 重导出核心类型
pub use batch::{
    BatchRecord, ChainStage, Dataset, FlowGraph, FlowLink, FlowNode, NormalizedDataset,
    TemperatureReading,
};
pub use bundle::{
    ComplianceReport, EvaluationStatus, ReportSource, ResultBundle, StageRecord,
};
pub use risk::{BatchContribution, RiskAssessment, RiskOutcome};
pub use run_log::RunLog;
pub use stats::{
    AggregateStats, ChartSeries, DatasetOverview, EntityDimension, EntityKpi, FlowEdge,
    HierarchyEntry, NumericSummary, RawCounts, StageDelta, StageDeltaSummary, TimelineEntry,
    TrendPoint, ViolationCount,
};
pub use types::{DatasetShape, PipelineState, RiskLevel, Stage, ViolationKind};
pub use violation::{Finding, FindingKind, Violation};
