// ==========================================
// 蛋品冷链溯源分析系统 - 结果包
// ==========================================
// 一次流水线运行的唯一输出,由该运行独占
// 展示层只读消费,不修改
// ==========================================

use crate::domain::batch::{BatchRecord, NormalizedDataset};
use crate::domain::risk::RiskOutcome;
use crate::domain::stats::{AggregateStats, ChartSeries};
use crate::domain::types::{DatasetShape, PipelineState, ViolationKind};
use crate::domain::violation::{Finding, Violation};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// ComplianceReport - 合规评估输出
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationStatus {
    Evaluated,
    InsufficientStructure,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceReport {
    pub status: EvaluationStatus,
    pub evaluated_records: usize,
    pub violations: Vec<Violation>,
    /// 数据质量发现（如阶段时间倒序）
    pub findings: Vec<Finding>,
}

impl ComplianceReport {
    pub fn insufficient(finding: Finding) -> Self {
        Self {
            status: EvaluationStatus::InsufficientStructure,
            evaluated_records: 0,
            violations: Vec::new(),
            findings: vec![finding],
        }
    }

    pub fn count_of(&self, kind: ViolationKind) -> usize {
        self.violations.iter().filter(|v| v.kind == kind).count()
    }
}

// ==========================================
// StageRecord - 阶段完成记录（可观测性）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageRecord {
    pub state: PipelineState,
    pub completed_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

// ==========================================
// ReportSource - 报告来源
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum ReportSource {
    Provider { provider: String, model: String },
    Fallback { reason: String },
}

impl ReportSource {
    pub fn is_fallback(&self) -> bool {
        matches!(self, ReportSource::Fallback { .. })
    }
}

// ==========================================
// ResultBundle - 结果包
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultBundle {
    pub run_id: String,
    pub dataset_name: String,
    pub shape: DatasetShape,
    pub dataset: NormalizedDataset,
    pub compliance: ComplianceReport,
    pub statistics: AggregateStats,
    pub risk: RiskOutcome,
    pub charts: ChartSeries,
    /// 非阻断提示（结构降级、字段解析失败、报告降级等）
    pub notices: Vec<Finding>,
    pub stage_history: Vec<StageRecord>,
    pub state: PipelineState,
    pub final_report: Option<String>,
    pub report_source: Option<ReportSource>,
    pub created_at: DateTime<Utc>,
}

impl ResultBundle {
    pub fn records(&self) -> &[BatchRecord] {
        &self.dataset.records
    }

    pub fn violations(&self) -> &[Violation] {
        &self.compliance.violations
    }

    /// 建议的下载文件名
    pub fn report_file_name(&self) -> String {
        format!(
            "traceability_report_{}.md",
            self.created_at.format("%Y%m%d")
        )
    }
}
