// ==========================================
// 蛋品冷链溯源分析系统 - 风险评估领域模型
// ==========================================
// 每次运行重新派生,不独立于结果包持久化
// ==========================================

use crate::domain::types::RiskLevel;
use crate::domain::violation::Violation;
use serde::{Deserialize, Serialize};

// ==========================================
// RiskAssessment - 风险评估
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// 风险分数 [0, 10]
    pub score: f64,
    pub level: RiskLevel,
    /// 按权重降序排列的贡献违规
    pub contributing_violations: Vec<Violation>,
    /// 按批次汇总的贡献（权重降序）
    pub top_batches: Vec<BatchContribution>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchContribution {
    pub batch_id: String,
    /// 批次号重复时区分记录
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_index: Option<usize>,
    pub total_weight: f64,
    pub violation_count: usize,
}

// ==========================================
// RiskOutcome - 评分结果（结构不足时降级）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RiskOutcome {
    Assessed(RiskAssessment),
    InsufficientStructure { reason: String },
}

impl RiskOutcome {
    pub fn assessment(&self) -> Option<&RiskAssessment> {
        match self {
            RiskOutcome::Assessed(a) => Some(a),
            RiskOutcome::InsufficientStructure { .. } => None,
        }
    }

    pub fn score(&self) -> Option<f64> {
        self.assessment().map(|a| a.score)
    }

    pub fn level(&self) -> Option<RiskLevel> {
        self.assessment().map(|a| a.level)
    }
}
