// ==========================================
// 蛋品冷链溯源分析系统 - 风险评分引擎
// ==========================================
// 公式: score = clamp(base_score + Σweight × scale_factor, 0, 10)
// 分级: <4 low, 4–<7 medium, 7–<9 high, ≥9 critical
// 性质: 只依赖违规集合,对违规集合单调不减
// ==========================================

use crate::config::RiskScoringConfig;
use crate::domain::bundle::{ComplianceReport, EvaluationStatus};
use crate::domain::risk::{BatchContribution, RiskAssessment, RiskOutcome};
use crate::domain::types::RiskLevel;
use crate::domain::violation::Violation;
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::info;

/// 报告中列出的重点批次数
pub const TOP_BATCH_LIMIT: usize = 5;

// ==========================================
// RiskScorer - 风险评分引擎
// ==========================================
pub struct RiskScorer {
    config: RiskScoringConfig,
}

impl Default for RiskScorer {
    fn default() -> Self {
        Self::new(RiskScoringConfig::default())
    }
}

impl RiskScorer {
    pub fn new(config: RiskScoringConfig) -> Self {
        Self { config }
    }

    /// 根据合规评估结果评分
    pub fn assess(&self, compliance: &ComplianceReport) -> RiskOutcome {
        if compliance.status == EvaluationStatus::InsufficientStructure {
            let reason = compliance
                .findings
                .first()
                .map(|f| f.message.clone())
                .unwrap_or_else(|| "数据结构不足,无法评分".to_string());
            return RiskOutcome::InsufficientStructure { reason };
        }

        let assessment = self.score_violations(&compliance.violations);
        info!(
            score = assessment.score,
            level = %assessment.level,
            violations = compliance.violations.len(),
            "风险评分完成"
        );
        RiskOutcome::Assessed(assessment)
    }

    /// 违规集合 → 评分
    pub fn score_violations(&self, violations: &[Violation]) -> RiskAssessment {
        let total_weight: f64 = violations.iter().map(|v| v.severity_weight).sum();
        let score = self.score_for_weight(total_weight);

        let mut contributing = violations.to_vec();
        contributing.sort_by(|a, b| {
            b.severity_weight
                .partial_cmp(&a.severity_weight)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.batch_id.cmp(&b.batch_id))
                .then_with(|| a.kind.cmp(&b.kind))
        });

        RiskAssessment {
            score,
            level: RiskLevel::from_score(score),
            contributing_violations: contributing,
            top_batches: top_batches(violations),
        }
    }

    pub fn score_for_weight(&self, total_weight: f64) -> f64 {
        (self.config.base_score + total_weight * self.config.scale_factor).clamp(0.0, 10.0)
    }
}

/// 按记录累计权重,取前 N（重复批次号按记录位置分开）
fn top_batches(violations: &[Violation]) -> Vec<BatchContribution> {
    let mut per_record: HashMap<(&str, Option<usize>), BatchContribution> = HashMap::new();
    for violation in violations {
        let entry = per_record
            .entry((violation.batch_id.as_str(), violation.record_index))
            .or_insert_with(|| BatchContribution {
                batch_id: violation.batch_id.clone(),
                record_index: violation.record_index,
                total_weight: 0.0,
                violation_count: 0,
            });
        entry.total_weight += violation.severity_weight;
        entry.violation_count += 1;
    }

    let mut batches: Vec<BatchContribution> = per_record.into_values().collect();
    batches.sort_by(|a, b| {
        b.total_weight
            .partial_cmp(&a.total_weight)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.batch_id.cmp(&b.batch_id))
            .then_with(|| a.record_index.cmp(&b.record_index))
    });
    batches.truncate(TOP_BATCH_LIMIT);
    batches
}
