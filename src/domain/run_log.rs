// ==========================================
// 蛋品冷链溯源分析系统 - 运行记录
// ==========================================
// 用途: 审计每次分析运行（只记录摘要,不保存风险评估本体）
// ==========================================

use crate::domain::bundle::{ReportSource, ResultBundle};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunLog {
    pub run_id: String,
    pub dataset_name: String,
    pub shape: String,
    pub record_count: i64,
    pub violation_count: i64,
    pub risk_score: Option<f64>,
    pub risk_level: Option<String>,
    pub terminal_state: String,
    pub report_source: String,
    pub created_at: NaiveDateTime,
}

impl RunLog {
    pub fn from_bundle(bundle: &ResultBundle) -> Self {
        let report_source = match &bundle.report_source {
            Some(ReportSource::Provider { provider, model }) => {
                format!("{}:{}", provider, model)
            }
            Some(ReportSource::Fallback { .. }) => "fallback".to_string(),
            None => "none".to_string(),
        };

        Self {
            run_id: bundle.run_id.clone(),
            dataset_name: bundle.dataset_name.clone(),
            shape: bundle.shape.to_string(),
            record_count: bundle.records().len() as i64,
            violation_count: bundle.violations().len() as i64,
            risk_score: bundle.risk.score(),
            risk_level: bundle.risk.level().map(|l| l.to_string()),
            terminal_state: bundle.state.to_string(),
            report_source,
            created_at: bundle.created_at.naive_utc(),
        }
    }
}
