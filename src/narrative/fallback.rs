// ==========================================
// 蛋品冷链溯源分析系统 - 本地降级报告
// ==========================================
// 职责: 报告服务不可用时,仅依据结果包生成确定性 Markdown 报告
// 红线: 不访问网络,不含时间等不确定内容；同一结果包输出恒定
// ==========================================

use crate::domain::bundle::ResultBundle;
use crate::domain::risk::RiskOutcome;
use crate::domain::types::ViolationKind;
use crate::i18n::{t_in, t_in_with_args};
use std::fmt::Write;

/// 生成本地报告
pub fn render_fallback_report(bundle: &ResultBundle, reason: &str, locale: &str) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "# {}\n", t_in(locale, "report.title"));
    let _ = writeln!(
        out,
        "_{}_\n",
        t_in_with_args(locale, "report.fallback_notice", &[("reason", reason)])
    );

    write_risk_summary(&mut out, bundle, locale);
    write_key_findings(&mut out, bundle, locale);
    write_recommended_actions(&mut out, bundle, locale);
    write_visualization(&mut out, bundle, locale);

    out
}

fn heading(out: &mut String, locale: &str, key: &str) {
    let _ = writeln!(out, "## {}\n", t_in(locale, key));
}

fn kind_label(locale: &str, kind: ViolationKind) -> String {
    t_in(locale, &format!("report.kind.{}", kind))
}

// ==========================================
// 风险摘要
// ==========================================
fn write_risk_summary(out: &mut String, bundle: &ResultBundle, locale: &str) {
    heading(out, locale, "report.section.risk_summary");

    let count = bundle.compliance.evaluated_records.to_string();
    let shape = bundle.shape.to_string();
    let _ = writeln!(
        out,
        "{}\n",
        t_in_with_args(
            locale,
            "report.dataset_line",
            &[
                ("name", bundle.dataset_name.as_str()),
                ("shape", shape.as_str()),
                ("count", count.as_str()),
            ],
        )
    );

    match &bundle.risk {
        RiskOutcome::Assessed(assessment) => {
            let score = format!("{:.1}", assessment.score);
            let level = t_in(locale, &format!("report.level.{}", assessment.level));
            let _ = writeln!(
                out,
                "{}\n",
                t_in_with_args(
                    locale,
                    "report.risk.assessed",
                    &[("score", score.as_str()), ("level", level.as_str())],
                )
            );

            for batch in &assessment.top_batches {
                // 重复批次号附带行号区分
                let duplicated = assessment
                    .top_batches
                    .iter()
                    .filter(|b| b.batch_id == batch.batch_id)
                    .count()
                    > 1;
                let label = match batch.record_index {
                    Some(index) if duplicated => format!("{} (#{})", batch.batch_id, index + 1),
                    _ => batch.batch_id.clone(),
                };
                let count = batch.violation_count.to_string();
                let weight = format!("{:.1}", batch.total_weight);
                let _ = writeln!(
                    out,
                    "- {}",
                    t_in_with_args(
                        locale,
                        "report.risk.top_batch",
                        &[
                            ("batch", label.as_str()),
                            ("count", count.as_str()),
                            ("weight", weight.as_str()),
                        ],
                    )
                );
            }
            if !assessment.top_batches.is_empty() {
                out.push('\n');
            }
        }
        RiskOutcome::InsufficientStructure { reason } => {
            let _ = writeln!(
                out,
                "{}\n",
                t_in_with_args(locale, "report.risk.insufficient", &[("reason", reason)])
            );
        }
    }
}

// ==========================================
// 主要发现
// ==========================================
fn write_key_findings(out: &mut String, bundle: &ResultBundle, locale: &str) {
    heading(out, locale, "report.section.key_findings");

    if bundle.compliance.violations.is_empty() {
        let _ = writeln!(out, "- {}", t_in(locale, "report.findings.none"));
    } else {
        for kind in ViolationKind::ALL {
            let count = bundle.compliance.count_of(kind);
            if count == 0 {
                continue;
            }
            let label = kind_label(locale, kind);
            let count = count.to_string();
            let _ = writeln!(
                out,
                "- {}",
                t_in_with_args(
                    locale,
                    "report.findings.violation_count",
                    &[("kind", label.as_str()), ("count", count.as_str())],
                )
            );
        }
    }

    if !bundle.notices.is_empty() {
        let count = bundle.notices.len().to_string();
        let _ = writeln!(
            out,
            "- {}",
            t_in_with_args(locale, "report.findings.notices", &[("count", count.as_str())])
        );
    }
    out.push('\n');
}

// ==========================================
// 建议措施（按违规类型规则生成）
// ==========================================
fn write_recommended_actions(out: &mut String, bundle: &ResultBundle, locale: &str) {
    heading(out, locale, "report.section.recommended_actions");

    if bundle.risk.assessment().is_none() {
        let _ = writeln!(out, "- {}\n", t_in(locale, "report.action.insufficient"));
        return;
    }

    // 权重高的先列出
    let mut kinds: Vec<ViolationKind> = ViolationKind::ALL
        .into_iter()
        .filter(|k| bundle.compliance.count_of(*k) > 0)
        .collect();
    kinds.sort_by(|a, b| {
        b.severity_weight()
            .partial_cmp(&a.severity_weight())
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.cmp(b))
    });

    if kinds.is_empty() {
        let _ = writeln!(out, "- {}", t_in(locale, "report.action.none"));
    }
    for kind in kinds {
        let _ = writeln!(out, "- {}", t_in(locale, &format!("report.action.{}", kind)));
    }
    out.push('\n');
}

// ==========================================
// 图表说明
// ==========================================
fn write_visualization(out: &mut String, bundle: &ResultBundle, locale: &str) {
    heading(out, locale, "report.section.visualization");

    let charts = &bundle.charts;
    let series = [
        ("report.chart.trend", charts.trend.len()),
        ("report.chart.flow", charts.flow.len()),
        ("report.chart.hierarchy", charts.hierarchy.len()),
        ("report.chart.timeline", charts.timeline.len()),
    ];

    let mut written = false;
    for (key, len) in series {
        if len == 0 {
            continue;
        }
        let count = len.to_string();
        let _ = writeln!(
            out,
            "- {}",
            t_in_with_args(locale, key, &[("count", count.as_str())])
        );
        written = true;
    }
    if !written {
        let _ = writeln!(out, "- {}", t_in(locale, "report.chart.empty"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::batch::NormalizedDataset;
    use crate::domain::bundle::{ComplianceReport, EvaluationStatus};
    use crate::domain::risk::{BatchContribution, RiskAssessment};
    use crate::domain::stats::{AggregateStats, ChartSeries, FlowEdge};
    use crate::domain::types::{DatasetShape, PipelineState, RiskLevel};
    use crate::domain::violation::Violation;
    use chrono::Utc;

    fn bundle_with(violations: Vec<Violation>, risk: RiskOutcome) -> ResultBundle {
        ResultBundle {
            run_id: "run-1".to_string(),
            dataset_name: "eggs.csv".to_string(),
            shape: DatasetShape::BatchList,
            dataset: NormalizedDataset::empty(DatasetShape::BatchList),
            compliance: ComplianceReport {
                status: EvaluationStatus::Evaluated,
                evaluated_records: 2,
                violations,
                findings: vec![],
            },
            statistics: AggregateStats::default(),
            risk,
            charts: ChartSeries {
                flow: vec![FlowEdge {
                    source: "Farm A".to_string(),
                    target: "Packer".to_string(),
                    value: 10.0,
                }],
                ..ChartSeries::default()
            },
            notices: vec![],
            stage_history: vec![],
            state: PipelineState::Scored,
            final_report: None,
            report_source: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_report_has_all_sections() {
        let violations = vec![Violation::new(
            "B001",
            ViolationKind::ColdChainBreak,
            "3.0h > 2.0h",
        )];
        let risk = RiskOutcome::Assessed(RiskAssessment {
            score: 4.25,
            level: RiskLevel::Medium,
            contributing_violations: violations.clone(),
            top_batches: vec![BatchContribution {
                batch_id: "B001".to_string(),
                record_index: None,
                total_weight: 1.5,
                violation_count: 1,
            }],
        });
        let report = render_fallback_report(&bundle_with(violations, risk), "timeout", "en");

        assert!(report.contains("## Risk Summary"));
        assert!(report.contains("## Key Findings"));
        assert!(report.contains("## Recommended Actions"));
        assert!(report.contains("## Visualization Description"));
        assert!(report.contains("4.2") || report.contains("4.3"));
        assert!(report.contains("B001"));
        assert!(report.contains("Cold-chain breaks: 1"));
        assert!(report.contains("timeout"));
    }

    #[test]
    fn test_duplicate_batch_ids_labelled_by_row() {
        let contribution = |index: usize, weight: f64| BatchContribution {
            batch_id: "B001".to_string(),
            record_index: Some(index),
            total_weight: weight,
            violation_count: 1,
        };
        let risk = RiskOutcome::Assessed(RiskAssessment {
            score: 5.75,
            level: RiskLevel::Medium,
            contributing_violations: vec![],
            top_batches: vec![contribution(0, 1.5), contribution(2, 1.0)],
        });
        let report = render_fallback_report(&bundle_with(vec![], risk), "no provider", "en");

        assert!(report.contains("B001 (#1)"));
        assert!(report.contains("B001 (#3)"));
    }

    #[test]
    fn test_report_is_deterministic() {
        let risk = RiskOutcome::Assessed(RiskAssessment {
            score: 2.0,
            level: RiskLevel::Low,
            contributing_violations: vec![],
            top_batches: vec![],
        });
        let bundle = bundle_with(vec![], risk);
        let first = render_fallback_report(&bundle, "no provider", "en");
        let second = render_fallback_report(&bundle, "no provider", "en");
        assert_eq!(first, second);
        assert!(first.contains("No compliance violations detected."));
    }

    #[test]
    fn test_report_insufficient_structure() {
        let risk = RiskOutcome::InsufficientStructure {
            reason: "no batch records".to_string(),
        };
        let report = render_fallback_report(&bundle_with(vec![], risk), "no provider", "zh-TW");
        assert!(report.contains("## 風險摘要"));
        assert!(report.contains("no batch records"));
    }
}
