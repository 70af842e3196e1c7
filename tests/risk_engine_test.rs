// ==========================================
// RiskScorer 集成测试
// ==========================================
// 测试目标: 评分公式 / 等级划分 / 单调性 / 结构不足降级
// ==========================================

use egg_trace::config::RiskScoringConfig;
use egg_trace::domain::bundle::{ComplianceReport, EvaluationStatus};
use egg_trace::domain::types::{RiskLevel, ViolationKind};
use egg_trace::domain::violation::{Finding, FindingKind, Violation};
use egg_trace::domain::RiskOutcome;
use egg_trace::engine::RiskScorer;

fn report(violations: Vec<Violation>) -> ComplianceReport {
    ComplianceReport {
        status: EvaluationStatus::Evaluated,
        evaluated_records: 1,
        violations,
        findings: vec![],
    }
}

fn v(batch: &str, kind: ViolationKind) -> Violation {
    Violation::new(batch, kind, "test")
}

#[test]
fn test_zero_violations_scores_two_low() {
    let outcome = RiskScorer::default().assess(&report(vec![]));
    assert_eq!(outcome.score(), Some(2.0));
    assert_eq!(outcome.level(), Some(RiskLevel::Low));
}

#[test]
fn test_single_break_is_medium() {
    // 2.0 + 1.5 × 1.5 = 4.25
    let outcome = RiskScorer::default().assess(&report(vec![v("B001", ViolationKind::ColdChainBreak)]));
    let score = outcome.score().unwrap();
    assert!((score - 4.25).abs() < 1e-9);
    assert_eq!(outcome.level(), Some(RiskLevel::Medium));
}

#[test]
fn test_score_clamped_to_ten() {
    let violations = (0..20)
        .map(|i| v(&format!("B{:03}", i), ViolationKind::ColdChainBreak))
        .collect();
    let outcome = RiskScorer::default().assess(&report(violations));
    assert_eq!(outcome.score(), Some(10.0));
    assert_eq!(outcome.level(), Some(RiskLevel::Critical));
}

#[test]
fn test_score_monotonic_in_violations() {
    let scorer = RiskScorer::default();
    let sequence = [
        ViolationKind::MissingHandlerData,
        ViolationKind::TemperatureExcursion,
        ViolationKind::StageDurationOverrun,
        ViolationKind::ColdChainBreak,
        ViolationKind::ColdChainBreak,
        ViolationKind::TemperatureExcursion,
    ];

    let mut violations = Vec::new();
    let mut previous = scorer.score_violations(&violations).score;
    for kind in sequence {
        violations.push(v("B001", kind));
        let score = scorer.score_violations(&violations).score;
        assert!(score >= previous);
        assert!((0.0..=10.0).contains(&score));
        previous = score;
    }
}

#[test]
fn test_level_boundaries() {
    assert_eq!(RiskLevel::from_score(3.99), RiskLevel::Low);
    assert_eq!(RiskLevel::from_score(4.0), RiskLevel::Medium);
    assert_eq!(RiskLevel::from_score(7.0), RiskLevel::High);
    assert_eq!(RiskLevel::from_score(9.0), RiskLevel::Critical);
}

#[test]
fn test_custom_scoring_config() {
    let scorer = RiskScorer::new(RiskScoringConfig {
        base_score: 0.0,
        scale_factor: 1.0,
    });
    let assessment = scorer.score_violations(&[v("B001", ViolationKind::TemperatureExcursion)]);
    assert_eq!(assessment.score, 1.0);
}

#[test]
fn test_top_batches_ranked_by_weight() {
    let outcome = RiskScorer::default().assess(&report(vec![
        v("B002", ViolationKind::MissingHandlerData),
        v("B001", ViolationKind::ColdChainBreak),
        v("B001", ViolationKind::TemperatureExcursion),
        v("B003", ViolationKind::TemperatureExcursion),
    ]));

    let assessment = outcome.assessment().unwrap();
    let ids: Vec<&str> = assessment.top_batches.iter().map(|b| b.batch_id.as_str()).collect();
    assert_eq!(ids, vec!["B001", "B003", "B002"]);
    assert_eq!(assessment.top_batches[0].violation_count, 2);
    assert_eq!(assessment.contributing_violations[0].kind, ViolationKind::ColdChainBreak);
}

#[test]
fn test_insufficient_structure_is_not_scored() {
    let compliance = ComplianceReport::insufficient(Finding::new(
        FindingKind::InsufficientStructure,
        "flow_graph 无批次记录",
    ));
    let outcome = RiskScorer::default().assess(&compliance);

    assert!(matches!(outcome, RiskOutcome::InsufficientStructure { ref reason } if reason.contains("flow_graph")));
    assert_eq!(outcome.score(), None);
}
