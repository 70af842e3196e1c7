// ==========================================
// ComplianceEngine 集成测试
// ==========================================
// 测试目标: 温度 / 断链 / 阶段时长 / 经手缺失 四类规则
// ==========================================

mod helpers;

use egg_trace::config::ComplianceThresholds;
use egg_trace::domain::bundle::EvaluationStatus;
use egg_trace::domain::types::{DatasetShape, Stage, ViolationKind};
use egg_trace::domain::violation::FindingKind;
use egg_trace::domain::NormalizedDataset;
use egg_trace::engine::ComplianceEngine;
use helpers::test_data_builder::{at, batch_dataset, BatchBuilder};

fn kinds_of(engine: &ComplianceEngine, builder: BatchBuilder) -> Vec<ViolationKind> {
    let (violations, _) = engine.evaluate_record(&builder.build(), &[]);
    violations.into_iter().map(|v| v.kind).collect()
}

// ==========================================
// 温度规则
// ==========================================

#[test]
fn test_excursion_iff_outside_closed_range() {
    let engine = ComplianceEngine::default();
    for t in [-5.0, 1.99, 8.01, 9.2, 15.0] {
        assert!(engine.is_excursion(t), "{} 应判定超温", t);
    }
    for t in [2.0, 4.5, 8.0] {
        assert!(!engine.is_excursion(t), "{} 不应判定超温", t);
    }
}

#[test]
fn test_isolated_excursion_is_not_cold_chain_break() {
    let engine = ComplianceEngine::default();
    let kinds = kinds_of(
        &engine,
        BatchBuilder::new("B001")
            .reading(at(2025, 11, 1, 8, 0), 4.0)
            .reading(at(2025, 11, 1, 9, 0), 9.2)
            .reading(at(2025, 11, 1, 10, 0), 4.0),
    );
    assert_eq!(kinds, vec![ViolationKind::TemperatureExcursion]);
}

#[test]
fn test_three_hour_excursion_run_is_one_break() {
    let engine = ComplianceEngine::default();
    let kinds = kinds_of(
        &engine,
        BatchBuilder::new("B001")
            .reading(at(2025, 11, 1, 7, 0), 4.0)
            .reading(at(2025, 11, 1, 8, 0), 9.2)
            .reading(at(2025, 11, 1, 9, 30), 9.2)
            .reading(at(2025, 11, 1, 11, 0), 9.2)
            .reading(at(2025, 11, 1, 12, 0), 4.0),
    );

    let breaks = kinds.iter().filter(|k| **k == ViolationKind::ColdChainBreak).count();
    let excursions = kinds
        .iter()
        .filter(|k| **k == ViolationKind::TemperatureExcursion)
        .count();
    assert_eq!(breaks, 1);
    assert_eq!(excursions, 3);
}

#[test]
fn test_custom_range_is_respected() {
    let thresholds = ComplianceThresholds {
        temp_min_c: 0.0,
        temp_max_c: 10.0,
        ..ComplianceThresholds::default()
    };
    let engine = ComplianceEngine::new(thresholds);
    let kinds = kinds_of(&engine, BatchBuilder::new("B001").single_temperature(9.2));
    assert!(kinds.is_empty());
}

// ==========================================
// 阶段时长规则
// ==========================================

#[test]
fn test_lay_to_pack_48h_overruns() {
    let engine = ComplianceEngine::default();
    let kinds = kinds_of(
        &engine,
        BatchBuilder::new("B001")
            .stage(Stage::Laying, at(2025, 11, 1, 8, 0))
            .stage(Stage::Packing, at(2025, 11, 3, 8, 0)),
    );
    assert_eq!(kinds, vec![ViolationKind::StageDurationOverrun]);
}

#[test]
fn test_lay_to_pack_12h_within_policy() {
    let engine = ComplianceEngine::default();
    let kinds = kinds_of(
        &engine,
        BatchBuilder::new("B001")
            .stage(Stage::Laying, at(2025, 11, 1, 8, 0))
            .stage(Stage::Packing, at(2025, 11, 1, 20, 0)),
    );
    assert!(kinds.is_empty());
}

#[test]
fn test_shelf_life_exceeded() {
    let engine = ComplianceEngine::default();
    let kinds = kinds_of(
        &engine,
        BatchBuilder::new("B001")
            .stage(Stage::Laying, at(2025, 11, 1, 8, 0))
            .stage(Stage::Packing, at(2025, 11, 1, 20, 0))
            .stage(Stage::Delivery, at(2025, 12, 1, 8, 0)),
    );
    assert_eq!(kinds, vec![ViolationKind::StageDurationOverrun]);
}

// ==========================================
// 经手缺失 / 倒序
// ==========================================

#[test]
fn test_missing_expected_stages() {
    let engine = ComplianceEngine::default();
    let record = BatchBuilder::new("B001")
        .stage(Stage::Laying, at(2025, 11, 1, 8, 0))
        .build();

    let (violations, _) =
        engine.evaluate_record(&record, &[Stage::Laying, Stage::Packing, Stage::Delivery]);

    assert_eq!(violations.len(), 2);
    assert!(violations
        .iter()
        .all(|v| v.kind == ViolationKind::MissingHandlerData && v.batch_id == "B001"));
}

#[test]
fn test_stage_inversion_is_finding_only() {
    let engine = ComplianceEngine::default();
    let record = BatchBuilder::new("B001")
        .stage(Stage::Laying, at(2025, 11, 2, 8, 0))
        .stage(Stage::Packing, at(2025, 11, 1, 8, 0))
        .build();

    let (violations, findings) = engine.evaluate_record(&record, &[]);

    assert!(violations.is_empty());
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].kind, FindingKind::StageOrderInversion);
}

// ==========================================
// 数据集级
// ==========================================

#[test]
fn test_dataset_evaluation_keeps_record_order() {
    let engine = ComplianceEngine::default();
    let dataset = batch_dataset(
        vec![
            BatchBuilder::new("B001").single_temperature(9.5).build(),
            BatchBuilder::new("B002").single_temperature(4.0).build(),
            BatchBuilder::new("B003").single_temperature(1.0).build(),
        ],
        &[],
    );

    let report = engine.evaluate(&dataset);

    assert_eq!(report.status, EvaluationStatus::Evaluated);
    assert_eq!(report.evaluated_records, 3);
    let batches: Vec<&str> = report.violations.iter().map(|v| v.batch_id.as_str()).collect();
    assert_eq!(batches, vec!["B001", "B003"]);
}

#[test]
fn test_flow_graph_is_insufficient_structure() {
    let engine = ComplianceEngine::default();
    let report = engine.evaluate(&NormalizedDataset::empty(DatasetShape::FlowGraph));

    assert_eq!(report.status, EvaluationStatus::InsufficientStructure);
    assert!(report.violations.is_empty());
    assert_eq!(report.findings[0].kind, FindingKind::InsufficientStructure);
}
