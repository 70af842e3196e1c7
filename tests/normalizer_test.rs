// ==========================================
// Normalizer 集成测试
// ==========================================
// 测试目标: 别名映射 / 数据质量发现 / 幂等性 / 各形态规范化
// ==========================================

mod helpers;

use egg_trace::domain::types::{DatasetShape, Stage};
use egg_trace::domain::violation::FindingKind;
use egg_trace::engine::ComplianceEngine;
use egg_trace::importer::{FieldAliasTable, Normalizer, SchemaDetector};
use egg_trace::importer::normalizer::NormalizeOutcome;
use helpers::test_data_builder::{at, sample_chain, sample_flow_graph, RawRowBuilder};
use serde_json::{json, Value};

fn normalize(raw: Value) -> NormalizeOutcome {
    let aliases = FieldAliasTable::default();
    let dataset = SchemaDetector::new(&aliases).detect_dataset(raw);
    Normalizer::new(&aliases).normalize(&dataset)
}

fn assert_idempotent(raw: Value) {
    let aliases = FieldAliasTable::default();
    let normalizer = Normalizer::new(&aliases);
    let detector = SchemaDetector::new(&aliases);

    let first = normalizer.normalize(&detector.detect_dataset(raw)).dataset;
    let second = normalizer.normalize(&first.to_dataset()).dataset;
    assert_eq!(first, second);
}

// ==========================================
// batch_list
// ==========================================

#[test]
fn test_localized_aliases_are_mapped() {
    let raw = json!([{
        "批次編號": "TW-001",
        "農場": "陽光農場",
        "產蛋日期": "2025-11-01 08:00",
        "包裝日期": "2025/11/01 20:00",
        "溫度": "4.5°C",
        "箱數": "1,200",
        "經銷商": "冷鏈物流",
        "零售商": "全聯"
    }]);

    let outcome = normalize(raw);
    let record = &outcome.dataset.records[0];

    assert_eq!(outcome.dataset.shape, DatasetShape::BatchList);
    assert_eq!(record.batch_id, "TW-001");
    assert_eq!(record.farm_name.as_deref(), Some("陽光農場"));
    assert_eq!(record.laying_date, Some(at(2025, 11, 1, 8, 0)));
    assert_eq!(record.packing_date, Some(at(2025, 11, 1, 20, 0)));
    assert_eq!(record.temperature_readings[0].celsius, 4.5);
    assert_eq!(record.quantity_cartons, Some(1200));
    assert_eq!(record.retailer.as_deref(), Some("全聯"));
}

#[test]
fn test_expected_stages_follow_present_columns() {
    let raw = json!([
        RawRowBuilder::new("B001").field("laying_date", json!("2025-11-01")).build(),
        RawRowBuilder::new("B002").field("delivery_date", json!("2025-11-05")).build()
    ]);

    let outcome = normalize(raw);
    assert_eq!(outcome.dataset.expected_stages, vec![Stage::Laying, Stage::Delivery]);
}

#[test]
fn test_unparsable_field_becomes_missing_with_finding() {
    let raw = json!([RawRowBuilder::new("B001")
        .field("packing_date", json!("next tuesday"))
        .field("quantity_cartons", json!("lots"))
        .build()]);

    let outcome = normalize(raw);
    let record = &outcome.dataset.records[0];

    assert_eq!(record.packing_date, None);
    assert_eq!(record.quantity_cartons, None);
    let parse_findings: Vec<_> = outcome
        .findings
        .iter()
        .filter(|f| f.kind == FindingKind::FieldParse)
        .collect();
    assert_eq!(parse_findings.len(), 2);
    assert!(parse_findings.iter().all(|f| f.batch_id.as_deref() == Some("B001")));
}

#[test]
fn test_first_temperature_column_wins() {
    let raw = json!([RawRowBuilder::new("B001")
        .field("truck_temp", json!(9.0))
        .field("storage_temp", json!(4.0))
        .build()]);

    let outcome = normalize(raw);

    assert_eq!(outcome.temperature_source.as_deref(), Some("truck_temp"));
    assert_eq!(outcome.dataset.records[0].temperature_readings[0].celsius, 9.0);
    assert_eq!(
        outcome
            .findings
            .iter()
            .filter(|f| f.kind == FindingKind::AmbiguousTemperatureColumn)
            .count(),
        1
    );
}

#[test]
fn test_blank_first_temperature_column_not_substituted() {
    let raw = json!([
        RawRowBuilder::new("B1")
            .field("storage_temp", json!(4.0))
            .field("truck_temp", json!(4.0))
            .build(),
        RawRowBuilder::new("B2")
            .field("storage_temp", Value::Null)
            .field("truck_temp", json!(12.0))
            .build()
    ]);

    let outcome = normalize(raw);

    assert_eq!(outcome.temperature_source.as_deref(), Some("storage_temp"));
    let b2 = &outcome.dataset.records[1];
    assert!(b2.temperature_readings.is_empty());

    let skipped: Vec<_> = outcome
        .findings
        .iter()
        .filter(|f| {
            f.kind == FindingKind::AmbiguousTemperatureColumn && f.batch_id.as_deref() == Some("B2")
        })
        .collect();
    assert_eq!(skipped.len(), 1);
    assert!(skipped[0].message.contains("truck_temp"));

    let report = ComplianceEngine::default().evaluate(&outcome.dataset);
    assert!(report.violations.is_empty());
}

#[test]
fn test_timestamped_readings_sorted() {
    let raw = json!([RawRowBuilder::new("B001")
        .field(
            "temperature_readings",
            json!([
                {"timestamp": "2025-11-01T10:00:00Z", "celsius": 5.0},
                {"timestamp": "2025-11-01T08:00:00Z", "celsius": 4.0}
            ]),
        )
        .build()]);

    let outcome = normalize(raw);
    let readings = &outcome.dataset.records[0].temperature_readings;
    assert_eq!(readings[0].timestamp, Some(at(2025, 11, 1, 8, 0)));
    assert_eq!(readings[1].celsius, 5.0);
}

#[test]
fn test_batch_list_idempotent() {
    assert_idempotent(json!([
        RawRowBuilder::new("B001")
            .field("farm", json!("Sunrise Farm"))
            .field("laying_date", json!("2025-11-01T08:00:00"))
            .field("packing_date", json!("bad date"))
            .field("temp", json!("4.0;9.2"))
            .field("qty", json!(12))
            .build(),
        RawRowBuilder::new("").field("temp", json!(3.5)).build(),
    ]));
}

// ==========================================
// hierarchical_chain / flow_graph / unknown
// ==========================================

#[test]
fn test_chain_normalizes_to_single_record() {
    let outcome = normalize(sample_chain());
    let dataset = &outcome.dataset;

    assert_eq!(dataset.shape, DatasetShape::HierarchicalChain);
    assert_eq!(dataset.records.len(), 1);
    assert_eq!(dataset.chain.len(), 4);
    assert_eq!(dataset.expected_stages, Stage::ALL.to_vec());

    let record = &dataset.records[0];
    assert_eq!(record.batch_id, "CH-01");
    assert_eq!(record.delivery_date, Some(at(2025, 11, 3, 6, 0)));
    assert_eq!(record.temperature_readings.len(), 4);
    assert_eq!(record.quantity_cartons, Some(200));
}

#[test]
fn test_chain_idempotent() {
    assert_idempotent(sample_chain());
}

#[test]
fn test_flow_graph_resolves_index_links() {
    let outcome = normalize(sample_flow_graph());
    let graph = outcome.dataset.flow_graph.as_ref().unwrap();

    assert!(outcome.dataset.records.is_empty());
    assert_eq!(graph.links.len(), 2);
    assert_eq!(graph.links[1].source, "packer");
    assert_eq!(graph.links[1].target, "store");
    assert_eq!(graph.label_of("store"), "FreshMart");
}

#[test]
fn test_flow_graph_idempotent() {
    assert_idempotent(sample_flow_graph());
}

#[test]
fn test_unknown_structure_preserved() {
    let raw = json!({"title": "egg report", "pages": 3});
    let outcome = normalize(raw.clone());

    assert_eq!(outcome.dataset.shape, DatasetShape::Unknown);
    assert_eq!(outcome.dataset.unstructured, Some(raw));
    assert!(outcome
        .findings
        .iter()
        .any(|f| f.kind == FindingKind::SchemaAmbiguity));
}
