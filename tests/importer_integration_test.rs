// ==========================================
// 导入层集成测试
// ==========================================
// 测试目标: 文件解析 → 形态检测 → 规范化 的完整流程
// ==========================================


use egg_trace::domain::types::{DatasetShape, Stage};
use egg_trace::importer::{
    FieldAliasTable, ImportError, InputFormat, Normalizer, SchemaDetector, UniversalFileParser,
};
use egg_trace::logging;
use std::path::Path;
use test_helpers::{sample_batch_csv, write_temp_file};

#[test]
fn test_import_csv_basic() {
    logging::init_test();

    let file = write_temp_file(".csv", sample_batch_csv());
    let raw = UniversalFileParser.parse(file.path()).unwrap();

    let aliases = FieldAliasTable::default();
    let dataset = SchemaDetector::new(&aliases).detect_dataset(raw);
    assert_eq!(dataset.shape, DatasetShape::BatchList);

    let outcome = Normalizer::new(&aliases).normalize(&dataset);
    let records = &outcome.dataset.records;
    assert_eq!(records.len(), 3);
    assert_eq!(outcome.dataset.expected_stages, Stage::ALL.to_vec());

    let b002 = records.iter().find(|r| r.batch_id == "B002").unwrap();
    assert_eq!(b002.farm_name.as_deref(), Some("Sunrise Farm"));
    assert_eq!(b002.retailer.as_deref(), Some("GreenGrocer"));
    assert_eq!(b002.quantity_cartons, Some(80));
    assert_eq!(b002.temperature_readings.len(), 1);
    assert_eq!(b002.temperature_readings[0].celsius, 9.2);
    assert!(b002.delivery_date.is_some());
}

#[test]
fn test_import_csv_with_bom_and_blank_rows() {
    let content = "\u{feff}batch_id,temperature\nB001,4.0\n,\nB002,5.0\n";
    let file = write_temp_file(".csv", content);

    let raw = UniversalFileParser.parse(file.path()).unwrap();
    let rows = raw.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["batch_id"], "B001");
}

#[test]
fn test_import_json_chain_file() {
    let content = r#"{
        "batch_id": "CH-07",
        "quantity_cartons": 40,
        "traceability_chain": [
            {"stage": "Laying", "name": "Sunrise Farm", "timestamp": "2025-11-01T06:00:00Z", "temperature": 5.0},
            {"stage": "Packing", "name": "Valley Packers", "timestamp": "2025-11-01T18:00:00Z", "temperature": 4.0}
        ]
    }"#;
    let file = write_temp_file(".json", content);

    let raw = UniversalFileParser.parse(file.path()).unwrap();
    let aliases = FieldAliasTable::default();
    let dataset = SchemaDetector::new(&aliases).detect_dataset(raw);
    assert_eq!(dataset.shape, DatasetShape::HierarchicalChain);

    let outcome = Normalizer::new(&aliases).normalize(&dataset);
    assert_eq!(outcome.dataset.records.len(), 1);
    let record = &outcome.dataset.records[0];
    assert_eq!(record.batch_id, "CH-07");
    assert_eq!(record.quantity_cartons, Some(40));
    assert_eq!(record.temperature_readings.len(), 2);
    assert!(record.laying_date.is_some());
    assert!(record.distribution_date.is_none());
}

#[test]
fn test_import_unknown_json_structure() {
    let file = write_temp_file(".json", r#"{"title": "weekly notes", "pages": 3}"#);

    let raw = UniversalFileParser.parse(file.path()).unwrap();
    let aliases = FieldAliasTable::default();
    let dataset = SchemaDetector::new(&aliases).detect_dataset(raw);
    assert_eq!(dataset.shape, DatasetShape::Unknown);

    let outcome = Normalizer::new(&aliases).normalize(&dataset);
    assert!(outcome.dataset.records.is_empty());
    assert!(outcome.dataset.unstructured.is_some());
}

// ==========================================
// 错误处理
// ==========================================

#[test]
fn test_malformed_json_rejected() {
    let file = write_temp_file(".json", r#"{"batch_id": "B001", "#);
    let err = UniversalFileParser.parse(file.path()).unwrap_err();
    assert!(matches!(err, ImportError::JsonParseError(_)));
}

#[test]
fn test_unsupported_extension_rejected() {
    let file = write_temp_file(".txt", "batch_id\nB001\n");
    let err = UniversalFileParser.parse(file.path()).unwrap_err();
    assert!(matches!(err, ImportError::UnsupportedFormat(ext) if ext == "txt"));
}

#[test]
fn test_missing_file_rejected() {
    let err = UniversalFileParser
        .parse(Path::new("/nonexistent/eggs.csv"))
        .unwrap_err();
    assert!(matches!(err, ImportError::FileNotFound(_)));
}

#[test]
fn test_zero_byte_file_is_empty_dataset() {
    let file = write_temp_file(".csv", "");
    let err = UniversalFileParser.parse(file.path()).unwrap_err();
    assert!(matches!(err, ImportError::EmptyDataset(_)));
}

#[test]
fn test_parse_bytes_uploaded_content() {
    let raw = UniversalFileParser
        .parse_bytes(InputFormat::Csv, sample_batch_csv().as_bytes())
        .unwrap();
    assert_eq!(raw.as_array().unwrap().len(), 3);

    let err = UniversalFileParser
        .parse_bytes(InputFormat::Json, b"  \n ")
        .unwrap_err();
    assert!(matches!(err, ImportError::EmptyDataset(_)));
}
