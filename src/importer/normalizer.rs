// ==========================================
// 蛋品冷链溯源分析系统 - 数据规范化
// ==========================================
// 职责: 按检测形态把原始结构映射为标准批次记录
// 红线: 单字段失败只记 Finding,不中断；
//       normalize(canonical(normalize(x))) == normalize(x)
// ==========================================

use crate::domain::batch::{
    BatchRecord, ChainStage, Dataset, FlowGraph, FlowLink, FlowNode, NormalizedDataset,
    TemperatureReading,
};
use crate::domain::types::{DatasetShape, Stage};
use crate::domain::violation::{Finding, FindingKind};
use crate::importer::field_alias::{is_blank, CanonicalField, FieldAliasTable};
use crate::importer::schema_detector::SchemaDetector;
use crate::importer::value_parser::{
    clean_text, format_timestamp, parse_cartons, parse_celsius, parse_number, parse_readings,
    parse_timestamp,
};
use serde_json::{json, Map, Value};
use std::collections::HashSet;
use tracing::{debug, info, warn};

const CHAIN_NAME_KEYS: [&str; 7] = ["name", "facility", "handler", "location", "site", "名稱", "名称"];
const CHAIN_TIME_KEYS: [&str; 9] = [
    "timestamp", "date", "datetime", "time", "recorded_at", "at", "日期", "時間", "时间",
];
const CHAIN_KEY: &str = "traceability_chain";

const TEXT_FIELDS: [CanonicalField; 5] = [
    CanonicalField::FarmName,
    CanonicalField::FarmLocation,
    CanonicalField::PackingFacility,
    CanonicalField::Distributor,
    CanonicalField::Retailer,
];

// ==========================================
// NormalizeOutcome - 规范化结果
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizeOutcome {
    pub dataset: NormalizedDataset,
    /// 规范化过程中的数据质量发现
    pub findings: Vec<Finding>,
    /// 实际采用的温度列（batch_list）
    pub temperature_source: Option<String>,
}

impl NormalizeOutcome {
    fn new(dataset: NormalizedDataset) -> Self {
        Self {
            dataset,
            findings: Vec::new(),
            temperature_source: None,
        }
    }
}

// ==========================================
// Normalizer
// ==========================================
pub struct Normalizer<'a> {
    aliases: &'a FieldAliasTable,
}

impl<'a> Normalizer<'a> {
    pub fn new(aliases: &'a FieldAliasTable) -> Self {
        Self { aliases }
    }

    /// 规范化数据集（按 dataset.shape 分派,不重新检测）
    pub fn normalize(&self, dataset: &Dataset) -> NormalizeOutcome {
        let outcome = match dataset.shape {
            DatasetShape::BatchList => self.normalize_batch_list(&dataset.raw),
            DatasetShape::HierarchicalChain => self.normalize_chain(&dataset.raw),
            DatasetShape::FlowGraph => self.normalize_flow_graph(&dataset.raw),
            DatasetShape::Unknown => {
                let mut normalized = NormalizedDataset::empty(DatasetShape::Unknown);
                normalized.unstructured = Some(dataset.raw.clone());
                let mut outcome = NormalizeOutcome::new(normalized);
                outcome.findings.push(Finding::new(
                    FindingKind::SchemaAmbiguity,
                    "无法识别数据集结构,仅保留原始数据",
                ));
                outcome
            }
        };

        info!(
            shape = %dataset.shape,
            records = outcome.dataset.records.len(),
            findings = outcome.findings.len(),
            "数据规范化完成"
        );
        outcome
    }

    // ==========================================
    // batch_list
    // ==========================================

    fn normalize_batch_list(&self, raw: &Value) -> NormalizeOutcome {
        let mut outcome = NormalizeOutcome::new(NormalizedDataset::empty(DatasetShape::BatchList));
        let items = match raw.as_array() {
            Some(items) => items,
            None => {
                outcome.findings.push(Finding::new(
                    FindingKind::SchemaAmbiguity,
                    "batch_list 数据集不是数组",
                ));
                return outcome;
            }
        };

        let rows: Vec<&Map<String, Value>> = items.iter().filter_map(Value::as_object).collect();
        if rows.len() != items.len() {
            outcome.findings.push(Finding::new(
                FindingKind::FieldParse,
                format!("忽略 {} 个非对象元素", items.len() - rows.len()),
            ));
        }

        // 应当存在的阶段：任一记录携带该列
        outcome.dataset.expected_stages = Stage::ALL
            .iter()
            .copied()
            .filter(|stage| {
                rows.iter()
                    .any(|row| self.aliases.has_column(row, CanonicalField::for_stage(*stage)))
            })
            .collect();

        self.resolve_temperature_source(&rows, &mut outcome);
        let source = outcome.temperature_source.clone();

        let mut seen = HashSet::new();
        for (idx, row) in rows.iter().enumerate() {
            let batch_id = match self
                .aliases
                .find_value(row, CanonicalField::BatchId)
                .and_then(|(_, v)| clean_text(v))
            {
                Some(id) => id,
                None => {
                    let generated = format!("ROW-{}", idx + 1);
                    outcome.findings.push(
                        Finding::new(FindingKind::FieldParse, "批次号为空,使用行号代替")
                            .for_batch(generated.clone())
                            .on_field(CanonicalField::BatchId.canonical_name()),
                    );
                    generated
                }
            };

            if !seen.insert(batch_id.clone()) {
                outcome.findings.push(
                    Finding::new(FindingKind::DuplicateBatchId, "批次号重复,记录均保留")
                        .for_batch(batch_id.clone()),
                );
            }

            let mut record = BatchRecord::new(batch_id);
            self.fill_common_fields(row, &mut record, &mut outcome.findings);
            self.fill_temperature(row, source.as_deref(), &mut record, &mut outcome.findings);
            outcome.dataset.records.push(record);
        }

        outcome
    }

    /// 温度列选择：按列序取第一个,多列时记录歧义
    fn resolve_temperature_source(
        &self,
        rows: &[&Map<String, Value>],
        outcome: &mut NormalizeOutcome,
    ) {
        let mut ambiguous: Option<Vec<String>> = None;
        for row in rows {
            let columns = self.aliases.temperature_columns(row);
            if outcome.temperature_source.is_none() {
                outcome.temperature_source = columns.first().map(|c| c.to_string());
            }
            if columns.len() > 1 && ambiguous.is_none() {
                ambiguous = Some(columns.iter().map(|c| c.to_string()).collect());
            }
        }

        if let Some(columns) = ambiguous {
            warn!(columns = ?columns, "检测到多个温度列");
            outcome.findings.push(
                Finding::new(
                    FindingKind::AmbiguousTemperatureColumn,
                    format!("存在多个温度列 [{}],按列序采用第一个", columns.join(", ")),
                )
                .on_field(columns[0].clone()),
            );
        }
    }

    /// 经手方 / 阶段时间 / 箱数
    fn fill_common_fields(
        &self,
        row: &Map<String, Value>,
        record: &mut BatchRecord,
        findings: &mut Vec<Finding>,
    ) {
        for field in TEXT_FIELDS {
            let value = self
                .aliases
                .find_value(row, field)
                .and_then(|(_, v)| clean_text(v));
            match field {
                CanonicalField::FarmName => record.farm_name = value,
                CanonicalField::FarmLocation => record.farm_location = value,
                CanonicalField::PackingFacility => record.packing_facility = value,
                CanonicalField::Distributor => record.distributor = value,
                CanonicalField::Retailer => record.retailer = value,
                _ => {}
            }
        }

        for stage in Stage::ALL {
            let field = CanonicalField::for_stage(stage);
            if let Some((column, value)) = self.aliases.find_value(row, field) {
                let parsed = parse_timestamp(value);
                if parsed.is_none() {
                    findings.push(
                        Finding::new(
                            FindingKind::FieldParse,
                            format!("无法解析时间 {}={}", column, value),
                        )
                        .for_batch(record.batch_id.clone())
                        .on_field(field.canonical_name()),
                    );
                }
                record.set_stage_date(stage, parsed);
            }
        }

        if let Some((column, value)) = self.aliases.find_value(row, CanonicalField::QuantityCartons) {
            record.quantity_cartons = parse_cartons(value);
            if record.quantity_cartons.is_none() {
                findings.push(
                    Finding::new(
                        FindingKind::FieldParse,
                        format!("无法解析箱数 {}={}", column, value),
                    )
                    .for_batch(record.batch_id.clone())
                    .on_field(CanonicalField::QuantityCartons.canonical_name()),
                );
            }
        }
    }

    /// 只读取选定的温度列；该列为空时不改用其他列
    fn fill_temperature(
        &self,
        row: &Map<String, Value>,
        source: Option<&str>,
        record: &mut BatchRecord,
        findings: &mut Vec<Finding>,
    ) {
        let source = match source {
            Some(source) => source,
            None => return,
        };

        match row.get(source).filter(|v| !is_blank(v)) {
            Some(value) => {
                let (readings, rejected) = parse_readings(value);
                if rejected > 0 {
                    findings.push(
                        Finding::new(
                            FindingKind::FieldParse,
                            format!("{} 个温度读数无法解析（列 {}）", rejected, source),
                        )
                        .for_batch(record.batch_id.clone())
                        .on_field(CanonicalField::Temperature.canonical_name()),
                    );
                }
                record.temperature_readings = readings;
            }
            None => {
                let ignored: Vec<&str> = self
                    .aliases
                    .temperature_columns(row)
                    .into_iter()
                    .filter(|column| *column != source)
                    .filter(|column| row.get(*column).is_some_and(|v| !is_blank(v)))
                    .collect();
                if !ignored.is_empty() {
                    findings.push(
                        Finding::new(
                            FindingKind::AmbiguousTemperatureColumn,
                            format!("{} 为空,未采用其他温度列 [{}]", source, ignored.join(", ")),
                        )
                        .for_batch(record.batch_id.clone())
                        .on_field(source.to_string()),
                    );
                }
            }
        }
    }

    // ==========================================
    // hierarchical_chain
    // ==========================================

    fn normalize_chain(&self, raw: &Value) -> NormalizeOutcome {
        let mut normalized = NormalizedDataset::empty(DatasetShape::HierarchicalChain);
        normalized.expected_stages = Stage::ALL.to_vec();
        let mut outcome = NormalizeOutcome::new(normalized);

        let (obj, chain_key) = match (raw.as_object(), SchemaDetector::new(self.aliases).chain_key(raw)) {
            (Some(obj), Some(key)) => (obj, key),
            _ => {
                outcome.findings.push(Finding::new(
                    FindingKind::SchemaAmbiguity,
                    "未找到阶段链",
                ));
                return outcome;
            }
        };

        let batch_id = self
            .aliases
            .find_value(obj, CanonicalField::BatchId)
            .and_then(|(_, v)| clean_text(v))
            .unwrap_or_else(|| "CHAIN-1".to_string());
        let mut record = BatchRecord::new(batch_id);

        // 顶层字段（排除链本身）
        let top: Map<String, Value> = obj
            .iter()
            .filter(|(k, _)| k.as_str() != chain_key)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        self.fill_common_fields(&top, &mut record, &mut outcome.findings);

        let descriptors = obj
            .get(chain_key)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        for descriptor in descriptors.iter().filter_map(Value::as_object) {
            let stage = self.parse_chain_stage(descriptor, &record.batch_id, &mut outcome.findings);
            outcome.dataset.chain.push(stage);
        }

        // 阶段描述中的时间覆盖顶层时间（同一阶段取第一个）
        let mut overridden = HashSet::new();
        for stage in &outcome.dataset.chain {
            if let (Some(canonical), Some(ts)) = (stage.canonical, stage.timestamp) {
                if overridden.insert(canonical) {
                    record.set_stage_date(canonical, Some(ts));
                }
            }
        }

        // 链上温度优先于顶层读数
        let chain_readings: Vec<TemperatureReading> = outcome
            .dataset
            .chain
            .iter()
            .filter_map(|s| {
                s.temperature.map(|celsius| TemperatureReading {
                    timestamp: s.timestamp,
                    celsius,
                })
            })
            .collect();
        if chain_readings.is_empty() {
            let source = self.aliases.temperature_columns(&top).first().map(|c| c.to_string());
            self.fill_temperature(&top, source.as_deref(), &mut record, &mut outcome.findings);
        } else {
            let mut readings = chain_readings;
            if readings.iter().all(|r| r.timestamp.is_some()) {
                readings.sort_by_key(|r| r.timestamp);
            }
            record.temperature_readings = readings;
        }

        debug!(stages = outcome.dataset.chain.len(), "阶段链解析完成");
        outcome.dataset.records.push(record);
        outcome
    }

    fn parse_chain_stage(
        &self,
        descriptor: &Map<String, Value>,
        batch_id: &str,
        findings: &mut Vec<Finding>,
    ) -> ChainStage {
        let stage = find_key(descriptor, &["stage"])
            .and_then(clean_text)
            .unwrap_or_default();
        let name = find_key(descriptor, &CHAIN_NAME_KEYS).and_then(clean_text);

        let timestamp = match find_key(descriptor, &CHAIN_TIME_KEYS).filter(|v| !is_blank(v)) {
            Some(value) => {
                let parsed = parse_timestamp(value);
                if parsed.is_none() {
                    findings.push(
                        Finding::new(
                            FindingKind::FieldParse,
                            format!("阶段 {} 的时间无法解析: {}", stage, value),
                        )
                        .for_batch(batch_id)
                        .on_field("timestamp"),
                    );
                }
                parsed
            }
            None => None,
        };

        let temperature = match descriptor
            .iter()
            .find(|(k, v)| self.aliases.is_temperature_column(k) && !is_blank(v))
        {
            Some((column, value)) => {
                let parsed = parse_celsius(value);
                if parsed.is_none() {
                    findings.push(
                        Finding::new(
                            FindingKind::FieldParse,
                            format!("阶段 {} 的温度无法解析: {}={}", stage, column, value),
                        )
                        .for_batch(batch_id)
                        .on_field(CanonicalField::Temperature.canonical_name()),
                    );
                }
                parsed
            }
            None => None,
        };

        ChainStage {
            canonical: self.aliases.stage_for(&stage),
            stage,
            name,
            timestamp,
            temperature,
        }
    }

    // ==========================================
    // flow_graph
    // ==========================================

    fn normalize_flow_graph(&self, raw: &Value) -> NormalizeOutcome {
        let mut outcome = NormalizeOutcome::new(NormalizedDataset::empty(DatasetShape::FlowGraph));
        let mut graph = FlowGraph::default();

        let nodes = raw.get("nodes").and_then(Value::as_array).map(Vec::as_slice).unwrap_or(&[]);
        for (idx, node) in nodes.iter().enumerate() {
            let parsed = match node {
                Value::Object(obj) => {
                    let id = find_key(obj, &["id", "name", "label"]).and_then(clean_text);
                    let label = find_key(obj, &["label", "name"]).and_then(clean_text);
                    match (id, label) {
                        (Some(id), label) => FlowNode {
                            label: label.unwrap_or_else(|| id.clone()),
                            id,
                        },
                        (None, label) => {
                            let id = format!("node-{}", idx);
                            FlowNode {
                                label: label.unwrap_or_else(|| id.clone()),
                                id,
                            }
                        }
                    }
                }
                other => {
                    let id = clean_text(other).unwrap_or_else(|| format!("node-{}", idx));
                    FlowNode {
                        label: id.clone(),
                        id,
                    }
                }
            };
            graph.nodes.push(parsed);
        }

        let links = raw.get("links").and_then(Value::as_array).map(Vec::as_slice).unwrap_or(&[]);
        for (idx, link) in links.iter().enumerate() {
            let obj = match link.as_object() {
                Some(obj) => obj,
                None => {
                    outcome.findings.push(Finding::new(
                        FindingKind::FieldParse,
                        format!("流向第 {} 条不是对象,已忽略", idx + 1),
                    ));
                    continue;
                }
            };

            let source = obj.get("source").and_then(|v| resolve_endpoint(v, &graph.nodes));
            let target = obj.get("target").and_then(|v| resolve_endpoint(v, &graph.nodes));
            let (source, target) = match (source, target) {
                (Some(s), Some(t)) => (s, t),
                _ => {
                    outcome.findings.push(
                        Finding::new(
                            FindingKind::FieldParse,
                            format!("流向第 {} 条端点无法解析,已忽略", idx + 1),
                        )
                        .on_field("links"),
                    );
                    continue;
                }
            };

            let value = match obj.get("value").and_then(parse_number) {
                Some(v) => v,
                None => {
                    outcome.findings.push(
                        Finding::new(
                            FindingKind::FieldParse,
                            format!("流向 {} → {} 缺少数量,按 0 处理", source, target),
                        )
                        .on_field("value"),
                    );
                    0.0
                }
            };

            graph.links.push(FlowLink { source, target, value });
        }

        outcome.dataset.flow_graph = Some(graph);
        outcome
    }
}

fn find_key<'v>(obj: &'v Map<String, Value>, keys: &[&str]) -> Option<&'v Value> {
    // 按候选键优先级查找
    keys.iter().find_map(|candidate| {
        obj.iter()
            .find(|(k, _)| k.trim().to_lowercase() == *candidate)
            .map(|(_, v)| v)
    })
}

/// 端点：节点下标或节点 id
fn resolve_endpoint(value: &Value, nodes: &[FlowNode]) -> Option<String> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .and_then(|idx| nodes.get(idx as usize))
            .map(|node| node.id.clone()),
        other => clean_text(other),
    }
}

// ==========================================
// 规范化输出 → 原始结构
// ==========================================

fn reading_to_value(reading: &TemperatureReading) -> Value {
    match reading.timestamp {
        Some(ts) => json!({"timestamp": format_timestamp(&ts), "celsius": reading.celsius}),
        None => json!({"celsius": reading.celsius}),
    }
}

fn record_to_map(record: &BatchRecord, expected: &[Stage]) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert("batch_id".to_string(), json!(record.batch_id));

    let texts = [
        (CanonicalField::FarmName, &record.farm_name),
        (CanonicalField::FarmLocation, &record.farm_location),
        (CanonicalField::PackingFacility, &record.packing_facility),
        (CanonicalField::Distributor, &record.distributor),
        (CanonicalField::Retailer, &record.retailer),
    ];
    for (field, value) in texts {
        if let Some(text) = value {
            map.insert(field.canonical_name().to_string(), json!(text));
        }
    }

    for stage in Stage::ALL {
        match record.stage_date(stage) {
            Some(ts) => {
                map.insert(stage.date_field().to_string(), json!(format_timestamp(&ts)));
            }
            None if expected.contains(&stage) => {
                map.insert(stage.date_field().to_string(), Value::Null);
            }
            None => {}
        }
    }

    if !record.temperature_readings.is_empty() {
        map.insert(
            CanonicalField::Temperature.canonical_name().to_string(),
            Value::Array(record.temperature_readings.iter().map(reading_to_value).collect()),
        );
    }

    if let Some(cartons) = record.quantity_cartons {
        map.insert(
            CanonicalField::QuantityCartons.canonical_name().to_string(),
            json!(cartons),
        );
    }

    map
}

fn chain_stage_to_value(stage: &ChainStage) -> Value {
    let mut map = Map::new();
    map.insert("stage".to_string(), json!(stage.stage));
    if let Some(name) = &stage.name {
        map.insert("name".to_string(), json!(name));
    }
    if let Some(ts) = stage.timestamp {
        map.insert("timestamp".to_string(), json!(format_timestamp(&ts)));
    }
    if let Some(celsius) = stage.temperature {
        map.insert("temperature".to_string(), json!(celsius));
    }
    Value::Object(map)
}

impl NormalizedDataset {
    /// 以标准字段名重建原始结构（保持形态）
    pub fn to_dataset(&self) -> Dataset {
        let raw = match self.shape {
            DatasetShape::BatchList => Value::Array(
                self.records
                    .iter()
                    .map(|r| Value::Object(record_to_map(r, &self.expected_stages)))
                    .collect(),
            ),
            DatasetShape::HierarchicalChain => {
                let mut map = self
                    .records
                    .first()
                    .map(|r| record_to_map(r, &self.expected_stages))
                    .unwrap_or_default();
                map.insert(
                    CHAIN_KEY.to_string(),
                    Value::Array(self.chain.iter().map(chain_stage_to_value).collect()),
                );
                Value::Object(map)
            }
            DatasetShape::FlowGraph => {
                let graph = self.flow_graph.clone().unwrap_or_default();
                json!({
                    "nodes": graph.nodes.iter().map(|n| json!({"id": n.id, "label": n.label})).collect::<Vec<_>>(),
                    "links": graph.links.iter().map(|l| json!({"source": l.source, "target": l.target, "value": l.value})).collect::<Vec<_>>(),
                })
            }
            DatasetShape::Unknown => self.unstructured.clone().unwrap_or(Value::Null),
        };
        Dataset::new(self.shape, raw)
    }
}
