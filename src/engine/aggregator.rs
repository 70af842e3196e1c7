// ==========================================
// 蛋品冷链溯源分析系统 - 统计汇总引擎
// ==========================================
// 职责: 描述统计 / 经手方 KPI / 阶段时差 / 图表序列
// 输入: 规范化数据集 + 合规评估结果
// 输出: AggregateStats, 以及 趋势 / 流向 / 层级 / 时间线 序列
// 说明: unknown 形态只输出原始计数
// ==========================================

use crate::domain::batch::{BatchRecord, NormalizedDataset};
use crate::domain::bundle::ComplianceReport;
use crate::domain::stats::{
    AggregateStats, DatasetOverview, EntityDimension, EntityKpi, FlowEdge, HierarchyEntry,
    NumericSummary, RawCounts, StageDelta, StageDeltaSummary, TimelineEntry, TrendPoint,
    ViolationCount,
};
use crate::domain::types::{DatasetShape, Stage, ViolationKind};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

const UNKNOWN_FARM: &str = "(unknown farm)";

// 相邻阶段
const STAGE_PAIRS: [(Stage, Stage); 3] = [
    (Stage::Laying, Stage::Packing),
    (Stage::Packing, Stage::Distribution),
    (Stage::Distribution, Stage::Delivery),
];

/// 描述统计（样本标准差,单样本为 0）
pub fn summarize(values: &[f64]) -> Option<NumericSummary> {
    if values.is_empty() {
        return None;
    }
    let count = values.len();
    let mean = values.iter().sum::<f64>() / count as f64;
    let stddev = if count > 1 {
        let variance =
            values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (count - 1) as f64;
        variance.sqrt()
    } else {
        0.0
    };
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    Some(NumericSummary {
        count,
        mean,
        stddev,
        min,
        max,
    })
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

// ==========================================
// Aggregator - 统计汇总引擎（无状态）
// ==========================================
pub struct Aggregator;

impl Default for Aggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl Aggregator {
    pub fn new() -> Self {
        Self
    }

    /// 汇总统计
    pub fn aggregate(
        &self,
        dataset: &NormalizedDataset,
        compliance: &ComplianceReport,
    ) -> AggregateStats {
        if dataset.shape == DatasetShape::Unknown {
            return AggregateStats {
                raw_counts: dataset.unstructured.as_ref().map(raw_counts),
                ..AggregateStats::default()
            };
        }

        let records = &dataset.records;

        let temperatures: Vec<f64> = records
            .iter()
            .flat_map(|r| r.temperature_readings.iter().map(|t| t.celsius))
            .collect();
        let cartons: Vec<f64> = records
            .iter()
            .filter_map(|r| r.quantity_cartons.map(|c| c as f64))
            .collect();

        let violation_counts = ViolationKind::ALL
            .iter()
            .map(|kind| ViolationCount {
                kind: *kind,
                count: compliance.count_of(*kind),
            })
            .collect();

        let stage_deltas = stage_deltas(records);
        let stage_delta_summary = summarize_deltas(&stage_deltas);

        let mut entity_comparisons = entity_kpis(records, compliance, EntityDimension::Farm);
        entity_comparisons.extend(entity_kpis(records, compliance, EntityDimension::Distributor));

        let stats = AggregateStats {
            total_records: records.len(),
            overview: overview(records),
            temperature: summarize(&temperatures),
            cartons: summarize(&cartons),
            violation_counts,
            entity_comparisons,
            stage_deltas,
            stage_delta_summary,
            raw_counts: None,
        };

        debug!(
            total_records = stats.total_records,
            entities = stats.entity_comparisons.len(),
            "统计汇总完成"
        );
        stats
    }

    // ==========================================
    // 图表序列（彼此独立,可并发计算）
    // ==========================================

    /// 温度趋势 (timestamp, value, group)
    ///
    /// 无时间戳的读数以产蛋时间代替,仍无时间则跳过
    pub fn trend_series(dataset: &NormalizedDataset) -> Vec<TrendPoint> {
        let mut points: Vec<TrendPoint> = dataset
            .records
            .iter()
            .flat_map(|record| {
                record.temperature_readings.iter().filter_map(move |reading| {
                    reading
                        .timestamp
                        .or(record.laying_date)
                        .map(|timestamp| TrendPoint {
                            timestamp,
                            value: reading.celsius,
                            group: record.batch_id.clone(),
                        })
                })
            })
            .collect();
        points.sort_by_key(|p| p.timestamp);
        points
    }

    /// 流向 (source, target, value)
    pub fn flow_series(dataset: &NormalizedDataset) -> Vec<FlowEdge> {
        match dataset.shape {
            DatasetShape::FlowGraph => dataset
                .flow_graph
                .as_ref()
                .map(|graph| {
                    graph
                        .links
                        .iter()
                        .map(|link| FlowEdge {
                            source: graph.label_of(&link.source),
                            target: graph.label_of(&link.target),
                            value: link.value,
                        })
                        .collect()
                })
                .unwrap_or_default(),
            DatasetShape::HierarchicalChain => chain_flow(dataset),
            DatasetShape::BatchList => {
                let mut edges = EdgeAccumulator::default();
                for record in &dataset.records {
                    let hops: Vec<&str> = [
                        &record.farm_name,
                        &record.packing_facility,
                        &record.distributor,
                        &record.retailer,
                    ]
                    .into_iter()
                    .filter_map(|v| v.as_deref())
                    .collect();
                    let value = record.quantity_cartons.unwrap_or(0) as f64;
                    for pair in hops.windows(2) {
                        edges.add(pair[0], pair[1], value);
                    }
                }
                edges.into_edges()
            }
            DatasetShape::Unknown => Vec::new(),
        }
    }

    /// 层级 (label, parent, value)
    pub fn hierarchy_series(dataset: &NormalizedDataset) -> Vec<HierarchyEntry> {
        match dataset.shape {
            DatasetShape::BatchList => batch_hierarchy(&dataset.records),
            DatasetShape::HierarchicalChain => dataset
                .records
                .first()
                .map(|record| {
                    let mut entries = vec![HierarchyEntry {
                        label: record.batch_id.clone(),
                        parent: String::new(),
                        value: dataset.chain.len() as f64,
                    }];
                    entries.extend(dataset.chain.iter().map(|stage| HierarchyEntry {
                        label: match &stage.name {
                            Some(name) => format!("{}: {}", stage.stage, name),
                            None => stage.stage.clone(),
                        },
                        parent: record.batch_id.clone(),
                        value: 1.0,
                    }));
                    entries
                })
                .unwrap_or_default(),
            DatasetShape::FlowGraph => {
                let edges = Self::flow_series(dataset);
                let targets: BTreeSet<&str> = edges.iter().map(|e| e.target.as_str()).collect();
                let mut roots: Vec<(String, f64)> = Vec::new();
                for edge in &edges {
                    if targets.contains(edge.source.as_str()) {
                        continue;
                    }
                    match roots.iter_mut().find(|(label, _)| *label == edge.source) {
                        Some((_, total)) => *total += edge.value,
                        None => roots.push((edge.source.clone(), edge.value)),
                    }
                }

                let mut entries: Vec<HierarchyEntry> = roots
                    .into_iter()
                    .map(|(label, value)| HierarchyEntry {
                        label,
                        parent: String::new(),
                        value,
                    })
                    .collect();
                entries.extend(edges.into_iter().map(|edge| HierarchyEntry {
                    label: edge.target,
                    parent: edge.source,
                    value: edge.value,
                }));
                entries
            }
            DatasetShape::Unknown => Vec::new(),
        }
    }

    /// 批次旅程时间线
    pub fn timeline_series(dataset: &NormalizedDataset) -> Vec<TimelineEntry> {
        dataset
            .records
            .iter()
            .flat_map(|record| {
                Stage::ALL.iter().filter_map(move |stage| {
                    record.stage_date(*stage).map(|timestamp| TimelineEntry {
                        batch_id: record.batch_id.clone(),
                        stage: *stage,
                        timestamp,
                    })
                })
            })
            .collect()
    }
}

// ==========================================
// 内部计算
// ==========================================

fn raw_counts(raw: &Value) -> RawCounts {
    let (top_level, element_count, key_count) = match raw {
        Value::Array(items) => {
            let keys: BTreeSet<&str> = items
                .iter()
                .filter_map(Value::as_object)
                .flat_map(|obj| obj.keys().map(String::as_str))
                .collect();
            ("array", items.len(), keys.len())
        }
        Value::Object(obj) => ("object", obj.len(), obj.len()),
        Value::Null => ("null", 0, 0),
        Value::String(_) => ("string", 1, 0),
        Value::Number(_) => ("number", 1, 0),
        Value::Bool(_) => ("bool", 1, 0),
    };
    RawCounts {
        top_level: top_level.to_string(),
        element_count,
        key_count,
    }
}

/// 箱数合计（溢出时截断为 u64::MAX,并返回 true）
pub fn total_cartons<'a>(records: impl IntoIterator<Item = &'a BatchRecord>) -> (u64, bool) {
    records
        .into_iter()
        .filter_map(|r| r.quantity_cartons)
        .fold((0u64, false), |(total, saturated), cartons| {
            match total.checked_add(cartons) {
                Some(sum) => (sum, saturated),
                None => (u64::MAX, true),
            }
        })
}

fn overview(records: &[BatchRecord]) -> DatasetOverview {
    let farms: BTreeSet<&str> = records.iter().filter_map(|r| r.farm_name.as_deref()).collect();
    let retailers: BTreeSet<&str> = records.iter().filter_map(|r| r.retailer.as_deref()).collect();
    let (total_cartons, cartons_saturated) = total_cartons(records);
    DatasetOverview {
        batches: records.len(),
        total_cartons,
        cartons_saturated,
        distinct_farms: farms.len(),
        distinct_retailers: retailers.len(),
    }
}

fn stage_deltas(records: &[BatchRecord]) -> Vec<StageDelta> {
    records
        .iter()
        .flat_map(|record| {
            STAGE_PAIRS.iter().filter_map(move |(from, to)| {
                record.hours_between(*from, *to).map(|hours| StageDelta {
                    batch_id: record.batch_id.clone(),
                    from: *from,
                    to: *to,
                    hours,
                })
            })
        })
        .collect()
}

fn summarize_deltas(deltas: &[StageDelta]) -> Vec<StageDeltaSummary> {
    STAGE_PAIRS
        .iter()
        .filter_map(|(from, to)| {
            let hours: Vec<f64> = deltas
                .iter()
                .filter(|d| d.from == *from && d.to == *to)
                .map(|d| d.hours)
                .collect();
            summarize(&hours).map(|s| StageDeltaSummary {
                from: *from,
                to: *to,
                count: s.count,
                mean_hours: s.mean,
                max_hours: s.max,
            })
        })
        .collect()
}

fn entity_kpis(
    records: &[BatchRecord],
    compliance: &ComplianceReport,
    dimension: EntityDimension,
) -> Vec<EntityKpi> {
    // 记录位置 → (违规数, 超温数)；批次号可重复,按位置归属
    let mut per_record: HashMap<usize, (usize, usize)> = HashMap::new();
    for violation in &compliance.violations {
        let indices: Vec<usize> = match violation.record_index {
            Some(index) => vec![index],
            None => records
                .iter()
                .position(|r| r.batch_id == violation.batch_id)
                .into_iter()
                .collect(),
        };
        for index in indices {
            let entry = per_record.entry(index).or_default();
            entry.0 += 1;
            if violation.kind == ViolationKind::TemperatureExcursion {
                entry.1 += 1;
            }
        }
    }

    let mut groups: BTreeMap<&str, Vec<(usize, &BatchRecord)>> = BTreeMap::new();
    for (index, record) in records.iter().enumerate() {
        let name = match dimension {
            EntityDimension::Farm => record.farm_name.as_deref(),
            EntityDimension::Distributor => record.distributor.as_deref(),
        };
        if let Some(name) = name {
            groups.entry(name).or_default().push((index, record));
        }
    }

    groups
        .into_iter()
        .map(|(name, members)| {
            let (violation_count, excursion_count) = members
                .iter()
                .filter_map(|(index, _)| per_record.get(index))
                .fold((0, 0), |acc, (v, e)| (acc.0 + v, acc.1 + e));

            let temperatures: Vec<f64> = members
                .iter()
                .flat_map(|(_, r)| r.temperature_readings.iter().map(|t| t.celsius))
                .collect();
            let lay_to_pack: Vec<f64> = members
                .iter()
                .filter_map(|(_, r)| r.hours_between(Stage::Laying, Stage::Packing))
                .collect();

            EntityKpi {
                dimension,
                name: name.to_string(),
                record_count: members.len(),
                total_cartons: total_cartons(members.iter().map(|(_, r)| *r)).0,
                violation_count,
                excursion_count,
                mean_temperature: mean(&temperatures),
                mean_lay_to_pack_hours: mean(&lay_to_pack),
            }
        })
        .collect()
}

/// 层级链流向：相邻阶段经手方串联
fn chain_flow(dataset: &NormalizedDataset) -> Vec<FlowEdge> {
    let value = dataset
        .records
        .first()
        .and_then(|r| r.quantity_cartons)
        .map(|c| c as f64)
        .unwrap_or(1.0);
    let labels: Vec<&str> = dataset
        .chain
        .iter()
        .map(|s| s.name.as_deref().unwrap_or(s.stage.as_str()))
        .collect();

    let mut edges = EdgeAccumulator::default();
    for pair in labels.windows(2) {
        edges.add(pair[0], pair[1], value);
    }
    edges.into_edges()
}

fn batch_hierarchy(records: &[BatchRecord]) -> Vec<HierarchyEntry> {
    let mut farm_totals: Vec<(String, f64)> = Vec::new();
    let mut batches = Vec::new();

    for record in records {
        let farm = record.farm_name.clone().unwrap_or_else(|| UNKNOWN_FARM.to_string());
        let value = record.quantity_cartons.unwrap_or(0) as f64;
        match farm_totals.iter_mut().find(|(name, _)| *name == farm) {
            Some((_, total)) => *total += value,
            None => farm_totals.push((farm.clone(), value)),
        }
        batches.push(HierarchyEntry {
            label: record.batch_id.clone(),
            parent: farm,
            value,
        });
    }

    let mut entries: Vec<HierarchyEntry> = farm_totals
        .into_iter()
        .map(|(label, value)| HierarchyEntry {
            label,
            parent: String::new(),
            value,
        })
        .collect();
    entries.extend(batches);
    entries
}

/// 相同 (source, target) 累加,保留首次出现顺序
#[derive(Default)]
struct EdgeAccumulator {
    edges: Vec<FlowEdge>,
}

impl EdgeAccumulator {
    fn add(&mut self, source: &str, target: &str, value: f64) {
        match self
            .edges
            .iter_mut()
            .find(|e| e.source == source && e.target == target)
        {
            Some(edge) => edge.value += value,
            None => self.edges.push(FlowEdge {
                source: source.to_string(),
                target: target.to_string(),
                value,
            }),
        }
    }

    fn into_edges(self) -> Vec<FlowEdge> {
        self.edges
    }
}
