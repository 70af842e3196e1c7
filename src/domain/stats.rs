// ==========================================
// 蛋品冷链溯源分析系统 - 统计汇总与图表数据
// ==========================================
// 图表绘制由展示层负责,这里只提供结构化序列
// ==========================================

use crate::domain::types::{Stage, ViolationKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// 数值字段描述统计
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericSummary {
    pub count: usize,
    pub mean: f64,
    /// 样本标准差（n-1）；单个样本为 0
    pub stddev: f64,
    pub min: f64,
    pub max: f64,
}

// ==========================================
// 数据集概览 KPI
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetOverview {
    pub batches: usize,
    pub total_cartons: u64,
    /// 箱数合计溢出,total_cartons 为 u64::MAX
    #[serde(default)]
    pub cartons_saturated: bool,
    pub distinct_farms: usize,
    pub distinct_retailers: usize,
}

// ==========================================
// 经手方对比
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityDimension {
    Farm,
    Distributor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityKpi {
    pub dimension: EntityDimension,
    pub name: String,
    pub record_count: usize,
    pub total_cartons: u64,
    pub violation_count: usize,
    pub excursion_count: usize,
    pub mean_temperature: Option<f64>,
    pub mean_lay_to_pack_hours: Option<f64>,
}

// ==========================================
// 阶段间时长
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageDelta {
    pub batch_id: String,
    pub from: Stage,
    pub to: Stage,
    pub hours: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageDeltaSummary {
    pub from: Stage,
    pub to: Stage,
    pub count: usize,
    pub mean_hours: f64,
    pub max_hours: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViolationCount {
    pub kind: ViolationKind,
    pub count: usize,
}

// ==========================================
// 结构不足时的原始计数
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawCounts {
    /// array / object / scalar / null
    pub top_level: String,
    pub element_count: usize,
    pub key_count: usize,
}

// ==========================================
// AggregateStats - 统计汇总
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateStats {
    pub total_records: usize,
    pub overview: DatasetOverview,
    pub temperature: Option<NumericSummary>,
    pub cartons: Option<NumericSummary>,
    pub violation_counts: Vec<ViolationCount>,
    pub entity_comparisons: Vec<EntityKpi>,
    pub stage_deltas: Vec<StageDelta>,
    pub stage_delta_summary: Vec<StageDeltaSummary>,
    /// 仅 unknown 形态
    pub raw_counts: Option<RawCounts>,
}

impl AggregateStats {
    pub fn violation_count(&self, kind: ViolationKind) -> usize {
        self.violation_counts
            .iter()
            .find(|c| c.kind == kind)
            .map(|c| c.count)
            .unwrap_or(0)
    }
}

// ==========================================
// 图表序列
// ==========================================

/// 趋势图点 (timestamp, value, group_label)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    pub group: String,
}

/// 流向边 (source, target, value)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowEdge {
    pub source: String,
    pub target: String,
    pub value: f64,
}

/// 层级图条目（parent 为空字符串表示根）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HierarchyEntry {
    pub label: String,
    pub parent: String,
    pub value: f64,
}

/// 批次旅程时间线
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub batch_id: String,
    pub stage: Stage,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
    pub trend: Vec<TrendPoint>,
    pub flow: Vec<FlowEdge>,
    pub hierarchy: Vec<HierarchyEntry>,
    pub timeline: Vec<TimelineEntry>,
}
