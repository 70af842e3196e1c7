// ==========================================
// 蛋品冷链溯源分析系统 - 批次与数据集实体
// ==========================================
// 职责: 原始数据集 / 规范化批次记录 / 流向图
// ==========================================

use crate::domain::types::{DatasetShape, Stage};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ==========================================
// Dataset - 原始数据集（附带检测形态）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub shape: DatasetShape,
    pub raw: Value,
}

impl Dataset {
    pub fn new(shape: DatasetShape, raw: Value) -> Self {
        Self { shape, raw }
    }
}

// ==========================================
// TemperatureReading - 温度读数
// ==========================================
// 无时间戳表示单一代表值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemperatureReading {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    pub celsius: f64,
}

impl TemperatureReading {
    pub fn at(timestamp: DateTime<Utc>, celsius: f64) -> Self {
        Self {
            timestamp: Some(timestamp),
            celsius,
        }
    }

    pub fn representative(celsius: f64) -> Self {
        Self {
            timestamp: None,
            celsius,
        }
    }
}

// ==========================================
// BatchRecord - 溯源批次记录（规范化后）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRecord {
    pub batch_id: String,

    // 经手方
    pub farm_name: Option<String>,
    pub farm_location: Option<String>,
    pub packing_facility: Option<String>,
    pub distributor: Option<String>,
    pub retailer: Option<String>,

    // 阶段时间
    pub laying_date: Option<DateTime<Utc>>,
    pub packing_date: Option<DateTime<Utc>>,
    pub distribution_date: Option<DateTime<Utc>>,
    pub delivery_date: Option<DateTime<Utc>>,

    // 冷链温度（按时间排序）
    pub temperature_readings: Vec<TemperatureReading>,

    pub quantity_cartons: Option<u64>,
}

impl BatchRecord {
    pub fn new(batch_id: impl Into<String>) -> Self {
        Self {
            batch_id: batch_id.into(),
            farm_name: None,
            farm_location: None,
            packing_facility: None,
            distributor: None,
            retailer: None,
            laying_date: None,
            packing_date: None,
            distribution_date: None,
            delivery_date: None,
            temperature_readings: Vec::new(),
            quantity_cartons: None,
        }
    }

    pub fn stage_date(&self, stage: Stage) -> Option<DateTime<Utc>> {
        match stage {
            Stage::Laying => self.laying_date,
            Stage::Packing => self.packing_date,
            Stage::Distribution => self.distribution_date,
            Stage::Delivery => self.delivery_date,
        }
    }

    pub fn set_stage_date(&mut self, stage: Stage, value: Option<DateTime<Utc>>) {
        match stage {
            Stage::Laying => self.laying_date = value,
            Stage::Packing => self.packing_date = value,
            Stage::Distribution => self.distribution_date = value,
            Stage::Delivery => self.delivery_date = value,
        }
    }

    /// 两阶段之间的时长（小时），任一端缺失返回 None
    pub fn hours_between(&self, from: Stage, to: Stage) -> Option<f64> {
        let start = self.stage_date(from)?;
        let end = self.stage_date(to)?;
        Some((end - start).num_seconds() as f64 / 3600.0)
    }
}

// ==========================================
// 层级阶段链描述
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainStage {
    pub stage: String,
    pub name: Option<String>,
    /// 映射到的标准阶段（无法识别时为 None）
    pub canonical: Option<Stage>,
    pub timestamp: Option<DateTime<Utc>>,
    pub temperature: Option<f64>,
}

// ==========================================
// 流向图
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowNode {
    pub id: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowLink {
    pub source: String,
    pub target: String,
    pub value: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowGraph {
    pub nodes: Vec<FlowNode>,
    pub links: Vec<FlowLink>,
}

impl FlowGraph {
    pub fn label_of(&self, id: &str) -> String {
        self.nodes
            .iter()
            .find(|n| n.id == id)
            .map(|n| n.label.clone())
            .unwrap_or_else(|| id.to_string())
    }
}

// ==========================================
// NormalizedDataset - 规范化数据集
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedDataset {
    pub shape: DatasetShape,
    pub records: Vec<BatchRecord>,
    /// 按数据集形态应当存在的阶段时间
    pub expected_stages: Vec<Stage>,
    /// 层级链原始阶段（仅 hierarchical_chain）
    pub chain: Vec<ChainStage>,
    /// 流向图（仅 flow_graph）
    pub flow_graph: Option<FlowGraph>,
    /// 无法识别结构时原样保留（仅 unknown）
    pub unstructured: Option<Value>,
}

impl NormalizedDataset {
    pub fn empty(shape: DatasetShape) -> Self {
        Self {
            shape,
            records: Vec::new(),
            expected_stages: Vec::new(),
            chain: Vec::new(),
            flow_graph: None,
            unstructured: None,
        }
    }

    pub fn find_record(&self, batch_id: &str) -> Option<&BatchRecord> {
        self.records.iter().find(|r| r.batch_id == batch_id)
    }
}
