// ==========================================
// 测试数据构建器 - 用于集成测试
// ==========================================

use chrono::{DateTime, TimeZone, Utc};
use egg_trace::domain::batch::{BatchRecord, NormalizedDataset, TemperatureReading};
use egg_trace::domain::types::{DatasetShape, Stage};
use serde_json::{json, Map, Value};

/// UTC 时间简写
pub fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, 0).unwrap()
}

// ==========================================
// BatchRecord 构建器
// ==========================================

pub struct BatchBuilder {
    record: BatchRecord,
}

impl BatchBuilder {
    pub fn new(batch_id: &str) -> Self {
        Self {
            record: BatchRecord::new(batch_id),
        }
    }

    pub fn farm(mut self, name: &str) -> Self {
        self.record.farm_name = Some(name.to_string());
        self
    }

    pub fn packer(mut self, name: &str) -> Self {
        self.record.packing_facility = Some(name.to_string());
        self
    }

    pub fn distributor(mut self, name: &str) -> Self {
        self.record.distributor = Some(name.to_string());
        self
    }

    pub fn retailer(mut self, name: &str) -> Self {
        self.record.retailer = Some(name.to_string());
        self
    }

    pub fn stage(mut self, stage: Stage, ts: DateTime<Utc>) -> Self {
        self.record.set_stage_date(stage, Some(ts));
        self
    }

    pub fn reading(mut self, ts: DateTime<Utc>, celsius: f64) -> Self {
        self.record
            .temperature_readings
            .push(TemperatureReading::at(ts, celsius));
        self
    }

    pub fn single_temperature(mut self, celsius: f64) -> Self {
        self.record
            .temperature_readings
            .push(TemperatureReading::representative(celsius));
        self
    }

    pub fn cartons(mut self, cartons: u64) -> Self {
        self.record.quantity_cartons = Some(cartons);
        self
    }

    pub fn build(self) -> BatchRecord {
        self.record
    }
}

/// batch_list 规范化数据集
pub fn batch_dataset(records: Vec<BatchRecord>, expected: &[Stage]) -> NormalizedDataset {
    let mut dataset = NormalizedDataset::empty(DatasetShape::BatchList);
    dataset.records = records;
    dataset.expected_stages = expected.to_vec();
    dataset
}

// ==========================================
// 原始 JSON 构建器
// ==========================================

/// 批次行（原始列名）
pub struct RawRowBuilder {
    row: Map<String, Value>,
}

impl RawRowBuilder {
    pub fn new(batch_id: &str) -> Self {
        let mut row = Map::new();
        row.insert("batch_id".to_string(), json!(batch_id));
        Self { row }
    }

    pub fn field(mut self, key: &str, value: Value) -> Self {
        self.row.insert(key.to_string(), value);
        self
    }

    pub fn build(self) -> Value {
        Value::Object(self.row)
    }
}

/// 层级链样例（整条链合规）
pub fn sample_chain() -> Value {
    json!({
        "batch_id": "CH-01",
        "quantity_cartons": 200,
        "traceability_chain": [
            {"stage": "Laying", "name": "Sunrise Farm", "timestamp": "2025-11-01T06:00:00Z", "temperature": 5.0},
            {"stage": "Packing", "name": "Valley Packers", "timestamp": "2025-11-01T18:00:00Z", "temperature": 4.0},
            {"stage": "Distribution", "name": "ColdLink", "timestamp": "2025-11-02T06:00:00Z", "temperature": 4.5},
            {"stage": "Delivery", "name": "FreshMart", "timestamp": "2025-11-03T06:00:00Z", "temperature": 5.5}
        ]
    })
}

/// 流向图样例
pub fn sample_flow_graph() -> Value {
    json!({
        "nodes": [
            {"id": "farm", "label": "Sunrise Farm"},
            {"id": "packer", "label": "Valley Packers"},
            {"id": "store", "label": "FreshMart"}
        ],
        "links": [
            {"source": "farm", "target": "packer", "value": 120},
            {"source": 1, "target": 2, "value": 100}
        ]
    })
}
