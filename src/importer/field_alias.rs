// ==========================================
// 蛋品冷链溯源分析系统 - 字段别名表
// ==========================================
// 职责: 源列名 → 标准字段（显式、可测试的别名表）
// 说明: 源数据可能使用英文或本地化列名（繁/简中文）
// ==========================================

use crate::domain::types::Stage;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

// ==========================================
// 标准字段
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalField {
    BatchId,
    FarmName,
    FarmLocation,
    PackingFacility,
    LayingDate,
    PackingDate,
    DistributionDate,
    DeliveryDate,
    Temperature,
    QuantityCartons,
    Distributor,
    Retailer,
}

impl CanonicalField {
    pub const ALL: [CanonicalField; 12] = [
        CanonicalField::BatchId,
        CanonicalField::FarmName,
        CanonicalField::FarmLocation,
        CanonicalField::PackingFacility,
        CanonicalField::LayingDate,
        CanonicalField::PackingDate,
        CanonicalField::DistributionDate,
        CanonicalField::DeliveryDate,
        CanonicalField::Temperature,
        CanonicalField::QuantityCartons,
        CanonicalField::Distributor,
        CanonicalField::Retailer,
    ];

    /// 规范化输出使用的字段名
    pub fn canonical_name(&self) -> &'static str {
        match self {
            CanonicalField::BatchId => "batch_id",
            CanonicalField::FarmName => "farm_name",
            CanonicalField::FarmLocation => "farm_location",
            CanonicalField::PackingFacility => "packing_facility",
            CanonicalField::LayingDate => "laying_date",
            CanonicalField::PackingDate => "packing_date",
            CanonicalField::DistributionDate => "distribution_date",
            CanonicalField::DeliveryDate => "delivery_date",
            CanonicalField::Temperature => "temperature_readings",
            CanonicalField::QuantityCartons => "quantity_cartons",
            CanonicalField::Distributor => "distributor",
            CanonicalField::Retailer => "retailer",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let key = normalize_key(name);
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.canonical_name() == key)
    }

    pub fn for_stage(stage: Stage) -> Self {
        match stage {
            Stage::Laying => CanonicalField::LayingDate,
            Stage::Packing => CanonicalField::PackingDate,
            Stage::Distribution => CanonicalField::DistributionDate,
            Stage::Delivery => CanonicalField::DeliveryDate,
        }
    }
}

fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase()
}

fn owned(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

// ==========================================
// FieldAliasTable - 别名表
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct FieldAliasTable {
    aliases: BTreeMap<CanonicalField, Vec<String>>,
    /// 温度列子串标记（列名包含即视为温度候选）
    temperature_markers: Vec<String>,
    /// 层级链阶段名子串标记
    stage_markers: BTreeMap<Stage, Vec<String>>,
}

impl Default for FieldAliasTable {
    fn default() -> Self {
        let mut aliases = BTreeMap::new();
        aliases.insert(
            CanonicalField::BatchId,
            owned(&["batch_id", "batch", "batchid", "batch_no", "lot_id", "lot", "批次", "批次編號", "批次编号", "批號"]),
        );
        aliases.insert(
            CanonicalField::FarmName,
            owned(&["farm_name", "farm", "農場", "农场", "農場名稱"]),
        );
        aliases.insert(
            CanonicalField::FarmLocation,
            owned(&["farm_location", "location", "origin", "產地", "产地", "農場地點"]),
        );
        aliases.insert(
            CanonicalField::PackingFacility,
            owned(&["packing_facility", "packer", "packing_plant", "包裝廠", "洗選場"]),
        );
        aliases.insert(
            CanonicalField::LayingDate,
            owned(&["laying_date", "lay_date", "laid_at", "產蛋日期", "产蛋日期"]),
        );
        aliases.insert(
            CanonicalField::PackingDate,
            owned(&["packing_date", "pack_date", "packed_at", "包裝日期", "包装日期"]),
        );
        aliases.insert(
            CanonicalField::DistributionDate,
            owned(&["distribution_date", "ship_date", "shipped_at", "出貨日期", "出货日期"]),
        );
        aliases.insert(
            CanonicalField::DeliveryDate,
            owned(&["delivery_date", "delivered_at", "配送日期", "到貨日期"]),
        );
        aliases.insert(
            CanonicalField::Temperature,
            owned(&["temperature_readings", "temperature", "temperatures", "temp", "temp_c", "溫度", "温度"]),
        );
        aliases.insert(
            CanonicalField::QuantityCartons,
            owned(&["quantity_cartons", "cartons", "quantity", "qty", "箱數", "箱数"]),
        );
        aliases.insert(
            CanonicalField::Distributor,
            owned(&["distributor", "經銷商", "经销商", "物流商"]),
        );
        aliases.insert(
            CanonicalField::Retailer,
            owned(&["retailer", "store", "零售商", "通路"]),
        );

        let mut stage_markers = BTreeMap::new();
        stage_markers.insert(
            Stage::Laying,
            owned(&["laying", "lay", "farm", "hen", "產蛋", "产蛋", "農場"]),
        );
        stage_markers.insert(
            Stage::Packing,
            owned(&["packing", "pack", "grading", "wash", "包裝", "包装", "洗選"]),
        );
        stage_markers.insert(
            Stage::Distribution,
            owned(&["distribution", "distribut", "transport", "ship", "logistics", "出貨", "運輸", "物流"]),
        );
        stage_markers.insert(
            Stage::Delivery,
            owned(&["delivery", "deliver", "retail", "store", "配送", "零售", "到貨"]),
        );

        Self {
            aliases,
            temperature_markers: owned(&["temp", "溫度", "温度"]),
            stage_markers,
        }
    }
}

impl FieldAliasTable {
    /// 替换某字段的别名列表（标准字段名始终保留在首位）
    pub fn set_aliases(&mut self, field: CanonicalField, aliases: Vec<String>) {
        let mut list = vec![field.canonical_name().to_string()];
        for alias in aliases {
            let key = normalize_key(&alias);
            if !key.is_empty() && !list.contains(&key) {
                list.push(key);
            }
        }
        self.aliases.insert(field, list);
    }

    pub fn set_temperature_markers(&mut self, markers: Vec<String>) {
        self.temperature_markers = markers
            .into_iter()
            .map(|m| normalize_key(&m))
            .filter(|m| !m.is_empty())
            .collect();
    }

    pub fn aliases_of(&self, field: CanonicalField) -> &[String] {
        self.aliases.get(&field).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// 列名是否精确命中该字段的某个别名（忽略大小写与首尾空白）
    pub fn matches(&self, field: CanonicalField, column: &str) -> bool {
        let key = normalize_key(column);
        key == field.canonical_name()
            || self
                .aliases_of(field)
                .iter()
                .any(|alias| normalize_key(alias) == key)
    }

    /// 列名 → 标准字段（精确匹配）
    pub fn resolve(&self, column: &str) -> Option<CanonicalField> {
        CanonicalField::ALL
            .iter()
            .copied()
            .find(|f| self.matches(*f, column))
    }

    /// 温度候选列判定：精确别名命中,或包含温度标记且不是其他标准字段
    pub fn is_temperature_column(&self, column: &str) -> bool {
        match self.resolve(column) {
            Some(CanonicalField::Temperature) => true,
            Some(_) => false,
            None => {
                let key = normalize_key(column);
                self.temperature_markers
                    .iter()
                    .any(|marker| key.contains(marker.as_str()))
            }
        }
    }

    /// 对象中的温度候选列（按列序）
    pub fn temperature_columns<'a>(&self, row: &'a Map<String, Value>) -> Vec<&'a str> {
        row.keys()
            .filter(|k| self.is_temperature_column(k))
            .map(|k| k.as_str())
            .collect()
    }

    /// 对象是否携带该字段的列（值可以为空）
    pub fn has_column(&self, row: &Map<String, Value>, field: CanonicalField) -> bool {
        row.keys().any(|k| self.matches(field, k))
    }

    /// 按列序取第一个非空值
    pub fn find_value<'a>(
        &self,
        row: &'a Map<String, Value>,
        field: CanonicalField,
    ) -> Option<(&'a str, &'a Value)> {
        row.iter()
            .filter(|(k, _)| self.matches(field, k))
            .find(|(_, v)| !is_blank(v))
            .map(|(k, v)| (k.as_str(), v))
    }

    /// 阶段名 → 标准阶段（子串匹配,按阶段顺序取第一个命中）
    pub fn stage_for(&self, name: &str) -> Option<Stage> {
        let key = normalize_key(name);
        if key.is_empty() {
            return None;
        }
        if let Some(stage) = Stage::ALL.iter().find(|s| s.to_string() == key) {
            return Some(*stage);
        }
        Stage::ALL.iter().copied().find(|stage| {
            self.stage_markers
                .get(stage)
                .map(|markers| markers.iter().any(|m| key.contains(m.as_str())))
                .unwrap_or(false)
        })
    }
}

/// 空值判定：null / 空白字符串
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_resolve_english_and_localized() {
        let table = FieldAliasTable::default();
        assert_eq!(table.resolve("Batch_ID"), Some(CanonicalField::BatchId));
        assert_eq!(table.resolve("  產蛋日期 "), Some(CanonicalField::LayingDate));
        assert_eq!(table.resolve("出货日期"), Some(CanonicalField::DistributionDate));
        assert_eq!(table.resolve("箱數"), Some(CanonicalField::QuantityCartons));
        assert_eq!(table.resolve("unrelated"), None);
    }

    #[test]
    fn test_temperature_substring_detection() {
        let table = FieldAliasTable::default();
        assert!(table.is_temperature_column("Transport Temp (°C)"));
        assert!(table.is_temperature_column("冷藏溫度"));
        assert!(!table.is_temperature_column("timestamp"));
        assert!(!table.is_temperature_column("farm_name"));
    }

    #[test]
    fn test_temperature_columns_keep_column_order() {
        let table = FieldAliasTable::default();
        let r = row(json!({
            "batch_id": "B001",
            "storage_temp": 4.0,
            "truck_temp": 9.0
        }));
        assert_eq!(table.temperature_columns(&r), vec!["storage_temp", "truck_temp"]);
    }

    #[test]
    fn test_find_value_skips_blank() {
        let table = FieldAliasTable::default();
        let r = row(json!({"farm": "  ", "farm_name": "Sunrise"}));
        let (key, value) = table.find_value(&r, CanonicalField::FarmName).unwrap();
        assert_eq!(key, "farm_name");
        assert_eq!(value, &json!("Sunrise"));
        assert!(table.has_column(&r, CanonicalField::FarmName));
        assert!(!table.has_column(&r, CanonicalField::Retailer));
    }

    #[test]
    fn test_set_aliases_keeps_canonical_name() {
        let mut table = FieldAliasTable::default();
        table.set_aliases(CanonicalField::Retailer, vec!["Shop".to_string()]);
        assert!(table.matches(CanonicalField::Retailer, "retailer"));
        assert!(table.matches(CanonicalField::Retailer, "shop"));
        assert!(!table.matches(CanonicalField::Retailer, "store"));
    }

    #[test]
    fn test_stage_for() {
        let table = FieldAliasTable::default();
        assert_eq!(table.stage_for("Laying"), Some(Stage::Laying));
        assert_eq!(table.stage_for("Farm"), Some(Stage::Laying));
        assert_eq!(table.stage_for("洗選包裝"), Some(Stage::Packing));
        assert_eq!(table.stage_for("Distribution Center"), Some(Stage::Distribution));
        assert_eq!(table.stage_for("Retail Store"), Some(Stage::Delivery));
        assert_eq!(table.stage_for("QA"), None);
    }
}
