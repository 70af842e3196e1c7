// ==========================================
// 蛋品冷链溯源分析系统 - 数据集形态检测
// ==========================================
// 规则（按顺序,首个命中即返回）:
// (a) 非空对象数组,且每个对象含 batch_id（任一别名）→ batch_list
// (b) 对象中存在某个键,其值为阶段描述（含 stage 键）的非空数组 → hierarchical_chain
// (c) 对象同时含 nodes 数组与 links 数组 → flow_graph
// (d) 其他 → unknown
// 红线: 全函数,任何输入都不报错
// ==========================================

use crate::domain::batch::Dataset;
use crate::domain::types::DatasetShape;
use crate::importer::field_alias::{CanonicalField, FieldAliasTable};
use serde_json::Value;
use tracing::debug;

pub struct SchemaDetector<'a> {
    aliases: &'a FieldAliasTable,
}

impl<'a> SchemaDetector<'a> {
    pub fn new(aliases: &'a FieldAliasTable) -> Self {
        Self { aliases }
    }

    /// 检测形态并封装为 Dataset
    pub fn detect_dataset(&self, raw: Value) -> Dataset {
        let shape = self.detect(&raw);
        Dataset::new(shape, raw)
    }

    pub fn detect(&self, raw: &Value) -> DatasetShape {
        let shape = if self.is_batch_list(raw) {
            DatasetShape::BatchList
        } else if self.chain_key(raw).is_some() {
            DatasetShape::HierarchicalChain
        } else if is_flow_graph(raw) {
            DatasetShape::FlowGraph
        } else {
            DatasetShape::Unknown
        };

        debug!(shape = %shape, "数据集形态检测完成");
        shape
    }

    fn is_batch_list(&self, raw: &Value) -> bool {
        match raw {
            Value::Array(items) if !items.is_empty() => items.iter().all(|item| {
                item.as_object()
                    .map(|obj| self.aliases.has_column(obj, CanonicalField::BatchId))
                    .unwrap_or(false)
            }),
            _ => false,
        }
    }

    /// 层级链所在的键（按键序取第一个）
    pub fn chain_key<'v>(&self, raw: &'v Value) -> Option<&'v str> {
        let obj = raw.as_object()?;
        obj.iter()
            .find(|(_, v)| is_stage_sequence(v))
            .map(|(k, _)| k.as_str())
    }
}

fn is_stage_descriptor(value: &Value) -> bool {
    value
        .as_object()
        .map(|obj| obj.keys().any(|k| k.trim().eq_ignore_ascii_case("stage")))
        .unwrap_or(false)
}

fn is_stage_sequence(value: &Value) -> bool {
    match value {
        Value::Array(items) => !items.is_empty() && items.iter().all(is_stage_descriptor),
        _ => false,
    }
}

fn is_flow_graph(raw: &Value) -> bool {
    match raw.as_object() {
        Some(obj) => {
            obj.get("nodes").map(Value::is_array).unwrap_or(false)
                && obj.get("links").map(Value::is_array).unwrap_or(false)
        }
        None => false,
    }
}
