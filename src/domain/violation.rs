// ==========================================
// 蛋品冷链溯源分析系统 - 违规与数据质量发现
// ==========================================
// Violation: 合规违规（参与风险评分）
// Finding:   数据质量/结构提示（不阻断流程,不参与评分）
// ==========================================

use crate::domain::types::ViolationKind;
use serde::{Deserialize, Serialize};

// ==========================================
// Violation - 合规违规
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub batch_id: String,
    pub kind: ViolationKind,
    pub detail: String,
    pub severity_weight: f64,
    /// 所属记录在数据集中的位置（批次号可重复）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_index: Option<usize>,
}

impl Violation {
    /// 按类型默认权重构造
    pub fn new(batch_id: impl Into<String>, kind: ViolationKind, detail: impl Into<String>) -> Self {
        Self {
            batch_id: batch_id.into(),
            kind,
            detail: detail.into(),
            severity_weight: kind.severity_weight(),
            record_index: None,
        }
    }

    pub fn at_record(mut self, index: usize) -> Self {
        self.record_index = Some(index);
        self
    }
}

// ==========================================
// Finding - 非阻断提示
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    SchemaAmbiguity,            // 结构无法识别,降级为 unknown
    FieldParse,                 // 单字段无法解析,记为缺失
    AmbiguousTemperatureColumn, // 多个温度列,按列序取第一个
    DuplicateBatchId,           // 批次号重复
    StageOrderInversion,        // 阶段时间倒序
    InsufficientStructure,      // 结构不足,评估降级
    ProviderUnavailable,        // 报告生成服务不可用,使用本地报告
    ValueOverflow,              // 汇总超出上限,按上限截断
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub kind: FindingKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub message: String,
}

impl Finding {
    pub fn new(kind: FindingKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            batch_id: None,
            field: None,
            message: message.into(),
        }
    }

    pub fn for_batch(mut self, batch_id: impl Into<String>) -> Self {
        self.batch_id = Some(batch_id.into());
        self
    }

    pub fn on_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }
}
