// ==========================================
// 蛋品冷链溯源分析系统 - 领域类型定义
// ==========================================
// 数据集形态 / 供应链阶段 / 违规类型 / 风险等级 / 流水线状态
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 数据集形态 (Dataset Shape)
// ==========================================
// 检测后不可变,决定下游各阶段是否适用
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetShape {
    BatchList,         // 扁平批次列表
    HierarchicalChain, // 层级阶段链
    FlowGraph,         // 节点/连线流向图
    Unknown,           // 结构不足
}

impl DatasetShape {
    /// 该形态是否能产出批次记录（合规评估与风险评分的前提）
    pub fn yields_batch_records(&self) -> bool {
        matches!(self, DatasetShape::BatchList | DatasetShape::HierarchicalChain)
    }
}

impl fmt::Display for DatasetShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetShape::BatchList => write!(f, "batch_list"),
            DatasetShape::HierarchicalChain => write!(f, "hierarchical_chain"),
            DatasetShape::FlowGraph => write!(f, "flow_graph"),
            DatasetShape::Unknown => write!(f, "unknown"),
        }
    }
}

// ==========================================
// 供应链阶段 (Stage)
// ==========================================
// 顺序: 产蛋 → 包装 → 出货 → 配送
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Laying,
    Packing,
    Distribution,
    Delivery,
}

impl Stage {
    pub const ALL: [Stage; 4] = [
        Stage::Laying,
        Stage::Packing,
        Stage::Distribution,
        Stage::Delivery,
    ];

    /// 标准字段名（规范化输出使用）
    pub fn date_field(&self) -> &'static str {
        match self {
            Stage::Laying => "laying_date",
            Stage::Packing => "packing_date",
            Stage::Distribution => "distribution_date",
            Stage::Delivery => "delivery_date",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Laying => write!(f, "laying"),
            Stage::Packing => write!(f, "packing"),
            Stage::Distribution => write!(f, "distribution"),
            Stage::Delivery => write!(f, "delivery"),
        }
    }
}

// ==========================================
// 违规类型 (Violation Kind)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    TemperatureExcursion, // 温度超限
    StageDurationOverrun, // 阶段时长超限
    ColdChainBreak,       // 冷链中断
    MissingHandlerData,   // 经手数据缺失
}

impl ViolationKind {
    pub const ALL: [ViolationKind; 4] = [
        ViolationKind::TemperatureExcursion,
        ViolationKind::StageDurationOverrun,
        ViolationKind::ColdChainBreak,
        ViolationKind::MissingHandlerData,
    ];

    /// 严重度权重（风险评分使用）
    pub fn severity_weight(&self) -> f64 {
        match self {
            ViolationKind::TemperatureExcursion => 1.0,
            ViolationKind::StageDurationOverrun => 1.0,
            ViolationKind::ColdChainBreak => 1.5,
            ViolationKind::MissingHandlerData => 0.5,
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViolationKind::TemperatureExcursion => write!(f, "temperature_excursion"),
            ViolationKind::StageDurationOverrun => write!(f, "stage_duration_overrun"),
            ViolationKind::ColdChainBreak => write!(f, "cold_chain_break"),
            ViolationKind::MissingHandlerData => write!(f, "missing_handler_data"),
        }
    }
}

// ==========================================
// 风险等级 (Risk Level)
// ==========================================
// 顺序: Low < Medium < High < Critical
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,      // 低
    Medium,   // 中
    High,     // 高
    Critical, // 紧急
}

impl RiskLevel {
    /// 分数 → 等级
    ///
    /// `<4 → Low, 4–<7 → Medium, 7–<9 → High, ≥9 → Critical`
    pub fn from_score(score: f64) -> Self {
        if score >= 9.0 {
            RiskLevel::Critical
        } else if score >= 7.0 {
            RiskLevel::High
        } else if score >= 4.0 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "low"),
            RiskLevel::Medium => write!(f, "medium"),
            RiskLevel::High => write!(f, "high"),
            RiskLevel::Critical => write!(f, "critical"),
        }
    }
}

// ==========================================
// 流水线状态 (Pipeline State)
// ==========================================
// Ingested → Normalized → Evaluated → Aggregated → Scored → Reported
//                                                        └→ ReportedFallback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Ingested,
    Normalized,
    Evaluated,
    Aggregated,
    Scored,
    Reported,
    ReportedFallback,
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Reported | PipelineState::ReportedFallback)
    }

    /// 合法的下一状态
    pub fn can_transition_to(&self, next: PipelineState) -> bool {
        use PipelineState::*;
        matches!(
            (self, next),
            (Ingested, Normalized)
                | (Normalized, Evaluated)
                | (Evaluated, Aggregated)
                | (Aggregated, Scored)
                | (Scored, Reported)
                | (Scored, ReportedFallback)
        )
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineState::Ingested => write!(f, "INGESTED"),
            PipelineState::Normalized => write!(f, "NORMALIZED"),
            PipelineState::Evaluated => write!(f, "EVALUATED"),
            PipelineState::Aggregated => write!(f, "AGGREGATED"),
            PipelineState::Scored => write!(f, "SCORED"),
            PipelineState::Reported => write!(f, "REPORTED"),
            PipelineState::ReportedFallback => write!(f, "REPORTED_FALLBACK"),
        }
    }
}
