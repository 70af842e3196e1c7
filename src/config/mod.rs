// ==========================================
// 蛋品冷链溯源分析系统 - 配置层
// ==========================================
// 职责: 流水线配置定义与覆写管理
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod error;
pub mod pipeline_config;
pub mod pipeline_config_trait;

pub use config_manager::ConfigManager;
pub use error::{ConfigError, ConfigResult};
pub use pipeline_config::{
    config_keys, ComplianceThresholds, NarrativeConfig, PipelineConfig, ProviderKind,
    RiskScoringConfig, SUPPORTED_LOCALES,
};
pub use pipeline_config_trait::PipelineConfigReader;
