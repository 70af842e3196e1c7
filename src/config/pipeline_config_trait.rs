// ==========================================
// 蛋品冷链溯源分析系统 - 配置读取 Trait
// ==========================================
// 职责: 定义流水线所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::config::error::ConfigResult;
use crate::config::pipeline_config::PipelineConfig;
use async_trait::async_trait;

// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait PipelineConfigReader: Send + Sync {
    /// 读取完整流水线配置（默认值 + 已保存的覆写）
    ///
    /// # 说明
    /// - 返回的配置不含 API 凭证,由调用方按次注入
    async fn load_pipeline_config(&self) -> ConfigResult<PipelineConfig>;
}
