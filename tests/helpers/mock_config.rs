// ==========================================
// Mock 配置实现 - 用于集成测试
// ==========================================

use async_trait::async_trait;
use egg_trace::config::{ConfigResult, PipelineConfig, PipelineConfigReader};

/// 内存配置读取器（不访问数据库）
#[derive(Debug, Clone)]
pub struct MockConfig {
    pub config: PipelineConfig,
}

impl MockConfig {
    /// 默认策略配置
    pub fn default_policy() -> Self {
        Self {
            config: PipelineConfig::default(),
        }
    }

    /// 自定义温度区间
    pub fn with_temperature_range(min: f64, max: f64) -> Self {
        let mut mock = Self::default_policy();
        mock.config.compliance.temp_min_c = min;
        mock.config.compliance.temp_max_c = max;
        mock
    }

    /// 报告语言
    pub fn with_locale(locale: &str) -> Self {
        let mut mock = Self::default_policy();
        mock.config.report_locale = locale.to_string();
        mock
    }
}

#[async_trait]
impl PipelineConfigReader for MockConfig {
    async fn load_pipeline_config(&self) -> ConfigResult<PipelineConfig> {
        Ok(self.config.clone())
    }
}
