// ==========================================
// 蛋品冷链溯源分析系统 - 流水线配置
// ==========================================
// 职责: 合规阈值 / 风险评分 / 字段别名 / 报告生成 的显式配置
// 红线: 不使用全局可变状态,配置按次显式传入编排器；
//       API 凭证只来自命令行或环境变量,不落库、不打日志
// ==========================================

use crate::config::error::{ConfigError, ConfigResult};
use crate::importer::field_alias::{CanonicalField, FieldAliasTable};
use crate::narrative::prompt::PromptTemplate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 合规阈值
    pub const TEMP_MIN_C: &str = "compliance.temp_min_c";
    pub const TEMP_MAX_C: &str = "compliance.temp_max_c";
    pub const MAX_LAY_TO_PACK_HOURS: &str = "compliance.max_lay_to_pack_hours";
    pub const MAX_SHELF_LIFE_DAYS: &str = "compliance.max_shelf_life_days";
    pub const MAX_COLD_BREAK_HOURS: &str = "compliance.max_cold_break_hours";

    // 风险评分
    pub const BASE_SCORE: &str = "scoring.base_score";
    pub const SCALE_FACTOR: &str = "scoring.scale_factor";

    // 报告生成
    pub const NARRATIVE_PROVIDER: &str = "narrative.provider";
    pub const NARRATIVE_MODEL: &str = "narrative.model";
    pub const NARRATIVE_BASE_URL: &str = "narrative.base_url";
    pub const NARRATIVE_MAX_OUTPUT_TOKENS: &str = "narrative.max_output_tokens";
    pub const NARRATIVE_TEMPERATURE: &str = "narrative.temperature";
    pub const NARRATIVE_TIMEOUT_SECS: &str = "narrative.timeout_secs";
    pub const NARRATIVE_PROMPT_CEILING_BYTES: &str = "narrative.prompt_ceiling_bytes";
    pub const NARRATIVE_TEMPLATE: &str = "narrative.template";

    // 报告语言
    pub const REPORT_LOCALE: &str = "report.locale";

    // 字段别名（aliases.<canonical_field> / aliases.temperature_markers）
    pub const ALIASES_PREFIX: &str = "aliases.";
    pub const TEMPERATURE_MARKERS: &str = "aliases.temperature_markers";

    // 禁止写入配置库的凭证键
    pub const FORBIDDEN_CREDENTIAL_KEYS: [&str; 2] = ["narrative.api_key", "api_key"];
}

pub const SUPPORTED_LOCALES: [&str; 2] = ["en", "zh-TW"];

// ==========================================
// ComplianceThresholds - 合规阈值
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceThresholds {
    pub temp_min_c: f64,
    pub temp_max_c: f64,
    pub max_lay_to_pack_hours: f64,
    pub max_shelf_life_days: f64,
    pub max_cold_break_hours: f64,
}

impl Default for ComplianceThresholds {
    fn default() -> Self {
        Self {
            temp_min_c: 2.0,
            temp_max_c: 8.0,
            max_lay_to_pack_hours: 24.0,
            max_shelf_life_days: 28.0,
            max_cold_break_hours: 2.0,
        }
    }
}

// ==========================================
// RiskScoringConfig - 风险评分参数
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskScoringConfig {
    pub base_score: f64,
    pub scale_factor: f64,
}

impl Default for RiskScoringConfig {
    fn default() -> Self {
        Self {
            base_score: 2.0,
            scale_factor: 1.5,
        }
    }
}

// ==========================================
// ProviderKind - 报告生成服务
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    OpenAi,
    Gemini,
    Xai,
    Groq,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::OpenAi,
        ProviderKind::Gemini,
        ProviderKind::Xai,
        ProviderKind::Groq,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Gemini => "gemini",
            ProviderKind::Xai => "xai",
            ProviderKind::Groq => "groq",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "gpt-4o-mini",
            ProviderKind::Gemini => "gemini-1.5-flash",
            ProviderKind::Xai => "grok-2-latest",
            ProviderKind::Groq => "llama-3.3-70b-versatile",
        }
    }

    /// 凭证所在环境变量
    pub fn api_key_env(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "OPENAI_API_KEY",
            ProviderKind::Gemini => "GEMINI_API_KEY",
            ProviderKind::Xai => "XAI_API_KEY",
            ProviderKind::Groq => "GROQ_API_KEY",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" | "chatgpt" => Ok(ProviderKind::OpenAi),
            "gemini" | "google" => Ok(ProviderKind::Gemini),
            "xai" | "grok" => Ok(ProviderKind::Xai),
            "groq" => Ok(ProviderKind::Groq),
            _ => Err(ConfigError::invalid(
                config_keys::NARRATIVE_PROVIDER,
                s,
                "可选值: openai / gemini / xai / groq / none",
            )),
        }
    }
}

// ==========================================
// NarrativeConfig - 报告生成配置
// ==========================================
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrativeConfig {
    pub provider: Option<ProviderKind>,
    #[serde(skip)]
    pub api_key: Option<String>,
    pub model: Option<String>,
    /// 覆盖服务端点（兼容网关 / 私有部署）
    pub base_url: Option<String>,
    pub max_output_tokens: u32,
    pub temperature: f32,
    pub timeout_secs: u64,
    pub prompt_ceiling_bytes: usize,
    pub template: PromptTemplate,
}

impl Default for NarrativeConfig {
    fn default() -> Self {
        Self {
            provider: None,
            api_key: None,
            model: None,
            base_url: None,
            max_output_tokens: 2048,
            temperature: 0.3,
            timeout_secs: 60,
            prompt_ceiling_bytes: 60_000,
            template: PromptTemplate::default(),
        }
    }
}

impl NarrativeConfig {
    /// 实际使用的模型名
    pub fn resolved_model(&self) -> Option<String> {
        match (&self.model, self.provider) {
            (Some(model), _) => Some(model.clone()),
            (None, Some(provider)) => Some(provider.default_model().to_string()),
            (None, None) => None,
        }
    }
}

// 凭证脱敏
impl fmt::Debug for NarrativeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NarrativeConfig")
            .field("provider", &self.provider)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("temperature", &self.temperature)
            .field("timeout_secs", &self.timeout_secs)
            .field("prompt_ceiling_bytes", &self.prompt_ceiling_bytes)
            .field("template", &self.template)
            .finish()
    }
}

// ==========================================
// PipelineConfig - 单次运行配置
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub compliance: ComplianceThresholds,
    pub scoring: RiskScoringConfig,
    pub aliases: FieldAliasTable,
    pub narrative: NarrativeConfig,
    pub report_locale: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            compliance: ComplianceThresholds::default(),
            scoring: RiskScoringConfig::default(),
            aliases: FieldAliasTable::default(),
            narrative: NarrativeConfig::default(),
            report_locale: "en".to_string(),
        }
    }
}

fn parse_f64(key: &str, value: &str) -> ConfigResult<f64> {
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ConfigError::invalid(key, value, "需要数值"))
}

fn parse_uint<T: FromStr>(key: &str, value: &str) -> ConfigResult<T> {
    value
        .parse::<T>()
        .map_err(|_| ConfigError::invalid(key, value, "需要非负整数"))
}

fn optional_text(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// 别名列表：JSON 数组或逗号分隔
fn parse_list(key: &str, value: &str) -> ConfigResult<Vec<String>> {
    if value.starts_with('[') {
        serde_json::from_str::<Vec<String>>(value)
            .map_err(|e| ConfigError::invalid(key, value, e.to_string()))
    } else {
        Ok(value
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect())
    }
}

impl PipelineConfig {
    /// 应用单个配置覆写
    pub fn apply_override(&mut self, key: &str, value: &str) -> ConfigResult<()> {
        use config_keys::*;

        let key = key.trim();
        let value = value.trim();

        if FORBIDDEN_CREDENTIAL_KEYS.contains(&key) {
            return Err(ConfigError::CredentialNotStorable(key.to_string()));
        }

        match key {
            TEMP_MIN_C => self.compliance.temp_min_c = parse_f64(key, value)?,
            TEMP_MAX_C => self.compliance.temp_max_c = parse_f64(key, value)?,
            MAX_LAY_TO_PACK_HOURS => self.compliance.max_lay_to_pack_hours = parse_f64(key, value)?,
            MAX_SHELF_LIFE_DAYS => self.compliance.max_shelf_life_days = parse_f64(key, value)?,
            MAX_COLD_BREAK_HOURS => self.compliance.max_cold_break_hours = parse_f64(key, value)?,
            BASE_SCORE => self.scoring.base_score = parse_f64(key, value)?,
            SCALE_FACTOR => self.scoring.scale_factor = parse_f64(key, value)?,
            NARRATIVE_PROVIDER => {
                self.narrative.provider = if value.is_empty() || value.eq_ignore_ascii_case("none") {
                    None
                } else {
                    Some(value.parse()?)
                }
            }
            NARRATIVE_MODEL => self.narrative.model = optional_text(value),
            NARRATIVE_BASE_URL => self.narrative.base_url = optional_text(value),
            NARRATIVE_MAX_OUTPUT_TOKENS => self.narrative.max_output_tokens = parse_uint(key, value)?,
            NARRATIVE_TEMPERATURE => self.narrative.temperature = parse_f64(key, value)? as f32,
            NARRATIVE_TIMEOUT_SECS => self.narrative.timeout_secs = parse_uint(key, value)?,
            NARRATIVE_PROMPT_CEILING_BYTES => {
                self.narrative.prompt_ceiling_bytes = parse_uint(key, value)?
            }
            NARRATIVE_TEMPLATE => {
                self.narrative.template = value
                    .parse()
                    .map_err(|reason: String| ConfigError::invalid(key, value, reason))?
            }
            REPORT_LOCALE => {
                if !SUPPORTED_LOCALES.contains(&value) {
                    return Err(ConfigError::invalid(key, value, "可选值: en / zh-TW"));
                }
                self.report_locale = value.to_string();
            }
            TEMPERATURE_MARKERS => self.aliases.set_temperature_markers(parse_list(key, value)?),
            other => match other.strip_prefix(ALIASES_PREFIX) {
                Some(field_name) => {
                    let field = CanonicalField::from_name(field_name)
                        .ok_or_else(|| ConfigError::UnknownKey(other.to_string()))?;
                    self.aliases.set_aliases(field, parse_list(key, value)?);
                }
                None => return Err(ConfigError::UnknownKey(other.to_string())),
            },
        }

        Ok(())
    }

    /// 校验配置一致性
    pub fn validate(&self) -> ConfigResult<()> {
        use config_keys::*;

        let c = &self.compliance;
        if c.temp_min_c >= c.temp_max_c {
            return Err(ConfigError::invalid(
                TEMP_MIN_C,
                &c.temp_min_c.to_string(),
                format!("必须小于 {}={}", TEMP_MAX_C, c.temp_max_c),
            ));
        }

        let positives = [
            (MAX_LAY_TO_PACK_HOURS, c.max_lay_to_pack_hours),
            (MAX_SHELF_LIFE_DAYS, c.max_shelf_life_days),
            (MAX_COLD_BREAK_HOURS, c.max_cold_break_hours),
        ];
        for (key, value) in positives {
            if value <= 0.0 {
                return Err(ConfigError::invalid(key, &value.to_string(), "必须大于 0"));
            }
        }

        if !(0.0..=10.0).contains(&self.scoring.base_score) {
            return Err(ConfigError::invalid(
                BASE_SCORE,
                &self.scoring.base_score.to_string(),
                "取值范围 [0, 10]",
            ));
        }
        if self.scoring.scale_factor < 0.0 {
            return Err(ConfigError::invalid(
                SCALE_FACTOR,
                &self.scoring.scale_factor.to_string(),
                "不能为负数",
            ));
        }

        let n = &self.narrative;
        if n.timeout_secs == 0 {
            return Err(ConfigError::invalid(NARRATIVE_TIMEOUT_SECS, "0", "必须大于 0"));
        }
        if n.prompt_ceiling_bytes == 0 {
            return Err(ConfigError::invalid(NARRATIVE_PROMPT_CEILING_BYTES, "0", "必须大于 0"));
        }
        if !(0.0..=2.0).contains(&n.temperature) {
            return Err(ConfigError::invalid(
                NARRATIVE_TEMPERATURE,
                &n.temperature.to_string(),
                "取值范围 [0, 2]",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.compliance.temp_min_c, 2.0);
        assert_eq!(config.compliance.temp_max_c, 8.0);
        assert_eq!(config.compliance.max_lay_to_pack_hours, 24.0);
        assert_eq!(config.scoring.base_score, 2.0);
        assert_eq!(config.narrative.prompt_ceiling_bytes, 60_000);
        assert!(config.narrative.provider.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_apply_override() {
        let mut config = PipelineConfig::default();
        config.apply_override(config_keys::TEMP_MAX_C, "7.5").unwrap();
        config.apply_override(config_keys::NARRATIVE_PROVIDER, "Grok").unwrap();
        config.apply_override(config_keys::REPORT_LOCALE, "zh-TW").unwrap();
        config
            .apply_override("aliases.retailer", r#"["Shop", "門市"]"#)
            .unwrap();

        assert_eq!(config.compliance.temp_max_c, 7.5);
        assert_eq!(config.narrative.provider, Some(ProviderKind::Xai));
        assert_eq!(config.narrative.resolved_model().as_deref(), Some("grok-2-latest"));
        assert_eq!(config.report_locale, "zh-TW");
        assert!(config.aliases.matches(CanonicalField::Retailer, "門市"));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = PipelineConfig::default();
        assert!(matches!(
            config.apply_override(config_keys::TEMP_MIN_C, "cold"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            config.apply_override("compliance.unknown", "1"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(matches!(
            config.apply_override("narrative.api_key", "sk-test"),
            Err(ConfigError::CredentialNotStorable(_))
        ));
    }

    #[test]
    fn test_validate_threshold_order() {
        let mut config = PipelineConfig::default();
        config.compliance.temp_min_c = 9.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_debug_masks_api_key() {
        let mut config = NarrativeConfig::default();
        config.api_key = Some("sk-secret".to_string());
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("sk-secret"));
    }
}
