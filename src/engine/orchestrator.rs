// ==========================================
// 蛋品冷链溯源分析系统 - 流水线编排器
// ==========================================
// 用途: 按状态机顺序调用各组件,记录阶段耗时
// 流程: Ingested → Normalized → Evaluated → Aggregated → Scored
//       → Reported | ReportedFallback
// 红线: 编排器不含业务规则；报告服务失败只在此处捕获
// ==========================================

use crate::config::pipeline_config::PipelineConfig;
use crate::domain::batch::NormalizedDataset;
use crate::domain::bundle::{ReportSource, ResultBundle, StageRecord};
use crate::domain::stats::ChartSeries;
use crate::domain::types::PipelineState;
use crate::domain::violation::{Finding, FindingKind};
use crate::engine::aggregator::Aggregator;
use crate::engine::compliance::ComplianceEngine;
use crate::engine::error::{PipelineError, PipelineResult};
use crate::engine::risk::RiskScorer;
use crate::importer::file_parser::UniversalFileParser;
use crate::importer::normalizer::Normalizer;
use crate::importer::schema_detector::SchemaDetector;
use crate::narrative::{
    build_prompt, build_provider, generate_with_timeout, render_fallback_report,
    GenerationConfig, NarrativeProvider,
};
use chrono::Utc;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

// ==========================================
// StageTracker - 阶段状态与耗时
// ==========================================
#[derive(Debug)]
pub struct StageTracker {
    state: PipelineState,
    history: Vec<StageRecord>,
    last_mark: Instant,
}

impl Default for StageTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl StageTracker {
    /// 以 Ingested 作为初始状态
    pub fn new() -> Self {
        Self {
            state: PipelineState::Ingested,
            history: vec![StageRecord {
                state: PipelineState::Ingested,
                completed_at: Utc::now(),
                elapsed_ms: 0,
            }],
            last_mark: Instant::now(),
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn history(&self) -> &[StageRecord] {
        &self.history
    }

    /// 推进到下一状态（校验转换合法性）
    pub fn advance(&mut self, next: PipelineState) -> PipelineResult<()> {
        if !self.state.can_transition_to(next) {
            return Err(PipelineError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }

        let elapsed_ms = self.last_mark.elapsed().as_millis() as u64;
        self.last_mark = Instant::now();
        self.state = next;
        self.history.push(StageRecord {
            state: next,
            completed_at: Utc::now(),
            elapsed_ms,
        });

        debug!(state = %next, elapsed_ms, "阶段完成");
        Ok(())
    }

    pub fn into_history(self) -> Vec<StageRecord> {
        self.history
    }
}

// ==========================================
// PipelineOrchestrator - 流水线编排器
// ==========================================
pub struct PipelineOrchestrator {
    config: PipelineConfig,
    /// 显式注入的报告服务（为空时按配置构建）
    provider: Option<Arc<dyn NarrativeProvider>>,
}

impl PipelineOrchestrator {
    /// 创建编排器（报告服务按 config.narrative 构建）
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            provider: None,
        }
    }

    /// 创建编排器并注入报告服务
    pub fn with_provider(config: PipelineConfig, provider: Arc<dyn NarrativeProvider>) -> Self {
        Self {
            config,
            provider: Some(provider),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// 解析文件并执行流水线
    pub async fn run_file(&self, path: &Path) -> PipelineResult<ResultBundle> {
        let owned = path.to_path_buf();
        let raw = tokio::task::spawn_blocking(move || UniversalFileParser.parse(&owned)).await??;

        let dataset_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("dataset")
            .to_string();
        self.run(&dataset_name, raw).await
    }

    /// 执行完整分析流程
    ///
    /// # 参数
    /// - dataset_name: 数据集名称（文件名）
    /// - raw: 已解析的原始结构
    ///
    /// # 返回
    /// 结果包（终态为 Reported 或 ReportedFallback）
    pub async fn run(&self, dataset_name: &str, raw: Value) -> PipelineResult<ResultBundle> {
        let run_id = uuid::Uuid::new_v4().to_string();
        let started = Instant::now();

        // ==========================================
        // 步骤1: 形态检测
        // ==========================================
        debug!(run_id = %run_id, "步骤1: 检测数据集形态");
        let dataset = SchemaDetector::new(&self.config.aliases).detect_dataset(raw);
        let shape = dataset.shape;
        let mut tracker = StageTracker::new();

        info!(run_id = %run_id, dataset = dataset_name, shape = %shape, "开始执行分析流程");

        // ==========================================
        // 步骤2: 规范化
        // ==========================================
        debug!("步骤2: 规范化字段");
        let outcome = Normalizer::new(&self.config.aliases).normalize(&dataset);
        let mut notices = outcome.findings;
        let normalized = outcome.dataset;
        tracker.advance(PipelineState::Normalized)?;

        // ==========================================
        // 步骤3: 合规评估
        // ==========================================
        debug!("步骤3: 执行合规评估");
        let compliance =
            ComplianceEngine::new(self.config.compliance.clone()).evaluate(&normalized);
        notices.extend(compliance.findings.iter().cloned());
        tracker.advance(PipelineState::Evaluated)?;

        // ==========================================
        // 步骤4: 统计汇总与图表序列（图表并发计算）
        // ==========================================
        debug!("步骤4: 统计汇总");
        let statistics = Aggregator::new().aggregate(&normalized, &compliance);
        if statistics.overview.cartons_saturated {
            notices.push(
                Finding::new(
                    FindingKind::ValueOverflow,
                    format!("箱数合计超出上限,按 {} 截断", u64::MAX),
                )
                .on_field("quantity_cartons"),
            );
        }

        let shared = Arc::new(normalized);
        let (trend, flow, hierarchy, timeline) = tokio::try_join!(
            spawn_series(&shared, Aggregator::trend_series),
            spawn_series(&shared, Aggregator::flow_series),
            spawn_series(&shared, Aggregator::hierarchy_series),
            spawn_series(&shared, Aggregator::timeline_series),
        )?;
        let charts = ChartSeries {
            trend,
            flow,
            hierarchy,
            timeline,
        };
        let normalized = Arc::try_unwrap(shared).unwrap_or_else(|arc| (*arc).clone());
        tracker.advance(PipelineState::Aggregated)?;

        // ==========================================
        // 步骤5: 风险评分
        // ==========================================
        debug!("步骤5: 风险评分");
        let risk = RiskScorer::new(self.config.scoring.clone()).assess(&compliance);
        tracker.advance(PipelineState::Scored)?;

        let mut bundle = ResultBundle {
            run_id,
            dataset_name: dataset_name.to_string(),
            shape,
            dataset: normalized,
            compliance,
            statistics,
            risk,
            charts,
            notices,
            stage_history: Vec::new(),
            state: PipelineState::Scored,
            final_report: None,
            report_source: None,
            created_at: Utc::now(),
        };

        // ==========================================
        // 步骤6: 生成报告（失败降级为本地报告）
        // ==========================================
        debug!("步骤6: 生成报告");
        let locale = self.config.report_locale.clone();
        match self.narrate(&bundle).await {
            Ok((report, source)) => {
                bundle.final_report = Some(report);
                bundle.report_source = Some(source);
                tracker.advance(PipelineState::Reported)?;
            }
            Err(reason) => {
                warn!(run_id = %bundle.run_id, reason = %reason, "报告服务不可用,使用本地报告");
                bundle.notices.push(Finding::new(
                    FindingKind::ProviderUnavailable,
                    reason.clone(),
                ));
                bundle.final_report = Some(render_fallback_report(&bundle, &reason, &locale));
                bundle.report_source = Some(ReportSource::Fallback { reason });
                tracker.advance(PipelineState::ReportedFallback)?;
            }
        }

        bundle.state = tracker.state();
        bundle.stage_history = tracker.into_history();

        info!(
            run_id = %bundle.run_id,
            shape = %bundle.shape,
            record_count = bundle.records().len(),
            violation_count = bundle.violations().len(),
            risk_score = ?bundle.risk.score(),
            state = %bundle.state,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "分析流程完成"
        );

        Ok(bundle)
    }

    /// 调用报告服务；任何失败返回原因文本
    async fn narrate(&self, bundle: &ResultBundle) -> Result<(String, ReportSource), String> {
        let narrative = &self.config.narrative;

        let provider = match &self.provider {
            Some(provider) => provider.clone(),
            None => build_provider(narrative).map_err(|e| e.to_string())?,
        };
        let model = narrative
            .resolved_model()
            .unwrap_or_else(|| provider.name().to_string());

        let prompt = build_prompt(
            narrative.template,
            bundle,
            narrative.prompt_ceiling_bytes,
            &self.config.report_locale,
        );
        let generation = GenerationConfig {
            model: model.clone(),
            max_output_tokens: narrative.max_output_tokens,
            temperature: narrative.temperature,
        };

        debug!(
            provider = provider.name(),
            model = %model,
            prompt_bytes = prompt.len(),
            "调用报告服务"
        );

        let report = generate_with_timeout(
            provider.as_ref(),
            &prompt,
            &generation,
            narrative.timeout_secs,
        )
        .await
        .map_err(|e| e.to_string())?;

        Ok((
            report,
            ReportSource::Provider {
                provider: provider.name().to_string(),
                model,
            },
        ))
    }
}

// 图表序列在阻塞线程池中计算
fn spawn_series<T, F>(
    dataset: &Arc<NormalizedDataset>,
    series: F,
) -> tokio::task::JoinHandle<T>
where
    T: Send + 'static,
    F: FnOnce(&NormalizedDataset) -> T + Send + 'static,
{
    let dataset = Arc::clone(dataset);
    tokio::task::spawn_blocking(move || series(&dataset))
}
