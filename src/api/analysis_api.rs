// ==========================================
// 蛋品冷链溯源分析系统 - 分析 API
// ==========================================
// 职责: 文件解析 → 加载配置 → 执行流水线 → 记录运行日志
// 说明: 运行日志写入失败只记录告警,不影响结果包返回
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::pipeline_config::{config_keys, PipelineConfig, ProviderKind};
use crate::config::pipeline_config_trait::PipelineConfigReader;
use crate::domain::bundle::ResultBundle;
use crate::domain::run_log::RunLog;
use crate::engine::orchestrator::PipelineOrchestrator;
use crate::narrative::{NarrativeProvider, PromptTemplate};
use crate::repository::run_log_repo::RunLogRepository;
use futures::future::join_all;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

// ==========================================
// RunOptions - 单次运行的覆写项
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub provider: Option<ProviderKind>,
    pub model: Option<String>,
    /// 仅存在于内存,不落库不打日志
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub locale: Option<String>,
    pub template: Option<PromptTemplate>,
}

// ==========================================
// AnalysisApi - 分析 API
// ==========================================
pub struct AnalysisApi<C>
where
    C: PipelineConfigReader,
{
    config_reader: Arc<C>,
    run_log_repo: Arc<RunLogRepository>,
    provider: Option<Arc<dyn NarrativeProvider>>,
}

impl<C> AnalysisApi<C>
where
    C: PipelineConfigReader,
{
    pub fn new(config_reader: Arc<C>, run_log_repo: Arc<RunLogRepository>) -> Self {
        Self {
            config_reader,
            run_log_repo,
            provider: None,
        }
    }

    /// 注入报告服务（测试或自定义后端）
    pub fn with_provider(mut self, provider: Arc<dyn NarrativeProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// 加载存储配置并应用本次覆写
    pub async fn resolve_config(&self, options: &RunOptions) -> ApiResult<PipelineConfig> {
        let mut config = self.config_reader.load_pipeline_config().await?;

        let narrative = &mut config.narrative;
        if let Some(provider) = options.provider {
            narrative.provider = Some(provider);
        }
        if let Some(model) = &options.model {
            narrative.model = Some(model.clone());
        }
        if let Some(api_key) = &options.api_key {
            narrative.api_key = Some(api_key.clone());
        }
        if let Some(base_url) = &options.base_url {
            narrative.base_url = Some(base_url.clone());
        }
        if let Some(template) = options.template {
            narrative.template = template;
        }
        if let Some(locale) = &options.locale {
            config.apply_override(config_keys::REPORT_LOCALE, locale)?;
        }

        config.validate()?;
        Ok(config)
    }

    fn orchestrator(&self, config: PipelineConfig) -> PipelineOrchestrator {
        match &self.provider {
            Some(provider) => PipelineOrchestrator::with_provider(config, provider.clone()),
            None => PipelineOrchestrator::new(config),
        }
    }

    /// 分析单个文件
    ///
    /// # 参数
    /// - path: .csv / .xlsx / .xls / .json 文件
    /// - options: 本次运行覆写项
    pub async fn analyze_file(
        &self,
        path: impl AsRef<Path>,
        options: &RunOptions,
    ) -> ApiResult<ResultBundle> {
        let path = path.as_ref();
        let config = self.resolve_config(options).await?;
        let bundle = self.orchestrator(config).run_file(path).await?;
        self.record_run(&bundle);
        Ok(bundle)
    }

    /// 分析已解析的原始结构
    pub async fn analyze_value(
        &self,
        dataset_name: &str,
        raw: Value,
        options: &RunOptions,
    ) -> ApiResult<ResultBundle> {
        if dataset_name.trim().is_empty() {
            return Err(ApiError::InvalidInput("数据集名称不能为空".to_string()));
        }
        let config = self.resolve_config(options).await?;
        let bundle = self.orchestrator(config).run(dataset_name, raw).await?;
        self.record_run(&bundle);
        Ok(bundle)
    }

    /// 并发分析多个文件（各运行互不共享可变状态）
    pub async fn analyze_many(
        &self,
        paths: &[PathBuf],
        options: &RunOptions,
    ) -> Vec<(PathBuf, ApiResult<ResultBundle>)> {
        let runs = paths.iter().map(|path| async move {
            let result = self.analyze_file(path, options).await;
            (path.clone(), result)
        });

        let results = join_all(runs).await;
        info!(
            total = results.len(),
            failed = results.iter().filter(|(_, r)| r.is_err()).count(),
            "批量分析完成"
        );
        results
    }

    /// 最近的运行记录
    pub fn recent_runs(&self, limit: usize) -> ApiResult<Vec<RunLog>> {
        Ok(self.run_log_repo.list_recent(limit)?)
    }

    /// 按 run_id 查询运行记录
    pub fn find_run(&self, run_id: &str) -> ApiResult<RunLog> {
        self.run_log_repo
            .find_by_id(run_id)?
            .ok_or_else(|| ApiError::NotFound(format!("RunLog(id={})", run_id)))
    }

    fn record_run(&self, bundle: &ResultBundle) {
        if let Err(e) = self.run_log_repo.insert(&RunLog::from_bundle(bundle)) {
            warn!(run_id = %bundle.run_id, error = %e, "运行记录写入失败");
        }
    }
}
