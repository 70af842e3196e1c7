// ==========================================
// 蛋品冷链溯源分析系统 - 合规评估引擎
// ==========================================
// 职责: 按阈值评估每条批次记录,输出违规与数据质量发现
// 规则:
// - temperature_excursion: 读数超出 [temp_min, temp_max]（每个读数一条）
// - cold_chain_break: 连续超温读数的首末时间跨度 > max_cold_break_hours（每段一条）
// - stage_duration_overrun: 产蛋→包装 > max_lay_to_pack_hours；产蛋→配送 > 保质期
// - missing_handler_data: 应有阶段时间缺失
// 红线: 字段缺失不报错；阶段时间倒序只记 Finding
// ==========================================

use crate::config::ComplianceThresholds;
use crate::domain::batch::{BatchRecord, NormalizedDataset, TemperatureReading};
use crate::domain::bundle::{ComplianceReport, EvaluationStatus};
use crate::domain::types::{Stage, ViolationKind};
use crate::domain::violation::{Finding, FindingKind, Violation};
use tracing::{debug, info};

// ==========================================
// ComplianceEngine - 合规评估引擎
// ==========================================
pub struct ComplianceEngine {
    thresholds: ComplianceThresholds,
}

impl Default for ComplianceEngine {
    fn default() -> Self {
        Self::new(ComplianceThresholds::default())
    }
}

impl ComplianceEngine {
    pub fn new(thresholds: ComplianceThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &ComplianceThresholds {
        &self.thresholds
    }

    /// 评估整个数据集
    ///
    /// # 返回
    /// - flow_graph / unknown: InsufficientStructure
    /// - 其他: 所有记录的违规（按记录顺序）
    pub fn evaluate(&self, dataset: &NormalizedDataset) -> ComplianceReport {
        if !dataset.shape.yields_batch_records() {
            debug!(shape = %dataset.shape, "数据集无批次记录,跳过合规评估");
            return ComplianceReport::insufficient(Finding::new(
                FindingKind::InsufficientStructure,
                format!("数据集形态 {} 不含批次记录,无法进行合规评估", dataset.shape),
            ));
        }

        let mut violations = Vec::new();
        let mut findings = Vec::new();
        for (index, record) in dataset.records.iter().enumerate() {
            let (record_violations, record_findings) =
                self.evaluate_record(record, &dataset.expected_stages);
            violations.extend(record_violations.into_iter().map(|v| v.at_record(index)));
            findings.extend(record_findings);
        }

        info!(
            records = dataset.records.len(),
            violations = violations.len(),
            findings = findings.len(),
            "合规评估完成"
        );

        ComplianceReport {
            status: EvaluationStatus::Evaluated,
            evaluated_records: dataset.records.len(),
            violations,
            findings,
        }
    }

    /// 评估单条记录
    pub fn evaluate_record(
        &self,
        record: &BatchRecord,
        expected_stages: &[Stage],
    ) -> (Vec<Violation>, Vec<Finding>) {
        let mut violations = Vec::new();

        self.check_temperatures(record, &mut violations);
        self.check_cold_chain_breaks(record, &mut violations);
        self.check_stage_durations(record, &mut violations);
        self.check_missing_stages(record, expected_stages, &mut violations);

        let findings = check_stage_order(record);
        (violations, findings)
    }

    /// 是否超温（闭区间外）
    pub fn is_excursion(&self, celsius: f64) -> bool {
        celsius < self.thresholds.temp_min_c || celsius > self.thresholds.temp_max_c
    }

    // ==========================================
    // 温度规则
    // ==========================================

    fn check_temperatures(&self, record: &BatchRecord, violations: &mut Vec<Violation>) {
        for reading in &record.temperature_readings {
            if !self.is_excursion(reading.celsius) {
                continue;
            }
            let at = reading
                .timestamp
                .map(|ts| format!(" @ {}", ts.format("%Y-%m-%d %H:%M")))
                .unwrap_or_default();
            violations.push(Violation::new(
                &record.batch_id,
                ViolationKind::TemperatureExcursion,
                format!(
                    "温度 {:.1}°C 超出 [{}, {}]°C{}",
                    reading.celsius, self.thresholds.temp_min_c, self.thresholds.temp_max_c, at
                ),
            ));
        }
    }

    fn check_cold_chain_breaks(&self, record: &BatchRecord, violations: &mut Vec<Violation>) {
        let mut run: Vec<&TemperatureReading> = Vec::new();

        for reading in &record.temperature_readings {
            if self.is_excursion(reading.celsius) {
                run.push(reading);
            } else {
                self.close_run(record, &run, violations);
                run.clear();
            }
        }
        self.close_run(record, &run, violations);
    }

    /// 结束一段连续超温,跨度超过阈值则记一次断链
    fn close_run(
        &self,
        record: &BatchRecord,
        run: &[&TemperatureReading],
        violations: &mut Vec<Violation>,
    ) {
        let mut stamps = run.iter().filter_map(|r| r.timestamp);
        let first = match stamps.next() {
            Some(ts) => ts,
            None => return,
        };
        let last = stamps.last().unwrap_or(first);
        let span_hours = (last - first).num_seconds() as f64 / 3600.0;

        if span_hours > self.thresholds.max_cold_break_hours {
            violations.push(Violation::new(
                &record.batch_id,
                ViolationKind::ColdChainBreak,
                format!(
                    "连续 {} 个超温读数持续 {:.1} 小时（阈值 {} 小时）",
                    run.len(),
                    span_hours,
                    self.thresholds.max_cold_break_hours
                ),
            ));
        }
    }

    // ==========================================
    // 阶段时长规则
    // ==========================================

    fn check_stage_durations(&self, record: &BatchRecord, violations: &mut Vec<Violation>) {
        if let Some(hours) = record.hours_between(Stage::Laying, Stage::Packing) {
            if hours > self.thresholds.max_lay_to_pack_hours {
                violations.push(Violation::new(
                    &record.batch_id,
                    ViolationKind::StageDurationOverrun,
                    format!(
                        "产蛋到包装耗时 {:.1} 小时（上限 {} 小时）",
                        hours, self.thresholds.max_lay_to_pack_hours
                    ),
                ));
            }
        }

        if let Some(hours) = record.hours_between(Stage::Laying, Stage::Delivery) {
            let days = hours / 24.0;
            if days > self.thresholds.max_shelf_life_days {
                violations.push(Violation::new(
                    &record.batch_id,
                    ViolationKind::StageDurationOverrun,
                    format!(
                        "产蛋到配送 {:.1} 天,超过保质期 {} 天",
                        days, self.thresholds.max_shelf_life_days
                    ),
                ));
            }
        }
    }

    fn check_missing_stages(
        &self,
        record: &BatchRecord,
        expected_stages: &[Stage],
        violations: &mut Vec<Violation>,
    ) {
        for stage in expected_stages {
            if record.stage_date(*stage).is_none() {
                violations.push(Violation::new(
                    &record.batch_id,
                    ViolationKind::MissingHandlerData,
                    format!("缺少 {} 阶段时间（{}）", stage, stage.date_field()),
                ));
            }
        }
    }
}

/// 相邻已知阶段时间倒序检查
fn check_stage_order(record: &BatchRecord) -> Vec<Finding> {
    let present: Vec<(Stage, _)> = Stage::ALL
        .iter()
        .filter_map(|stage| record.stage_date(*stage).map(|ts| (*stage, ts)))
        .collect();

    present
        .windows(2)
        .filter(|pair| pair[1].1 < pair[0].1)
        .map(|pair| {
            Finding::new(
                FindingKind::StageOrderInversion,
                format!("{} 阶段时间早于 {} 阶段", pair[1].0, pair[0].0),
            )
            .for_batch(record.batch_id.clone())
            .on_field(pair[1].0.date_field())
        })
        .collect()
}
