// ==========================================
// 蛋品冷链溯源分析系统 - 报告提示词
// ==========================================
// 结构: 角色模板 + 固定输出章节 + "DATASET:" + 结果包摘要（超长截断）
// ==========================================

use crate::domain::bundle::ResultBundle;
use crate::domain::types::DatasetShape;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const TRUNCATION_MARKER: &str = "\n...[TRUNCATED]";

const SECTION_TEMPLATE: &str = "Respond in Markdown using exactly these sections, in this order:
## Risk Summary
## Key Findings
## Recommended Actions
## Visualization Description";

// ==========================================
// PromptTemplate - 角色模板
// ==========================================
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptTemplate {
    #[default]
    TraceabilityAnalyst,
    RecallCommander,
    ConsumerStory,
}

impl PromptTemplate {
    pub const ALL: [PromptTemplate; 3] = [
        PromptTemplate::TraceabilityAnalyst,
        PromptTemplate::RecallCommander,
        PromptTemplate::ConsumerStory,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PromptTemplate::TraceabilityAnalyst => "traceability_analyst",
            PromptTemplate::RecallCommander => "recall_commander",
            PromptTemplate::ConsumerStory => "consumer_story",
        }
    }

    pub fn instructions(&self) -> &'static str {
        match self {
            PromptTemplate::TraceabilityAnalyst => {
                "You are a senior food safety auditor with 20 years of experience in egg supply chains.
Analyze the egg traceability result below. Identify the top risks, bottlenecks and delays
between laying, packing, distribution and delivery, and rate recall readiness out of 10."
            }
            PromptTemplate::RecallCommander => {
                "SIMULATE A RECALL for the egg batches below.
Identify affected batches, list every retailer and distributor with dates and carton quantities,
draft a recall notice and a contact list, and prioritize by risk level."
            }
            PromptTemplate::ConsumerStory => {
                "Turn the egg traceability result below into a friendly consumer story for a carton QR code:
which farm the eggs came from, how many days old they are, and whether they were always kept cold."
            }
        }
    }
}

impl fmt::Display for PromptTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PromptTemplate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase().replace('-', "_");
        PromptTemplate::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == key)
            .ok_or_else(|| {
                "可选值: traceability_analyst / recall_commander / consumer_story".to_string()
            })
    }
}

// ==========================================
// 提示词拼装
// ==========================================

/// 发送给服务的结果包摘要
#[derive(Serialize)]
struct PromptPayload<'a> {
    dataset_name: &'a str,
    shape: DatasetShape,
    risk: &'a crate::domain::risk::RiskOutcome,
    statistics: &'a crate::domain::stats::AggregateStats,
    violations: &'a [crate::domain::violation::Violation],
    notices: &'a [crate::domain::violation::Finding],
    records: &'a [crate::domain::batch::BatchRecord],
    #[serde(skip_serializing_if = "Option::is_none")]
    flow_graph: Option<&'a crate::domain::batch::FlowGraph>,
    #[serde(skip_serializing_if = "Option::is_none")]
    unstructured: Option<&'a serde_json::Value>,
}

/// 按字节上限截断（保证落在字符边界）
pub fn truncate_with_marker(text: &str, ceiling_bytes: usize) -> String {
    if text.len() <= ceiling_bytes {
        return text.to_string();
    }
    let mut end = ceiling_bytes;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}{}", &text[..end], TRUNCATION_MARKER)
}

/// 序列化结果包摘要
pub fn serialize_bundle(bundle: &ResultBundle) -> String {
    let payload = PromptPayload {
        dataset_name: &bundle.dataset_name,
        shape: bundle.shape,
        risk: &bundle.risk,
        statistics: &bundle.statistics,
        violations: &bundle.compliance.violations,
        notices: &bundle.notices,
        records: &bundle.dataset.records,
        flow_graph: bundle.dataset.flow_graph.as_ref(),
        unstructured: bundle.dataset.unstructured.as_ref(),
    };
    // 仅含可序列化的普通数据,失败时退化为空对象
    serde_json::to_string_pretty(&payload).unwrap_or_else(|_| "{}".to_string())
}

/// 拼装完整提示词
pub fn build_prompt(
    template: PromptTemplate,
    bundle: &ResultBundle,
    ceiling_bytes: usize,
    locale: &str,
) -> String {
    let language = if locale.eq_ignore_ascii_case("zh-TW") {
        "\nWrite the report in Traditional Chinese (zh-TW)."
    } else {
        ""
    };

    format!(
        "{}\n\n{}{}\n\nDATASET:\n{}",
        template.instructions(),
        SECTION_TEMPLATE,
        language,
        truncate_with_marker(&serialize_bundle(bundle), ceiling_bytes)
    )
}
