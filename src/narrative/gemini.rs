// ==========================================
// 蛋品冷链溯源分析系统 - Gemini generateContent 服务
// ==========================================

use crate::narrative::error::ProviderError;
use crate::narrative::provider::{
    build_http_client, check_status, non_empty, GenerationConfig, NarrativeProvider,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationParams {
    max_output_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationParams,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

pub struct GeminiProvider {
    base_url: String,
    api_key: String,
    http_client: reqwest::Client,
}

impl GeminiProvider {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self, ProviderError> {
        Self::with_base_url(GEMINI_BASE_URL, api_key, timeout)
    }

    pub fn with_base_url(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            http_client: build_http_client(timeout)?,
        })
    }

    pub fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }
}

fn extract_text(response: GenerateResponse) -> Option<String> {
    let candidate = response.candidates.into_iter().next()?;
    let text: String = candidate
        .content?
        .parts
        .into_iter()
        .filter_map(|p| p.text)
        .collect::<Vec<_>>()
        .join("");
    Some(text)
}

#[async_trait]
impl NarrativeProvider for GeminiProvider {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn generate(
        &self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<String, ProviderError> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationParams {
                max_output_tokens: config.max_output_tokens,
                temperature: config.temperature,
            },
        };

        debug!(model = %config.model, prompt_bytes = prompt.len(), "发送 Gemini 请求");

        // 凭证放在请求头,避免出现在 URL 日志中
        let response = self
            .http_client
            .post(self.endpoint(&config.model))
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;
        let response = check_status(response).await?;

        let body: GenerateResponse = response.json().await?;
        let text = extract_text(body)
            .ok_or_else(|| ProviderError::InvalidResponse("candidates 为空".to_string()))?;
        non_empty(text)
    }
}
