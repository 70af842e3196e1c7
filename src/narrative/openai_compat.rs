// ==========================================
// 蛋品冷链溯源分析系统 - Chat Completions 兼容服务
// ==========================================
// 适用: OpenAI / xAI Grok / Groq（同一请求格式,不同端点）
// ==========================================

use crate::narrative::error::ProviderError;
use crate::narrative::provider::{
    build_http_client, check_status, non_empty, GenerationConfig, NarrativeProvider,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const XAI_BASE_URL: &str = "https://api.x.ai/v1";
pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct ChatCompletionsProvider {
    name: &'static str,
    base_url: String,
    api_key: String,
    http_client: reqwest::Client,
}

impl ChatCompletionsProvider {
    pub fn new(
        name: &'static str,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        Ok(Self {
            name,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            http_client: build_http_client(timeout)?,
        })
    }

    pub fn openai(api_key: impl Into<String>, timeout: Duration) -> Result<Self, ProviderError> {
        Self::new("openai", OPENAI_BASE_URL, api_key, timeout)
    }

    pub fn xai(api_key: impl Into<String>, timeout: Duration) -> Result<Self, ProviderError> {
        Self::new("xai", XAI_BASE_URL, api_key, timeout)
    }

    pub fn groq(api_key: impl Into<String>, timeout: Duration) -> Result<Self, ProviderError> {
        Self::new("groq", GROQ_BASE_URL, api_key, timeout)
    }

    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl NarrativeProvider for ChatCompletionsProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn generate(
        &self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<String, ProviderError> {
        let request = ChatRequest {
            model: &config.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: config.max_output_tokens,
            temperature: config.temperature,
        };

        debug!(
            provider = self.name,
            model = %config.model,
            prompt_bytes = prompt.len(),
            "发送报告生成请求"
        );

        let response = self
            .http_client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;
        let response = check_status(response).await?;

        let body: ChatResponse = response.json().await?;
        let text = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ProviderError::InvalidResponse("choices 为空".to_string()))?;

        non_empty(text)
    }
}
