// ==========================================
// Mock 报告生成服务 - 用于集成测试（不访问网络）
// ==========================================

use async_trait::async_trait;
use egg_trace::narrative::{GenerationConfig, NarrativeProvider, ProviderError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// 服务行为
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// 返回固定文本
    Respond(String),
    /// 返回认证失败
    AuthFailure,
    /// 返回配额不足
    QuotaExceeded,
    /// 返回空文本
    Empty,
    /// 休眠后返回（用于超时测试）
    Hang(Duration),
}

pub struct MockProvider {
    behavior: MockBehavior,
    calls: AtomicUsize,
    last_prompt: Mutex<Option<String>>,
    last_config: Mutex<Option<GenerationConfig>>,
}

impl MockProvider {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
            last_config: Mutex::new(None),
        }
    }

    pub fn responding(text: &str) -> Self {
        Self::new(MockBehavior::Respond(text.to_string()))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.last_prompt.lock().unwrap().clone()
    }

    pub fn last_config(&self) -> Option<GenerationConfig> {
        self.last_config.lock().unwrap().clone()
    }
}

#[async_trait]
impl NarrativeProvider for MockProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn generate(
        &self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_prompt.lock().unwrap() = Some(prompt.to_string());
        *self.last_config.lock().unwrap() = Some(config.clone());

        match &self.behavior {
            MockBehavior::Respond(text) => Ok(text.clone()),
            MockBehavior::AuthFailure => Err(ProviderError::from_status(401, "invalid key".to_string())),
            MockBehavior::QuotaExceeded => Err(ProviderError::from_status(429, "slow down".to_string())),
            MockBehavior::Empty => Err(ProviderError::EmptyResponse),
            MockBehavior::Hang(duration) => {
                tokio::time::sleep(*duration).await;
                Ok("too late".to_string())
            }
        }
    }
}
