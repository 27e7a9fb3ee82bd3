//! LLM 层：客户端抽象、自动重试策略与实现（DeepSeek / Mock）

pub mod deepseek;
pub mod mock;
pub mod retry;
pub mod traits;

use std::sync::Arc;

use crate::config::LlmSection;

pub use deepseek::{is_usable_key, DeepSeekClient, TokenUsage, DEEPSEEK_BASE_URL, DEEPSEEK_CHAT};
pub use mock::MockLlmClient;
pub use retry::{RetryPolicy, RetryableError};
pub use traits::{CompletionRequest, LlmClient, LlmError};

/// 按配置创建客户端；provider = "mock" 时返回空脚本的 Mock
pub fn create_llm_from_config(section: &LlmSection) -> Arc<dyn LlmClient> {
    match section.provider.to_lowercase().as_str() {
        "mock" => {
            tracing::info!("Using mock LLM client");
            Arc::new(MockLlmClient::new())
        }
        other => {
            if other != "deepseek" {
                tracing::warn!(provider = %other, "Unknown LLM provider, falling back to DeepSeek");
            }
            let client = DeepSeekClient::from_config(section);
            if !client.is_configured() {
                tracing::warn!("DeepSeek API key is not configured");
            }
            Arc::new(client)
        }
    }
}
