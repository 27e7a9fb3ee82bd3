//! LLM 客户端抽象
//!
//! 所有后端（DeepSeek / Mock）实现 LlmClient：一次请求 = system + user 两条指令，返回一段（应为 JSON 的）文本。

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::llm::retry::RetryableError;

/// 一次补全请求
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    pub temperature: f32,
    /// 单次请求超时（不含重试等待）
    pub timeout: Duration,
}

/// 远端调用错误；带 HTTP 状态码的归为 Api
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LlmError {
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("AI 返回了空响应")]
    EmptyResponse,

    #[error("Failed to decode API response: {0}")]
    Decode(String),
}

impl LlmError {
    pub fn status(&self) -> Option<u16> {
        match self {
            LlmError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// 4xx：鉴权、参数、限流等客户端错误
    pub fn is_client_error(&self) -> bool {
        matches!(self.status(), Some(s) if (400..500).contains(&s))
    }
}

impl RetryableError for LlmError {
    fn is_retryable(&self) -> bool {
        !self.is_client_error()
    }
}

/// LLM 客户端 trait
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// 非流式补全，返回首条 choice 的文本
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError>;

    /// 凭证是否已配置（非空且不是占位符）；未配置时编排器不会发起调用
    fn is_configured(&self) -> bool {
        true
    }

    /// 累计 token 使用统计：(prompt_tokens, completion_tokens, total_tokens)
    /// 默认返回 (0, 0, 0)，具体实现可覆盖
    fn token_usage(&self) -> (u64, u64, u64) {
        (0, 0, 0)
    }
}
