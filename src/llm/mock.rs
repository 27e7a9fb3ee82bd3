//! Mock LLM 客户端（用于测试与离线演示，无需 API）
//!
//! 按顺序返回预先排好的响应；队列耗尽后返回 EmptyResponse。

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::{CompletionRequest, LlmClient, LlmError};

/// 脚本化客户端：记录收到的请求，依次吐出预设结果
#[derive(Debug)]
pub struct MockLlmClient {
    responses: Mutex<VecDeque<Result<String, LlmError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
    calls: AtomicUsize,
    configured: AtomicBool,
}

impl Default for MockLlmClient {
    fn default() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            configured: AtomicBool::new(true),
        }
    }
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// 模拟未配置 key 的客户端
    pub fn unconfigured() -> Self {
        let client = Self::default();
        client.configured.store(false, Ordering::SeqCst);
        client
    }

    /// 模拟用户补全 / 清除配置
    pub fn set_configured(&self, configured: bool) {
        self.configured.store(configured, Ordering::SeqCst);
    }

    pub fn with_responses<I>(responses: I) -> Self
    where
        I: IntoIterator<Item = Result<String, LlmError>>,
    {
        let client = Self::default();
        client
            .responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend(responses);
        client
    }

    pub fn push_ok(&self, body: impl Into<String>) {
        self.push(Ok(body.into()));
    }

    pub fn push_err(&self, err: LlmError) {
        self.push(Err(err));
    }

    pub fn push(&self, response: Result<String, LlmError>) {
        self.responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(response);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// 已收到的请求（按顺序）
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn remaining(&self) -> usize {
        self.responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request.clone());

        self.responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or(Err(LlmError::EmptyResponse))
    }

    fn is_configured(&self) -> bool {
        self.configured.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn request() -> CompletionRequest {
        CompletionRequest {
            system: "sys".to_string(),
            user: "user".to_string(),
            temperature: 0.7,
            timeout: Duration::from_secs(30),
        }
    }

    #[tokio::test]
    async fn test_scripted_responses_in_order() {
        let client = MockLlmClient::with_responses([
            Ok("{}".to_string()),
            Err(LlmError::Network("reset".to_string())),
        ]);

        assert_eq!(client.complete(&request()).await, Ok("{}".to_string()));
        assert!(client.complete(&request()).await.is_err());
        assert_eq!(
            client.complete(&request()).await,
            Err(LlmError::EmptyResponse)
        );
        assert_eq!(client.calls(), 3);
        assert_eq!(client.requests()[0].system, "sys");
    }

    #[test]
    fn test_unconfigured_flag() {
        assert!(MockLlmClient::new().is_configured());
        assert!(!MockLlmClient::unconfigured().is_configured());

        let client = MockLlmClient::unconfigured();
        client.set_configured(true);
        assert!(client.is_configured());
    }
}
