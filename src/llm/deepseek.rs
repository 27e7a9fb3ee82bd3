//! DeepSeek API 客户端（OpenAI 兼容格式）
//!
//! - Base URL: https://api.deepseek.com
//! - 模型: deepseek-chat
//!
//! 直接用 reqwest 调 `/chat/completions`，保留 HTTP 状态码供重试策略区分 4xx / 5xx；
//! 请求开启 `response_format = json_object`。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::LlmSection;
use crate::llm::{CompletionRequest, LlmClient, LlmError};

/// DeepSeek API 常量
pub const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com";
pub const DEEPSEEK_CHAT: &str = "deepseek-chat";

/// 视为「未配置」的占位 key
const PLACEHOLDER_KEYS: [&str; 2] = ["sk-your-deepseek-api-key-here", "sk-placeholder"];

/// 配置的 key 不可用时，调用时依次查看的环境变量
const API_KEY_ENV_VARS: [&str; 2] = ["QIMING__LLM__API_KEY", "DEEPSEEK_API_KEY"];

/// Token 使用统计（累计值）
#[derive(Debug, Clone, Default)]
pub struct TokenUsage {
    pub prompt_tokens: Arc<AtomicU64>,
    pub completion_tokens: Arc<AtomicU64>,
    pub total_tokens: Arc<AtomicU64>,
}

impl TokenUsage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, prompt: u64, completion: u64) {
        self.prompt_tokens.fetch_add(prompt, Ordering::Relaxed);
        self.completion_tokens.fetch_add(completion, Ordering::Relaxed);
        self.total_tokens.fetch_add(prompt + completion, Ordering::Relaxed);
    }

    pub fn get(&self) -> (u64, u64, u64) {
        (
            self.prompt_tokens.load(Ordering::Relaxed),
            self.completion_tokens.load(Ordering::Relaxed),
            self.total_tokens.load(Ordering::Relaxed),
        )
    }
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    response_format: ResponseFormat,
    stream: bool,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// DeepSeek 客户端：持有 HTTP client、base_url、model 与 key
///
/// key 可在运行中更新（`set_api_key`），也会在每次调用时回退读取环境变量，
/// 因此「未配置」错误在修好配置后可以直接重试。
pub struct DeepSeekClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: RwLock<String>,
    /// 累计 token 使用统计
    pub usage: TokenUsage,
}

impl DeepSeekClient {
    pub fn new(base_url: Option<&str>, model: &str, api_key: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url
                .unwrap_or(DEEPSEEK_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            model: model.to_string(),
            api_key: RwLock::new(api_key.to_string()),
            usage: TokenUsage::new(),
        }
    }

    /// 从配置创建：key 优先取配置，其次环境变量 `DEEPSEEK_API_KEY`
    pub fn from_config(section: &LlmSection) -> Self {
        let api_key = section
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var("DEEPSEEK_API_KEY").ok())
            .unwrap_or_else(|| "sk-placeholder".to_string());

        let model = if section.model.trim().is_empty() {
            DEEPSEEK_CHAT
        } else {
            section.model.as_str()
        };

        Self::new(section.base_url.as_deref(), model, &api_key)
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    /// 更新 API key（例如用户在设置中填入后）
    pub fn set_api_key(&self, key: &str) {
        *self.api_key.write().unwrap_or_else(|e| e.into_inner()) = key.trim().to_string();
        tracing::info!(configured = is_usable_key(key), "DeepSeek API key updated");
    }

    /// 本次调用实际使用的 key：已设置的可用 key 优先，否则读环境变量
    fn current_key(&self) -> String {
        let key = self
            .api_key
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        resolve_key(key, env_api_key())
    }
}

fn env_api_key() -> Option<String> {
    API_KEY_ENV_VARS
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .find(|key| is_usable_key(key))
}

fn resolve_key(configured: String, from_env: Option<String>) -> String {
    if is_usable_key(&configured) {
        configured
    } else {
        from_env.unwrap_or(configured)
    }
}

/// key 非空且不是占位符
pub fn is_usable_key(key: &str) -> bool {
    let key = key.trim();
    !key.is_empty() && !PLACEHOLDER_KEYS.contains(&key)
}

fn map_transport_error(err: reqwest::Error, request: &CompletionRequest) -> LlmError {
    if err.is_timeout() {
        LlmError::Timeout(request.timeout)
    } else {
        LlmError::Network(err.to_string())
    }
}

#[async_trait]
impl LlmClient for DeepSeekClient {
    fn is_configured(&self) -> bool {
        is_usable_key(&self.current_key())
    }

    fn token_usage(&self) -> (u64, u64, u64) {
        self.usage.get()
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user,
                },
            ],
            temperature: request.temperature,
            response_format: ResponseFormat {
                kind: "json_object",
            },
            stream: false,
        };

        tracing::debug!(model = %self.model, temperature = request.temperature, "Sending DeepSeek request");

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(self.current_key())
            .timeout(request.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| map_transport_error(e, request))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| map_transport_error(e, request))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorEnvelope>(&text)
                .map(|env| env.error.message)
                .unwrap_or_else(|_| {
                    status
                        .canonical_reason()
                        .unwrap_or("unknown error")
                        .to_string()
                });
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ChatResponse =
            serde_json::from_str(&text).map_err(|e| LlmError::Decode(e.to_string()))?;

        // 提取 token 使用统计
        if let Some(usage) = &parsed.usage {
            self.usage.add(usage.prompt_tokens, usage.completion_tokens);
        }

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        if content.trim().is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_keys_are_unconfigured() {
        assert!(!is_usable_key(""));
        assert!(!is_usable_key("   "));
        assert!(!is_usable_key("sk-placeholder"));
        assert!(!is_usable_key("sk-your-deepseek-api-key-here"));
        assert!(is_usable_key("sk-4f2a9c"));
    }

    #[test]
    fn test_set_api_key_makes_client_configured() {
        let client = DeepSeekClient::new(None, DEEPSEEK_CHAT, "sk-placeholder");
        client.set_api_key("sk-4f2a9c");
        assert!(client.is_configured());
        assert_eq!(client.current_key(), "sk-4f2a9c");
    }

    #[test]
    fn test_resolve_key_prefers_usable_configured_key() {
        assert_eq!(
            resolve_key("sk-config".to_string(), Some("sk-env".to_string())),
            "sk-config"
        );
        assert_eq!(
            resolve_key("sk-placeholder".to_string(), Some("sk-env".to_string())),
            "sk-env"
        );
        assert_eq!(resolve_key(String::new(), None), "");
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let client = DeepSeekClient::new(Some("http://localhost:8080/v1/"), DEEPSEEK_CHAT, "k");
        assert_eq!(client.endpoint(), "http://localhost:8080/v1/chat/completions");
    }

    #[test]
    fn test_token_usage_accumulates() {
        let usage = TokenUsage::new();
        usage.add(100, 20);
        usage.add(50, 5);
        assert_eq!(usage.get(), (150, 25, 175));
    }

    #[test]
    fn test_request_body_shape() {
        let body = ChatRequest {
            model: DEEPSEEK_CHAT,
            messages: vec![ChatMessage {
                role: "system",
                content: "只输出 JSON",
            }],
            temperature: 0.7,
            response_format: ResponseFormat {
                kind: "json_object",
            },
            stream: false,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["response_format"]["type"], "json_object");
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["stream"], false);
    }
}
