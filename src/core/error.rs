//! 生成流程错误类型
//!
//! 与 RecoveryEngine 配合：根据 GenerationError 决定是否附带一次手动重试。

use thiserror::Error;

use crate::llm::LlmError;
use crate::session::SessionError;
use crate::storage::StorageError;
use crate::validation::ValidationError;

pub const NO_ACTIVE_SESSION_MESSAGE: &str = "没有活动会话";
pub const MISSING_PREREQUISITE_MESSAGE: &str = "缺少会话或八字分析数据";
pub const NAME_NOT_FOUND_MESSAGE: &str = "未找到该名字";
pub const NOT_CONFIGURED_MESSAGE: &str =
    "AI 服务未配置，请设置 QIMING__LLM__API_KEY 或 DEEPSEEK_API_KEY";
/// 手动重试再次失败后的终止提示
pub const TERMINAL_RETRY_MESSAGE: &str = "多次尝试均失败，请检查网络连接后稍后再试。";

/// 三个生成操作可能出现的错误
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("没有活动会话")]
    NoActiveSession,

    #[error("{0}")]
    MissingPrerequisite(String),

    /// 载荷为名字 id
    #[error("未找到该名字")]
    NameNotFound(String),

    #[error("{0}")]
    NotConfigured(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Remote(#[from] LlmError),

    #[error("会话保存失败: {0}")]
    Session(SessionError),

    /// 同一会话的同一操作已在进行中
    #[error("操作正在进行中: {0}")]
    AlreadyInFlight(String),

    #[error("多次尝试均失败，请检查网络连接后稍后再试。")]
    RetryExhausted,
}

impl From<SessionError> for GenerationError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NotFound(_) => GenerationError::NoActiveSession,
            SessionError::NameNotFound(id) => GenerationError::NameNotFound(id),
            other => GenerationError::Session(other),
        }
    }
}

impl From<StorageError> for GenerationError {
    fn from(err: StorageError) -> Self {
        GenerationError::Session(SessionError::Storage(err))
    }
}

/// 错误大类，供恢复策略与调用方分支
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// 前置条件不满足：原样展示，不重试
    Precondition,
    NotConfigured,
    Validation,
    /// 4xx，自动重试不会介入
    RemoteClient,
    /// 5xx / 网络 / 超时，已经过自动重试
    RemoteServer,
    Storage,
    Busy,
    Exhausted,
}

impl GenerationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GenerationError::NoActiveSession
            | GenerationError::MissingPrerequisite(_)
            | GenerationError::NameNotFound(_) => ErrorKind::Precondition,
            GenerationError::NotConfigured(_) => ErrorKind::NotConfigured,
            GenerationError::Validation(_) => ErrorKind::Validation,
            GenerationError::Remote(e) if e.is_client_error() => ErrorKind::RemoteClient,
            GenerationError::Remote(_) => ErrorKind::RemoteServer,
            GenerationError::Session(_) => ErrorKind::Storage,
            GenerationError::AlreadyInFlight(_) => ErrorKind::Busy,
            GenerationError::RetryExhausted => ErrorKind::Exhausted,
        }
    }

    pub fn missing_prerequisite() -> Self {
        GenerationError::MissingPrerequisite(MISSING_PREREQUISITE_MESSAGE.to_string())
    }

    pub fn not_configured() -> Self {
        GenerationError::NotConfigured(NOT_CONFIGURED_MESSAGE.to_string())
    }
}
