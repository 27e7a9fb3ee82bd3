//! 错误恢复引擎
//!
//! 根据 GenerationError 返回 RecoveryAction，供 Orchestrator 决定写入什么错误信息、是否附带重试命令。

use crate::core::error::{ErrorKind, GenerationError};
use crate::core::state::GenerationStage;

/// 恢复引擎给出的建议动作
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryAction {
    /// 展示信息，并提供一次手动重试
    OfferRetry(String),
    /// 原样展示，不提供重试
    Surface(String),
    /// 不改动错误状态（例如重复请求被拒）
    Ignore,
}

/// 把错误映射为面向用户的状态变更
#[derive(Debug, Default)]
pub struct RecoveryEngine;

impl RecoveryEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn handle(&self, err: &GenerationError, stage: GenerationStage) -> RecoveryAction {
        match err.kind() {
            ErrorKind::Precondition => RecoveryAction::Surface(err.to_string()),
            // 配置修好后可以直接重试，不加阶段前缀
            ErrorKind::NotConfigured => RecoveryAction::OfferRetry(err.to_string()),
            ErrorKind::Validation
            | ErrorKind::RemoteClient
            | ErrorKind::RemoteServer
            | ErrorKind::Storage => {
                RecoveryAction::OfferRetry(format!("{}{}", stage.error_prefix(), err))
            }
            ErrorKind::Exhausted => RecoveryAction::Surface(err.to_string()),
            ErrorKind::Busy => RecoveryAction::Ignore,
        }
    }
}
