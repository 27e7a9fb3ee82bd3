//! 生成状态：三个进行中标志、面向 UI 的错误信息与一次性重试命令
//!
//! Orchestrator 通过 watch 通道广播 AiState，UI 只需订阅并渲染。

use serde::{Deserialize, Serialize};

use crate::core::error::TERMINAL_RETRY_MESSAGE;

/// 生成阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationStage {
    Bazi,
    Names,
    Detail,
}

impl GenerationStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationStage::Bazi => "bazi",
            GenerationStage::Names => "names",
            GenerationStage::Detail => "detail",
        }
    }

    /// 面向用户的错误前缀
    pub fn error_prefix(&self) -> &'static str {
        match self {
            GenerationStage::Bazi => "八字分析失败：",
            GenerationStage::Names => "名字生成失败：",
            GenerationStage::Detail => "名字详情加载失败：",
        }
    }
}

/// 可重放的失败操作
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum RetryCommand {
    #[serde(rename_all = "camelCase")]
    BaziAnalysis { session_id: String },
    #[serde(rename_all = "camelCase")]
    NameBatch { session_id: String, style: String },
    #[serde(rename_all = "camelCase")]
    CharacterDetail { session_id: String, name_id: String },
}

impl RetryCommand {
    pub fn stage(&self) -> GenerationStage {
        match self {
            RetryCommand::BaziAnalysis { .. } => GenerationStage::Bazi,
            RetryCommand::NameBatch { .. } => GenerationStage::Names,
            RetryCommand::CharacterDetail { .. } => GenerationStage::Detail,
        }
    }

    pub fn session_id(&self) -> &str {
        match self {
            RetryCommand::BaziAnalysis { session_id }
            | RetryCommand::NameBatch { session_id, .. }
            | RetryCommand::CharacterDetail { session_id, .. } => session_id,
        }
    }
}

/// UI 可见的生成状态
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AiState {
    pub is_generating_bazi: bool,
    pub is_generating_names: bool,
    pub is_generating_detail: bool,
    pub error: Option<String>,
    pub retry_command: Option<RetryCommand>,
    pub retry_count: u32,
}

impl AiState {
    pub fn is_generating(&self, stage: GenerationStage) -> bool {
        match stage {
            GenerationStage::Bazi => self.is_generating_bazi,
            GenerationStage::Names => self.is_generating_names,
            GenerationStage::Detail => self.is_generating_detail,
        }
    }

    pub fn set_generating(&mut self, stage: GenerationStage, on: bool) {
        match stage {
            GenerationStage::Bazi => self.is_generating_bazi = on,
            GenerationStage::Names => self.is_generating_names = on,
            GenerationStage::Detail => self.is_generating_detail = on,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.is_generating_bazi || self.is_generating_names || self.is_generating_detail
    }

    /// 当前错误是否提供重试入口
    pub fn can_retry(&self) -> bool {
        self.retry_command.is_some()
    }

    pub fn clear_error(&mut self) {
        self.error = None;
        self.retry_command = None;
        self.retry_count = 0;
    }

    /// 终止态：固定提示，不再提供重试
    pub fn mark_terminal(&mut self) {
        self.error = Some(TERMINAL_RETRY_MESSAGE.to_string());
        self.retry_command = None;
    }
}
