//! Qiming - 八字起名 AI 生成管线
//!
//! 模块划分：
//! - **calendar**: 时辰、公历日期中文格式
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 生成编排、AI 状态、错误恢复、解锁判断
//! - **domain**: 出生信息、八字分析、名字候选、会话、订单
//! - **llm**: LLM 客户端抽象、自动重试策略与实现（DeepSeek / Mock）
//! - **observability**: 日志初始化
//! - **payment**: 解锁订单与模拟支付
//! - **prompts**: 八字分析 / 取名 / 名字详情提示词
//! - **session**: 会话服务与收藏夹
//! - **storage**: 键值存储（内存 / JSON 文件）
//! - **validation**: 模型输出清洗与结构校验

pub mod calendar;
pub mod config;
pub mod core;
pub mod domain;
pub mod llm;
pub mod observability;
pub mod payment;
pub mod prompts;
pub mod session;
pub mod storage;
pub mod validation;

pub use crate::core::{GenerationError, Orchestrator};
