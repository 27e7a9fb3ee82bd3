//! 响应结构声明：目标类型即 schema
//!
//! serde 负责结构校验，`refine` 负责类型表达不了的语义约束；
//! schemars 从同一组类型生成 JSON Schema 注入提示词（参见 prompts 模块）。

use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;

use crate::domain::{BaziAnalysis, NameDetail, NameListResponse};

/// 可作为模型响应 schema 的类型
pub trait ResponseSchema: DeserializeOwned {
    /// 顶层是否为数组（决定是否尝试单键对象解包）
    const EXPECTS_ARRAY: bool = false;

    fn schema_name() -> &'static str {
        std::any::type_name::<Self>()
    }

    /// 反序列化后的语义检查 / 规整；Err 中为诊断信息
    fn refine(self) -> Result<Self, String> {
        Ok(self)
    }
}

impl<T: ResponseSchema> ResponseSchema for Vec<T> {
    const EXPECTS_ARRAY: bool = true;

    fn refine(self) -> Result<Self, String> {
        self.into_iter().map(T::refine).collect()
    }
}

impl ResponseSchema for BaziAnalysis {
    fn refine(self) -> Result<Self, String> {
        self.check()?;
        Ok(self)
    }
}

impl ResponseSchema for NameDetail {
    fn refine(self) -> Result<Self, String> {
        if self.characters.is_empty() {
            return Err(format!("characters 为空（名字：{}）", self.name));
        }
        Ok(self)
    }
}

impl ResponseSchema for NameListResponse {
    fn refine(mut self) -> Result<Self, String> {
        self.featured = self
            .featured
            .refine()
            .map_err(|detail| format!("featured: {detail}"))?;

        let count = self.others.len();
        if count > Self::SUMMARY_COUNT {
            tracing::warn!(count, "Model returned extra summary names, truncating");
            self.others.truncate(Self::SUMMARY_COUNT);
        } else if count < Self::SUMMARY_COUNT {
            tracing::warn!(count, "Model returned fewer summary names than requested");
        }
        Ok(self)
    }
}

/// 目标类型的 JSON Schema（美化输出），可拼入 system prompt
pub fn response_schema_json<T: JsonSchema>() -> String {
    let schema = schema_for!(T);
    match serde_json::to_string_pretty(&schema) {
        Ok(json) => json,
        Err(e) => {
            tracing::error!(error = %e, "Failed to render response schema");
            String::new()
        }
    }
}
