//! 模型输出清洗与结构校验
//!
//! 模型被要求只输出 JSON，但仍可能夹带 Markdown 代码块、前后说明文字，
//! 或在 json_object 模式下把数组包一层对象。这里把原始文本变成强类型结果：
//!
//! 1. 去首尾空白；若含 ``` 代码块（可带 json 标记）只取块内内容
//! 2. 严格解析；失败则抽取第一个括号平衡的对象 / 数组再解析
//! 3. 仍失败 → ParseFailure（附前 200 字符预览）
//! 4. 期望数组而拿到「单键且值为数组」的对象时，先尝试解包后的数组
//! 5. 反序列化为目标类型并做语义检查，失败 → SchemaMismatch
//!
//! 纯函数，无 I/O。

mod extract;
mod schema;

use serde_json::Value;
use thiserror::Error;

pub use extract::{extract_balanced_json, strip_code_fence};
pub use schema::{response_schema_json, ResponseSchema};

/// 解析失败时保留的预览长度（字符）
pub const PREVIEW_CHARS: usize = 200;

/// 校验错误分类
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Failed to parse JSON from AI response: {preview}")]
    ParseFailure { preview: String },

    #[error("AI response does not match the required schema ({expected}): {detail}")]
    SchemaMismatch {
        /// 目标类型名
        expected: &'static str,
        /// serde 或语义检查给出的诊断信息
        detail: String,
    },
}

impl ValidationError {
    pub fn is_parse_failure(&self) -> bool {
        matches!(self, ValidationError::ParseFailure { .. })
    }
}

/// 清洗 + 解析 + 校验，得到目标类型
pub fn validate_response<T: ResponseSchema>(raw: &str) -> Result<T, ValidationError> {
    let cleaned = normalize(raw);
    let value = parse_lenient(&cleaned)?;

    if T::EXPECTS_ARRAY {
        if let Some(inner) = sole_array_member(&value) {
            match decode::<T>(inner.clone()) {
                Ok(data) => return Ok(data),
                Err(e) => {
                    tracing::debug!(error = %e, "Unwrapped array did not validate, trying original object");
                }
            }
        }
    }

    decode::<T>(value).map_err(|e| {
        tracing::error!(
            error = %e,
            preview = %preview(&cleaned),
            "AI response failed schema validation"
        );
        e
    })
}

/// 去空白并剥离代码块
fn normalize(raw: &str) -> String {
    let trimmed = raw.trim();
    match strip_code_fence(trimmed) {
        Some(inner) => inner.trim().to_string(),
        None => trimmed.to_string(),
    }
}

fn parse_lenient(text: &str) -> Result<Value, ValidationError> {
    if let Ok(value) = serde_json::from_str::<Value>(text) {
        return Ok(value);
    }

    if let Some(candidate) = extract_balanced_json(text) {
        if let Ok(value) = serde_json::from_str::<Value>(candidate) {
            tracing::warn!(
                raw_len = text.len(),
                salvaged_len = candidate.len(),
                "Salvaged embedded JSON from AI response"
            );
            return Ok(value);
        }
    }

    Err(ValidationError::ParseFailure {
        preview: preview(text),
    })
}

/// 单键对象且唯一的值是数组时返回该数组
fn sole_array_member(value: &Value) -> Option<&Value> {
    let map = value.as_object()?;
    if map.len() != 1 {
        return None;
    }
    map.values().next().filter(|v| v.is_array())
}

fn decode<T: ResponseSchema>(value: Value) -> Result<T, ValidationError> {
    let data: T = serde_json::from_value(value).map_err(|e| ValidationError::SchemaMismatch {
        expected: T::schema_name(),
        detail: e.to_string(),
    })?;
    data.refine().map_err(|detail| ValidationError::SchemaMismatch {
        expected: T::schema_name(),
        detail,
    })
}

fn preview(text: &str) -> String {
    text.chars().take(PREVIEW_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    use crate::domain::{BaziAnalysis, NameDetail, NameListResponse};

    const BAZI_JSON: &str = include_str!("../../tests/fixtures/bazi_analysis.json");
    const NAME_LIST_JSON: &str = include_str!("../../tests/fixtures/name_list.json");
    const NAME_DETAIL_JSON: &str = include_str!("../../tests/fixtures/name_detail.json");

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Person {
        name: String,
        age: u32,
        tags: Vec<String>,
    }

    impl ResponseSchema for Person {}

    fn person() -> Person {
        Person {
            name: "test".to_string(),
            age: 25,
            tags: vec!["a".to_string(), "b".to_string()],
        }
    }

    #[test]
    fn test_plain_json() {
        let json = r#"{"name": "test", "age": 25, "tags": ["a", "b"]}"#;
        assert_eq!(validate_response::<Person>(json).unwrap(), person());
    }

    #[test]
    fn test_markdown_fence_with_and_without_language() {
        let body = serde_json::to_string(&person()).unwrap();
        for wrapped in [
            format!("```json\n{}\n```", body),
            format!("```JSON\n{}\n```", body),
            format!("```\n{}\n```", body),
            format!("Here you go:\n``` json\n{}\n```\nEnjoy!", body),
        ] {
            assert_eq!(validate_response::<Person>(&wrapped).unwrap(), person());
        }
    }

    #[test]
    fn test_salvages_embedded_object() {
        let raw = r#"当然，结果如下：{"name": "test", "age": 25, "tags": ["a", "b"]} 希望有帮助"#;
        assert_eq!(validate_response::<Person>(raw).unwrap(), person());
    }

    #[test]
    fn test_parse_failure_carries_preview() {
        let raw = format!("{{name: \"test\"}} {}", "x".repeat(500));
        let err = validate_response::<Person>(&raw).unwrap_err();
        match err {
            ValidationError::ParseFailure { preview } => {
                assert_eq!(preview.chars().count(), PREVIEW_CHARS);
                assert!(preview.starts_with("{name"));
            }
            other => panic!("Expected ParseFailure, got {other:?}"),
        }
    }

    #[test]
    fn test_schema_mismatch() {
        let raw = r#"{"name": "test", "age": "25", "tags": []}"#;
        let err = validate_response::<Person>(raw).unwrap_err();
        assert!(matches!(err, ValidationError::SchemaMismatch { .. }));
        assert!(err.to_string().contains("schema"));
    }

    #[test]
    fn test_unwraps_single_key_array() {
        let raw = r#"{"items": [{"name": "a", "age": 1, "tags": []}, {"name": "b", "age": 2, "tags": ["x"]}]}"#;
        let people = validate_response::<Vec<Person>>(raw).unwrap();
        assert_eq!(people.len(), 2);
        assert_eq!(people[1].name, "b");
    }

    #[test]
    fn test_unwrap_not_applied_to_object_schema() {
        #[derive(Debug, Deserialize)]
        struct Wrapper {
            items: Vec<u32>,
        }
        impl ResponseSchema for Wrapper {}

        let wrapped = validate_response::<Wrapper>(r#"{"items": [1, 2]}"#).unwrap();
        assert_eq!(wrapped.items, vec![1, 2]);
    }

    #[test]
    fn test_unwrap_falls_back_to_original_object() {
        // 解包后的数组元素类型不符，回退到原对象也不符 → SchemaMismatch
        let raw = r#"{"items": [1, 2]}"#;
        let err = validate_response::<Vec<Person>>(raw).unwrap_err();
        assert!(matches!(err, ValidationError::SchemaMismatch { .. }));
    }

    #[test]
    fn test_bazi_roundtrip_and_fence_tolerance() {
        let original: BaziAnalysis = serde_json::from_str(BAZI_JSON).unwrap();
        let text = serde_json::to_string(&original).unwrap();

        assert_eq!(validate_response::<BaziAnalysis>(&text).unwrap(), original);
        let fenced = format!("```json\n{}\n```", text);
        assert_eq!(validate_response::<BaziAnalysis>(&fenced).unwrap(), original);
    }

    #[test]
    fn test_bazi_rejects_too_many_styles() {
        let mut value: Value = serde_json::from_str(BAZI_JSON).unwrap();
        let styles = value["suggestedStyles"].as_array().unwrap().clone();
        let mut four = styles.clone();
        four.push(styles[0].clone());
        value["suggestedStyles"] = Value::Array(four);

        let err = validate_response::<BaziAnalysis>(&value.to_string()).unwrap_err();
        match err {
            ValidationError::SchemaMismatch { detail, .. } => {
                assert!(detail.contains("suggestedStyles"))
            }
            other => panic!("Expected SchemaMismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_bazi_rejects_unknown_color_theme() {
        let mut value: Value = serde_json::from_str(BAZI_JSON).unwrap();
        value["suggestedStyles"][0]["colorTheme"] = Value::String("magenta".to_string());
        let err = validate_response::<BaziAnalysis>(&value.to_string()).unwrap_err();
        assert!(matches!(err, ValidationError::SchemaMismatch { .. }));
    }

    #[test]
    fn test_name_list_and_detail_fixtures_validate() {
        let list = validate_response::<NameListResponse>(NAME_LIST_JSON).unwrap();
        assert_eq!(list.others.len(), NameListResponse::SUMMARY_COUNT);
        assert!(!list.featured.characters.is_empty());

        let detail = validate_response::<NameDetail>(NAME_DETAIL_JSON).unwrap();
        assert!(!detail.characters.is_empty());
    }

    #[test]
    fn test_name_list_truncates_extra_summaries() {
        let mut value: Value = serde_json::from_str(NAME_LIST_JSON).unwrap();
        let others = value["others"].as_array().unwrap().clone();
        let mut seven = others.clone();
        seven.push(others[0].clone());
        seven.push(others[1].clone());
        value["others"] = Value::Array(seven);

        let list = validate_response::<NameListResponse>(&value.to_string()).unwrap();
        assert_eq!(list.others.len(), NameListResponse::SUMMARY_COUNT);
    }

    #[test]
    fn test_name_detail_requires_characters() {
        let mut value: Value = serde_json::from_str(NAME_DETAIL_JSON).unwrap();
        value["characters"] = Value::Array(Vec::new());
        let err = validate_response::<NameDetail>(&value.to_string()).unwrap_err();
        assert!(matches!(err, ValidationError::SchemaMismatch { .. }));
    }
}
