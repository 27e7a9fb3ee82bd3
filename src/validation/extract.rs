//! 从模型文本中抽取 JSON：Markdown 代码块、括号平衡的对象 / 数组

use std::sync::OnceLock;

use regex::Regex;
use serde::de::IgnoredAny;

static CODE_FENCE_RE: OnceLock<Regex> = OnceLock::new();

/// 取第一个 ``` 代码块的内容（可带 json 标记，大小写不敏感）；没有代码块时返回 None
pub fn strip_code_fence(text: &str) -> Option<&str> {
    let re = CODE_FENCE_RE.get_or_init(|| {
        Regex::new(r"(?is)```[ \t]*(?:json)?[ \t]*\r?\n?(.*?)\r?\n?[ \t]*```")
            .expect("code fence regex is valid")
    });
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// 找到第一个括号平衡且可被解析为 JSON 的对象 / 数组子串
///
/// 从每个 `{` / `[` 起尝试匹配（忽略字符串字面量里的括号），
/// 第一个能通过解析的片段即为结果。
pub fn extract_balanced_json(text: &str) -> Option<&str> {
    let mut search_from = 0;
    while let Some(offset) = text[search_from..].find(|c: char| c == '{' || c == '[') {
        let start = search_from + offset;
        if let Some(end) = balanced_end(&text[start..]) {
            let candidate = &text[start..start + end];
            if serde_json::from_str::<IgnoredAny>(candidate).is_ok() {
                return Some(candidate);
            }
        }
        // 跳过当前开括号（单字节 ASCII）继续找
        search_from = start + 1;
    }
    None
}

/// 返回与开头括号匹配的闭括号之后的字节偏移；不平衡时返回 None
fn balanced_end(text: &str) -> Option<usize> {
    let mut stack: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in text.char_indices() {
        if in_string {
            if escape_next {
                escape_next = false;
            } else if ch == '\\' {
                escape_next = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => stack.push('}'),
            '[' => stack.push(']'),
            '}' | ']' => {
                if stack.pop() != Some(ch) {
                    return None;
                }
                if stack.is_empty() {
                    return Some(i + ch.len_utf8());
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_code_fence_variants() {
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), Some("{\"a\":1}"));
        assert_eq!(strip_code_fence("```\n[1,2]\n```"), Some("[1,2]"));
        assert_eq!(strip_code_fence("```Json {\"a\":1}```"), Some("{\"a\":1}"));
        assert_eq!(strip_code_fence("{\"a\":1}"), None);
    }

    #[test]
    fn test_balanced_object_ignores_braces_in_strings() {
        let text = r#"结果：{"text": "含有 } 和 { 的字符串", "n": [1, {"x": "]"}]} 完毕"#;
        assert_eq!(
            extract_balanced_json(text),
            Some(r#"{"text": "含有 } 和 { 的字符串", "n": [1, {"x": "]"}]}"#)
        );
    }

    #[test]
    fn test_skips_unparseable_bracket_prefix() {
        let text = r#"[注] 以下为结果 {"ok": true}"#;
        assert_eq!(extract_balanced_json(text), Some(r#"{"ok": true}"#));
    }

    #[test]
    fn test_array_first() {
        assert_eq!(extract_balanced_json("data: [1, 2, 3] end"), Some("[1, 2, 3]"));
    }

    #[test]
    fn test_unbalanced_returns_none() {
        assert_eq!(extract_balanced_json(r#"{"a": [1, 2"#), None);
        assert_eq!(extract_balanced_json("没有 JSON"), None);
    }
}
