//! LLM 输出的宽容 JSON 提取
//!
//! 模型输出常混杂说明文字或 ``` 围栏；先剥围栏，再定位首个配平的 `{…}` 块。

use serde::de::DeserializeOwned;

use crate::core::error::LlmError;

/// 提取文本中第一个配平的 JSON 对象块
pub fn extract_json_block(text: &str) -> Option<&str> {
    // 优先剥 ```json / ``` 围栏
    let inner = if let Some(start) = text.find("```") {
        let after = &text[start + 3..];
        let after = after.strip_prefix("json").unwrap_or(after);
        match after.find("```") {
            Some(end) => &after[..end],
            None => after,
        }
    } else {
        text
    };

    let open = inner.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, ch) in inner[open..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&inner[open..open + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// 提取并反序列化为目标类型
pub fn parse_json_block<T: DeserializeOwned>(text: &str) -> Result<T, LlmError> {
    let block = extract_json_block(text)
        .ok_or_else(|| LlmError::MalformedResponse("no json object found".to_string()))?;
    serde_json::from_str(block).map_err(|e| LlmError::MalformedResponse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_extract_from_fenced_block() {
        let text = "Here you go:\n```json\n{\"decision\": \"none\", \"note\": \"ok\"}\n```\nDone.";
        let block = extract_json_block(text).unwrap();
        let v: Value = serde_json::from_str(block).unwrap();
        assert_eq!(v["decision"], "none");
    }

    #[test]
    fn test_extract_nested_and_strings_with_braces() {
        let text = r#"prefix {"a": {"b": "x } y"}, "c": 1} suffix"#;
        let block = extract_json_block(text).unwrap();
        let v: Value = serde_json::from_str(block).unwrap();
        assert_eq!(v["c"], 1);
        assert_eq!(v["a"]["b"], "x } y");
    }

    #[test]
    fn test_no_json_is_error() {
        let parsed: Result<Value, _> = parse_json_block("LLM disabled. Prompt preview: hello");
        assert!(parsed.is_err());
    }
}
