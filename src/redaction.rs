use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum RedactionLevel {
    Strict,  // redact secrets + all message content
    Normal,  // redact secrets + long message content
    Minimal, // only known secret keys
}

const LONG_CONTENT_CHARS: usize = 200;

impl Default for RedactionLevel {
    fn default() -> Self {
        match std::env::var("REDACTION_LEVEL")
            .unwrap_or_else(|_| "normal".to_string())
            .to_lowercase()
            .as_str()
        {
            "strict" => RedactionLevel::Strict,
            "minimal" => RedactionLevel::Minimal,
            _ => RedactionLevel::Normal,
        }
    }
}

pub fn redact_value(v: &mut Value, level: RedactionLevel) {
    match v {
        Value::Object(map) => {
            for (k, val) in map.iter_mut() {
                let k_lower = k.to_lowercase();

                if k_lower.contains("key")
                    || k_lower.contains("auth")
                    || (k_lower.contains("token") && k_lower != "max_tokens")
                    || k_lower.contains("secret")
                    || k_lower.contains("password")
                {
                    *val = Value::String("[REDACTED]".to_string());
                    continue;
                }

                match level {
                    RedactionLevel::Strict if k_lower == "content" => {
                        *val = Value::String("[REDACTED-STRICT]".to_string());
                    }
                    RedactionLevel::Normal
                        if k_lower == "content"
                            && val
                                .as_str()
                                .map(|s| s.chars().count() > LONG_CONTENT_CHARS)
                                .unwrap_or(false) =>
                    {
                        *val = Value::String("[REDACTED-LARGE-CONTENT]".to_string());
                    }
                    _ => redact_value(val, level),
                }
            }
        }
        Value::Array(arr) => {
            for val in arr {
                redact_value(val, level);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_secrets_always_redacted() {
        let mut v = json!({ "Authorization": "Bearer sk-1", "api_key": "sk-2", "max_tokens": 1024 });
        redact_value(&mut v, RedactionLevel::Minimal);
        assert_eq!(v["Authorization"], "[REDACTED]");
        assert_eq!(v["api_key"], "[REDACTED]");
        assert_eq!(v["max_tokens"], 1024);
    }

    #[test]
    fn test_strict_hides_content() {
        let mut v = json!({ "messages": [{ "role": "user", "content": "hello" }] });
        redact_value(&mut v, RedactionLevel::Strict);
        assert_eq!(v["messages"][0]["content"], "[REDACTED-STRICT]");
        assert_eq!(v["messages"][0]["role"], "user");
    }

    #[test]
    fn test_normal_hides_only_long_content() {
        let long = "x".repeat(LONG_CONTENT_CHARS + 1);
        let mut v = json!({ "messages": [{ "content": "short" }, { "content": long }] });
        redact_value(&mut v, RedactionLevel::Normal);
        assert_eq!(v["messages"][0]["content"], "short");
        assert_eq!(v["messages"][1]["content"], "[REDACTED-LARGE-CONTENT]");
    }
}
