//! # Cache Key Derivation
//!
//! 缓存键 = 操作名 + 规范化参数摘要。
//!
//! 参数中的对象键会递归排序，因此关键字参数的顺序不影响缓存键；数组顺序保持不变。
//!
//! 键格式为 `[prefix:]name:digest`。前缀与操作名中的 `%` 和 `:` 会被转义，
//! 因此 `:` 只作为分隔符出现，不同的 (前缀, 操作名) 组合不会得到相同的键。

use std::borrow::Cow;
use std::fmt;

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use webpilot_types::OperationDescriptor;

/// 摘要截取的字节数 (16 字节 = 32 个十六进制字符)
const DIGEST_BYTES: usize = 16;

/// 确定性缓存键
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// 由操作名与参数生成缓存键
    pub fn derive(name: &str, params: &Value, prefix: Option<&str>) -> Self {
        let canonical = canonicalize(params);

        let mut hasher = Sha256::new();
        hasher.update(name.as_bytes());
        hasher.update([0u8]);
        // Value 的 Display 输出紧凑 JSON
        hasher.update(canonical.to_string().as_bytes());
        let digest = hasher.finalize();
        let digest = hex::encode(&digest[..DIGEST_BYTES]);

        Self(format!("{}{}", Self::operation_prefix(name, prefix), digest))
    }

    /// 由操作描述生成缓存键
    pub fn from_descriptor(descriptor: &OperationDescriptor, prefix: Option<&str>) -> Self {
        Self::derive(&descriptor.name, &descriptor.params, prefix)
    }

    /// 操作名部分，可用于 [`CacheStore::invalidate_prefix`](super::CacheStore::invalidate_prefix)
    pub fn operation_prefix(name: &str, prefix: Option<&str>) -> String {
        match prefix {
            Some(prefix) if !prefix.is_empty() => {
                format!("{}:{}:", escape_segment(prefix), escape_segment(name))
            }
            _ => format!("{}:", escape_segment(name)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<CacheKey> for String {
    fn from(key: CacheKey) -> Self {
        key.0
    }
}

/// 转义键中的分隔符
fn escape_segment(segment: &str) -> Cow<'_, str> {
    if segment.contains(['%', ':']) {
        Cow::Owned(segment.replace('%', "%25").replace(':', "%3A"))
    } else {
        Cow::Borrowed(segment)
    }
}

/// 递归排序对象键
fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();

            let mut sorted = Map::new();
            for key in keys {
                sorted.insert(key.clone(), canonicalize(&map[key]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_keyword_order_independent() {
        let a = CacheKey::derive(
            "webpilot_get_text",
            &json!({"selector": "h1", "timeout": 5, "options": {"trim": true, "all": false}}),
            None,
        );
        let b = CacheKey::derive(
            "webpilot_get_text",
            &json!({"options": {"all": false, "trim": true}, "timeout": 5, "selector": "h1"}),
            None,
        );
        assert_eq!(a, b);
    }

    #[test]
    fn test_distinct_args_distinct_keys() {
        let a = CacheKey::derive("webpilot_get_text", &json!({"selector": "h1"}), None);
        let b = CacheKey::derive("webpilot_get_text", &json!({"selector": "h2"}), None);
        let c = CacheKey::derive("webpilot_get_title", &json!({"selector": "h1"}), None);
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_array_order_matters() {
        let a = CacheKey::derive("webpilot_extract", &json!({"fields": ["a", "b"]}), None);
        let b = CacheKey::derive("webpilot_extract", &json!({"fields": ["b", "a"]}), None);
        assert_ne!(a, b);
    }

    #[test]
    fn test_prefix_and_shape() {
        let key = CacheKey::derive("webpilot_get_title", &json!({}), Some("tab-1"));
        assert!(key.as_str().starts_with("tab-1:webpilot_get_title:"));
        assert!(key
            .as_str()
            .starts_with(&CacheKey::operation_prefix("webpilot_get_title", Some("tab-1"))));

        let digest = key.as_str().rsplit(':').next().unwrap();
        assert_eq!(digest.len(), DIGEST_BYTES * 2);
    }

    #[test]
    fn test_from_descriptor_matches_derive() {
        let op = OperationDescriptor::read("webpilot_get_text").with_param("selector", "#main");
        assert_eq!(
            CacheKey::from_descriptor(&op, None),
            CacheKey::derive("webpilot_get_text", &json!({"selector": "#main"}), None)
        );
    }

    #[test]
    fn test_separator_in_segments_cannot_collide() {
        let params = json!({ "selector": "h1" });
        let a = CacheKey::derive("b:c", &params, Some("a"));
        let b = CacheKey::derive("c", &params, Some("a:b"));
        assert_ne!(a, b);
        assert_eq!(a.as_str().matches(':').count(), 2);
        assert_eq!(b.as_str().matches(':').count(), 2);

        // 操作 "b" 的前缀不能匹配操作 "b:c" 的键
        assert!(!a.as_str().starts_with(&CacheKey::operation_prefix("b", Some("a"))));
        assert!(a.as_str().starts_with(&CacheKey::operation_prefix("b:c", Some("a"))));
    }

    #[test]
    fn test_escape_is_unambiguous() {
        assert_eq!(escape_segment("tab-1"), "tab-1");
        assert_eq!(escape_segment("a:b"), "a%3Ab");
        assert_ne!(escape_segment("a%3Ab"), escape_segment("a:b"));
    }
}
