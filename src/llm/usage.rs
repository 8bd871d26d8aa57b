//! Token usage normalization.
//!
//! Providers report token accounting in several shapes. This module
//! resolves them into one canonical record with a fixed precedence order,
//! so cost tracking never depends on which provider produced a response.
//!
//! Recognized shapes, first match wins:
//! 1. nested `tokenUsage {promptTokens, completionTokens, totalTokens}`
//! 2. nested `usage {input_tokens, output_tokens, total_tokens}` (Anthropic
//!    style) or `usage {prompt_tokens, completion_tokens, total_tokens}`
//!    (OpenAI style)
//! 3. flat `inputTokens`/`outputTokens`/`totalTokens` or snake_case
//!    equivalents directly on the payload
//! 4. `message.usage_metadata` on the response message
//!
//! An unrecognized payload yields `None`; callers log it and record a
//! zero-cost step rather than failing the investigation.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Canonical token usage for one reasoning call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
}

impl TokenUsage {
    /// Create a usage record, deriving `total_tokens` from the parts.
    pub fn new(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens: input_tokens.saturating_add(output_tokens),
        }
    }

    /// Create a usage record with a provider-reported total.
    ///
    /// A reported total is authoritative even when it disagrees with the
    /// sum of the parts.
    pub fn with_total(input_tokens: u64, output_tokens: u64, total: Option<u64>) -> Self {
        match total {
            Some(total_tokens) => Self {
                input_tokens,
                output_tokens,
                total_tokens,
            },
            None => Self::new(input_tokens, output_tokens),
        }
    }
}

/// Read a non-negative integer field, trying each candidate key in order.
fn u64_field(obj: &Value, keys: &[&str]) -> Option<u64> {
    keys.iter().find_map(|k| obj.get(*k).and_then(Value::as_u64))
}

/// Extract usage from an object carrying input/output counts under any of
/// the supported key spellings. Returns `None` unless both directions are
/// present.
fn from_counts(obj: &Value) -> Option<TokenUsage> {
    let input = u64_field(obj, &["promptTokens", "prompt_tokens", "inputTokens", "input_tokens"])?;
    let output = u64_field(
        obj,
        &[
            "completionTokens",
            "completion_tokens",
            "outputTokens",
            "output_tokens",
        ],
    )?;
    let total = u64_field(obj, &["totalTokens", "total_tokens"]);
    Some(TokenUsage::with_total(input, output, total))
}

/// Normalize a provider usage payload into canonical [`TokenUsage`].
///
/// `payload` is the whole completion payload as the provider returned it,
/// not a pre-extracted usage object.
pub fn normalize_usage(payload: &Value) -> Option<TokenUsage> {
    // 1. Nested tokenUsage (LangChain-style camelCase).
    if let Some(nested) = payload.get("tokenUsage") {
        if let Some(usage) = from_counts(nested) {
            return Some(usage);
        }
    }

    // 2. Nested usage (Anthropic input/output or OpenAI prompt/completion).
    if let Some(nested) = payload.get("usage") {
        if let Some(usage) = from_counts(nested) {
            return Some(usage);
        }
    }

    // 3. Flat fields directly on the payload.
    if let Some(usage) = from_counts(payload) {
        return Some(usage);
    }

    // 4. Usage metadata embedded on the response message.
    if let Some(metadata) = payload
        .get("message")
        .and_then(|m| m.get("usage_metadata").or_else(|| m.get("usageMetadata")))
    {
        if let Some(usage) = from_counts(metadata) {
            return Some(usage);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nested_token_usage() {
        let payload = json!({
            "tokenUsage": {"promptTokens": 100, "completionTokens": 40, "totalTokens": 140}
        });
        assert_eq!(normalize_usage(&payload), Some(TokenUsage::new(100, 40)));
    }

    #[test]
    fn test_nested_usage_snake_case() {
        let payload = json!({"usage": {"input_tokens": 120, "output_tokens": 30}});
        let usage = normalize_usage(&payload).unwrap();
        assert_eq!(usage.input_tokens, 120);
        assert_eq!(usage.output_tokens, 30);
        assert_eq!(usage.total_tokens, 150);
    }

    #[test]
    fn test_nested_usage_openai_style() {
        let payload = json!({
            "usage": {"prompt_tokens": 57, "completion_tokens": 17, "total_tokens": 74}
        });
        assert_eq!(normalize_usage(&payload), Some(TokenUsage::new(57, 17)));
    }

    #[test]
    fn test_flat_fields_camel_and_snake() {
        let camel = json!({"inputTokens": 10, "outputTokens": 5, "totalTokens": 15});
        let snake = json!({"input_tokens": 10, "output_tokens": 5});
        assert_eq!(normalize_usage(&camel), normalize_usage(&snake));
        assert_eq!(normalize_usage(&camel), Some(TokenUsage::new(10, 5)));
    }

    #[test]
    fn test_message_level_metadata() {
        let payload = json!({
            "message": {"usage_metadata": {"input_tokens": 8, "output_tokens": 2}}
        });
        assert_eq!(normalize_usage(&payload), Some(TokenUsage::new(8, 2)));
    }

    #[test]
    fn test_all_shapes_agree() {
        let shapes = [
            json!({"tokenUsage": {"promptTokens": 120, "completionTokens": 30}}),
            json!({"usage": {"input_tokens": 120, "output_tokens": 30}}),
            json!({"inputTokens": 120, "outputTokens": 30}),
            json!({"message": {"usage_metadata": {"input_tokens": 120, "output_tokens": 30}}}),
        ];
        for shape in &shapes {
            assert_eq!(
                normalize_usage(shape),
                Some(TokenUsage::new(120, 30)),
                "shape {shape} did not normalize"
            );
        }
    }

    #[test]
    fn test_precedence_token_usage_wins() {
        // Both shapes present: the nested tokenUsage is authoritative.
        let payload = json!({
            "tokenUsage": {"promptTokens": 1, "completionTokens": 2},
            "usage": {"input_tokens": 100, "output_tokens": 200}
        });
        assert_eq!(normalize_usage(&payload), Some(TokenUsage::new(1, 2)));
    }

    #[test]
    fn test_reported_total_is_authoritative() {
        // Some providers count cached tokens only in the total.
        let payload = json!({"usage": {"input_tokens": 10, "output_tokens": 5, "total_tokens": 99}});
        assert_eq!(normalize_usage(&payload).unwrap().total_tokens, 99);
    }

    #[test]
    fn test_unrecognized_payload() {
        assert_eq!(normalize_usage(&json!({})), None);
        assert_eq!(normalize_usage(&json!({"tokens": 42})), None);
        assert_eq!(normalize_usage(&json!(null)), None);
        // One direction alone is not enough to bill a step.
        assert_eq!(normalize_usage(&json!({"input_tokens": 10})), None);
    }
}
