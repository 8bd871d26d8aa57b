//! Static model pricing.
//!
//! Rates are USD per million tokens, split into input and output. Lookup
//! is by provider plus the longest matching model-id prefix, so dated
//! snapshots ("gpt-4o-2024-11-20") price like their base model. Unknown
//! combinations fall back to [`DEFAULT_RATE`]; cost tracking must never
//! block execution.

use crate::config::Provider;

/// Fallback rate for unknown provider/model combinations: $3 input /
/// $15 output per million tokens.
pub const DEFAULT_RATE: (f64, f64) = (3.0, 15.0);

/// (provider, model prefix, input rate, output rate)
const RATES: &[(Provider, &str, f64, f64)] = &[
    (Provider::OpenAi, "gpt-4o-mini", 0.15, 0.60),
    (Provider::OpenAi, "gpt-4o", 2.50, 10.00),
    (Provider::OpenAi, "gpt-4.1-mini", 0.40, 1.60),
    (Provider::OpenAi, "gpt-4.1", 2.00, 8.00),
    (Provider::OpenAi, "o3-mini", 1.10, 4.40),
    (Provider::Anthropic, "claude-3-5-haiku", 0.80, 4.00),
    (Provider::Anthropic, "claude-sonnet-4", 3.00, 15.00),
    (Provider::Anthropic, "claude-3-7-sonnet", 3.00, 15.00),
    (Provider::Anthropic, "claude-opus-4", 15.00, 75.00),
    (Provider::Google, "gemini-2.0-flash", 0.10, 0.40),
    (Provider::Google, "gemini-2.5-pro", 1.25, 10.00),
    (Provider::Google, "gemini-2.5-flash", 0.30, 2.50),
    (Provider::OpenRouter, "openai/gpt-4o-mini", 0.15, 0.60),
    (Provider::OpenRouter, "openai/gpt-4o", 2.50, 10.00),
    (Provider::OpenRouter, "anthropic/claude-3.5-haiku", 0.80, 4.00),
    (Provider::OpenRouter, "anthropic/claude-sonnet-4", 3.00, 15.00),
];

/// Per-million-token (input, output) rates for a model.
fn rates_for(provider: Provider, model: &str) -> (f64, f64) {
    RATES
        .iter()
        .filter(|(p, prefix, _, _)| *p == provider && model.starts_with(prefix))
        .max_by_key(|(_, prefix, _, _)| prefix.len())
        .map(|(_, _, input, output)| (*input, *output))
        .unwrap_or(DEFAULT_RATE)
}

/// Cost in USD for one reasoning step.
pub fn cost_usd(provider: Provider, model: &str, input_tokens: u64, output_tokens: u64) -> f64 {
    let (input_rate, output_rate) = rates_for(provider, model);
    (input_tokens as f64 * input_rate + output_tokens as f64 * output_rate) / 1_000_000.0
}
