//! Configuration: server-level settings loaded from the environment, and
//! the per-investigation [`InvestigationConfig`] resolved from request
//! overrides with strict bounds checking.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Supported LLM providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    OpenAi,
    Anthropic,
    Google,
    OpenRouter,
}

impl Provider {
    /// OpenAI-compatible chat-completions endpoint for this provider.
    pub fn chat_completions_url(&self) -> &'static str {
        match self {
            Provider::OpenAi => "https://api.openai.com/v1/chat/completions",
            Provider::Anthropic => "https://api.anthropic.com/v1/chat/completions",
            Provider::Google => {
                "https://generativelanguage.googleapis.com/v1beta/openai/chat/completions"
            }
            Provider::OpenRouter => "https://openrouter.ai/api/v1/chat/completions",
        }
    }

    /// Model used when a request does not name one.
    pub fn default_model(&self) -> &'static str {
        match self {
            Provider::OpenAi => "gpt-4o-mini",
            Provider::Anthropic => "claude-3-5-haiku-latest",
            Provider::Google => "gemini-2.0-flash",
            Provider::OpenRouter => "openai/gpt-4o-mini",
        }
    }

    /// Environment variable holding this provider's API key.
    pub fn api_key_env(&self) -> &'static str {
        match self {
            Provider::OpenAi => "OPENAI_API_KEY",
            Provider::Anthropic => "ANTHROPIC_API_KEY",
            Provider::Google => "GOOGLE_API_KEY",
            Provider::OpenRouter => "OPENROUTER_API_KEY",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Provider::OpenAi => "openai",
            Provider::Anthropic => "anthropic",
            Provider::Google => "google",
            Provider::OpenRouter => "openrouter",
        };
        f.write_str(name)
    }
}

/// Server-level configuration loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP server binds to.
    pub bind_addr: String,
    /// Default provider for investigations that don't name one.
    pub default_provider: Provider,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// - `OPSLEUTH_BIND` - bind address (default `0.0.0.0:3000`)
    /// - `OPSLEUTH_PROVIDER` - default provider (default `openai`)
    /// - `<PROVIDER>_API_KEY` - API keys, looked up lazily per request
    pub fn from_env() -> Self {
        let bind_addr =
            std::env::var("OPSLEUTH_BIND").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        let default_provider = std::env::var("OPSLEUTH_PROVIDER")
            .ok()
            .and_then(|v| serde_json::from_value(serde_json::Value::String(v)).ok())
            .unwrap_or(Provider::OpenAi);

        Self {
            bind_addr,
            default_provider,
        }
    }

    /// Look up the API key for a provider.
    pub fn api_key(&self, provider: Provider) -> Result<String, ConfigError> {
        std::env::var(provider.api_key_env())
            .map_err(|_| ConfigError::MissingApiKey { provider })
    }
}

// Bounds for per-request configuration overrides. Out-of-range values are
// rejected before any model call is made.
pub const TEMPERATURE_RANGE: (f64, f64) = (0.0, 2.0);
pub const RECURSION_LIMIT_RANGE: (u32, u32) = (1, 100);
pub const MAX_TOOL_CALLS_RANGE: (u32, u32) = (1, 100);
pub const TIMEOUT_MS_RANGE: (u64, u64) = (1_000, 600_000);
pub const MAX_TOKENS_RANGE: (u64, u64) = (100, 128_000);

/// Resolved per-investigation configuration. Immutable once validated.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestigationConfig {
    pub provider: Provider,
    /// Model override; the provider default applies when absent.
    pub model: Option<String>,
    pub temperature: f64,
    /// Maximum supervisor/agent hand-offs before forced termination.
    pub recursion_limit: u32,
    /// Maximum tool invocations per domain agent.
    pub max_tool_calls: u32,
    /// Outer wall-clock deadline for the whole investigation.
    pub timeout_ms: u64,
    pub max_tokens: u64,
    /// Upgrade per-step trace events from debug to info logging.
    pub verbose_logging: bool,
}

impl InvestigationConfig {
    /// Defaults used when a request carries no overrides.
    pub fn defaults(provider: Provider) -> Self {
        Self {
            provider,
            model: None,
            temperature: 0.2,
            recursion_limit: 10,
            max_tool_calls: 15,
            timeout_ms: 120_000,
            max_tokens: 4_096,
            verbose_logging: false,
        }
    }

    /// Merge request overrides onto defaults and validate the result.
    pub fn resolve(
        default_provider: Provider,
        overrides: Option<&ConfigOverrides>,
    ) -> Result<Self, ConfigError> {
        let mut config = Self::defaults(default_provider);

        if let Some(o) = overrides {
            if let Some(provider) = o.provider {
                config.provider = provider;
            }
            if let Some(model) = &o.model {
                config.model = Some(model.clone());
            }
            if let Some(temperature) = o.temperature {
                config.temperature = temperature;
            }
            if let Some(recursion_limit) = o.recursion_limit {
                config.recursion_limit = recursion_limit;
            }
            if let Some(max_tool_calls) = o.max_tool_calls {
                config.max_tool_calls = max_tool_calls;
            }
            if let Some(timeout_ms) = o.timeout_ms {
                config.timeout_ms = timeout_ms;
            }
            if let Some(max_tokens) = o.max_tokens {
                config.max_tokens = max_tokens;
            }
            if let Some(verbose_logging) = o.verbose_logging {
                config.verbose_logging = verbose_logging;
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Check every field against its documented bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_f64("temperature", self.temperature, TEMPERATURE_RANGE)?;
        check_u32("recursionLimit", self.recursion_limit, RECURSION_LIMIT_RANGE)?;
        check_u32("maxToolCalls", self.max_tool_calls, MAX_TOOL_CALLS_RANGE)?;
        check_u64("timeoutMs", self.timeout_ms, TIMEOUT_MS_RANGE)?;
        check_u64("maxTokens", self.max_tokens, MAX_TOKENS_RANGE)?;
        if let Some(model) = &self.model {
            if model.trim().is_empty() {
                return Err(ConfigError::OutOfBounds {
                    field: "model",
                    detail: "must not be empty".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Model to use, falling back to the provider default.
    pub fn resolved_model(&self) -> String {
        self.model
            .clone()
            .unwrap_or_else(|| self.provider.default_model().to_string())
    }
}

/// Request-level overrides, all optional. Field names follow the wire
/// format of `POST /agent/investigate`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ConfigOverrides {
    pub provider: Option<Provider>,
    pub model: Option<String>,
    pub temperature: Option<f64>,
    pub recursion_limit: Option<u32>,
    pub max_tool_calls: Option<u32>,
    pub timeout_ms: Option<u64>,
    pub max_tokens: Option<u64>,
    pub verbose_logging: Option<bool>,
}

fn check_f64(field: &'static str, value: f64, (lo, hi): (f64, f64)) -> Result<(), ConfigError> {
    if !value.is_finite() || value < lo || value > hi {
        return Err(ConfigError::OutOfBounds {
            field,
            detail: format!("{value} is outside {lo}..={hi}"),
        });
    }
    Ok(())
}

fn check_u32(field: &'static str, value: u32, (lo, hi): (u32, u32)) -> Result<(), ConfigError> {
    if value < lo || value > hi {
        return Err(ConfigError::OutOfBounds {
            field,
            detail: format!("{value} is outside {lo}..={hi}"),
        });
    }
    Ok(())
}

fn check_u64(field: &'static str, value: u64, (lo, hi): (u64, u64)) -> Result<(), ConfigError> {
    if value < lo || value > hi {
        return Err(ConfigError::OutOfBounds {
            field,
            detail: format!("{value} is outside {lo}..={hi}"),
        });
    }
    Ok(())
}
