//! Typed errors for the investigation engine.
//!
//! Only two kinds propagate to callers as request failures: configuration
//! validation errors (client error, rejected before any model call) and
//! hard run failures (timeout or an uncaught agent error). Budget
//! exhaustion, individual tool failures, and unrecognized usage payloads
//! are absorbed into the trace and reported as part of a partial success.

use serde::Serialize;
use thiserror::Error;

use crate::budget::CostSummary;
use crate::config::Provider;
use crate::trace::{TraceStep, TraceSummary};

/// Configuration resolution failure. Always surfaced as a client error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {detail}")]
    OutOfBounds { field: &'static str, detail: String },

    #[error("no API key configured for provider {provider} (set {})", .provider.api_key_env())]
    MissingApiKey { provider: Provider },
}

/// Cost and trace data accumulated before a run failed. Attached to hard
/// failures so callers can still see what happened.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialDiagnostics {
    pub cost_summary: CostSummary,
    pub trace_summary: TraceSummary,
    pub trace: Vec<TraceStep>,
}

/// Failure of one `investigate` call.
#[derive(Debug, Error)]
pub enum InvestigationError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("investigation timed out after {timeout_ms}ms")]
    Timeout {
        timeout_ms: u64,
        partial: Box<PartialDiagnostics>,
    },

    #[error("investigation failed: {reason}")]
    Agent {
        reason: anyhow::Error,
        partial: Box<PartialDiagnostics>,
    },
}

impl InvestigationError {
    /// Whether this failure is the caller's fault (maps to HTTP 400).
    pub fn is_client_error(&self) -> bool {
        matches!(self, InvestigationError::Config(_))
    }

    /// Diagnostics accumulated before the failure, when any exist.
    pub fn partial(&self) -> Option<&PartialDiagnostics> {
        match self {
            InvestigationError::Timeout { partial, .. }
            | InvestigationError::Agent { partial, .. } => Some(partial),
            InvestigationError::Config(_) => None,
        }
    }
}
