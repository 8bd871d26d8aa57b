//! Per-investigation cost ledger.
//!
//! One ledger exists per investigation. It is owned by that
//! investigation's monitor and dropped with it, so cost entries can never
//! leak across requests.

use serde::Serialize;

use crate::config::Provider;
use crate::llm::TokenUsage;

use super::pricing;

/// Cost of one completed reasoning step. Immutable after creation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepCost {
    /// Stable identifier, `llm-call-<n>` with a 1-based counter.
    pub step_id: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
    /// USD, computed from the pricing table at record time.
    pub cost: f64,
}

/// Aggregate view over a ledger's steps. Recomputed on demand.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CostSummary {
    pub provider: Provider,
    pub model: String,
    pub steps: Vec<StepCost>,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub total_tokens: u64,
    pub total_cost: f64,
}

/// Accumulates one [`StepCost`] per reasoning step.
#[derive(Debug)]
pub struct CostLedger {
    provider: Provider,
    model: String,
    steps: Vec<StepCost>,
}

impl CostLedger {
    pub fn new(provider: Provider, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            steps: Vec::new(),
        }
    }

    /// Record one completed reasoning step and return its cost entry.
    pub fn record_step(&mut self, usage: TokenUsage) -> &StepCost {
        let cost = pricing::cost_usd(
            self.provider,
            &self.model,
            usage.input_tokens,
            usage.output_tokens,
        );
        let step = StepCost {
            step_id: format!("llm-call-{}", self.steps.len() + 1),
            input_tokens: usage.input_tokens,
            output_tokens: usage.output_tokens,
            total_tokens: usage.total_tokens,
            cost,
        };
        self.steps.push(step);
        self.steps.last().expect("step just pushed")
    }

    /// Aggregate the recorded steps. Callable at any time, including
    /// mid-run.
    pub fn summary(&self) -> CostSummary {
        CostSummary {
            provider: self.provider,
            model: self.model.clone(),
            steps: self.steps.clone(),
            total_input_tokens: self.steps.iter().map(|s| s.input_tokens).sum(),
            total_output_tokens: self.steps.iter().map(|s| s.output_tokens).sum(),
            total_tokens: self.steps.iter().map(|s| s.total_tokens).sum(),
            total_cost: self.steps.iter().map(|s| s.cost).sum(),
        }
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }
}
