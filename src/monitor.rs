//! Per-investigation monitoring.
//!
//! [`InvestigationMonitor`] owns exactly one cost ledger and one execution
//! tracer. The orchestrator constructs it at the start of each
//! `investigate` call and consumes it at the end, so per-request isolation
//! holds by ownership rather than by caller discipline. The supervisor and
//! domain agents report completed steps through the two `on_*` methods;
//! nothing else writes to the ledger or tracer.

use std::time::Duration;

use serde_json::Value;

use crate::budget::{CostLedger, CostSummary};
use crate::config::{InvestigationConfig, Provider};
use crate::llm::{normalize_usage, TokenUsage};
use crate::trace::{ExecutionTracer, TraceStep, TraceSummary};

/// Owns the cost ledger and execution tracer for one investigation.
#[derive(Debug)]
pub struct InvestigationMonitor {
    ledger: CostLedger,
    tracer: ExecutionTracer,
    verbose: bool,
}

impl InvestigationMonitor {
    pub fn new(provider: Provider, model: impl Into<String>, verbose: bool) -> Self {
        Self {
            ledger: CostLedger::new(provider, model),
            tracer: ExecutionTracer::new(),
            verbose,
        }
    }

    pub fn for_config(config: &InvestigationConfig) -> Self {
        Self::new(
            config.provider,
            config.resolved_model(),
            config.verbose_logging,
        )
    }

    /// Record a completed reasoning call.
    ///
    /// `usage_payload` is the provider's raw token accounting. An
    /// unrecognized payload is logged and billed as zero; partial
    /// visibility is preferred over failing the investigation.
    pub fn on_llm_call_complete(
        &mut self,
        agent: &str,
        usage_payload: Option<&Value>,
        duration: Duration,
        tool_calls_decided: Option<u32>,
    ) {
        let usage = match usage_payload.map(normalize_usage) {
            Some(Some(usage)) => usage,
            Some(None) => {
                tracing::warn!(agent, "unrecognized usage payload, recording zero-cost step");
                TokenUsage::default()
            }
            None => {
                tracing::warn!(agent, "no usage reported, recording zero-cost step");
                TokenUsage::default()
            }
        };

        let step = self.ledger.record_step(usage);
        let cost = step.cost;
        let duration_ms = duration.as_millis() as u64;
        self.tracer
            .record_llm_call(agent, usage.total_tokens, duration_ms, cost, tool_calls_decided);

        if self.verbose {
            tracing::info!(
                agent,
                tokens = usage.total_tokens,
                cost,
                duration_ms,
                "llm call complete"
            );
        } else {
            tracing::debug!(agent, tokens = usage.total_tokens, cost, duration_ms, "llm call complete");
        }
    }

    /// Record a completed or failed tool invocation.
    pub fn on_tool_call_complete(
        &mut self,
        agent: &str,
        tool_name: &str,
        duration: Duration,
        result: Result<(), String>,
    ) {
        let duration_ms = duration.as_millis() as u64;
        let (success, error) = match result {
            Ok(()) => (true, None),
            Err(e) => (false, Some(e)),
        };
        self.tracer
            .record_tool_execution(agent, tool_name, duration_ms, success, error.clone());

        if self.verbose {
            tracing::info!(agent, tool_name, success, duration_ms, ?error, "tool call complete");
        } else {
            tracing::debug!(agent, tool_name, success, duration_ms, ?error, "tool call complete");
        }
    }

    pub fn cost_summary(&self) -> CostSummary {
        self.ledger.summary()
    }

    pub fn trace_summary(&self) -> TraceSummary {
        self.tracer.summary()
    }

    /// Consume the monitor, yielding summaries plus the ordered trace.
    pub fn finish(self) -> (CostSummary, TraceSummary, Vec<TraceStep>) {
        let cost = self.ledger.summary();
        let trace_summary = self.tracer.summary();
        (cost, trace_summary, self.tracer.into_steps())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_llm_call_feeds_ledger_and_tracer() {
        let mut monitor = InvestigationMonitor::new(Provider::OpenAi, "unpriced-model", false);
        let payload = json!({"usage": {"input_tokens": 120, "output_tokens": 30}});
        monitor.on_llm_call_complete("apm", Some(&payload), Duration::from_millis(40), Some(1));

        let (cost, trace, steps) = monitor.finish();
        assert_eq!(cost.total_tokens, 150);
        assert!((cost.total_cost - 0.00081).abs() < 1e-9);
        assert_eq!(trace.llm_calls, 1);
        assert_eq!(steps.len(), 1);
    }

    #[test]
    fn test_unrecognized_usage_is_zero_cost() {
        let mut monitor = InvestigationMonitor::new(Provider::OpenAi, "gpt-4o", false);
        monitor.on_llm_call_complete(
            "errors",
            Some(&json!({"unrelated": true})),
            Duration::from_millis(10),
            None,
        );

        let (cost, trace, _) = monitor.finish();
        // The step is still visible in both ledger and trace.
        assert_eq!(cost.steps.len(), 1);
        assert_eq!(cost.total_cost, 0.0);
        assert_eq!(trace.llm_calls, 1);
    }

    #[test]
    fn test_shared_order_across_step_kinds() {
        let mut monitor = InvestigationMonitor::new(Provider::OpenAi, "gpt-4o", false);
        let payload = json!({"usage": {"input_tokens": 10, "output_tokens": 5}});
        monitor.on_llm_call_complete("infra", Some(&payload), Duration::from_millis(5), Some(1));
        monitor.on_tool_call_complete(
            "infra",
            "infra__list_instances",
            Duration::from_millis(3),
            Ok(()),
        );
        monitor.on_llm_call_complete("infra", Some(&payload), Duration::from_millis(5), None);

        let (_, _, steps) = monitor.finish();
        let orders: Vec<u64> = steps.iter().map(|s| s.order()).collect();
        assert_eq!(orders, vec![1, 2, 3]);
    }
}
