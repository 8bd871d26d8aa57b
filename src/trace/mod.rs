//! Execution tracing.
//!
//! One tracer exists per investigation. It records every reasoning call
//! and tool invocation in strict completion order: both step kinds share
//! a single monotonically increasing counter, so the trace reads as one
//! interleaved timeline rather than two parallel sequences.

use serde::Serialize;
use std::time::Instant;

/// One entry in the execution trace.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TraceStep {
    #[serde(rename_all = "camelCase")]
    LlmCall {
        /// Position in the shared step sequence, starting at 1.
        order: u64,
        agent: String,
        total_tokens: u64,
        duration_ms: u64,
        cost: f64,
        #[serde(skip_serializing_if = "Option::is_none")]
        tool_calls_decided: Option<u32>,
    },
    #[serde(rename_all = "camelCase")]
    ToolExecution {
        order: u64,
        agent: String,
        tool_name: String,
        duration_ms: u64,
        success: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

impl TraceStep {
    pub fn order(&self) -> u64 {
        match self {
            TraceStep::LlmCall { order, .. } | TraceStep::ToolExecution { order, .. } => *order,
        }
    }
}

/// Totals over all recorded steps.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceSummary {
    pub total_tokens: u64,
    pub total_cost: f64,
    pub llm_calls: u64,
    pub tool_executions: u64,
    /// Wall-clock time since the tracer was created.
    pub duration_ms: u64,
}

/// Per-investigation accumulator of [`TraceStep`] entries.
#[derive(Debug)]
pub struct ExecutionTracer {
    steps: Vec<TraceStep>,
    next_order: u64,
    started: Instant,
}

impl ExecutionTracer {
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            next_order: 1,
            started: Instant::now(),
        }
    }

    fn next_order(&mut self) -> u64 {
        let order = self.next_order;
        self.next_order += 1;
        order
    }

    /// Record a completed reasoning call.
    pub fn record_llm_call(
        &mut self,
        agent: &str,
        total_tokens: u64,
        duration_ms: u64,
        cost: f64,
        tool_calls_decided: Option<u32>,
    ) -> &TraceStep {
        let order = self.next_order();
        self.steps.push(TraceStep::LlmCall {
            order,
            agent: agent.to_string(),
            total_tokens,
            duration_ms,
            cost,
            tool_calls_decided,
        });
        self.steps.last().expect("step just pushed")
    }

    /// Record a completed (or failed) tool invocation.
    pub fn record_tool_execution(
        &mut self,
        agent: &str,
        tool_name: &str,
        duration_ms: u64,
        success: bool,
        error: Option<String>,
    ) -> &TraceStep {
        let order = self.next_order();
        self.steps.push(TraceStep::ToolExecution {
            order,
            agent: agent.to_string(),
            tool_name: tool_name.to_string(),
            duration_ms,
            success,
            error,
        });
        self.steps.last().expect("step just pushed")
    }

    pub fn steps(&self) -> &[TraceStep] {
        &self.steps
    }

    /// Consume the tracer, yielding the ordered steps.
    pub fn into_steps(self) -> Vec<TraceStep> {
        self.steps
    }

    pub fn summary(&self) -> TraceSummary {
        let mut total_tokens = 0;
        let mut total_cost = 0.0;
        let mut llm_calls = 0;
        let mut tool_executions = 0;
        for step in &self.steps {
            match step {
                TraceStep::LlmCall {
                    total_tokens: tokens,
                    cost,
                    ..
                } => {
                    total_tokens += tokens;
                    total_cost += cost;
                    llm_calls += 1;
                }
                TraceStep::ToolExecution { .. } => tool_executions += 1,
            }
        }
        TraceSummary {
            total_tokens,
            total_cost,
            llm_calls,
            tool_executions,
            duration_ms: self.started.elapsed().as_millis() as u64,
        }
    }
}

impl Default for ExecutionTracer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orders_are_contiguous_across_kinds() {
        let mut tracer = ExecutionTracer::new();
        tracer.record_llm_call("apm", 100, 50, 0.001, Some(2));
        tracer.record_tool_execution("apm", "apm__query_metrics", 30, true, None);
        tracer.record_tool_execution("apm", "apm__list_services", 10, false, Some("timeout".into()));
        tracer.record_llm_call("apm", 80, 40, 0.0008, None);
        tracer.record_llm_call("supervisor", 60, 20, 0.0005, None);

        let orders: Vec<u64> = tracer.steps().iter().map(TraceStep::order).collect();
        assert_eq!(orders, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_summary_counts_by_kind() {
        let mut tracer = ExecutionTracer::new();
        tracer.record_llm_call("errors", 100, 10, 0.002, None);
        tracer.record_llm_call("errors", 50, 10, 0.001, None);
        tracer.record_tool_execution("errors", "errors__search_issues", 25, true, None);

        let summary = tracer.summary();
        assert_eq!(summary.llm_calls, 2);
        assert_eq!(summary.tool_executions, 1);
        assert_eq!(summary.total_tokens, 150);
        assert!((summary.total_cost - 0.003).abs() < 1e-12);
    }

    #[test]
    fn test_failed_tool_step_keeps_error() {
        let mut tracer = ExecutionTracer::new();
        tracer.record_tool_execution("infra", "infra__list_instances", 5000, false, Some("timeout".into()));
        match &tracer.steps()[0] {
            TraceStep::ToolExecution { success, error, .. } => {
                assert!(!success);
                assert_eq!(error.as_deref(), Some("timeout"));
            }
            other => panic!("unexpected step: {other:?}"),
        }
    }
}
