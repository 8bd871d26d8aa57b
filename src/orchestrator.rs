//! Investigation orchestration.
//!
//! [`Orchestrator::investigate`] is the single entry point: it resolves
//! the per-request configuration, constructs a fresh monitor (cost ledger
//! plus execution tracer) owned by this call alone, builds the supervisor
//! from the enabled domains, races the run against the wall-clock budget,
//! and assembles the final result. Concurrent investigations share only
//! the immutable tool registry and server config.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use crate::agents::{build_agent, domain_spec, Supervisor, DOMAINS};
use crate::budget::{CostSummary, ExecutionBudget};
use crate::config::{Config, ConfigOverrides, InvestigationConfig};
use crate::error::{ConfigError, InvestigationError, PartialDiagnostics};
use crate::llm::{HttpChatClient, LlmClient};
use crate::monitor::InvestigationMonitor;
use crate::tools::ToolRegistry;
use crate::trace::{TraceStep, TraceSummary};

/// Bounds on the freeform query text.
pub const QUERY_LEN_RANGE: (usize, usize) = (1, 10_000);

/// Final product of one investigation. Returned to the caller and then
/// discarded; nothing is persisted.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestigationResult {
    pub id: Uuid,
    pub query: String,
    pub raw_summary: String,
    pub structured_summary: Value,
    pub message_count: usize,
    pub duration_ms: u64,
    pub started_at: DateTime<Utc>,
    pub cost_summary: CostSummary,
    pub trace_summary: TraceSummary,
    pub trace: Vec<TraceStep>,
}

/// Drives investigations. One instance serves the whole process; all
/// per-request state lives inside each `investigate` call.
pub struct Orchestrator {
    config: Config,
    registry: Arc<ToolRegistry>,
    /// Test seam: replaces the HTTP provider client for every request.
    client_override: Option<Arc<dyn LlmClient>>,
}

impl Orchestrator {
    pub fn new(config: Config, registry: Arc<ToolRegistry>) -> Self {
        Self {
            config,
            registry,
            client_override: None,
        }
    }

    /// Use a fixed client instead of constructing one per provider.
    pub fn with_client(config: Config, registry: Arc<ToolRegistry>, llm: Arc<dyn LlmClient>) -> Self {
        Self {
            config,
            registry,
            client_override: Some(llm),
        }
    }

    fn client_for(&self, config: &InvestigationConfig) -> Result<Arc<dyn LlmClient>, ConfigError> {
        if let Some(client) = &self.client_override {
            return Ok(client.clone());
        }
        let api_key = self.config.api_key(config.provider)?;
        Ok(Arc::new(HttpChatClient::for_provider(config.provider, api_key)))
    }

    /// Resolve the enabled domain specs, defaulting to all built-ins.
    fn enabled_domains(
        enabled: Option<&[String]>,
    ) -> Result<Vec<&'static crate::agents::DomainSpec>, ConfigError> {
        match enabled {
            None => Ok(DOMAINS.iter().collect()),
            Some(names) => {
                if names.is_empty() {
                    return Err(ConfigError::OutOfBounds {
                        field: "domains",
                        detail: "at least one domain must be enabled".to_string(),
                    });
                }
                names
                    .iter()
                    .map(|name| {
                        domain_spec(name).ok_or_else(|| ConfigError::OutOfBounds {
                            field: "domains",
                            detail: format!("unknown domain '{name}'"),
                        })
                    })
                    .collect()
            }
        }
    }

    /// Investigate a freeform operational query.
    pub async fn investigate(
        &self,
        query: &str,
        overrides: Option<&ConfigOverrides>,
        enabled: Option<&[String]>,
    ) -> Result<InvestigationResult, InvestigationError> {
        let chars = query.chars().count();
        if chars < QUERY_LEN_RANGE.0 || chars > QUERY_LEN_RANGE.1 {
            return Err(ConfigError::OutOfBounds {
                field: "query",
                detail: format!(
                    "length {chars} is outside {}..={}",
                    QUERY_LEN_RANGE.0, QUERY_LEN_RANGE.1
                ),
            }
            .into());
        }

        // Everything that can be rejected is rejected before any model call.
        let config = InvestigationConfig::resolve(self.config.default_provider, overrides)?;
        let domains = Self::enabled_domains(enabled)?;
        let llm = self.client_for(&config)?;

        let id = Uuid::new_v4();
        tracing::info!(
            %id,
            provider = %config.provider,
            model = %config.resolved_model(),
            domains = domains.len(),
            "starting investigation"
        );

        let budget = ExecutionBudget::from_config(&config);
        // Fresh per call; dropped with this call. Never stored in shared state.
        let mut monitor = InvestigationMonitor::for_config(&config);

        let agents = domains
            .iter()
            .map(|spec| build_agent(spec, llm.clone(), &config, &self.registry))
            .collect();
        let supervisor = Supervisor::new(agents, llm, &config);

        let started_at = Utc::now();
        let started = Instant::now();

        let run_result =
            tokio::time::timeout(budget.timeout, supervisor.run(query, &budget, &mut monitor))
                .await;

        match run_result {
            Ok(Ok(outcome)) => {
                let (cost_summary, trace_summary, trace) = monitor.finish();
                let duration_ms = started.elapsed().as_millis() as u64;
                tracing::info!(
                    %id,
                    duration_ms,
                    handoffs = outcome.handoffs,
                    cost = cost_summary.total_cost,
                    "investigation complete"
                );
                Ok(InvestigationResult {
                    id,
                    query: query.to_string(),
                    raw_summary: outcome.raw_summary,
                    structured_summary: outcome.structured_summary,
                    message_count: outcome.message_count,
                    duration_ms,
                    started_at,
                    cost_summary,
                    trace_summary,
                    trace,
                })
            }
            Ok(Err(reason)) => {
                tracing::error!(%id, "investigation failed: {reason}");
                Err(InvestigationError::Agent {
                    reason,
                    partial: Box::new(Self::partial(monitor)),
                })
            }
            Err(_) => {
                // The raced future is dropped here; any in-flight step's
                // result is discarded rather than recorded late.
                tracing::warn!(%id, timeout_ms = config.timeout_ms, "investigation timed out");
                Err(InvestigationError::Timeout {
                    timeout_ms: config.timeout_ms,
                    partial: Box::new(Self::partial(monitor)),
                })
            }
        }
    }

    fn partial(monitor: InvestigationMonitor) -> PartialDiagnostics {
        let (cost_summary, trace_summary, trace) = monitor.finish();
        PartialDiagnostics {
            cost_summary,
            trace_summary,
            trace,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Provider;
    use crate::testing::{MockLlm, MockTool};
    use std::time::Duration;

    fn server_config() -> Config {
        Config {
            bind_addr: "127.0.0.1:0".to_string(),
            default_provider: Provider::OpenAi,
        }
    }

    fn orchestrator(llm: MockLlm, registry: ToolRegistry) -> Orchestrator {
        Orchestrator::with_client(server_config(), Arc::new(registry), Arc::new(llm))
    }

    fn apm_only() -> Option<Vec<String>> {
        Some(vec!["apm".to_string()])
    }

    #[tokio::test]
    async fn test_successful_investigation_assembles_result() {
        let llm = MockLlm::answering(&["p95 doubled after deploy", "rollback the deploy"]);
        let orchestrator = orchestrator(llm, ToolRegistry::new());

        let result = orchestrator
            .investigate("latency spike on checkout", None, apm_only().as_deref())
            .await
            .unwrap();

        assert_eq!(result.raw_summary, "rollback the deploy");
        assert_eq!(result.cost_summary.steps.len(), 2);
        assert_eq!(result.trace_summary.llm_calls, 2);
        let orders: Vec<u64> = result.trace.iter().map(|s| s.order()).collect();
        assert_eq!(orders, vec![1, 2]);
        assert!(result.structured_summary["domains"].is_array());
    }

    #[tokio::test]
    async fn test_invalid_config_fails_before_any_call() {
        let llm = MockLlm::new(); // would fail if called
        let orchestrator = orchestrator(llm, ToolRegistry::new());

        let overrides = ConfigOverrides {
            timeout_ms: Some(50),
            ..Default::default()
        };
        let err = orchestrator
            .investigate("q", Some(&overrides), None)
            .await
            .unwrap_err();
        assert!(err.is_client_error());
        assert!(err.partial().is_none());
    }

    #[tokio::test]
    async fn test_query_length_bounds() {
        let orchestrator = orchestrator(MockLlm::new(), ToolRegistry::new());

        let err = orchestrator.investigate("", None, None).await.unwrap_err();
        assert!(err.is_client_error());

        let long = "x".repeat(10_001);
        let err = orchestrator.investigate(&long, None, None).await.unwrap_err();
        assert!(err.is_client_error());
    }

    #[tokio::test]
    async fn test_unknown_domain_rejected() {
        let orchestrator = orchestrator(MockLlm::new(), ToolRegistry::new());
        let domains = vec!["apm".to_string(), "billing".to_string()];
        let err = orchestrator
            .investigate("q", None, Some(&domains))
            .await
            .unwrap_err();
        assert!(err.is_client_error());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_preserves_partial_trace() {
        // First call answers instantly, the synthesis call stalls past the
        // 1s deadline: the failure must still carry the completed step.
        let llm = MockLlm::answering(&["quick finding"])
            .then_answer_delayed("too late", Duration::from_secs(5));
        let orchestrator = orchestrator(llm, ToolRegistry::new());

        let overrides = ConfigOverrides {
            timeout_ms: Some(1_000),
            ..Default::default()
        };
        let err = orchestrator
            .investigate("Investigate issue X", Some(&overrides), apm_only().as_deref())
            .await
            .unwrap_err();

        match &err {
            InvestigationError::Timeout { timeout_ms, partial } => {
                assert_eq!(*timeout_ms, 1_000);
                // The pre-deadline step is present; nothing after it.
                assert_eq!(partial.trace.len(), 1);
                assert_eq!(partial.cost_summary.steps.len(), 1);
            }
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_agent_failure_carries_partials() {
        // Tool call succeeds, then the script runs dry and the follow-up
        // model call errors out.
        let llm = MockLlm::new().then_tool_call("apm__query_metrics", serde_json::json!({}));
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(MockTool::new("apm__query_metrics", "data")));
        let orchestrator = orchestrator(llm, registry);

        let err = orchestrator
            .investigate("latency spike", None, apm_only().as_deref())
            .await
            .unwrap_err();

        match &err {
            InvestigationError::Agent { partial, .. } => {
                // One llm step and one tool step completed before the failure.
                assert_eq!(partial.trace.len(), 2);
            }
            other => panic!("expected agent failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_concurrent_investigations_are_isolated() {
        let orchestrator_a = orchestrator(
            MockLlm::answering(&["finding a", "summary a"]),
            ToolRegistry::new(),
        );
        let orchestrator_b = orchestrator(
            MockLlm::answering(&["finding b", "summary b"]),
            ToolRegistry::new(),
        );

        let sources_a = apm_only();
        let sources_b = apm_only();
        let (a, b) = tokio::join!(
            orchestrator_a.investigate("latency spike", None, sources_a.as_deref()),
            orchestrator_b.investigate("latency spike", None, sources_b.as_deref()),
        );
        let (a, b) = (a.unwrap(), b.unwrap());

        // Each run has its own counters: both start at order 1 and bill
        // exactly their own two steps.
        assert_eq!(a.trace.iter().map(|s| s.order()).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(b.trace.iter().map(|s| s.order()).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(a.cost_summary.steps.len(), 2);
        assert_eq!(b.cost_summary.steps.len(), 2);
        assert_eq!(a.raw_summary, "summary a");
        assert_eq!(b.raw_summary, "summary b");
        assert_ne!(a.id, b.id);
    }
}
