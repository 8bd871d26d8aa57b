//! Domain agents.
//!
//! A domain agent is one bounded reasoning loop over a single operational
//! domain (APM data, error tracking, cloud infrastructure). It is built by
//! [`build_agent`] from a domain spec, a model, and the toolset selected
//! for its namespace, and reports every completed reasoning call and tool
//! invocation to the investigation monitor.

mod supervisor;

pub use supervisor::{Supervisor, SupervisorOutcome};

use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;

use crate::budget::ExecutionBudget;
use crate::config::InvestigationConfig;
use crate::llm::{ChatMessage, ChatOptions, LlmClient, Role, ToolDefinition};
use crate::monitor::InvestigationMonitor;
use crate::tools::{Tool, ToolRegistry};

/// Static description of one investigation domain.
#[derive(Debug, Clone, Copy)]
pub struct DomainSpec {
    pub name: &'static str,
    /// Keywords for the deterministic router; longer keywords are treated
    /// as more specific.
    pub keywords: &'static [&'static str],
    pub system_prompt: &'static str,
}

/// Built-in investigation domains.
pub const DOMAINS: &[DomainSpec] = &[
    DomainSpec {
        name: "apm",
        keywords: &[
            "latency",
            "apdex",
            "throughput",
            "response time",
            "slow",
            "performance",
            "transaction",
            "metric",
        ],
        system_prompt: "You are an APM specialist. Investigate the reported issue using \
            application performance data: latency, throughput, error rates, and transaction \
            traces. Use your tools to pull real data before concluding. Report concrete \
            findings with numbers and time ranges.",
    },
    DomainSpec {
        name: "errors",
        keywords: &[
            "exception",
            "stack trace",
            "stacktrace",
            "crash",
            "error rate",
            "panic",
            "unhandled",
            "regression",
        ],
        system_prompt: "You are an error-tracking specialist. Investigate the reported issue \
            using error-tracking data: new issues, spikes, affected releases, and stack \
            traces. Use your tools to pull real data before concluding. Report the most \
            likely offending change or component.",
    },
    DomainSpec {
        name: "infra",
        keywords: &[
            "instance",
            "node",
            "pod",
            "deployment",
            "cpu",
            "memory",
            "disk",
            "autoscaling",
            "load balancer",
            "dns",
        ],
        system_prompt: "You are a cloud-infrastructure specialist. Investigate the reported \
            issue using infrastructure inventory and health data: instances, deployments, \
            resource saturation, and recent changes. Use your tools to pull real data before \
            concluding.",
    },
];

/// Look up a built-in domain spec by name.
pub fn domain_spec(name: &str) -> Option<&'static DomainSpec> {
    DOMAINS.iter().find(|d| d.name == name)
}

/// Build a domain agent wired with the toolset for its namespace.
pub fn build_agent(
    spec: &DomainSpec,
    llm: Arc<dyn LlmClient>,
    config: &InvestigationConfig,
    registry: &ToolRegistry,
) -> DomainAgent {
    DomainAgent {
        name: spec.name.to_string(),
        keywords: spec.keywords.iter().map(|k| k.to_string()).collect(),
        system_prompt: spec.system_prompt.to_string(),
        model: config.resolved_model(),
        options: ChatOptions {
            temperature: Some(config.temperature),
            max_tokens: Some(config.max_tokens),
        },
        llm,
        tools: registry.tools_for_source(spec.name),
    }
}

/// What one domain agent produced for an investigation.
#[derive(Debug, Clone)]
pub struct AgentFindings {
    pub text: String,
    pub tool_calls_made: u32,
    pub messages_used: usize,
    /// True when the tool-call ceiling forced early termination.
    pub truncated: bool,
}

/// One bounded reasoning agent for a single domain.
pub struct DomainAgent {
    name: String,
    keywords: Vec<String>,
    system_prompt: String,
    model: String,
    options: ChatOptions,
    llm: Arc<dyn LlmClient>,
    tools: Vec<Arc<dyn Tool>>,
}

impl DomainAgent {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    fn tool_definitions(&self) -> Option<Vec<ToolDefinition>> {
        if self.tools.is_empty() {
            return None;
        }
        Some(
            self.tools
                .iter()
                .map(|t| ToolDefinition::function(t.name(), t.description(), t.parameters_schema()))
                .collect(),
        )
    }

    fn find_tool(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name)
    }

    /// Run the reasoning loop for one investigation.
    ///
    /// Makes at least one LLM call. Tool calls execute one at a time under
    /// the per-step timeout; a failed or timed-out tool is recorded and an
    /// error message is fed back to the model rather than aborting the
    /// run. Exhausting the tool-call ceiling ends the loop early with the
    /// best-effort partial answer.
    pub async fn run(
        &self,
        query: &str,
        context: &str,
        budget: &ExecutionBudget,
        monitor: &mut InvestigationMonitor,
    ) -> anyhow::Result<AgentFindings> {
        let mut messages = vec![ChatMessage::new(Role::System, self.system_prompt.as_str())];
        if context.is_empty() {
            messages.push(ChatMessage::new(Role::User, query));
        } else {
            messages.push(ChatMessage::new(
                Role::User,
                format!("{query}\n\nFindings from other specialists so far:\n{context}"),
            ));
        }

        let tool_definitions = self.tool_definitions();
        let mut tool_calls_made = 0u32;
        let mut last_content: Option<String> = None;

        loop {
            let started = Instant::now();
            let response = self
                .llm
                .chat(
                    &self.model,
                    &messages,
                    tool_definitions.as_deref(),
                    self.options.clone(),
                )
                .await?;
            monitor.on_llm_call_complete(
                &self.name,
                response.usage.as_ref(),
                started.elapsed(),
                Some(response.tool_calls_decided()),
            );

            if let Some(content) = &response.content {
                if !content.trim().is_empty() {
                    last_content = Some(content.clone());
                }
            }

            let tool_calls = match response.tool_calls {
                Some(calls) if !calls.is_empty() => calls,
                _ => {
                    // Terminal turn: the model answered without tools.
                    return Ok(AgentFindings {
                        text: last_content
                            .unwrap_or_else(|| "(no findings produced)".to_string()),
                        tool_calls_made,
                        messages_used: messages.len() + 1,
                        truncated: false,
                    });
                }
            };

            messages.push(ChatMessage::assistant_tool_calls(
                response.content.clone(),
                tool_calls.clone(),
            ));

            for call in &tool_calls {
                if tool_calls_made >= budget.max_tool_calls {
                    tracing::info!(
                        agent = %self.name,
                        limit = budget.max_tool_calls,
                        "tool-call ceiling reached, terminating early"
                    );
                    return Ok(AgentFindings {
                        text: last_content.unwrap_or_else(|| {
                            "(tool budget exhausted before a conclusion was reached)".to_string()
                        }),
                        tool_calls_made,
                        messages_used: messages.len(),
                        truncated: true,
                    });
                }
                tool_calls_made += 1;

                let result = self.execute_tool_call(call, budget, monitor).await;
                messages.push(ChatMessage::tool_result(call.id.clone(), result));
            }
        }
    }

    /// Execute one tool call under the per-step timeout, record it, and
    /// return the content to feed back to the model.
    async fn execute_tool_call(
        &self,
        call: &crate::llm::ToolCall,
        budget: &ExecutionBudget,
        monitor: &mut InvestigationMonitor,
    ) -> String {
        let tool_name = call.function.name.clone();
        let started = Instant::now();

        let Some(tool) = self.find_tool(&tool_name) else {
            monitor.on_tool_call_complete(
                &self.name,
                &tool_name,
                started.elapsed(),
                Err("unknown tool".to_string()),
            );
            return format!("Error: unknown tool '{tool_name}'");
        };

        let args: Value = if call.function.arguments.trim().is_empty() {
            Value::Object(Default::default())
        } else {
            serde_json::from_str(&call.function.arguments)
                .unwrap_or_else(|_| Value::Object(Default::default()))
        };

        match budget.run_step(tool.invoke(args)).await {
            Ok(Ok(output)) => {
                // Tool backends that themselves call a model report usage
                // through message-level metadata; bill it like any step.
                if let Some(metadata) = &output.usage_metadata {
                    monitor.on_llm_call_complete(
                        &self.name,
                        Some(metadata),
                        started.elapsed(),
                        None,
                    );
                }
                monitor.on_tool_call_complete(&self.name, &tool_name, started.elapsed(), Ok(()));
                output.content
            }
            Ok(Err(e)) => {
                monitor.on_tool_call_complete(
                    &self.name,
                    &tool_name,
                    started.elapsed(),
                    Err(e.to_string()),
                );
                format!("Error: tool '{tool_name}' failed: {e}")
            }
            Err(()) => {
                monitor.on_tool_call_complete(
                    &self.name,
                    &tool_name,
                    started.elapsed(),
                    Err("timeout".to_string()),
                );
                format!(
                    "Error: tool '{tool_name}' timed out after {}ms",
                    budget.step_timeout.as_millis()
                )
            }
        }
    }
}
