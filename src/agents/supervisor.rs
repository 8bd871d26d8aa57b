//! Supervisor: deterministic routing over domain agents plus final
//! synthesis.
//!
//! Routing is a keyword classifier, not a model decision: each domain is
//! scored by the total length of its keywords found in the query
//! (case-insensitive), so longer keywords count as more specific matches.
//! Agents are visited in descending score order, one hand-off each, every
//! hand-off counted against the recursion limit. When nothing matches, the
//! first enabled domain is consulted once as a fallback. The run ends in a
//! terminal synthesis step that composes the collected findings into one
//! answer.

use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;

use crate::budget::ExecutionBudget;
use crate::config::InvestigationConfig;
use crate::llm::{ChatMessage, ChatOptions, LlmClient, Role};
use crate::monitor::InvestigationMonitor;

use super::{AgentFindings, DomainAgent};

const SYNTHESIS_PROMPT: &str = "You are the lead investigator. Combine the specialist findings \
    below into one concise incident summary: what happened, the most likely cause, and the \
    recommended next step. Do not invent data the specialists did not report.";

/// What the supervisor produced for one investigation.
#[derive(Debug, Clone)]
pub struct SupervisorOutcome {
    pub raw_summary: String,
    pub structured_summary: Value,
    pub message_count: usize,
    pub handoffs: u32,
}

/// Routes an investigation across domain agents and synthesizes the result.
pub struct Supervisor {
    agents: Vec<DomainAgent>,
    llm: Arc<dyn LlmClient>,
    model: String,
    options: ChatOptions,
}

impl Supervisor {
    pub fn new(agents: Vec<DomainAgent>, llm: Arc<dyn LlmClient>, config: &InvestigationConfig) -> Self {
        Self {
            agents,
            llm,
            model: config.resolved_model(),
            options: ChatOptions {
                temperature: Some(config.temperature),
                max_tokens: Some(config.max_tokens),
            },
        }
    }

    /// Keyword specificity score of one agent for a query.
    fn score(agent: &DomainAgent, query_lower: &str) -> usize {
        agent
            .keywords()
            .iter()
            .filter(|k| query_lower.contains(k.as_str()))
            .map(|k| k.len())
            .sum()
    }

    /// Agent indices in visit order: positive scores descending, ties by
    /// registration order. Falls back to the first enabled agent when
    /// nothing scores.
    fn route(&self, query: &str) -> Vec<usize> {
        let query_lower = query.to_lowercase();
        let mut scored: Vec<(usize, usize)> = self
            .agents
            .iter()
            .enumerate()
            .map(|(idx, agent)| (idx, Self::score(agent, &query_lower)))
            .filter(|(_, score)| *score > 0)
            .collect();
        // Stable sort keeps registration order for equal scores.
        scored.sort_by(|a, b| b.1.cmp(&a.1));

        if scored.is_empty() && !self.agents.is_empty() {
            return vec![0];
        }
        scored.into_iter().map(|(idx, _)| idx).collect()
    }

    /// Run the investigation: visit routed agents, then synthesize.
    pub async fn run(
        &self,
        query: &str,
        budget: &ExecutionBudget,
        monitor: &mut InvestigationMonitor,
    ) -> anyhow::Result<SupervisorOutcome> {
        let mut findings: Vec<(String, AgentFindings)> = Vec::new();
        let mut context = String::new();
        let mut message_count = 0;
        let mut handoffs = 0u32;

        for idx in self.route(query) {
            if handoffs >= budget.recursion_limit {
                tracing::info!(
                    limit = budget.recursion_limit,
                    "recursion limit reached, forcing termination"
                );
                break;
            }
            handoffs += 1;

            let agent = &self.agents[idx];
            tracing::debug!(agent = %agent.name(), handoff = handoffs, "routing to domain agent");

            let result = agent.run(query, &context, budget, monitor).await?;
            message_count += result.messages_used;
            context.push_str(&format!("[{}] {}\n", agent.name(), result.text));
            findings.push((agent.name().to_string(), result));
        }

        let (raw_summary, synthesis_called) = self.synthesize(query, &findings, monitor).await;
        if synthesis_called {
            message_count += 2; // synthesis prompt + answer
        }

        let structured_summary = json!({
            "query": query,
            "domains": findings
                .iter()
                .map(|(name, f)| {
                    json!({
                        "domain": name,
                        "findings": f.text,
                        "toolCalls": f.tool_calls_made,
                        "truncated": f.truncated,
                    })
                })
                .collect::<Vec<_>>(),
            "conclusion": raw_summary,
        });

        Ok(SupervisorOutcome {
            raw_summary,
            structured_summary,
            message_count,
            handoffs,
        })
    }

    /// Terminal synthesis step. A synthesis failure degrades to the
    /// concatenated findings instead of failing the whole run. The flag in
    /// the return value reports whether a synthesis exchange completed, so
    /// the caller only counts the messages that actually happened.
    async fn synthesize(
        &self,
        query: &str,
        findings: &[(String, AgentFindings)],
        monitor: &mut InvestigationMonitor,
    ) -> (String, bool) {
        let fallback = || {
            if findings.is_empty() {
                "No domain agent produced findings for this query.".to_string()
            } else {
                findings
                    .iter()
                    .map(|(name, f)| format!("[{name}] {}", f.text))
                    .collect::<Vec<_>>()
                    .join("\n")
            }
        };

        let mut body = format!("Incident query: {query}\n\nSpecialist findings:\n");
        for (name, f) in findings {
            body.push_str(&format!("[{name}] {}\n", f.text));
        }

        let messages = [
            ChatMessage::new(Role::System, SYNTHESIS_PROMPT),
            ChatMessage::new(Role::User, body),
        ];

        let started = Instant::now();
        match self
            .llm
            .chat(&self.model, &messages, None, self.options.clone())
            .await
        {
            Ok(response) => {
                monitor.on_llm_call_complete(
                    "supervisor",
                    response.usage.as_ref(),
                    started.elapsed(),
                    None,
                );
                let summary = response
                    .content
                    .filter(|c| !c.trim().is_empty())
                    .unwrap_or_else(fallback);
                (summary, true)
            }
            Err(e) => {
                tracing::warn!("synthesis call failed, falling back to raw findings: {e}");
                (fallback(), false)
            }
        }
    }
}
