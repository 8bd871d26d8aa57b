//! Execution budgets derived from a resolved configuration.
//!
//! Three independent budgets can each end a run: the outer wall-clock
//! deadline (enforced by the orchestrator as a timeout race), the
//! supervisor hand-off limit, and the per-agent tool-call ceiling. A
//! fourth, shorter per-step timeout bounds individual tool invocations so
//! one slow dependency cannot consume the whole request budget.

use std::future::Future;
use std::time::Duration;

use crate::config::InvestigationConfig;

/// Per-step timeout is this fraction of the outer deadline.
const STEP_TIMEOUT_DIVISOR: u64 = 5;
const MIN_STEP_TIMEOUT: Duration = Duration::from_secs(1);
const MAX_STEP_TIMEOUT: Duration = Duration::from_secs(30);

/// Resource budgets for one investigation.
#[derive(Debug, Clone, Copy)]
pub struct ExecutionBudget {
    /// Outer wall-clock deadline for the whole run.
    pub timeout: Duration,
    /// Deadline for one external tool call.
    pub step_timeout: Duration,
    /// Maximum supervisor/agent hand-offs.
    pub recursion_limit: u32,
    /// Maximum tool invocations per domain agent.
    pub max_tool_calls: u32,
}

impl ExecutionBudget {
    pub fn from_config(config: &InvestigationConfig) -> Self {
        let timeout = Duration::from_millis(config.timeout_ms);
        let step_timeout = (timeout / STEP_TIMEOUT_DIVISOR as u32)
            .clamp(MIN_STEP_TIMEOUT, MAX_STEP_TIMEOUT);
        Self {
            timeout,
            step_timeout,
            recursion_limit: config.recursion_limit,
            max_tool_calls: config.max_tool_calls,
        }
    }

    /// Run one external step under the per-step deadline.
    ///
    /// `Err(())` means the step timed out; the caller records it as a
    /// failed trace step and continues.
    pub async fn run_step<F, T>(&self, fut: F) -> Result<T, ()>
    where
        F: Future<Output = T>,
    {
        tokio::time::timeout(self.step_timeout, fut)
            .await
            .map_err(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{InvestigationConfig, Provider};

    #[test]
    fn test_step_timeout_is_fraction_of_deadline() {
        let mut config = InvestigationConfig::defaults(Provider::OpenAi);
        config.timeout_ms = 100_000;
        let budget = ExecutionBudget::from_config(&config);
        assert_eq!(budget.step_timeout, Duration::from_secs(20));
    }

    #[test]
    fn test_step_timeout_clamped() {
        let mut config = InvestigationConfig::defaults(Provider::OpenAi);

        config.timeout_ms = 1_000;
        let budget = ExecutionBudget::from_config(&config);
        assert_eq!(budget.step_timeout, MIN_STEP_TIMEOUT);

        config.timeout_ms = 600_000;
        let budget = ExecutionBudget::from_config(&config);
        assert_eq!(budget.step_timeout, MAX_STEP_TIMEOUT);
    }

    #[tokio::test]
    async fn test_run_step_timeout() {
        let mut config = InvestigationConfig::defaults(Provider::OpenAi);
        config.timeout_ms = 1_000;
        let budget = ExecutionBudget::from_config(&config);

        let ok = budget.run_step(async { 42 }).await;
        assert_eq!(ok, Ok(42));

        let slow = budget
            .run_step(tokio::time::sleep(Duration::from_secs(5)))
            .await;
        assert!(slow.is_err());
    }
}
