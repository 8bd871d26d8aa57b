//! # opsleuth
//!
//! A multi-agent investigation engine for operational incidents. A
//! freeform query ("checkout latency doubled since the 14:00 deploy") is
//! routed across specialized reasoning agents (APM data, error tracking,
//! cloud infrastructure), each running a bounded tool-calling loop, and
//! the findings are synthesized into one answer.
//!
//! ## Architecture
//!
//! ```text
//!            ┌─────────────────────────────┐
//!            │        Orchestrator         │
//!            │ (config, budgets, monitor)  │
//!            └──────────────┬──────────────┘
//!                           │
//!                           ▼
//!            ┌─────────────────────────────┐
//!            │     Supervisor / Router     │
//!            │  (keyword routing, synth)   │
//!            └───┬─────────┬─────────┬─────┘
//!                ▼         ▼         ▼
//!              apm       errors    infra
//!            (agent)    (agent)   (agent)
//! ```
//!
//! Every reasoning call and tool invocation is billed into a
//! per-investigation cost ledger and recorded in one interleaved execution
//! trace. Three budgets bound each run: a wall-clock deadline, a
//! supervisor hand-off limit, and a per-agent tool-call ceiling.
//!
//! ## Modules
//! - `orchestrator`: the `investigate` entry point
//! - `agents`: domain agents and the supervisor
//! - `budget`: pricing, cost ledger, execution budgets
//! - `trace`: ordered execution trace
//! - `llm`: provider abstraction and usage normalization
//! - `tools`: tool registry and namespace selection

pub mod agents;
pub mod api;
pub mod budget;
pub mod config;
pub mod error;
pub mod llm;
pub mod monitor;
pub mod orchestrator;
pub mod tools;
pub mod trace;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{Config, ConfigOverrides, InvestigationConfig, Provider};
pub use error::{ConfigError, InvestigationError};
pub use orchestrator::{InvestigationResult, Orchestrator};
