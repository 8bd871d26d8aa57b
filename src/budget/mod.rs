//! Budget module - cost tracking, model pricing, and execution budgets.
//!
//! # Key Concepts
//! - Pricing: static per-million-token rates by provider and model prefix
//! - Ledger: per-investigation accumulation of one cost entry per
//!   reasoning step
//! - Enforcer: recursion, tool-call, and wall-clock budgets derived from
//!   the resolved configuration

mod enforcer;
mod ledger;
mod pricing;

pub use enforcer::ExecutionBudget;
pub use ledger::{CostLedger, CostSummary, StepCost};
pub use pricing::cost_usd;
