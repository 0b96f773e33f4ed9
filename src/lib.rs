//! Yield Guard
//!
//! A treasury agent that keeps a single stablecoin balance near an idle
//! target and supplies the excess to an Aave V3 pool:
//! - Reads wallet, deployed and reserve-capacity state
//! - Decides between supply, withdraw and no action
//! - Approves, submits and confirms the resulting transaction
//!
//! # Safety Model
//!
//! - At most one cycle is in flight; overlapping ticks are skipped
//! - Interactive runs require operator confirmation before sending
//! - Private keys never leave the wallet module
//! - Optional JSONL journal of every finished cycle

pub mod config;
pub mod contracts;
pub mod cycle;
pub mod executor;
pub mod identity;
pub mod intent;
pub mod journal;
pub mod prompt;
pub mod runner;
pub mod state;
pub mod units;
pub mod wallet;

mod error;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use config::AgentConfig;
pub use cycle::{CycleOrchestrator, CycleOutcome, CycleStats, Supervision};
pub use error::{Error, Result};
pub use intent::{decide, Action, Intent, PolicyConfig};
pub use runner::AgentRunner;
pub use state::BalanceSnapshot;
pub use wallet::WalletGateway;
