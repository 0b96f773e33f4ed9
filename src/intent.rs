//! Rebalancing policy
//!
//! Pure decision logic: a balance snapshot plus the policy thresholds map to
//! exactly one recommended action. No I/O happens here, so the same inputs
//! always produce the same intent.
//!
//! Rules, in priority order:
//! 1. Supply: wallet balance exceeds `min_idle + min_supply_unit` and the
//!    venue still has capacity; the excess above `min_idle` is supplied.
//! 2. Withdraw: wallet balance is below `min_idle` and something is deployed;
//!    the deficit is withdrawn, capped at the deployed balance.
//! 3. None otherwise. Equality at either threshold lands here.

use crate::state::BalanceSnapshot;
use alloy::primitives::U256;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Idle target and supply granularity, in token base units
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyConfig {
    /// Balance the wallet should keep liquid
    pub min_idle_balance: U256,
    /// Excess above the idle target that must accumulate before supplying
    pub min_supply_unit: U256,
}

impl PolicyConfig {
    pub const DEFAULT_MIN_IDLE_BALANCE: u64 = 1_100_000; // 1.1 units of a 6-decimal token
    pub const DEFAULT_MIN_SUPPLY_UNIT: u64 = 100_000; // 0.1 units of a 6-decimal token

    pub fn new(min_idle_balance: U256, min_supply_unit: U256) -> Self {
        Self {
            min_idle_balance,
            min_supply_unit,
        }
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self::new(
            U256::from(Self::DEFAULT_MIN_IDLE_BALANCE),
            U256::from(Self::DEFAULT_MIN_SUPPLY_UNIT),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Supply,
    Withdraw,
    None,
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Supply => "supply",
            Action::Withdraw => "withdraw",
            Action::None => "none",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A recommended action with its justification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intent {
    pub action: Action,
    /// Base units to move; always zero for [`Action::None`]
    pub amount: U256,
    pub reason: String,
}

impl Intent {
    fn none(reason: String) -> Self {
        Self {
            action: Action::None,
            amount: U256::ZERO,
            reason,
        }
    }

    pub fn is_actionable(&self) -> bool {
        self.action != Action::None
    }
}

/// Decide what to do with the current balances.
pub fn decide(snapshot: &BalanceSnapshot, policy: &PolicyConfig) -> Intent {
    let wallet = snapshot.wallet_balance;
    let deployed = snapshot.deployed_balance;
    let min_idle = policy.min_idle_balance;
    let supply_threshold = min_idle.saturating_add(policy.min_supply_unit);

    if wallet > supply_threshold {
        if snapshot.capacity_reached {
            return Intent::none(format!(
                "Wallet balance ({wallet}) is above the supply threshold ({supply_threshold}) \
                 but the venue capacity reached its ceiling; cannot supply further."
            ));
        }

        return Intent {
            action: Action::Supply,
            amount: wallet - min_idle,
            reason: format!(
                "Wallet balance ({wallet}) exceeds min idle ({min_idle}) by more than the min \
                 supply unit. Supplying excess above idle target."
            ),
        };
    }

    if wallet < min_idle && !deployed.is_zero() {
        let deficit = min_idle - wallet;
        let amount = deficit.min(deployed);

        return Intent {
            action: Action::Withdraw,
            amount,
            reason: format!(
                "Wallet balance ({wallet}) is below min idle ({min_idle}). Withdrawing to \
                 replenish idle target."
            ),
        };
    }

    Intent::none("Wallet balance is within optimal range. No action needed.".to_string())
}
