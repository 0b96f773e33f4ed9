//! Action executor
//!
//! Turns a supply or withdraw intent into confirmed transactions against the
//! lending pool. Nothing here retries: any failure is returned to the caller
//! and the next cycle starts again from fresh on-chain state.

use crate::contracts::{self, VenueAddresses, IERC20, IPool};
use crate::intent::{Action, Intent};
use crate::wallet::{ConfirmationPolicy, TxRequest, WalletGateway};
use crate::Result;
use alloy::primitives::{TxHash, U256};
use alloy::sol_types::SolCall;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Aave referral code for untagged deposits
const NO_REFERRAL: u16 = 0;

/// Transactions sent while executing one intent
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionRecord {
    /// Allowance approval, when the existing one was too small
    pub approval: Option<TxHash>,
    /// The supply or withdraw transaction
    pub transfer: TxHash,
}

/// Timing knobs for the execution step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionConfig {
    pub confirmation: ConfirmationPolicy,
    /// Pause after a confirmed approval before supplying
    pub propagation_delay: Duration,
}

impl ExecutionConfig {
    pub const DEFAULT_PROPAGATION_DELAY_SECS: u64 = 5;
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            confirmation: ConfirmationPolicy::default(),
            propagation_delay: Duration::from_secs(Self::DEFAULT_PROPAGATION_DELAY_SECS),
        }
    }
}

pub struct ActionExecutor {
    gateway: Arc<dyn WalletGateway>,
    venue: VenueAddresses,
    config: ExecutionConfig,
}

impl ActionExecutor {
    pub fn new(
        gateway: Arc<dyn WalletGateway>,
        venue: VenueAddresses,
        config: ExecutionConfig,
    ) -> Self {
        Self {
            gateway,
            venue,
            config,
        }
    }

    /// Execute `intent`; returns `None` when there is nothing to do.
    pub async fn execute(&self, intent: &Intent) -> Result<Option<ExecutionRecord>> {
        let record = match intent.action {
            Action::None => return Ok(None),
            Action::Supply => self.supply(intent.amount).await?,
            Action::Withdraw => self.withdraw(intent.amount).await?,
        };

        Ok(Some(record))
    }

    async fn supply(&self, amount: U256) -> Result<ExecutionRecord> {
        info!(amount = %amount, pool = %self.venue.pool, "Preparing to supply to pool");

        let approval = self.approve_if_needed(amount).await?;
        if let Some(hash) = approval {
            info!(tx = %hash, "Approval sent, waiting for confirmation");
            self.gateway
                .wait_for_confirmation(hash, &self.config.confirmation)
                .await?;
            info!(
                delay_secs = self.config.propagation_delay.as_secs_f64(),
                "Approval confirmed, waiting for propagation"
            );
            tokio::time::sleep(self.config.propagation_delay).await;
        }

        let data = IPool::supplyCall {
            asset: self.venue.token,
            amount,
            onBehalfOf: self.gateway.address(),
            referralCode: NO_REFERRAL,
        }
        .abi_encode();

        let transfer = self.submit(TxRequest::call(self.venue.pool, data)).await?;

        Ok(ExecutionRecord { approval, transfer })
    }

    async fn withdraw(&self, amount: U256) -> Result<ExecutionRecord> {
        info!(amount = %amount, pool = %self.venue.pool, "Preparing to withdraw from pool");

        let data = IPool::withdrawCall {
            asset: self.venue.token,
            amount,
            to: self.gateway.address(),
        }
        .abi_encode();

        let transfer = self.submit(TxRequest::call(self.venue.pool, data)).await?;

        Ok(ExecutionRecord {
            approval: None,
            transfer,
        })
    }

    /// Approve an unlimited allowance for the pool when the current one
    /// does not cover `amount`. Returns the approval hash if one was sent.
    async fn approve_if_needed(&self, amount: U256) -> Result<Option<TxHash>> {
        let current = contracts::read(
            self.gateway.as_ref(),
            self.venue.token,
            &IERC20::allowanceCall {
                owner: self.gateway.address(),
                spender: self.venue.pool,
            },
        )
        .await?;

        if current >= amount {
            info!(allowance = %current, "Allowance sufficient, skipping approval");
            return Ok(None);
        }

        info!(allowance = %current, "Allowance insufficient, approving unlimited");

        let data = IERC20::approveCall {
            spender: self.venue.pool,
            amount: U256::MAX,
        }
        .abi_encode();

        let hash = self
            .gateway
            .send_transaction(TxRequest::call(self.venue.token, data))
            .await?;

        Ok(Some(hash))
    }

    async fn submit(&self, tx: TxRequest) -> Result<TxHash> {
        let hash = self.gateway.send_transaction(tx).await?;
        info!(tx = %hash, "Transaction sent, waiting for confirmation");

        self.gateway
            .wait_for_confirmation(hash, &self.config.confirmation)
            .await?;
        info!(tx = %hash, "Transaction confirmed");

        Ok(hash)
    }
}
