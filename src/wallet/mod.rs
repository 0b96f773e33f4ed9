//! Wallet capability
//!
//! The rest of the agent talks to the chain only through [`WalletGateway`].
//! [`RpcGateway`] is the production implementation; the private key lives
//! in [`SecureWallet`] and never leaves this module.

mod rpc;
mod signer;

pub use rpc::RpcGateway;
pub use signer::SecureWallet;

use crate::{Error, Result};
use alloy::primitives::{Address, Bytes, TxHash, U256};
use async_trait::async_trait;
use std::time::Duration;

/// An unsigned call to submit from the agent's account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxRequest {
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
}

impl TxRequest {
    /// A contract call carrying no native value
    pub fn call(to: Address, data: impl Into<Bytes>) -> Self {
        Self {
            to,
            data: data.into(),
            value: U256::ZERO,
        }
    }
}

/// What the chain currently says about a submitted transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptStatus {
    /// No receipt yet
    Pending,
    Succeeded,
    Reverted,
}

/// Bounds for waiting on a transaction receipt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmationPolicy {
    pub poll_interval: Duration,
    pub timeout: Duration,
}

impl ConfirmationPolicy {
    pub const DEFAULT_POLL_SECS: u64 = 2;
    pub const DEFAULT_TIMEOUT_SECS: u64 = 300;
}

impl Default for ConfirmationPolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(Self::DEFAULT_POLL_SECS),
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Signing account plus read access to the chain
#[async_trait]
pub trait WalletGateway: Send + Sync {
    /// Public address of the signing account
    fn address(&self) -> Address;

    /// Native balance in wei
    async fn native_balance(&self) -> Result<U256>;

    /// ERC-20 balance of the signing account, in token base units
    async fn token_balance(&self, token: Address) -> Result<U256>;

    /// Read-only `eth_call`
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes>;

    /// Sign and submit; returns once the node accepted the transaction
    async fn send_transaction(&self, tx: TxRequest) -> Result<TxHash>;

    async fn receipt_status(&self, hash: TxHash) -> Result<ReceiptStatus>;

    /// Poll the receipt until the transaction succeeds.
    ///
    /// Fails with [`Error::TransactionReverted`] as soon as a reverted
    /// receipt shows up and with [`Error::ConfirmationTimeout`] once
    /// `policy.timeout` elapses while still pending.
    async fn wait_for_confirmation(&self, hash: TxHash, policy: &ConfirmationPolicy) -> Result<()> {
        let poll = async {
            loop {
                match self.receipt_status(hash).await? {
                    ReceiptStatus::Succeeded => return Ok(()),
                    ReceiptStatus::Reverted => return Err(Error::TransactionReverted(hash)),
                    ReceiptStatus::Pending => {
                        tracing::debug!(tx = %hash, "Transaction pending");
                        tokio::time::sleep(policy.poll_interval).await;
                    }
                }
            }
        };

        tokio::time::timeout(policy.timeout, poll)
            .await
            .map_err(|_| Error::ConfirmationTimeout {
                hash,
                waited: policy.timeout,
            })?
    }
}
