//! Error types for the yield guard agent

use alloy::primitives::TxHash;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Wallet error: {0}")]
    Wallet(String),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("ABI decode error: {0}")]
    Decode(String),

    #[error("Transaction {0} reverted")]
    TransactionReverted(TxHash),

    #[error("Transaction {hash} not confirmed after {}s", waited.as_secs())]
    ConfirmationTimeout { hash: TxHash, waited: Duration },

    #[error("Prompt error: {0}")]
    Prompt(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
