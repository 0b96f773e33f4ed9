//! JSON-RPC backed wallet gateway
//!
//! Wraps an alloy HTTP provider with the agent's signer attached. Gas,
//! nonce and chain id are filled by the provider's recommended fillers.

use super::{ReceiptStatus, SecureWallet, TxRequest, WalletGateway};
use crate::contracts::IERC20;
use crate::{Error, Result};
use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use url::Url;

pub struct RpcGateway {
    provider: DynProvider,
    address: Address,
}

impl RpcGateway {
    /// Connect to `rpc_url`, signing with `wallet`
    pub fn connect(rpc_url: Url, wallet: &SecureWallet) -> Self {
        let provider = ProviderBuilder::new()
            .wallet(wallet.wallet().clone())
            .connect_http(rpc_url)
            .erased();

        Self {
            provider,
            address: wallet.address(),
        }
    }
}

#[async_trait]
impl WalletGateway for RpcGateway {
    fn address(&self) -> Address {
        self.address
    }

    async fn native_balance(&self) -> Result<U256> {
        self.provider
            .get_balance(self.address)
            .await
            .map_err(|e| Error::Rpc(format!("Failed to get native balance: {}", e)))
    }

    async fn token_balance(&self, token: Address) -> Result<U256> {
        let data = IERC20::balanceOfCall {
            owner: self.address,
        }
        .abi_encode();

        let output = self.call(token, data.into()).await?;

        IERC20::balanceOfCall::abi_decode_returns(&output)
            .map_err(|e| Error::Decode(format!("balanceOf on {}: {}", token, e)))
    }

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes> {
        let tx = TransactionRequest::default()
            .from(self.address)
            .to(to)
            .input(data.into());

        self.provider
            .call(tx)
            .await
            .map_err(|e| Error::Rpc(format!("eth_call to {} failed: {}", to, e)))
    }

    async fn send_transaction(&self, tx: TxRequest) -> Result<TxHash> {
        let request = TransactionRequest::default()
            .from(self.address)
            .to(tx.to)
            .input(tx.data.into())
            .value(tx.value);

        let pending = self
            .provider
            .send_transaction(request)
            .await
            .map_err(|e| Error::Rpc(format!("Failed to send transaction to {}: {}", tx.to, e)))?;

        Ok(*pending.tx_hash())
    }

    async fn receipt_status(&self, hash: TxHash) -> Result<ReceiptStatus> {
        let receipt = self
            .provider
            .get_transaction_receipt(hash)
            .await
            .map_err(|e| Error::Rpc(format!("Failed to get receipt for {}: {}", hash, e)))?;

        Ok(match receipt {
            None => ReceiptStatus::Pending,
            Some(receipt) if receipt.status() => ReceiptStatus::Succeeded,
            Some(_) => ReceiptStatus::Reverted,
        })
    }
}

impl std::fmt::Debug for RpcGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcGateway")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}
