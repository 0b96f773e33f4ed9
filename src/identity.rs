//! ERC-8004 agent identity
//!
//! The agent can mint an identity NFT on the ERC-8004 registry so its
//! on-chain activity is attributable. Registration is optional: every
//! failure here is reported as a warning and never blocks rebalancing.

use crate::contracts::{self, IIdentityRegistry};
use crate::wallet::{ConfirmationPolicy, TxRequest, WalletGateway};
use crate::Result;
use alloy::primitives::{Address, TxHash};
use alloy::sol_types::SolCall;
use base64::prelude::{Engine as _, BASE64_STANDARD};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

const AGENT_DESCRIPTION: &str = "AI Yield Guard Agent";
/// Simple blue circle
const AGENT_IMAGE: &str = "data:image/svg+xml;base64,PHN2ZyB4bWxucz0iaHR0cDovL3d3dy53My5vcmcvMjAwMC9zdmciIHZpZXdCb3g9IjAgMCAxMDAgMTAwIj48Y2lyY2xlIGN4PSI1MCIgY3k9IjUwIiByPSI0MCIgZmlsbD0iIzQyODVGNCIgLz48L3N2Zz4=";

#[derive(Debug, Serialize)]
struct AgentMetadata<'a> {
    name: &'a str,
    description: &'a str,
    image: &'a str,
}

pub struct IdentityClient {
    gateway: Arc<dyn WalletGateway>,
    registry: Address,
    confirmation: ConfirmationPolicy,
}

impl IdentityClient {
    pub fn new(gateway: Arc<dyn WalletGateway>, registry: Address) -> Self {
        Self {
            gateway,
            registry,
            confirmation: ConfirmationPolicy::default(),
        }
    }

    /// Bound the wait for the registration receipt
    pub fn with_confirmation(mut self, confirmation: ConfirmationPolicy) -> Self {
        self.confirmation = confirmation;
        self
    }

    /// Whether the agent already holds an identity NFT.
    ///
    /// A failed lookup is logged and reported as not registered.
    pub async fn is_registered(&self) -> bool {
        let call = IIdentityRegistry::balanceOfCall {
            owner: self.gateway.address(),
        };

        match contracts::read(self.gateway.as_ref(), self.registry, &call).await {
            Ok(balance) => !balance.is_zero(),
            Err(e) => {
                warn!(registry = %self.registry, error = %e, "Failed to check registration status");
                false
            }
        }
    }

    /// Register `agent_name` and wait for the transaction to confirm
    pub async fn register(&self, agent_name: &str) -> Result<TxHash> {
        info!(agent_name, registry = %self.registry, "Preparing to register agent");

        let data = IIdentityRegistry::registerCall {
            tokenURI: token_uri(agent_name)?,
        }
        .abi_encode();

        let hash = self
            .gateway
            .send_transaction(TxRequest::call(self.registry, data))
            .await?;
        info!(tx = %hash, "Registration sent, waiting for confirmation");

        self.gateway
            .wait_for_confirmation(hash, &self.confirmation)
            .await?;
        info!(tx = %hash, "Agent identity registered");

        Ok(hash)
    }
}

/// Registration metadata as a `data:` URI
fn token_uri(agent_name: &str) -> Result<String> {
    let metadata = serde_json::to_string(&AgentMetadata {
        name: agent_name,
        description: AGENT_DESCRIPTION,
        image: AGENT_IMAGE,
    })?;

    Ok(format!(
        "data:application/json;base64,{}",
        BASE64_STANDARD.encode(metadata)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeGateway, ReceiptBehavior, SentCall};
    use crate::Error;

    fn client(gateway: &Arc<FakeGateway>) -> IdentityClient {
        IdentityClient::new(gateway.clone(), gateway.registry())
            .with_confirmation(FakeGateway::fast_execution().confirmation)
    }

    #[tokio::test]
    async fn reports_registration_from_balance() {
        let gateway = Arc::new(FakeGateway::new());
        gateway.set_registered(false);
        assert!(!client(&gateway).is_registered().await);

        gateway.set_registered(true);
        assert!(client(&gateway).is_registered().await);
    }

    #[tokio::test]
    async fn lookup_failure_reads_as_unregistered() {
        let gateway = Arc::new(FakeGateway::new());
        gateway.set_registered(true);
        gateway.fail_calls(IIdentityRegistry::balanceOfCall::SELECTOR);

        assert!(!client(&gateway).is_registered().await);
    }

    #[tokio::test]
    async fn register_sends_metadata_uri() {
        let gateway = Arc::new(FakeGateway::new());

        client(&gateway).register("Treasury Bot").await.unwrap();

        let calls = gateway.sent_calls();
        assert_eq!(calls.len(), 1);
        match &calls[0] {
            SentCall::Register {
                registry,
                token_uri,
            } => {
                assert_eq!(*registry, gateway.registry());
                let payload = token_uri
                    .strip_prefix("data:application/json;base64,")
                    .unwrap();
                let json: serde_json::Value =
                    serde_json::from_slice(&BASE64_STANDARD.decode(payload).unwrap()).unwrap();
                assert_eq!(json["name"], "Treasury Bot");
                assert_eq!(json["description"], AGENT_DESCRIPTION);
            }
            other => panic!("unexpected call: {other:?}"),
        }
    }

    #[tokio::test]
    async fn reverted_registration_is_an_error() {
        let gateway = Arc::new(FakeGateway::new());
        gateway.set_receipt_behavior(ReceiptBehavior::Revert);

        let err = client(&gateway).register("Treasury Bot").await.unwrap_err();
        assert!(matches!(err, Error::TransactionReverted(_)));
    }
}
