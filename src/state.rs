//! Balance snapshot reader
//!
//! Reads the three inputs of the rebalancing policy, one after another:
//! the wallet's token balance, the deployed (aToken) balance and whether
//! the reserve's supply cap has been reached.

use crate::contracts::{self, IPoolDataProvider, VenueAddresses};
use crate::wallet::WalletGateway;
use crate::Result;
use alloy::primitives::U256;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// Point-in-time view of idle and deployed funds, in token base units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    pub wallet_balance: U256,
    pub deployed_balance: U256,
    pub capacity_reached: bool,
}

pub struct StateReader {
    gateway: Arc<dyn WalletGateway>,
    venue: VenueAddresses,
    /// Decimal precision of the underlying token, used to scale the supply cap
    token_decimals: u8,
}

impl StateReader {
    pub fn new(gateway: Arc<dyn WalletGateway>, venue: VenueAddresses, token_decimals: u8) -> Self {
        Self {
            gateway,
            venue,
            token_decimals,
        }
    }

    /// Read a fresh snapshot.
    ///
    /// Wallet balance and capacity reads are load-bearing and fail the call.
    /// A failed deployed-balance read is logged and counted as zero.
    pub async fn snapshot(&self) -> Result<BalanceSnapshot> {
        let wallet_balance = self.gateway.token_balance(self.venue.token).await?;
        let deployed_balance = self.deployed_balance().await;
        let capacity_reached = self.capacity_reached().await?;

        Ok(BalanceSnapshot {
            wallet_balance,
            deployed_balance,
            capacity_reached,
        })
    }

    async fn deployed_balance(&self) -> U256 {
        match self.gateway.token_balance(self.venue.position_token).await {
            Ok(balance) => balance,
            Err(e) => {
                warn!(
                    position_token = %self.venue.position_token,
                    error = %e,
                    "Failed to fetch deployed balance; treating as 0"
                );
                U256::ZERO
            }
        }
    }

    async fn capacity_reached(&self) -> Result<bool> {
        let gateway = self.gateway.as_ref();
        let caps = contracts::read(
            gateway,
            self.venue.data_provider,
            &IPoolDataProvider::getReserveCapsCall {
                asset: self.venue.token,
            },
        )
        .await?;

        // A zero cap means the reserve is uncapped
        if caps.supplyCap.is_zero() {
            debug!("Supply cap not set for reserve");
            return Ok(false);
        }

        let reserve = contracts::read(
            gateway,
            self.venue.data_provider,
            &IPoolDataProvider::getReserveDataCall {
                asset: self.venue.token,
            },
        )
        .await?;

        let total_supplied = reserve.totalAToken;
        let ceiling = scale_whole_units(caps.supplyCap, self.token_decimals);

        debug!(
            supply_cap = %caps.supplyCap,
            ceiling = %ceiling,
            total_supplied = %total_supplied,
            "Supply cap check"
        );

        Ok(total_supplied >= ceiling)
    }
}

/// Reserve caps are expressed in whole tokens; convert to base units.
fn scale_whole_units(whole: U256, decimals: u8) -> U256 {
    whole.saturating_mul(U256::from(10).pow(U256::from(decimals)))
}
