//! Contract surface of the lending venue
//!
//! Minimal ABIs for the ERC-20 token, the Aave V3 pool, the Aave protocol
//! data provider and the ERC-8004 identity registry. Calls are encoded here
//! and sent through the [`WalletGateway`] so nothing in this module talks to
//! the network directly.

use crate::wallet::WalletGateway;
use crate::{Error, Result};
use alloy::primitives::Address;
use alloy::sol;
use alloy::sol_types::SolCall;

sol! {
    #[allow(missing_docs)]
    interface IERC20 {
        function balanceOf(address owner) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
        function symbol() external view returns (string);
    }
}

sol! {
    #[allow(missing_docs)]
    interface IPool {
        function supply(address asset, uint256 amount, address onBehalfOf, uint16 referralCode) external;
        function withdraw(address asset, uint256 amount, address to) external returns (uint256);
    }
}

sol! {
    #[allow(missing_docs)]
    interface IPoolDataProvider {
        function getReserveCaps(address asset) external view returns (uint256 borrowCap, uint256 supplyCap);
        function getReserveData(address asset) external view returns (
            uint256 unbacked,
            uint256 accruedToTreasury,
            uint256 totalAToken,
            uint256 totalStableDebt,
            uint256 totalVariableDebt,
            uint256 liquidityRate,
            uint256 variableBorrowRate,
            uint256 stableBorrowRate,
            uint256 averageStableBorrowRate,
            uint256 liquidityIndex,
            uint256 variableBorrowIndex,
            uint40 lastUpdateTimestamp
        );
    }
}

sol! {
    #[allow(missing_docs)]
    interface IIdentityRegistry {
        function register(string tokenURI) external returns (uint256);
        function balanceOf(address owner) external view returns (uint256);
    }
}

/// Addresses of the token and the venue contracts this agent works against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VenueAddresses {
    /// Underlying ERC-20 held idle in the wallet
    pub token: Address,
    /// Aave V3 pool receiving supply/withdraw calls
    pub pool: Address,
    /// aToken representing the deployed position
    pub position_token: Address,
    /// Protocol data provider exposing reserve caps and totals
    pub data_provider: Address,
}

/// Run a read-only call and decode its return value.
pub async fn read<C: SolCall>(
    gateway: &dyn WalletGateway,
    to: Address,
    call: &C,
) -> Result<C::Return> {
    let output = gateway.call(to, call.abi_encode().into()).await?;
    C::abi_decode_returns(&output)
        .map_err(|e| Error::Decode(format!("{} on {}: {}", C::SIGNATURE, to, e)))
}
