//! Secure wallet implementation
//!
//! SECURITY: This is the ONLY place where private keys exist.
//! - Keys are held in alloy's PrivateKeySigner which handles crypto securely
//! - Keys are never serialized
//! - Keys are never logged

use crate::{Error, Result};
use alloy::network::EthereumWallet;
use alloy::primitives::Address;
use alloy::signers::local::{coins_bip39::English, MnemonicBuilder, PrivateKeySigner};
use secrecy::{ExposeSecret, SecretString};

/// Account index derived from a mnemonic (m/44'/60'/0'/0/0)
const PRIMARY_ACCOUNT_INDEX: u32 = 0;

/// Secure wallet that protects private keys
///
/// The private key is:
/// - Stored in alloy's PrivateKeySigner (handles crypto securely)
/// - Never serialized (no Serialize impl)
/// - Only reachable through the [`EthereumWallet`] handed to the provider
pub struct SecureWallet {
    /// Public address (safe to expose)
    address: Address,
    /// Ethereum wallet for alloy integration
    wallet: EthereumWallet,
}

impl SecureWallet {
    /// Create a wallet from seed material
    ///
    /// Accepts either a 0x-prefixed 32-byte hex private key or a BIP-39
    /// mnemonic, from which the primary account is derived.
    pub fn from_secret(secret: &SecretString) -> Result<Self> {
        let secret = secret.expose_secret().trim();

        if is_hex_key(secret) {
            Self::from_hex(secret)
        } else {
            Self::from_mnemonic(secret)
        }
    }

    /// Create a wallet from a hex-encoded private key
    pub fn from_hex(key_hex: &str) -> Result<Self> {
        // Remove 0x prefix if present
        let key_hex = key_hex.strip_prefix("0x").unwrap_or(key_hex);

        let signer: PrivateKeySigner = key_hex
            .parse()
            .map_err(|e| Error::Wallet(format!("Invalid private key: {}", e)))?;

        Ok(Self::from_signer(signer))
    }

    /// Derive the primary account from a BIP-39 mnemonic
    pub fn from_mnemonic(phrase: &str) -> Result<Self> {
        let signer = MnemonicBuilder::<English>::default()
            .phrase(phrase)
            .index(PRIMARY_ACCOUNT_INDEX)
            .map_err(|e| Error::Wallet(format!("Invalid derivation index: {}", e)))?
            .build()
            .map_err(|e| Error::Wallet(format!("Invalid seed phrase: {}", e)))?;

        Ok(Self::from_signer(signer))
    }

    fn from_signer(signer: PrivateKeySigner) -> Self {
        let address = signer.address();
        Self {
            address,
            wallet: EthereumWallet::from(signer),
        }
    }

    /// Get the public address (safe to share)
    pub fn address(&self) -> Address {
        self.address
    }

    /// Get a reference to the EthereumWallet for use with alloy providers
    ///
    /// This is safe because EthereumWallet only exposes signing operations,
    /// not the raw private key.
    pub fn wallet(&self) -> &EthereumWallet {
        &self.wallet
    }
}

fn is_hex_key(secret: &str) -> bool {
    secret
        .strip_prefix("0x")
        .is_some_and(|hex| hex.len() == 64 && hex.chars().all(|c| c.is_ascii_hexdigit()))
}

// Implement Debug manually to avoid exposing the signer
impl std::fmt::Debug for SecureWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureWallet")
            .field("address", &self.address)
            .field("signer", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Well-known development credentials (DO NOT use in production!)
    const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const TEST_MNEMONIC: &str = "test test test test test test test test test test test junk";
    const TEST_ADDRESS: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";

    #[test]
    fn test_wallet_from_hex() {
        let wallet = SecureWallet::from_hex(TEST_KEY).unwrap();

        assert_eq!(format!("{:?}", wallet.address()).to_lowercase(), TEST_ADDRESS);
    }

    #[test]
    fn test_mnemonic_derives_primary_account() {
        let wallet = SecureWallet::from_secret(&SecretString::from(TEST_MNEMONIC.to_string())).unwrap();

        assert_eq!(format!("{:?}", wallet.address()).to_lowercase(), TEST_ADDRESS);
    }

    #[test]
    fn test_secret_accepts_hex_key() {
        let wallet = SecureWallet::from_secret(&SecretString::from(TEST_KEY.to_string())).unwrap();

        assert_eq!(format!("{:?}", wallet.address()).to_lowercase(), TEST_ADDRESS);
    }

    #[test]
    fn test_rejects_garbage_phrase() {
        let err = SecureWallet::from_secret(&SecretString::from("not a seed".to_string())).unwrap_err();

        assert!(matches!(err, Error::Wallet(_)));
    }

    #[test]
    fn test_debug_redacts_key() {
        let wallet = SecureWallet::from_hex(TEST_KEY).unwrap();

        let debug_str = format!("{:?}", wallet);

        // Should not contain the private key
        assert!(!debug_str.contains("ac0974bec"));
        assert!(debug_str.contains("[REDACTED]"));
    }
}
