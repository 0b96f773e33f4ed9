//! Configuration for the yield guard agent
//!
//! Everything comes from environment variables (a `.env` file is loaded by
//! the binary first). The result is a plain struct handed to constructors;
//! changing a value requires a restart.
//!
//! # Examples
//!
//! ```bash
//! export AGENT_SEED_PHRASE="test test test test test test test test test test test junk"
//! export RPC_URL="https://sepolia.base.org"
//! export TOKEN_ADDRESS="0x0a215D8ba66387DCA84B284D18c3B4ec3de6E54a"
//! export AAVE_POOL_ADDRESS="0x8bAB6d1b75f19e9eD9fCe8b9BD338844fF79aE27"
//! export AAVE_ATOKEN_ADDRESS="0x..."
//! export AAVE_DATA_PROVIDER_ADDRESS="0x..."
//! ```

use crate::contracts::VenueAddresses;
use crate::executor::ExecutionConfig;
use crate::intent::PolicyConfig;
use crate::wallet::ConfirmationPolicy;
use crate::{Error, Result};
use alloy::primitives::{address, Address, U256};
use secrecy::SecretString;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

/// Environment variable names
pub mod env_vars {
    pub const AGENT_SEED_PHRASE: &str = "AGENT_SEED_PHRASE";
    pub const RPC_URL: &str = "RPC_URL";
    pub const TOKEN_ADDRESS: &str = "TOKEN_ADDRESS";
    pub const AAVE_POOL_ADDRESS: &str = "AAVE_POOL_ADDRESS";
    pub const AAVE_ATOKEN_ADDRESS: &str = "AAVE_ATOKEN_ADDRESS";
    pub const AAVE_DATA_PROVIDER_ADDRESS: &str = "AAVE_DATA_PROVIDER_ADDRESS";
    pub const ERC8004_IDENTITY_REGISTRY: &str = "ERC8004_IDENTITY_REGISTRY";
    pub const AGENT_NAME: &str = "AGENT_NAME";

    // Strategy (token base units)
    pub const MIN_IDLE_BALANCE: &str = "MIN_IDLE_BALANCE";
    pub const MIN_SUPPLY_UNIT: &str = "MIN_SUPPLY_UNIT";
    pub const TOKEN_DECIMALS: &str = "TOKEN_DECIMALS";

    // Execution timing
    pub const CONFIRMATION_POLL_SECS: &str = "CONFIRMATION_POLL_SECS";
    pub const CONFIRMATION_TIMEOUT_SECS: &str = "CONFIRMATION_TIMEOUT_SECS";
    pub const PROPAGATION_DELAY_SECS: &str = "PROPAGATION_DELAY_SECS";

    pub const AUDIT_LOG_PATH: &str = "AUDIT_LOG_PATH";
}

/// ERC-8004 identity registry used when none is configured
pub const DEFAULT_IDENTITY_REGISTRY: Address =
    address!("8004aa63c570c570ebf15376c0db199918bfe9fb");
pub const DEFAULT_AGENT_NAME: &str = "AI Yield Guard";
/// USDT / USDC precision
pub const DEFAULT_TOKEN_DECIMALS: u8 = 6;

/// Main configuration
#[derive(Debug)]
pub struct AgentConfig {
    /// Mnemonic or hex private key of the agent account
    pub seed: SecretString,
    pub rpc_url: Url,
    pub venue: VenueAddresses,
    pub identity_registry: Address,
    pub agent_name: String,
    pub policy: PolicyConfig,
    /// Decimal precision of the underlying token
    pub token_decimals: u8,
    pub execution: ExecutionConfig,
    /// Cycle journal (JSONL); disabled when unset
    pub audit_log_path: Option<PathBuf>,
}

impl AgentConfig {
    /// Load from the process environment, optionally replacing the seed
    pub fn from_env(seed_override: Option<String>) -> Result<Self> {
        Self::from_lookup(|key| {
            if key == env_vars::AGENT_SEED_PHRASE {
                if let Some(seed) = &seed_override {
                    return Some(seed.clone());
                }
            }
            std::env::var(key).ok()
        })
    }

    /// Load from an arbitrary key lookup.
    ///
    /// Every problem found is reported in a single [`Error::Config`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut vars = Vars {
            lookup,
            problems: Vec::new(),
        };

        let seed = vars.required(env_vars::AGENT_SEED_PHRASE, |raw| {
            Ok(SecretString::from(raw.to_string()))
        });
        let rpc_url = vars.required(env_vars::RPC_URL, parse_url);
        let token = vars.required(env_vars::TOKEN_ADDRESS, parse_address);
        let pool = vars.required(env_vars::AAVE_POOL_ADDRESS, parse_address);
        let position_token = vars.required(env_vars::AAVE_ATOKEN_ADDRESS, parse_address);
        let data_provider = vars.required(env_vars::AAVE_DATA_PROVIDER_ADDRESS, parse_address);

        let identity_registry = vars.optional(
            env_vars::ERC8004_IDENTITY_REGISTRY,
            DEFAULT_IDENTITY_REGISTRY,
            parse_address,
        );
        let agent_name = vars.optional(env_vars::AGENT_NAME, DEFAULT_AGENT_NAME.to_string(), |raw| {
            Ok(raw.to_string())
        });

        let defaults = PolicyConfig::default();
        let min_idle_balance = vars.optional(
            env_vars::MIN_IDLE_BALANCE,
            defaults.min_idle_balance,
            parse_amount,
        );
        let min_supply_unit = vars.optional(
            env_vars::MIN_SUPPLY_UNIT,
            defaults.min_supply_unit,
            parse_amount,
        );
        let token_decimals = vars.optional(
            env_vars::TOKEN_DECIMALS,
            DEFAULT_TOKEN_DECIMALS,
            parse_decimals,
        );

        let poll_secs = vars.optional(
            env_vars::CONFIRMATION_POLL_SECS,
            ConfirmationPolicy::DEFAULT_POLL_SECS,
            parse_secs,
        );
        let timeout_secs = vars.optional(
            env_vars::CONFIRMATION_TIMEOUT_SECS,
            ConfirmationPolicy::DEFAULT_TIMEOUT_SECS,
            parse_secs,
        );
        let propagation_secs = vars.optional(
            env_vars::PROPAGATION_DELAY_SECS,
            ExecutionConfig::DEFAULT_PROPAGATION_DELAY_SECS,
            parse_secs,
        );
        let audit_log_path = vars.optional_unset(env_vars::AUDIT_LOG_PATH, |raw| {
            Ok(PathBuf::from(raw))
        });

        if poll_secs == Some(0) {
            vars.problem(env_vars::CONFIRMATION_POLL_SECS, "must be at least 1");
        }
        if timeout_secs == Some(0) {
            vars.problem(env_vars::CONFIRMATION_TIMEOUT_SECS, "must be at least 1");
        }

        if !vars.problems.is_empty() {
            return Err(Error::Config(format!(
                "Invalid environment variables: {}",
                vars.problems.join("; ")
            )));
        }

        // All Nones were recorded as problems above
        match (
            seed,
            rpc_url,
            token,
            pool,
            position_token,
            data_provider,
            identity_registry,
            agent_name,
            min_idle_balance,
            min_supply_unit,
            token_decimals,
            poll_secs,
            timeout_secs,
            propagation_secs,
            audit_log_path,
        ) {
            (
                Some(seed),
                Some(rpc_url),
                Some(token),
                Some(pool),
                Some(position_token),
                Some(data_provider),
                Some(identity_registry),
                Some(agent_name),
                Some(min_idle_balance),
                Some(min_supply_unit),
                Some(token_decimals),
                Some(poll_secs),
                Some(timeout_secs),
                Some(propagation_secs),
                Some(audit_log_path),
            ) => Ok(Self {
                seed,
                rpc_url,
                venue: VenueAddresses {
                    token,
                    pool,
                    position_token,
                    data_provider,
                },
                identity_registry,
                agent_name,
                policy: PolicyConfig::new(min_idle_balance, min_supply_unit),
                token_decimals,
                execution: ExecutionConfig {
                    confirmation: ConfirmationPolicy {
                        poll_interval: Duration::from_secs(poll_secs),
                        timeout: Duration::from_secs(timeout_secs),
                    },
                    propagation_delay: Duration::from_secs(propagation_secs),
                },
                audit_log_path,
            }),
            _ => Err(Error::Config("Invalid environment variables".to_string())),
        }
    }
}

/// Collects parse results and problems while reading variables
struct Vars<F> {
    lookup: F,
    problems: Vec<String>,
}

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn problem(&mut self, key: &str, message: impl std::fmt::Display) {
        self.problems.push(format!("{}: {}", key, message));
    }

    fn parse<T>(
        &mut self,
        key: &str,
        raw: &str,
        parse: impl Fn(&str) -> std::result::Result<T, String>,
    ) -> Option<T> {
        match parse(raw) {
            Ok(value) => Some(value),
            Err(message) => {
                self.problem(key, message);
                None
            }
        }
    }

    fn required<T>(
        &mut self,
        key: &str,
        parse: impl Fn(&str) -> std::result::Result<T, String>,
    ) -> Option<T> {
        match self.get(key) {
            Some(raw) => self.parse(key, &raw, parse),
            None => {
                self.problem(key, "is required");
                None
            }
        }
    }

    fn optional<T>(
        &mut self,
        key: &str,
        default: T,
        parse: impl Fn(&str) -> std::result::Result<T, String>,
    ) -> Option<T> {
        match self.get(key) {
            Some(raw) => self.parse(key, &raw, parse),
            None => Some(default),
        }
    }

    /// Optional without a default: `Some(None)` when unset
    fn optional_unset<T>(
        &mut self,
        key: &str,
        parse: impl Fn(&str) -> std::result::Result<T, String>,
    ) -> Option<Option<T>> {
        match self.get(key) {
            Some(raw) => self.parse(key, &raw, parse).map(Some),
            None => Some(None),
        }
    }
}

fn parse_url(raw: &str) -> std::result::Result<Url, String> {
    let url = Url::parse(raw).map_err(|e| format!("must be a valid URL ({})", e))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(format!("unsupported URL scheme '{}'", other)),
    }
}

/// Strict `0x` + 40 hex digits
fn parse_address(raw: &str) -> std::result::Result<Address, String> {
    let valid = raw
        .strip_prefix("0x")
        .is_some_and(|hex| hex.len() == 40 && hex.chars().all(|c| c.is_ascii_hexdigit()));
    if !valid {
        return Err(format!("invalid address '{}'", raw));
    }
    Address::from_str(raw).map_err(|e| format!("invalid address '{}': {}", raw, e))
}

fn parse_amount(raw: &str) -> std::result::Result<U256, String> {
    if !raw.chars().all(|c| c.is_ascii_digit()) {
        return Err(format!("must be a non-negative integer in base units, got '{}'", raw));
    }
    U256::from_str_radix(raw, 10).map_err(|e| format!("invalid amount '{}': {}", raw, e))
}

fn parse_decimals(raw: &str) -> std::result::Result<u8, String> {
    match raw.parse::<u8>() {
        Ok(decimals) if decimals <= 36 => Ok(decimals),
        _ => Err(format!("must be an integer between 0 and 36, got '{}'", raw)),
    }
}

fn parse_secs(raw: &str) -> std::result::Result<u64, String> {
    raw.parse::<u64>()
        .map_err(|_| format!("must be a whole number of seconds, got '{}'", raw))
}
