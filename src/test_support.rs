//! In-memory wallet gateway for unit tests
//!
//! Answers the venue's read calls from plain fields, records every submitted
//! transaction and lets tests script receipts, failures and read latency.

use crate::contracts::{VenueAddresses, IERC20, IIdentityRegistry, IPool, IPoolDataProvider};
use crate::executor::ExecutionConfig;
use crate::wallet::{ConfirmationPolicy, ReceiptStatus, TxRequest, WalletGateway};
use crate::{Error, Result};
use alloy::primitives::{address, Address, Bytes, TxHash, B256, U256};
use alloy::sol_types::{SolCall, SolValue};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub const AGENT: Address = address!("00000000000000000000000000000000000000a1");
pub const TOKEN: Address = address!("00000000000000000000000000000000000000b1");
pub const POOL: Address = address!("00000000000000000000000000000000000000b2");
pub const A_TOKEN: Address = address!("00000000000000000000000000000000000000b3");
pub const DATA_PROVIDER: Address = address!("00000000000000000000000000000000000000b4");
pub const REGISTRY: Address = address!("00000000000000000000000000000000000000c1");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptBehavior {
    Confirm,
    /// Report pending for this many polls per transaction, then succeed
    PendingFor(usize),
    Revert,
    NeverMined,
}

/// Decoded view of a submitted transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SentCall {
    Approve {
        token: Address,
        spender: Address,
        amount: U256,
    },
    Supply {
        asset: Address,
        amount: U256,
        on_behalf_of: Address,
        referral_code: u16,
    },
    Withdraw {
        asset: Address,
        amount: U256,
        to: Address,
    },
    Register {
        registry: Address,
        token_uri: String,
    },
    Other(TxRequest),
}

struct State {
    balances: HashMap<Address, U256>,
    allowance: U256,
    supply_cap: U256,
    total_supplied: U256,
    symbol: String,
    registered: bool,
    raw_responses: HashMap<[u8; 4], Vec<u8>>,
    failing_tokens: HashSet<Address>,
    failing_calls: HashSet<[u8; 4]>,
    fail_sends: bool,
    call_counts: HashMap<[u8; 4], usize>,
    sent: Vec<TxRequest>,
    send_attempts: usize,
    receipt_behavior: ReceiptBehavior,
    polls: HashMap<TxHash, usize>,
    read_latency: Duration,
}

pub struct FakeGateway {
    state: Mutex<State>,
    active_reads: AtomicUsize,
    max_active_reads: AtomicUsize,
    wallet_reads: AtomicUsize,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                balances: HashMap::new(),
                allowance: U256::ZERO,
                supply_cap: U256::ZERO,
                total_supplied: U256::ZERO,
                symbol: "USDT".to_string(),
                registered: true,
                raw_responses: HashMap::new(),
                failing_tokens: HashSet::new(),
                failing_calls: HashSet::new(),
                fail_sends: false,
                call_counts: HashMap::new(),
                sent: Vec::new(),
                send_attempts: 0,
                receipt_behavior: ReceiptBehavior::Confirm,
                polls: HashMap::new(),
                read_latency: Duration::ZERO,
            }),
            active_reads: AtomicUsize::new(0),
            max_active_reads: AtomicUsize::new(0),
            wallet_reads: AtomicUsize::new(0),
        }
    }

    pub fn venue(&self) -> VenueAddresses {
        VenueAddresses {
            token: TOKEN,
            pool: POOL,
            position_token: A_TOKEN,
            data_provider: DATA_PROVIDER,
        }
    }

    pub fn registry(&self) -> Address {
        REGISTRY
    }

    /// Execution timings short enough for tests
    pub fn fast_execution() -> ExecutionConfig {
        ExecutionConfig {
            confirmation: ConfirmationPolicy {
                poll_interval: Duration::from_millis(1),
                timeout: Duration::from_millis(50),
            },
            propagation_delay: Duration::ZERO,
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn set_wallet_balance(&self, amount: U256) {
        self.state().balances.insert(TOKEN, amount);
    }

    pub fn set_deployed_balance(&self, amount: U256) {
        self.state().balances.insert(A_TOKEN, amount);
    }

    /// Supply cap in whole tokens and total supplied in base units
    pub fn set_reserve(&self, supply_cap: U256, total_supplied: U256) {
        let mut state = self.state();
        state.supply_cap = supply_cap;
        state.total_supplied = total_supplied;
    }

    pub fn set_allowance(&self, amount: U256) {
        self.state().allowance = amount;
    }

    pub fn allowance(&self) -> U256 {
        self.state().allowance
    }

    pub fn set_registered(&self, registered: bool) {
        self.state().registered = registered;
    }

    pub fn set_raw_response(&self, selector: [u8; 4], output: Vec<u8>) {
        self.state().raw_responses.insert(selector, output);
    }

    pub fn fail_token_reads(&self, token: Address) {
        self.state().failing_tokens.insert(token);
    }

    pub fn fail_calls(&self, selector: [u8; 4]) {
        self.state().failing_calls.insert(selector);
    }

    pub fn fail_sends(&self) {
        self.state().fail_sends = true;
    }

    pub fn set_receipt_behavior(&self, behavior: ReceiptBehavior) {
        self.state().receipt_behavior = behavior;
    }

    /// Delay every wallet-token balance read
    pub fn set_read_latency(&self, latency: Duration) {
        self.state().read_latency = latency;
    }

    pub fn call_count(&self, selector: [u8; 4]) -> usize {
        self.state().call_counts.get(&selector).copied().unwrap_or(0)
    }

    pub fn receipt_polls(&self) -> usize {
        self.state().polls.values().sum()
    }

    pub fn sent(&self) -> Vec<TxRequest> {
        self.state().sent.clone()
    }

    pub fn send_attempts(&self) -> usize {
        self.state().send_attempts
    }

    pub fn sent_calls(&self) -> Vec<SentCall> {
        self.sent().into_iter().map(decode_sent).collect()
    }

    /// Number of wallet-token balance reads started so far
    pub fn wallet_reads(&self) -> usize {
        self.wallet_reads.load(Ordering::SeqCst)
    }

    /// Highest number of wallet-token balance reads in flight at once
    pub fn max_concurrent_reads(&self) -> usize {
        self.max_active_reads.load(Ordering::SeqCst)
    }
}

fn word(value: U256) -> Vec<u8> {
    value.to_be_bytes::<32>().to_vec()
}

fn selector_of(data: &[u8]) -> [u8; 4] {
    let mut selector = [0u8; 4];
    if data.len() >= 4 {
        selector.copy_from_slice(&data[..4]);
    }
    selector
}

fn decode_sent(tx: TxRequest) -> SentCall {
    let data = tx.data.as_ref();
    let selector = selector_of(data);

    let decoded = if selector == IERC20::approveCall::SELECTOR {
        IERC20::approveCall::abi_decode(data)
            .ok()
            .map(|call| SentCall::Approve {
                token: tx.to,
                spender: call.spender,
                amount: call.amount,
            })
    } else if selector == IPool::supplyCall::SELECTOR {
        IPool::supplyCall::abi_decode(data)
            .ok()
            .map(|call| SentCall::Supply {
                asset: call.asset,
                amount: call.amount,
                on_behalf_of: call.onBehalfOf,
                referral_code: call.referralCode,
            })
    } else if selector == IPool::withdrawCall::SELECTOR {
        IPool::withdrawCall::abi_decode(data)
            .ok()
            .map(|call| SentCall::Withdraw {
                asset: call.asset,
                amount: call.amount,
                to: call.to,
            })
    } else if selector == IIdentityRegistry::registerCall::SELECTOR {
        IIdentityRegistry::registerCall::abi_decode(data)
            .ok()
            .map(|call| SentCall::Register {
                registry: tx.to,
                token_uri: call.tokenURI,
            })
    } else {
        None
    };

    decoded.unwrap_or(SentCall::Other(tx))
}

#[async_trait]
impl WalletGateway for FakeGateway {
    fn address(&self) -> Address {
        AGENT
    }

    async fn native_balance(&self) -> Result<U256> {
        Ok(U256::from(10u64).pow(U256::from(18)))
    }

    async fn token_balance(&self, token: Address) -> Result<U256> {
        let (latency, failing, balance) = {
            let state = self.state();
            (
                state.read_latency,
                state.failing_tokens.contains(&token),
                state.balances.get(&token).copied().unwrap_or(U256::ZERO),
            )
        };

        if token == TOKEN {
            self.wallet_reads.fetch_add(1, Ordering::SeqCst);
            let active = self.active_reads.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active_reads.fetch_max(active, Ordering::SeqCst);
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            self.active_reads.fetch_sub(1, Ordering::SeqCst);
        }

        if failing {
            return Err(Error::Rpc(format!("balanceOf on {} unavailable", token)));
        }
        Ok(balance)
    }

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes> {
        let selector = selector_of(&data);
        let mut state = self.state();
        *state.call_counts.entry(selector).or_insert(0) += 1;

        if state.failing_calls.contains(&selector) {
            return Err(Error::Rpc(format!("eth_call to {} failed", to)));
        }
        if let Some(raw) = state.raw_responses.get(&selector) {
            return Ok(raw.clone().into());
        }

        let output = if to == REGISTRY && selector == IIdentityRegistry::balanceOfCall::SELECTOR {
            word(U256::from(state.registered as u64))
        } else if selector == IERC20::allowanceCall::SELECTOR {
            word(state.allowance)
        } else if selector == IERC20::symbolCall::SELECTOR {
            (state.symbol.clone(),).abi_encode_params()
        } else if selector == IPoolDataProvider::getReserveCapsCall::SELECTOR {
            [word(U256::ZERO), word(state.supply_cap)].concat()
        } else if selector == IPoolDataProvider::getReserveDataCall::SELECTOR {
            let mut words = vec![U256::ZERO; 12];
            words[2] = state.total_supplied;
            words.into_iter().flat_map(word).collect()
        } else {
            return Err(Error::Rpc(format!("unexpected call to {}", to)));
        };

        Ok(output.into())
    }

    async fn send_transaction(&self, tx: TxRequest) -> Result<TxHash> {
        let mut state = self.state();
        state.send_attempts += 1;
        if state.fail_sends {
            return Err(Error::Rpc("nonce too low".to_string()));
        }

        if let SentCall::Approve { amount, .. } = decode_sent(tx.clone()) {
            state.allowance = amount;
        }
        if let SentCall::Register { .. } = decode_sent(tx.clone()) {
            state.registered = true;
        }

        state.sent.push(tx);
        let hash = B256::from(U256::from(state.sent.len()).to_be_bytes::<32>());
        Ok(hash)
    }

    async fn receipt_status(&self, hash: TxHash) -> Result<ReceiptStatus> {
        let mut state = self.state();
        let behavior = state.receipt_behavior;
        let polls = state.polls.entry(hash).or_insert(0);
        *polls += 1;

        Ok(match behavior {
            ReceiptBehavior::Confirm => ReceiptStatus::Succeeded,
            ReceiptBehavior::PendingFor(n) if *polls > n => ReceiptStatus::Succeeded,
            ReceiptBehavior::PendingFor(_) | ReceiptBehavior::NeverMined => ReceiptStatus::Pending,
            ReceiptBehavior::Revert => ReceiptStatus::Reverted,
        })
    }
}
