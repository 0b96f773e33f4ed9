//! Agent runner module
//!
//! Wires configuration, signer and RPC gateway into a cycle orchestrator
//! and runs it once or on a schedule.

use crate::config::AgentConfig;
use crate::contracts::{self, IERC20};
use crate::cycle::{CycleOrchestrator, CycleOutcome, Supervision};
use crate::executor::ActionExecutor;
use crate::identity::IdentityClient;
use crate::journal::CycleJournal;
use crate::prompt::TerminalPrompt;
use crate::state::StateReader;
use crate::wallet::{RpcGateway, SecureWallet, WalletGateway};
use crate::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Shown when the token does not answer `symbol()`
const FALLBACK_SYMBOL: &str = "TOKEN";

/// Agent runner that manages the rebalancing agent lifecycle
pub struct AgentRunner {
    config: AgentConfig,
}

impl AgentRunner {
    /// Create a new agent runner
    pub fn new(config: AgentConfig) -> Self {
        Self { config }
    }

    /// Run a single interactive cycle
    pub async fn run_once(&self) -> Result<CycleOutcome> {
        let gateway = self.connect()?;
        report_startup(gateway.as_ref(), &self.config).await;

        let gate = Box::new(TerminalPrompt::stdio());
        let orchestrator = self.orchestrator(gateway, Supervision::Interactive(gate));
        orchestrator.run_cycle().await
    }

    /// Run unattended cycles every `interval` until Ctrl+C.
    ///
    /// Individual cycle failures are logged and do not stop the schedule.
    pub async fn watch(&self, interval: Duration) -> Result<()> {
        let gateway = self.connect()?;
        report_startup(gateway.as_ref(), &self.config).await;

        let orchestrator = Arc::new(self.orchestrator(gateway, Supervision::Unattended));

        let shutdown = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        };

        orchestrator.watch(interval, shutdown).await;
        Ok(())
    }

    fn connect(&self) -> Result<Arc<dyn WalletGateway>> {
        let wallet = SecureWallet::from_secret(&self.config.seed)?;
        info!(address = %wallet.address(), rpc_url = %self.config.rpc_url, "Wallet loaded");

        Ok(Arc::new(RpcGateway::connect(self.config.rpc_url.clone(), &wallet)))
    }

    fn orchestrator(
        &self,
        gateway: Arc<dyn WalletGateway>,
        supervision: Supervision,
    ) -> CycleOrchestrator {
        let config = &self.config;

        let reader = StateReader::new(gateway.clone(), config.venue, config.token_decimals);
        let executor = ActionExecutor::new(gateway.clone(), config.venue, config.execution);
        let identity = IdentityClient::new(gateway, config.identity_registry)
            .with_confirmation(config.execution.confirmation);

        let mut orchestrator = CycleOrchestrator::new(reader, config.policy, executor, supervision)
            .with_identity(identity, config.agent_name.clone())
            .with_token_decimals(config.token_decimals);

        if let Some(path) = &config.audit_log_path {
            info!(path = %path.display(), "Cycle journal enabled");
            orchestrator = orchestrator.with_journal(CycleJournal::new(path));
        }

        orchestrator
    }
}

/// Log who the agent is and what it holds. Every read here is best-effort.
async fn report_startup(gateway: &dyn WalletGateway, config: &AgentConfig) -> String {
    let symbol = match contracts::read(gateway, config.venue.token, &IERC20::symbolCall {}).await
    {
        Ok(symbol) => symbol,
        Err(e) => {
            warn!(token = %config.venue.token, error = %e, "Failed to read token symbol");
            FALLBACK_SYMBOL.to_string()
        }
    };

    match gateway.native_balance().await {
        Ok(balance) => info!(
            address = %gateway.address(),
            native_balance_wei = %balance,
            token = %symbol,
            pool = %config.venue.pool,
            "Agent started"
        ),
        Err(e) => warn!(
            address = %gateway.address(),
            error = %e,
            "Failed to read native balance"
        ),
    }

    symbol
}
