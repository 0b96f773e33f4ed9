//! Cycle orchestrator
//!
//! Drives one rebalancing pass: snapshot, decide, optionally ask the
//! operator, execute. A process-wide flag keeps at most one pass in flight;
//! a tick that arrives while a pass is running is skipped and counted, never
//! queued.

use crate::executor::{ActionExecutor, ExecutionRecord};
use crate::identity::IdentityClient;
use crate::intent::{decide, Intent, PolicyConfig};
use crate::journal::CycleJournal;
use crate::prompt::ConfirmationGate;
use crate::state::{BalanceSnapshot, StateReader};
use crate::units::format_units;
use crate::Result;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Who approves an actionable intent
pub enum Supervision {
    /// Scheduled runs; every actionable intent is executed
    Unattended,
    /// An operator must confirm before anything is sent
    Interactive(Box<dyn ConfirmationGate>),
}

/// How a cycle ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Another cycle was already running
    Skipped,
    NoAction {
        snapshot: BalanceSnapshot,
        intent: Intent,
    },
    /// The operator did not confirm
    Declined {
        snapshot: BalanceSnapshot,
        intent: Intent,
    },
    Executed {
        snapshot: BalanceSnapshot,
        intent: Intent,
        record: ExecutionRecord,
    },
}

impl CycleOutcome {
    pub fn status(&self) -> &'static str {
        match self {
            CycleOutcome::Skipped => "skipped",
            CycleOutcome::NoAction { .. } => "no_action",
            CycleOutcome::Declined { .. } => "declined",
            CycleOutcome::Executed { .. } => "executed",
        }
    }

    pub fn snapshot(&self) -> Option<&BalanceSnapshot> {
        match self {
            CycleOutcome::Skipped => None,
            CycleOutcome::NoAction { snapshot, .. }
            | CycleOutcome::Declined { snapshot, .. }
            | CycleOutcome::Executed { snapshot, .. } => Some(snapshot),
        }
    }

    pub fn intent(&self) -> Option<&Intent> {
        match self {
            CycleOutcome::Skipped => None,
            CycleOutcome::NoAction { intent, .. }
            | CycleOutcome::Declined { intent, .. }
            | CycleOutcome::Executed { intent, .. } => Some(intent),
        }
    }

    pub fn execution(&self) -> Option<&ExecutionRecord> {
        match self {
            CycleOutcome::Executed { record, .. } => Some(record),
            _ => None,
        }
    }
}

/// Running totals since the orchestrator was built
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleStats {
    pub completed: u64,
    pub failed: u64,
    pub skipped: u64,
}

#[derive(Debug, Default)]
struct Counters {
    completed: AtomicU64,
    failed: AtomicU64,
    skipped: AtomicU64,
}

/// Holds the in-progress flag; clearing it on drop covers early returns,
/// errors and panics alike.
struct CycleGuard {
    flag: Arc<AtomicBool>,
}

impl Drop for CycleGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

struct AgentIdentity {
    client: IdentityClient,
    name: String,
}

pub struct CycleOrchestrator {
    reader: StateReader,
    policy: PolicyConfig,
    executor: ActionExecutor,
    supervision: Supervision,
    identity: Option<AgentIdentity>,
    journal: Option<CycleJournal>,
    token_decimals: u8,
    in_progress: Arc<AtomicBool>,
    counters: Counters,
}

impl CycleOrchestrator {
    pub fn new(
        reader: StateReader,
        policy: PolicyConfig,
        executor: ActionExecutor,
        supervision: Supervision,
    ) -> Self {
        Self {
            reader,
            policy,
            executor,
            supervision,
            identity: None,
            journal: None,
            token_decimals: crate::config::DEFAULT_TOKEN_DECIMALS,
            in_progress: Arc::new(AtomicBool::new(false)),
            counters: Counters::default(),
        }
    }

    /// Check the agent's identity NFT at the start of every cycle
    pub fn with_identity(mut self, client: IdentityClient, agent_name: impl Into<String>) -> Self {
        self.identity = Some(AgentIdentity {
            client,
            name: agent_name.into(),
        });
        self
    }

    /// Append every finished cycle to `journal`
    pub fn with_journal(mut self, journal: CycleJournal) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Decimals used when logging amounts
    pub fn with_token_decimals(mut self, decimals: u8) -> Self {
        self.token_decimals = decimals;
        self
    }

    pub fn is_running(&self) -> bool {
        self.in_progress.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> CycleStats {
        CycleStats {
            completed: self.counters.completed.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            skipped: self.counters.skipped.load(Ordering::Relaxed),
        }
    }

    /// Run one cycle, or return [`CycleOutcome::Skipped`] if one is in flight.
    pub async fn run_cycle(&self) -> Result<CycleOutcome> {
        match self.try_begin() {
            Some(guard) => self.run_guarded(guard).await,
            None => {
                self.skip();
                Ok(CycleOutcome::Skipped)
            }
        }
    }

    /// Run a cycle every `period` until `shutdown` resolves.
    ///
    /// The first cycle starts immediately. On shutdown no new cycle is
    /// started and a cycle already in flight is awaited.
    pub async fn watch<F>(self: Arc<Self>, period: Duration, shutdown: F) -> CycleStats
    where
        F: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        let mut in_flight: Option<JoinHandle<()>> = None;

        info!(
            interval_secs = period.as_secs_f64(),
            "Watching balances. Press Ctrl+C to stop."
        );

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    break;
                }
                _ = ticker.tick() => {
                    // Claim the flag here, not in the task, so the next tick
                    // already sees it set.
                    match self.try_begin() {
                        Some(guard) => {
                            let orchestrator = Arc::clone(&self);
                            in_flight = Some(tokio::spawn(async move {
                                let _ = orchestrator.run_guarded(guard).await;
                            }));
                        }
                        None => self.skip(),
                    }
                }
            }
        }

        if let Some(handle) = in_flight {
            if !handle.is_finished() {
                info!("Waiting for in-flight cycle to finish");
            }
            if let Err(e) = handle.await {
                error!(error = %e, "Cycle task aborted");
            }
        }

        let stats = self.stats();
        info!(
            completed = stats.completed,
            failed = stats.failed,
            skipped = stats.skipped,
            "Watch stopped"
        );
        stats
    }

    fn try_begin(&self) -> Option<CycleGuard> {
        self.in_progress
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| CycleGuard {
                flag: Arc::clone(&self.in_progress),
            })
    }

    fn skip(&self) {
        let skipped = self.counters.skipped.fetch_add(1, Ordering::Relaxed) + 1;
        warn!(skipped, "Previous cycle still running, skipping tick");
    }

    async fn run_guarded(&self, _guard: CycleGuard) -> Result<CycleOutcome> {
        let id = Uuid::new_v4();
        let span = info_span!("cycle", %id);

        let result = self.pipeline().instrument(span.clone()).await;

        span.in_scope(|| match &result {
            Ok(outcome) => {
                self.counters.completed.fetch_add(1, Ordering::Relaxed);
                info!(outcome = outcome.status(), "Cycle complete");
            }
            Err(e) => {
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                error!(error = %e, "Cycle failed");
            }
        });

        if let Some(journal) = &self.journal {
            journal.record(id, &result).await;
        }

        result
    }

    async fn pipeline(&self) -> Result<CycleOutcome> {
        info!("Starting cycle");

        self.ensure_identity().await;

        let snapshot = self.reader.snapshot().await?;
        info!(
            wallet = %format_units(snapshot.wallet_balance, self.token_decimals),
            deployed = %format_units(snapshot.deployed_balance, self.token_decimals),
            capacity_reached = snapshot.capacity_reached,
            "Balances"
        );

        let intent = decide(&snapshot, &self.policy);
        info!(
            action = %intent.action,
            amount = %format_units(intent.amount, self.token_decimals),
            reason = %intent.reason,
            "Decision"
        );

        if !intent.is_actionable() {
            return Ok(CycleOutcome::NoAction { snapshot, intent });
        }

        if let Supervision::Interactive(gate) = &self.supervision {
            let question = format!(
                "{}\nExecute {} of {}?",
                intent.reason,
                intent.action,
                format_units(intent.amount, self.token_decimals)
            );
            if !gate.confirm(&question).await? {
                info!("Operator declined, nothing sent");
                return Ok(CycleOutcome::Declined { snapshot, intent });
            }
        }

        match self.executor.execute(&intent).await? {
            Some(record) => Ok(CycleOutcome::Executed {
                snapshot,
                intent,
                record,
            }),
            None => Ok(CycleOutcome::NoAction { snapshot, intent }),
        }
    }

    /// Offer to mint the identity NFT when the agent has none. Never fails
    /// the cycle.
    async fn ensure_identity(&self) {
        let Some(identity) = &self.identity else {
            return;
        };

        if identity.client.is_registered().await {
            debug!("Agent identity already registered");
            return;
        }

        let gate = match &self.supervision {
            Supervision::Unattended => {
                warn!("Agent has no identity NFT; run without --watch to register one");
                return;
            }
            Supervision::Interactive(gate) => gate,
        };

        match gate.confirm("Mint agent identity NFT?").await {
            Ok(true) => {
                if let Err(e) = identity.client.register(&identity.name).await {
                    warn!(error = %e, "Identity registration failed");
                }
            }
            Ok(false) => info!("Identity registration skipped"),
            Err(e) => warn!(error = %e, "Identity prompt failed"),
        }
    }
}
