//! The deposit orchestrator.
//!
//! Owns the current [`Session`] and drives it through the deposit state machine. The session is
//! published through a [`watch`] channel; renderers read it with [`Orchestrator::snapshot`] or
//! follow it with [`Orchestrator::subscribe`].
//!
//! Every command runs in its own task and at most one task is live. Each lookup starts a new
//! session with a fresh [`SessionId`]; updates carry the id of the session they were computed for
//! and are dropped once that session has been superseded.

mod metrics;
pub use metrics::OrchestratorMetrics;

use crate::{
    config::{ChainConfig, DepositorConfig, OrchestratorConfig},
    error::{DepositError, LedgerError},
    ledger::{Clipboard, Finality, GiftLedger, Transactor, WalletSession},
    types::{
        AssetInfo, FundingPath, GiftId, GiftRecord, Phase, Session, SessionId, TxReference,
    },
};
use alloy::primitives::{Address, B256, U256};
use std::{
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
    time::Instant,
};
use tokio::{sync::watch, task::JoinHandle};
use tracing::{debug, info, warn};

/// Capabilities the [`Orchestrator`] consumes.
#[derive(Debug, Clone)]
pub struct Capabilities {
    /// Ledger reads.
    pub ledger: Arc<dyn GiftLedger>,
    /// Transaction submission.
    pub transactor: Arc<dyn Transactor>,
    /// The connected wallet.
    pub wallet: Arc<dyn WalletSession>,
    /// Clipboard.
    pub clipboard: Arc<dyn Clipboard>,
}

impl Capabilities {
    /// Uses `ledger` for reads, transactions and the wallet session.
    pub fn from_ledger<L>(ledger: Arc<L>, clipboard: Arc<dyn Clipboard>) -> Self
    where
        L: GiftLedger + Transactor + WalletSession + 'static,
    {
        Self { ledger: ledger.clone(), transactor: ledger.clone(), wallet: ledger, clipboard }
    }
}

/// Why a deposit task stopped early.
#[derive(Debug)]
enum Interrupt {
    /// A newer session replaced ours.
    Superseded,
    /// An external call failed.
    Failed(DepositError),
}

impl From<DepositError> for Interrupt {
    fn from(err: DepositError) -> Self {
        Self::Failed(err)
    }
}

/// Drives deposit sessions.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    inner: Arc<OrchestratorInner>,
}

#[derive(Debug)]
struct OrchestratorInner {
    capabilities: Capabilities,
    gift_contract: Address,
    chain: ChainConfig,
    config: OrchestratorConfig,
    state: watch::Sender<Session>,
    next_session: AtomicU64,
    /// The live task, if any.
    task: Mutex<Option<JoinHandle<()>>>,
    metrics: OrchestratorMetrics,
}

impl Orchestrator {
    /// Creates a new [`Orchestrator`] with an empty [`Phase::Idle`] session.
    pub fn new(capabilities: Capabilities, config: &DepositorConfig) -> Self {
        let (state, _) = watch::channel(Session::default());

        Self {
            inner: Arc::new(OrchestratorInner {
                capabilities,
                gift_contract: config.gift_contract,
                chain: config.chain.clone(),
                config: config.orchestrator.clone(),
                state,
                next_session: AtomicU64::new(1),
                task: Default::default(),
                metrics: OrchestratorMetrics::default(),
            }),
        }
    }

    /// The current session.
    pub fn snapshot(&self) -> Session {
        self.inner.state.borrow().clone()
    }

    /// Subscribes to session updates.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.inner.state.subscribe()
    }

    /// Waits until the current session satisfies `f` and returns it.
    pub async fn wait_for(&self, f: impl FnMut(&Session) -> bool) -> Session {
        let mut rx = self.subscribe();
        match rx.wait_for(f).await {
            Ok(session) => session.clone(),
            Err(_) => self.snapshot(),
        }
    }

    /// Waits until no work is in flight for the current session.
    pub async fn settled(&self) -> Session {
        self.wait_for(|session| session.phase.is_settled()).await
    }

    /// Starts a new session looking up the gift under `code`.
    ///
    /// Supersedes the current session. An empty code leaves an [`Phase::Idle`] session carrying
    /// [`DepositError::InputInvalid`].
    pub fn submit_lookup(&self, code: &str) -> SessionId {
        let mut task = lock(&self.inner.task);
        if let Some(task) = task.take() {
            task.abort();
        }

        let id = SessionId(self.inner.next_session.fetch_add(1, Ordering::SeqCst));
        let code = code.trim();

        if code.is_empty() {
            let mut session = Session::new(id);
            session.error = Some(DepositError::empty_code());
            self.inner.state.send_replace(session);
            return id;
        }

        info!(%id, code, "Looking up gift");
        self.inner.metrics.lookups.increment(1);

        let session = Session::looking_up(id, code);
        let gift_id = GiftId::from_code(code);
        self.inner.state.send_replace(session);

        let this = self.clone();
        *task = Some(tokio::spawn(async move { this.lookup(id, gift_id).await }));

        id
    }

    /// Deposits into the gift of the current session.
    ///
    /// Only accepted in [`Phase::Found`]. Ignored while a deposit is in flight and once the
    /// session has ended.
    pub fn submit_deposit(&self) {
        let mut task = lock(&self.inner.task);
        let session = self.snapshot();
        let id = session.id;

        if session.phase.is_depositing() || session.phase.is_terminal() {
            debug!(%id, phase = %session.phase, "Ignoring deposit");
            return;
        }

        if session.phase != Phase::Found {
            self.inner.update(id, |session| session.error = Some(DepositError::no_gift_selected()));
            return;
        }

        let Some(gift) = session.gift.clone().filter(|_| session.can_deposit()) else {
            self.inner.update(id, |session| session.error = Some(DepositError::AlreadyDeposited));
            return;
        };

        let Some(owner) = self.inner.capabilities.wallet.connected_address() else {
            self.inner.update(id, |session| session.error = Some(DepositError::WalletNotConnected));
            return;
        };

        let Some(gift_id) = session.gift_id else {
            self.inner.update(id, |session| session.error = Some(DepositError::no_gift_selected()));
            return;
        };

        let phase = if gift.funding_path().is_native() {
            Phase::Depositing
        } else {
            Phase::CheckingAllowance
        };
        self.inner.update(id, |session| {
            session.phase = phase;
            session.error = None;
        });

        let this = self.clone();
        *task = Some(tokio::spawn(async move { this.deposit(id, gift_id, gift, owner).await }));
    }

    /// Copies `text` to the clipboard. Returns whether it was copied.
    pub fn copy_address_to_clipboard(&self, text: &str) -> bool {
        match self.inner.capabilities.clipboard.write_text(text) {
            Ok(()) => {
                debug!(text, "Copied to clipboard");
                true
            }
            Err(err) => {
                warn!(%err, "Failed to copy to clipboard");
                false
            }
        }
    }

    async fn lookup(&self, id: SessionId, gift_id: GiftId) {
        let inner = &self.inner;
        let ledger = &inner.capabilities.ledger;

        let mut retries = 0;
        let mut backoff = inner.config.lookup_retry_backoff;
        let raw = loop {
            match ledger.gift(inner.gift_contract, gift_id).await {
                Ok(raw) => break Ok(raw),
                Err(err) if retries < inner.config.lookup_retries => {
                    retries += 1;
                    warn!(%id, %err, retries, "Gift lookup failed, retrying in {backoff:?}");
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
                Err(err) => break Err(err),
            }
        };

        let gift = match raw {
            Ok(raw) => GiftRecord::from_raw(raw),
            Err(err) => {
                warn!(%id, %err, "Gift lookup failed");
                inner.metrics.lookup_errors.increment(1);
                inner.update(id, |session| {
                    session.fail(Phase::LookupError, DepositError::classify_read(err))
                });
                return;
            }
        };

        let Some(gift) = gift else {
            inner.metrics.not_found.increment(1);
            inner.update(id, |session| session.fail(Phase::NotFound, DepositError::NotFound));
            return;
        };

        let asset = self.asset_info(gift.funding_path()).await;
        info!(
            %id,
            amount = %asset.display_amount(gift.amount),
            recipient = %gift.recipient,
            deposited = gift.deposited,
            "Found gift"
        );

        inner.update(id, |session| {
            session.gift = Some(gift);
            session.asset = Some(asset);
            session.phase = Phase::Found;
            session.error = None;
        });
    }

    async fn asset_info(&self, path: FundingPath) -> AssetInfo {
        match path {
            FundingPath::Native => self.inner.chain.native_asset(),
            FundingPath::Token(token) => {
                let metadata = self.inner.capabilities.ledger.token_metadata(token).await;
                AssetInfo::token(token, metadata)
            }
        }
    }

    async fn deposit(&self, id: SessionId, gift_id: GiftId, gift: GiftRecord, owner: Address) {
        let inner = &self.inner;

        match self.run_deposit(id, gift_id, &gift, owner).await {
            Ok(()) => {
                inner.metrics.confirmed.increment(1);
                self.schedule_reset(id);
            }
            Err(Interrupt::Superseded) => debug!(%id, "Session superseded, stopping deposit"),
            Err(Interrupt::Failed(
                err @ (DepositError::TransactionRejectedByUser | DepositError::WalletNotConnected),
            )) => {
                info!(%id, %err, "Deposit not signed");
                inner.update(id, |session| {
                    session.phase = Phase::Found;
                    session.error = Some(err);
                });
            }
            Err(Interrupt::Failed(err)) => {
                warn!(%id, %err, "Deposit failed");
                inner.metrics.failed.increment(1);
                inner.update(id, |session| session.fail(Phase::Failed, err));
            }
        }
    }

    async fn run_deposit(
        &self,
        id: SessionId,
        gift_id: GiftId,
        gift: &GiftRecord,
        owner: Address,
    ) -> Result<(), Interrupt> {
        let inner = &self.inner;
        let transactor = &inner.capabilities.transactor;

        let value = match gift.funding_path() {
            FundingPath::Native => gift.amount,
            FundingPath::Token(token) => {
                self.ensure_allowance(id, token, owner, gift.amount).await?;
                U256::ZERO
            }
        };

        inner.advance(id, |session| session.phase = Phase::Depositing)?;
        inner.metrics.deposits.increment(1);
        let tx_hash = transactor
            .deposit(inner.gift_contract, gift_id, value)
            .await
            .map_err(DepositError::classify_write)?;
        info!(%id, %tx_hash, %value, "Deposit sent");

        let submitted = Instant::now();
        let tx = TxReference::new(tx_hash, &inner.chain.explorer_url);
        inner.advance(id, |session| {
            session.phase = Phase::AwaitingDepositFinality;
            session.deposit_tx = Some(tx);
        })?;

        self.finality(tx_hash).await?;
        inner.metrics.confirmation_time.record(submitted.elapsed().as_millis() as f64);

        inner.advance(id, |session| {
            session.phase = Phase::Success;
            if let Some(gift) = &mut session.gift {
                gift.deposited = true;
                gift.depositor = owner;
            }
        })?;
        info!(%id, %tx_hash, "Deposit confirmed");

        Ok(())
    }

    /// Makes sure the gift contract may pull `amount` of `token` from `owner`, approving exactly
    /// `amount` if needed.
    async fn ensure_allowance(
        &self,
        id: SessionId,
        token: Address,
        owner: Address,
        amount: U256,
    ) -> Result<(), Interrupt> {
        let inner = &self.inner;
        let ledger = &inner.capabilities.ledger;
        let spender = inner.gift_contract;

        inner.advance(id, |session| session.phase = Phase::CheckingAllowance)?;
        let allowance =
            ledger.allowance(token, owner, spender).await.map_err(DepositError::classify_read)?;
        inner.advance(id, |session| session.allowance = Some(allowance))?;

        if allowance >= amount {
            debug!(%id, %allowance, "Allowance suffices");
            return Ok(());
        }

        inner.advance(id, |session| session.phase = Phase::Approving)?;
        inner.metrics.approvals.increment(1);
        let tx_hash = inner
            .capabilities
            .transactor
            .approve(token, spender, amount)
            .await
            .map_err(DepositError::classify_write)?;
        info!(%id, %tx_hash, %amount, "Approval sent");

        let tx = TxReference::new(tx_hash, &inner.chain.explorer_url);
        inner.advance(id, |session| {
            session.phase = Phase::AwaitingApprovalFinality;
            session.approval_tx = Some(tx);
        })?;

        self.finality(tx_hash).await?;

        for attempt in 0..inner.config.allowance_recheck_attempts.max(1) {
            if attempt > 0 {
                tokio::time::sleep(inner.config.allowance_recheck_interval).await;
            }

            let allowance = ledger
                .allowance(token, owner, spender)
                .await
                .map_err(DepositError::classify_read)?;
            inner.advance(id, |session| session.allowance = Some(allowance))?;

            if allowance >= amount {
                return Ok(());
            }

            warn!(%id, %allowance, %amount, attempt, "Allowance not updated after approval");
        }

        Err(DepositError::Unknown("Allowance is still insufficient after approval".into()).into())
    }

    async fn finality(&self, tx_hash: B256) -> Result<(), DepositError> {
        match self.inner.capabilities.transactor.await_finality(tx_hash).await {
            Ok(Finality::Finalized) => Ok(()),
            Ok(Finality::Reverted { reason }) => {
                Err(DepositError::classify_write(LedgerError::Reverted(reason)))
            }
            Err(err) => Err(DepositError::classify_write(err)),
        }
    }

    /// Resets the session to an empty one once the grace period has passed, unless it has been
    /// superseded.
    fn schedule_reset(&self, id: SessionId) {
        let inner = self.inner.clone();
        tokio::spawn(async move {
            tokio::time::sleep(inner.config.success_grace_period).await;
            inner.state.send_if_modified(|session| {
                if session.id != id || session.phase != Phase::Success {
                    return false;
                }
                debug!(%id, "Resetting session");
                *session = Session::new(id);
                true
            });
        });
    }
}

impl OrchestratorInner {
    /// Applies `f` to the session if it is still session `id`. Returns whether it was applied.
    fn update(&self, id: SessionId, f: impl FnOnce(&mut Session)) -> bool {
        self.state.send_if_modified(|session| {
            if session.id != id {
                return false;
            }

            let phase = session.phase;
            f(session);
            if session.phase != phase {
                info!(%id, from = %phase, to = %session.phase, "Session advanced");
            }
            true
        })
    }

    fn advance(&self, id: SessionId, f: impl FnOnce(&mut Session)) -> Result<(), Interrupt> {
        if self.update(id, f) { Ok(()) } else { Err(Interrupt::Superseded) }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
