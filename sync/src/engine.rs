//! The poll synchronization engine.
//!
//! Every mutating action runs the same sequence: take the per-action lock,
//! validate, gate on network and binding, guard (votes only), submit, wait
//! for inclusion, then reload the authoritative poll list. Failures are
//! classified into a [`FailureKind`], logged, surfaced as a [`Notice`] when
//! the kind warrants it, and resolved to `false`. Nothing is raised past the
//! public methods.

use chainvote_ledger::{paging, EventBus, LedgerBinder, LedgerError, LedgerEvent, PollLedger, Receipt};
use chainvote_networks::{NetworkRegistry, NetworkStatus};
use chainvote_types::{ChainId, Clock, CreatePoll, NetworkDescriptor, Poll, PollId, PollStats};
use chainvote_wallet_core::{switch_network, ProviderError, SessionManager, SwitchOutcome, WalletSession};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::action_lock::{ActionKey, ActionKind, ActionLocks};
use crate::cache::{PendingPoll, PollCache};
use crate::cancel::CancelToken;
use crate::config::{LoadStrategy, SyncConfig};
use crate::notice::{FailureKind, Notice};
use crate::view::{split_views, PollView};

const NO_PROVIDER_MESSAGE: &str = "No wallet found. Please install a browser wallet to use polls.";
const MISSING_FIELDS_MESSAGE: &str = "Please fill in all fields";
const ALREADY_VOTED_MESSAGE: &str = "You have already voted on this poll!";

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A classified failure on its way to the public boundary.
#[derive(Debug)]
struct Failure {
    kind: FailureKind,
    detail: String,
}

impl Failure {
    fn new(kind: FailureKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }
}

impl From<LedgerError> for Failure {
    fn from(e: LedgerError) -> Self {
        let kind = FailureKind::from(&e);
        let detail = match e {
            LedgerError::Reverted {
                reason: Some(reason), ..
            } => reason,
            other => other.to_string(),
        };
        Self { kind, detail }
    }
}

impl From<ProviderError> for Failure {
    fn from(e: ProviderError) -> Self {
        Self {
            kind: FailureKind::from(&e),
            detail: e.to_string(),
        }
    }
}

#[derive(Clone, Debug)]
enum Mutation {
    Create(CreatePoll),
    Vote { poll_id: PollId, option_index: u64 },
    End(PollId),
    Extend { poll_id: PollId, hours: u64 },
}

impl Mutation {
    fn kind(&self) -> ActionKind {
        match self {
            Self::Create(_) => ActionKind::Create,
            Self::Vote { .. } => ActionKind::Vote,
            Self::End(_) => ActionKind::End,
            Self::Extend { .. } => ActionKind::Extend,
        }
    }

    fn poll_id(&self) -> Option<PollId> {
        match self {
            Self::Create(_) => None,
            Self::Vote { poll_id, .. } | Self::End(poll_id) | Self::Extend { poll_id, .. } => Some(*poll_id),
        }
    }

    fn key(&self) -> ActionKey {
        ActionKey::new(self.kind(), self.poll_id())
    }
}

/// Wording used in user-facing error messages.
fn activity(kind: ActionKind) -> &'static str {
    match kind {
        ActionKind::Create => "creating poll",
        ActionKind::Vote => "voting",
        ActionKind::End => "ending poll",
        ActionKind::Extend => "extending poll",
    }
}

/// The ledger handle built for one signer generation. `ledger` is `None`
/// when the network has no deployed contract.
struct Binding {
    generation: u64,
    ledger: Option<Arc<dyn PollLedger>>,
}

/// Decrements the loading counter on drop.
struct LoadingGuard<'a>(&'a AtomicUsize);

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct PollSyncEngine {
    session: Arc<SessionManager>,
    registry: NetworkRegistry,
    binder: Arc<dyn LedgerBinder>,
    clock: Arc<dyn Clock>,
    load_strategy: LoadStrategy,
    page_size: u64,
    confirmation_timeout: Duration,
    binding: Mutex<Option<Binding>>,
    network: Mutex<NetworkStatus>,
    cache: Mutex<PollCache>,
    locks: ActionLocks,
    loading: AtomicUsize,
    cancel: CancelToken,
    notices: mpsc::UnboundedSender<Notice>,
    no_provider_noticed: AtomicBool,
    last_failure: Mutex<Option<FailureKind>>,
    events: EventBus,
}

impl PollSyncEngine {
    /// Build an engine and the receiving end of its notice channel.
    pub fn new(
        session: Arc<SessionManager>,
        registry: NetworkRegistry,
        binder: Arc<dyn LedgerBinder>,
        clock: Arc<dyn Clock>,
        config: &SyncConfig,
    ) -> (Self, mpsc::UnboundedReceiver<Notice>) {
        let (notices, rx) = mpsc::unbounded_channel();
        let engine = Self {
            session,
            registry,
            binder,
            clock,
            load_strategy: config.load_strategy,
            page_size: config.page_size,
            confirmation_timeout: config.confirmation_timeout(),
            binding: Mutex::new(None),
            network: Mutex::new(NetworkStatus::Unknown),
            cache: Mutex::new(PollCache::new()),
            locks: ActionLocks::new(),
            loading: AtomicUsize::new(0),
            cancel: CancelToken::new(),
            notices,
            no_provider_noticed: AtomicBool::new(false),
            last_failure: Mutex::new(None),
            events: EventBus::new(),
        };
        (engine, rx)
    }

    /// Register a listener for contract events decoded from receipts of
    /// this engine's own transactions.
    pub fn on_ledger_event(&mut self, listener: impl Fn(&LedgerEvent) + Send + Sync + 'static) {
        self.events.subscribe(Box::new(listener));
    }

    pub fn session(&self) -> WalletSession {
        self.session.session()
    }

    pub fn session_manager(&self) -> &Arc<SessionManager> {
        &self.session
    }

    pub fn registry(&self) -> &NetworkRegistry {
        &self.registry
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    // ---- session and network ------------------------------------------

    /// Connect the wallet, start listening for its events and load polls.
    pub async fn connect(&self) -> bool {
        match self.session.connect().await {
            Ok(signer) => {
                debug!(address = %signer.address, generation = signer.generation, "session established");
                self.session.attach();
                self.sync_session();
                self.load_polls().await;
                true
            }
            Err(e) => {
                self.report_connect(e);
                false
            }
        }
    }

    /// Resume a session the wallet already authorised. Silent on failure.
    pub async fn restore(&self) -> bool {
        if self.session.restore().await.is_none() {
            return false;
        }
        self.session.attach();
        self.sync_session();
        self.load_polls().await;
        true
    }

    /// Drop the session, the ledger binding and every cached poll.
    pub fn disconnect(&self) {
        self.session.disconnect();
        self.sync_session();
    }

    /// Ask the wallet to move to `target`, or to the default network.
    /// Returns whether the wallet ended up on a supported network.
    pub async fn switch_network(&self, target: Option<ChainId>) -> bool {
        let descriptor = match target {
            None => self.registry.default_network().clone(),
            Some(chain_id) => match self.registry.get(chain_id) {
                Some(d) => d.clone(),
                None => {
                    warn!(%chain_id, "refusing to switch to a network outside the registry");
                    return false;
                }
            },
        };
        match self.switch_to(&descriptor).await {
            Ok(()) => {
                self.load_polls().await;
                true
            }
            Err(failure) => {
                self.report_switch(failure);
                false
            }
        }
    }

    /// Re-derive network status and the ledger binding from the session.
    ///
    /// The cache is cleared whenever the network is unsupported or the
    /// chain differs from the one the cache was loaded for. Returns `true`
    /// when the binding was rebuilt or dropped.
    pub fn sync_session(&self) -> bool {
        let session = self.session.session();
        let status = self.registry.status(session.chain_id);
        {
            let mut network = lock(&self.network);
            if *network != status {
                match &status {
                    NetworkStatus::Supported(d) => info!(chain_id = %d.chain_id, network = %d.name, "on supported network"),
                    NetworkStatus::Unsupported { chain_id } => warn!(%chain_id, "wallet is on an unsupported network"),
                    NetworkStatus::Unknown => debug!("no network while disconnected"),
                }
                *network = status.clone();
            }
        }
        {
            let mut cache = lock(&self.cache);
            let stale = match cache.chain() {
                Some(chain) => status.chain_id() != Some(chain),
                None => false,
            };
            if !status.is_supported() || stale {
                cache.clear();
            }
        }

        let signer = self.session.signer();
        let mut binding = lock(&self.binding);
        match (signer, status.descriptor()) {
            (Some(signer), Some(network)) => {
                if binding.as_ref().is_some_and(|b| b.generation == signer.generation) {
                    return false;
                }
                let ledger = match self.binder.bind(&signer, network) {
                    Ok(ledger) => {
                        info!(
                            address = %signer.address,
                            chain_id = %signer.chain_id,
                            contract = %ledger.contract(),
                            "bound poll contract"
                        );
                        Some(ledger)
                    }
                    Err(e) => {
                        warn!(chain_id = %network.chain_id, error = %e, "poll contract unavailable");
                        None
                    }
                };
                *binding = Some(Binding {
                    generation: signer.generation,
                    ledger,
                });
                true
            }
            _ => binding.take().is_some(),
        }
    }

    /// Apply wallet events already queued and reload if the binding moved.
    /// Returns how many events were applied.
    pub async fn handle_wallet_events(&self) -> usize {
        let applied = self.session.drain_events();
        if applied > 0 && self.sync_session() {
            self.load_polls().await;
        }
        applied
    }

    /// Follow wallet events until cancelled or the provider goes away.
    ///
    /// Subscribes on entry, so the loop may start before `connect`.
    pub async fn run(&self) {
        self.session.attach();
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                alive = self.session.process_next_event() => {
                    if !alive {
                        debug!("wallet event stream closed");
                        break;
                    }
                    if self.sync_session() {
                        self.load_polls().await;
                    }
                }
            }
        }
    }

    /// Cancel in-flight confirmation waits and stop listening to the wallet.
    pub fn shutdown(&self) {
        self.cancel.cancel();
        self.session.detach();
    }

    pub fn network_status(&self) -> NetworkStatus {
        lock(&self.network).clone()
    }

    pub fn network_supported(&self) -> bool {
        lock(&self.network).is_supported()
    }

    pub fn current_network(&self) -> Option<NetworkDescriptor> {
        lock(&self.network).descriptor().cloned()
    }

    // ---- poll state -----------------------------------------------------

    /// Confirmed polls as last read from the ledger.
    pub fn polls(&self) -> Vec<Poll> {
        lock(&self.cache).confirmed().to_vec()
    }

    pub fn active_polls(&self) -> Vec<Poll> {
        let now = self.clock.now();
        self.polls().into_iter().filter(|p| p.is_open_at(now)).collect()
    }

    pub fn ended_polls(&self) -> Vec<Poll> {
        let now = self.clock.now();
        self.polls().into_iter().filter(|p| !p.is_open_at(now)).collect()
    }

    /// Creations submitted but not yet reconciled.
    pub fn pending_creates(&self) -> Vec<PendingPoll> {
        lock(&self.cache).pending().to_vec()
    }

    /// Display views for the connected account, split into (active, ended).
    pub fn views(&self) -> (Vec<PollView>, Vec<PollView>) {
        let viewer = self.session.session().address;
        split_views(&self.polls(), self.clock.now(), viewer.as_ref())
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst) > 0
    }

    /// Number of mutating actions currently holding a lock.
    pub fn in_flight(&self) -> usize {
        self.locks.in_flight()
    }

    pub fn is_action_in_flight(&self, kind: ActionKind, poll: Option<PollId>) -> bool {
        self.locks.is_held(&ActionKey::new(kind, poll))
    }

    /// Kind of the most recent failed action, cleared by the next success.
    pub fn last_failure(&self) -> Option<FailureKind> {
        *lock(&self.last_failure)
    }

    /// Reload the poll list from the ledger.
    ///
    /// Refused without a ledger call while the network is unsupported or no
    /// contract is bound; the list is then empty. Node failures also leave an
    /// empty list. Returns whether a fresh list was stored.
    pub async fn load_polls(&self) -> bool {
        let _loading = self.begin_loading();
        self.sync_session();
        let Some(network) = self.current_network() else {
            debug!("not loading polls without a supported network");
            lock(&self.cache).clear();
            return false;
        };
        let Some(ledger) = self.bound_ledger() else {
            debug!(chain_id = %network.chain_id, "not loading polls without a bound contract");
            lock(&self.cache).clear();
            return false;
        };
        match self.reload(ledger.as_ref()).await {
            Ok(count) => {
                debug!(count, chain_id = %network.chain_id, "loaded polls");
                true
            }
            Err(e) => {
                match &e {
                    LedgerError::NotDeployed { chain_id, contract } => warn!(
                        %chain_id,
                        contract = ?contract,
                        "poll contract not deployed at configured address"
                    ),
                    other => warn!(chain_id = %network.chain_id, error = %other, "failed to load polls"),
                }
                self.store_if_current(network.chain_id, Vec::new());
                false
            }
        }
    }

    // ---- mutating actions ----------------------------------------------

    pub async fn create_poll(&self, request: CreatePoll) -> bool {
        self.execute(Mutation::Create(request)).await
    }

    pub async fn vote(&self, poll_id: PollId, option_index: u64) -> bool {
        self.execute(Mutation::Vote { poll_id, option_index }).await
    }

    pub async fn end_poll(&self, poll_id: PollId) -> bool {
        self.execute(Mutation::End(poll_id)).await
    }

    pub async fn extend_poll(&self, poll_id: PollId, hours: u64) -> bool {
        self.execute(Mutation::Extend { poll_id, hours }).await
    }

    // ---- read-only queries ---------------------------------------------

    pub async fn stats(&self) -> Option<PollStats> {
        let ledger = self.bound_ledger_for_read()?;
        Self::answer("stats", ledger.stats().await)
    }

    /// Option the connected account voted for, if it voted on `poll_id`.
    pub async fn user_vote(&self, poll_id: PollId) -> Option<u64> {
        let ledger = self.bound_ledger_for_read()?;
        let account = ledger.account();
        if !Self::answer("has voted", ledger.has_voted(poll_id, account).await)? {
            return None;
        }
        Self::answer("user vote", ledger.user_vote(poll_id, account).await)
    }

    pub async fn has_voted(&self, poll_id: PollId) -> Option<bool> {
        let ledger = self.bound_ledger_for_read()?;
        Self::answer("has voted", ledger.has_voted(poll_id, ledger.account()).await)
    }

    /// Polls created by the connected account.
    pub async fn my_polls(&self) -> Option<Vec<PollId>> {
        let ledger = self.bound_ledger_for_read()?;
        Self::answer("user polls", ledger.user_polls(ledger.account()).await)
    }

    /// Polls the connected account voted on.
    pub async fn my_votes(&self) -> Option<Vec<PollId>> {
        let ledger = self.bound_ledger_for_read()?;
        Self::answer("user votes", ledger.user_votes(ledger.account()).await)
    }

    pub async fn poll_count(&self) -> Option<u64> {
        let ledger = self.bound_ledger_for_read()?;
        Self::answer("poll count", ledger.poll_count().await)
    }

    // ---- internals ------------------------------------------------------

    fn begin_loading(&self) -> LoadingGuard<'_> {
        self.loading.fetch_add(1, Ordering::SeqCst);
        LoadingGuard(&self.loading)
    }

    fn bound_ledger(&self) -> Option<Arc<dyn PollLedger>> {
        lock(&self.binding).as_ref().and_then(|b| b.ledger.clone())
    }

    fn bound_ledger_for_read(&self) -> Option<Arc<dyn PollLedger>> {
        self.sync_session();
        if !self.network_supported() {
            debug!("read refused on unsupported network");
            return None;
        }
        self.bound_ledger()
    }

    fn answer<T>(query: &'static str, result: Result<T, LedgerError>) -> Option<T> {
        result
            .map_err(|e| warn!(query, error = %e, "ledger read failed"))
            .ok()
    }

    async fn execute(&self, mutation: Mutation) -> bool {
        let kind = mutation.kind();
        let Some(_guard) = self.locks.try_acquire(mutation.key()) else {
            self.report(
                kind,
                Failure::new(
                    FailureKind::Busy,
                    format!("Still {} from an earlier request, please wait", activity(kind)),
                ),
            );
            return false;
        };
        let _loading = self.begin_loading();
        match self.perform(mutation).await {
            Ok(()) => {
                *lock(&self.last_failure) = None;
                true
            }
            Err(failure) => {
                self.report(kind, failure);
                false
            }
        }
    }

    async fn perform(&self, mutation: Mutation) -> Result<(), Failure> {
        let mutation = self.validate(mutation)?;
        let ledger = self.gate().await?;

        if let Mutation::Vote { poll_id, .. } = &mutation {
            if ledger.has_voted(*poll_id, ledger.account()).await? {
                return Err(Failure::new(FailureKind::AlreadyVoted, ALREADY_VOTED_MESSAGE));
            }
        }
        if self.cancel.is_cancelled() {
            return Err(Failure::new(FailureKind::Cancelled, "engine stopped before submitting"));
        }

        let token = match &mutation {
            Mutation::Create(request) => {
                Some(lock(&self.cache).add_pending(request.clone(), ledger.account(), self.clock.now()))
            }
            _ => None,
        };
        let outcome = self.submit_and_confirm(ledger.as_ref(), &mutation, token).await;
        let receipt = match outcome {
            Ok(receipt) => receipt,
            Err(failure) => {
                if let Some(token) = token {
                    lock(&self.cache).resolve_pending(token);
                }
                return Err(failure);
            }
        };

        for event in &receipt.events {
            debug!(poll_id = %event.poll_id(), ?event, "ledger event");
            self.events.emit(event);
        }
        if let Some(poll_id) = receipt.created_poll_id() {
            info!(%poll_id, tx_hash = %receipt.tx_hash, "poll created");
        }
        if let Err(e) = self.reload(ledger.as_ref()).await {
            warn!(error = %e, "reload after confirmed transaction failed");
        }
        if let Some(token) = token {
            lock(&self.cache).resolve_pending(token);
        }
        Ok(())
    }

    fn validate(&self, mutation: Mutation) -> Result<Mutation, Failure> {
        match mutation {
            Mutation::Create(request) => match request.normalized() {
                Ok(request) => Ok(Mutation::Create(request)),
                Err(e) => {
                    debug!(error = %e, "rejected poll request");
                    Err(Failure::new(FailureKind::InvalidInput, MISSING_FIELDS_MESSAGE))
                }
            },
            Mutation::Extend { hours: 0, .. } => Err(Failure::new(
                FailureKind::InvalidInput,
                "Extension must be at least one hour",
            )),
            Mutation::Vote { poll_id, option_index } => {
                let options = lock(&self.cache).find(poll_id).map(|p| p.options.len() as u64);
                match options {
                    Some(count) if option_index >= count => Err(Failure::new(
                        FailureKind::InvalidInput,
                        format!("Invalid option {option_index}"),
                    )),
                    _ => Ok(Mutation::Vote { poll_id, option_index }),
                }
            }
            other => Ok(other),
        }
    }

    /// Make sure a session exists on a supported network with a bound
    /// contract, switching networks first when needed.
    async fn gate(&self) -> Result<Arc<dyn PollLedger>, Failure> {
        self.sync_session();
        if self.session.signer().is_none() {
            return Err(Failure::new(FailureKind::NotConnected, "wallet not connected"));
        }
        if !self.network_supported() {
            let target = self.registry.default_network().clone();
            self.switch_to(&target).await?;
        }
        self.bound_ledger().ok_or_else(|| {
            let name = self
                .current_network()
                .map(|n| n.name)
                .unwrap_or_default();
            Failure::new(
                FailureKind::Remote,
                format!("poll contract is not deployed on {name}"),
            )
        })
    }

    async fn switch_to(&self, target: &NetworkDescriptor) -> Result<(), Failure> {
        let provider = self
            .session
            .provider()
            .ok_or_else(|| Failure::new(FailureKind::NoProvider, "no wallet provider"))?;
        match switch_network(provider.as_ref(), target).await {
            SwitchOutcome::Switched | SwitchOutcome::Added => {}
            SwitchOutcome::Declined => {
                return Err(Failure::new(FailureKind::UserRejected, "network switch declined"));
            }
            SwitchOutcome::Failed(e) => {
                return Err(Failure::new(FailureKind::UnsupportedNetwork, e.to_string()));
            }
        }
        self.session.refresh_chain().await?;
        self.sync_session();
        if self.network_supported() {
            Ok(())
        } else {
            Err(Failure::new(
                FailureKind::UnknownChain,
                format!("wallet did not move to {}", target.name),
            ))
        }
    }

    async fn submit_and_confirm(
        &self,
        ledger: &dyn PollLedger,
        mutation: &Mutation,
        token: Option<u64>,
    ) -> Result<Receipt, Failure> {
        let pending = match mutation {
            Mutation::Create(request) => ledger.create_poll(request).await?,
            Mutation::Vote { poll_id, option_index } => ledger.vote(*poll_id, *option_index).await?,
            Mutation::End(poll_id) => ledger.end_poll(*poll_id).await?,
            Mutation::Extend { poll_id, hours } => ledger.extend_poll(*poll_id, *hours).await?,
        };
        info!(
            action = %mutation.kind(),
            poll_id = ?mutation.poll_id(),
            tx_hash = %pending.hash,
            "transaction submitted"
        );
        if let Some(token) = token {
            lock(&self.cache).attach_tx(token, pending.hash.clone());
        }

        tokio::select! {
            _ = self.cancel.cancelled() => Err(Failure::new(
                FailureKind::Cancelled,
                format!("stopped waiting for {}", pending.hash),
            )),
            waited = tokio::time::timeout(self.confirmation_timeout, ledger.wait_for_receipt(&pending)) => match waited {
                Ok(receipt) => {
                    let receipt = receipt?;
                    debug!(tx_hash = %receipt.tx_hash, block = receipt.block_number, "transaction confirmed");
                    Ok(receipt)
                }
                Err(_) => Err(Failure::new(
                    FailureKind::TimedOut,
                    format!(
                        "transaction {} was not confirmed within {}s",
                        pending.hash,
                        self.confirmation_timeout.as_secs()
                    ),
                )),
            },
        }
    }

    /// Read the full poll list and store it if the chain is still current.
    async fn reload(&self, ledger: &dyn PollLedger) -> Result<usize, LedgerError> {
        let chain_id = ledger.chain_id();
        if !ledger.is_deployed().await? {
            return Err(LedgerError::NotDeployed {
                chain_id,
                contract: Some(ledger.contract()),
            });
        }
        let fetched = match self.load_strategy {
            LoadStrategy::Active => ledger.active_polls().await?,
            LoadStrategy::Paged => paging::fetch_all(ledger, self.page_size).await?,
        };
        let polls: Vec<Poll> = fetched
            .into_iter()
            .filter(|p| match p.check_invariants() {
                Ok(()) => true,
                Err(e) => {
                    warn!(poll_id = %p.id, error = %e, "dropping inconsistent poll");
                    false
                }
            })
            .collect();
        let count = polls.len();
        self.store_if_current(chain_id, polls);
        Ok(count)
    }

    fn store_if_current(&self, chain_id: ChainId, polls: Vec<Poll>) {
        let current = lock(&self.network).descriptor().map(|d| d.chain_id);
        if current != Some(chain_id) {
            debug!(%chain_id, "discarding poll list for a chain no longer active");
            return;
        }
        lock(&self.cache).replace_confirmed(chain_id, polls);
    }

    fn currency_symbol(&self) -> String {
        self.current_network()
            .unwrap_or_else(|| self.registry.default_network().clone())
            .native_currency
            .symbol
    }

    fn notify(&self, notice: Notice) {
        // A dropped receiver means nobody displays notices any more.
        let _ = self.notices.send(notice);
    }

    fn report(&self, action: ActionKind, failure: Failure) {
        let Failure { kind, detail } = failure;
        *lock(&self.last_failure) = Some(kind);
        match kind {
            FailureKind::UserRejected | FailureKind::Cancelled | FailureKind::NotConnected => {
                info!(%action, %kind, %detail, "action did not complete")
            }
            FailureKind::Busy | FailureKind::InvalidInput | FailureKind::AlreadyVoted => {
                info!(%action, %kind, %detail, "action refused")
            }
            FailureKind::Remote
            | FailureKind::Reverted
            | FailureKind::TimedOut
            | FailureKind::InsufficientFunds
            | FailureKind::UnsupportedNetwork
            | FailureKind::UnknownChain => warn!(%action, %kind, %detail, "action failed"),
            FailureKind::NoProvider => warn!(%action, %kind, "action attempted without a wallet provider"),
        }
        if !kind.notifies() {
            return;
        }
        let message = match kind {
            FailureKind::InsufficientFunds => format!(
                "Insufficient funds for transaction. Please add more {} to your wallet.",
                self.currency_symbol()
            ),
            FailureKind::Busy | FailureKind::InvalidInput | FailureKind::AlreadyVoted => detail,
            FailureKind::NoProvider => {
                if self.no_provider_noticed.swap(true, Ordering::SeqCst) {
                    return;
                }
                NO_PROVIDER_MESSAGE.to_string()
            }
            FailureKind::TimedOut => format!(
                "Error {}: transaction not confirmed in time. It may still be applied.",
                activity(action)
            ),
            _ => format!("Error {}: {detail}", activity(action)),
        };
        self.notify(Notice::new(kind, message));
    }

    fn report_connect(&self, e: ProviderError) {
        let kind = FailureKind::from(&e);
        *lock(&self.last_failure) = Some(kind);
        match kind {
            FailureKind::NoProvider => {
                if !self.no_provider_noticed.swap(true, Ordering::SeqCst) {
                    self.notify(Notice::new(kind, NO_PROVIDER_MESSAGE));
                }
            }
            FailureKind::UserRejected => {}
            _ => self.notify(Notice::new(kind, format!("Failed to connect wallet: {e}"))),
        }
    }

    fn report_switch(&self, failure: Failure) {
        *lock(&self.last_failure) = Some(failure.kind);
        match failure.kind {
            FailureKind::UserRejected => info!(detail = %failure.detail, "network switch declined"),
            FailureKind::NoProvider => {
                if !self.no_provider_noticed.swap(true, Ordering::SeqCst) {
                    self.notify(Notice::new(failure.kind, NO_PROVIDER_MESSAGE));
                }
            }
            _ => {
                warn!(kind = %failure.kind, detail = %failure.detail, "network switch failed");
                self.notify(Notice::new(
                    failure.kind,
                    format!("Failed to switch network: {}", failure.detail),
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reverted_detail_prefers_reason() {
        let failure = Failure::from(LedgerError::Reverted {
            tx_hash: Some("0x01".into()),
            reason: Some("Poll is not active".into()),
        });
        assert_eq!(failure.kind, FailureKind::Reverted);
        assert_eq!(failure.detail, "Poll is not active");
    }

    #[test]
    fn mutation_keys() {
        let vote = Mutation::Vote {
            poll_id: PollId::new(4),
            option_index: 1,
        };
        assert_eq!(vote.key(), ActionKey::new(ActionKind::Vote, Some(PollId::new(4))));
        let create = Mutation::Create(CreatePoll::new("Q", ["a", "b"], 1));
        assert_eq!(create.key(), ActionKey::new(ActionKind::Create, None));
        assert_eq!(activity(ActionKind::End), "ending poll");
    }

    #[test]
    fn engine_starts_disconnected() {
        let session = Arc::new(SessionManager::new(None));
        let binder: Arc<dyn LedgerBinder> = Arc::new(NoBinder);
        let (engine, _rx) = PollSyncEngine::new(
            session,
            NetworkRegistry::builtin(),
            binder,
            Arc::new(chainvote_types::SystemClock),
            &SyncConfig::default(),
        );
        assert_eq!(engine.network_status(), NetworkStatus::Unknown);
        assert!(engine.polls().is_empty());
        assert!(!engine.is_loading());
        assert_eq!(engine.session().address, None);
        assert!(!engine.sync_session());
    }

    struct NoBinder;

    impl LedgerBinder for NoBinder {
        fn bind(
            &self,
            _: &chainvote_wallet_core::Signer,
            network: &NetworkDescriptor,
        ) -> Result<Arc<dyn PollLedger>, LedgerError> {
            Err(LedgerError::NotDeployed {
                chain_id: network.chain_id,
                contract: None,
            })
        }
    }
}
