//! End-to-end engine behaviour against the nullable wallet and ledger.

use chainvote_ledger::LedgerError;
use chainvote_networks::{NetworkRegistry, NetworkStatus, LISK_MAINNET, LISK_SEPOLIA};
use chainvote_nullables::{LedgerCall, NullClock, NullLedger, NullLedgerBinder, NullWalletProvider};
use chainvote_sync::{ActionKind, FailureKind, LoadStrategy, Notice, PollSyncEngine, SyncConfig};
use chainvote_types::{Address, ChainId, CreatePoll, Poll, PollId, Timestamp};
use chainvote_wallet_core::{ProviderError, SessionManager, WalletProvider};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::yield_now;

const START: u64 = 1_700_000_000;
const UNLISTED_CHAIN: ChainId = ChainId::new(1);

fn alice() -> Address {
    Address::new([0xa1; 20])
}

fn bob() -> Address {
    Address::new([0xb0; 20])
}

fn contract() -> Address {
    Address::new([0xcc; 20])
}

struct Harness {
    clock: Arc<NullClock>,
    wallet: Arc<NullWalletProvider>,
    ledger: Arc<NullLedger>,
    binder: Arc<NullLedgerBinder>,
    engine: PollSyncEngine,
    notices: mpsc::UnboundedReceiver<Notice>,
}

impl Harness {
    fn new(chain: ChainId) -> Self {
        Self::with_config(chain, SyncConfig::default())
    }

    fn with_config(chain: ChainId, config: SyncConfig) -> Self {
        let clock = Arc::new(NullClock::new(START));
        let wallet = Arc::new(NullWalletProvider::new(alice(), chain));
        let ledger = Arc::new(NullLedger::new(contract(), clock.clone()));
        let binder = Arc::new(NullLedgerBinder::new());
        binder.deploy(LISK_SEPOLIA, ledger.clone());

        let provider: Arc<dyn WalletProvider> = wallet.clone();
        let session = Arc::new(SessionManager::new(Some(provider)));
        let (engine, notices) = PollSyncEngine::new(session, registry(), binder.clone(), clock.clone(), &config);
        Self {
            clock,
            wallet,
            ledger,
            binder,
            engine,
            notices,
        }
    }

    fn drain_notices(&mut self) -> Vec<Notice> {
        let mut all = Vec::new();
        while let Ok(n) = self.notices.try_recv() {
            all.push(n);
        }
        all
    }

    fn seed(&self, creator: Address, question: &str) -> PollId {
        self.ledger
            .create_directly(creator, &CreatePoll::new(question, ["Yes", "No"], 24))
    }
}

/// Built-in networks with the poll contract deployed on Sepolia only.
fn registry() -> NetworkRegistry {
    let mut sepolia = NetworkRegistry::builtin()
        .get(LISK_SEPOLIA)
        .cloned()
        .expect("sepolia is built in");
    sepolia.poll_contract = Some(contract());
    NetworkRegistry::builtin()
        .with_overrides(&[sepolia], None)
        .expect("valid overrides")
}

fn is_vote(call: &LedgerCall) -> bool {
    matches!(call, LedgerCall::Vote { .. })
}

fn is_receipt_wait(call: &LedgerCall) -> bool {
    matches!(call, LedgerCall::WaitForReceipt(_))
}

#[tokio::test]
async fn create_round_trip_reloads_confirmed_poll() {
    let h = Harness::new(LISK_SEPOLIA);
    assert!(h.engine.connect().await);
    assert!(h.engine.polls().is_empty());

    assert!(h.engine.create_poll(CreatePoll::new("Q", ["A", "B"], 24)).await);

    let polls = h.engine.polls();
    assert_eq!(polls.len(), 1);
    let poll = &polls[0];
    assert_eq!(poll.question, "Q");
    assert_eq!(poll.options, vec!["A".to_string(), "B".to_string()]);
    assert_eq!(poll.votes, vec![0, 0]);
    assert_eq!(poll.total_votes, 0);
    assert!(poll.is_active);
    assert_eq!(poll.creator, alice());
    assert_eq!(poll.end_time.as_secs() - poll.created_at.as_secs(), 24 * 3600);
    assert!(h.engine.pending_creates().is_empty());
    assert_eq!(h.engine.last_failure(), None);
    assert!(!h.engine.is_loading());
}

#[tokio::test]
async fn create_trims_input_and_rejects_blank_fields() {
    let mut h = Harness::new(LISK_SEPOLIA);
    assert!(h.engine.connect().await);

    assert!(!h.engine.create_poll(CreatePoll::new("   ", ["A", "B"], 24)).await);
    assert!(!h.engine.create_poll(CreatePoll::new("Q", ["A"], 24)).await);
    assert!(!h.engine.create_poll(CreatePoll::new("Q", ["A", " "], 24)).await);
    assert!(!h.engine.create_poll(CreatePoll::new("Q", ["A", "B"], 0)).await);
    assert_eq!(h.ledger.mutation_count(), 0);
    let notices = h.drain_notices();
    assert_eq!(notices.len(), 4);
    assert!(notices
        .iter()
        .all(|n| n.kind == FailureKind::InvalidInput && n.message == "Please fill in all fields"));

    assert!(h.engine.create_poll(CreatePoll::new("  Lunch?  ", [" Pizza ", "Salad"], 1)).await);
    let poll = &h.engine.polls()[0];
    assert_eq!(poll.question, "Lunch?");
    assert_eq!(poll.options, vec!["Pizza".to_string(), "Salad".to_string()]);
}

#[tokio::test]
async fn vote_is_skipped_when_already_voted() {
    let mut h = Harness::new(LISK_SEPOLIA);
    let id = h.seed(bob(), "Tabs or spaces?");
    h.ledger.vote_directly(id, alice(), 0).unwrap();
    assert!(h.engine.connect().await);

    assert!(!h.engine.vote(id, 1).await);

    assert_eq!(h.ledger.count(is_vote), 0);
    assert_eq!(h.ledger.count(|c| matches!(c, LedgerCall::HasVoted(p, a) if *p == id && *a == alice())), 1);
    assert_eq!(
        h.drain_notices(),
        vec![Notice::new(FailureKind::AlreadyVoted, "You have already voted on this poll!")]
    );
    assert_eq!(h.engine.last_failure(), Some(FailureKind::AlreadyVoted));
}

#[tokio::test]
async fn vote_updates_tally_after_reload() {
    let h = Harness::new(LISK_SEPOLIA);
    let id = h.seed(bob(), "Tabs or spaces?");
    assert!(h.engine.connect().await);

    assert!(h.engine.vote(id, 1).await);

    let poll = h.engine.polls().into_iter().find(|p| p.id == id).unwrap();
    assert_eq!(poll.votes, vec![0, 1]);
    assert_eq!(poll.total_votes, 1);
    assert_eq!(h.engine.user_vote(id).await, Some(1));
}

#[tokio::test]
async fn out_of_range_option_is_refused_locally() {
    let mut h = Harness::new(LISK_SEPOLIA);
    let id = h.seed(bob(), "Q");
    assert!(h.engine.connect().await);

    assert!(!h.engine.vote(id, 2).await);
    assert_eq!(h.ledger.count(is_vote), 0);
    assert_eq!(h.drain_notices()[0].kind, FailureKind::InvalidInput);
}

#[tokio::test]
async fn unsupported_network_refuses_everything_when_switch_declined() {
    let mut h = Harness::new(UNLISTED_CHAIN);
    h.wallet.fail_switch(Some(ProviderError::UserRejected));
    assert!(h.engine.connect().await);
    assert_eq!(
        h.engine.network_status(),
        NetworkStatus::Unsupported {
            chain_id: UNLISTED_CHAIN
        }
    );
    assert!(!h.engine.network_supported());

    assert!(!h.engine.create_poll(CreatePoll::new("Q", ["A", "B"], 24)).await);
    assert!(!h.engine.vote(PollId::new(0), 0).await);
    assert!(!h.engine.end_poll(PollId::new(0)).await);
    assert!(!h.engine.extend_poll(PollId::new(0), 1).await);

    assert!(h.ledger.calls().is_empty());
    assert!(h.binder.binds().is_empty());
    assert!(h.drain_notices().is_empty());
    assert_eq!(h.engine.last_failure(), Some(FailureKind::UserRejected));
    assert_eq!(h.wallet.switch_requests().len(), 4);
}

#[tokio::test]
async fn gate_switches_network_then_proceeds() {
    let h = Harness::new(UNLISTED_CHAIN);
    h.wallet.know_chain(LISK_SEPOLIA);
    assert!(h.engine.connect().await);
    assert!(h.ledger.calls().is_empty());

    assert!(h.engine.create_poll(CreatePoll::new("Q", ["A", "B"], 24)).await);

    assert_eq!(h.wallet.switch_requests(), vec![LISK_SEPOLIA]);
    assert!(h.wallet.add_chain_requests().is_empty());
    assert!(h.engine.network_supported());
    assert_eq!(h.engine.current_network().unwrap().chain_id, LISK_SEPOLIA);
    assert_eq!(h.engine.polls().len(), 1);
    assert_eq!(h.binder.binds().last().unwrap().chain_id, LISK_SEPOLIA);
}

#[tokio::test]
async fn unknown_chain_is_added_once_with_full_descriptor() {
    let h = Harness::new(UNLISTED_CHAIN);
    assert!(h.engine.connect().await);

    assert!(h.engine.switch_network(None).await);

    let added = h.wallet.add_chain_requests();
    assert_eq!(added.len(), 1);
    assert_eq!(added[0].chain_id, LISK_SEPOLIA);
    assert_eq!(added[0].poll_contract, Some(contract()));
    assert_eq!(added[0].native_currency.symbol, "ETH");
    assert_eq!(h.wallet.current_chain(), LISK_SEPOLIA);
    assert!(h.engine.network_supported());
    assert_eq!(h.ledger.count(|c| matches!(c, LedgerCall::ActivePolls)), 1);
}

#[tokio::test]
async fn declined_switch_returns_false_without_notice() {
    let mut h = Harness::new(UNLISTED_CHAIN);
    h.wallet.fail_switch(Some(ProviderError::UserRejected));
    assert!(h.engine.connect().await);

    assert!(!h.engine.switch_network(None).await);

    assert!(h.drain_notices().is_empty());
    assert_eq!(h.engine.last_failure(), Some(FailureKind::UserRejected));
    assert!(!h.engine.network_supported());
}

#[tokio::test]
async fn switch_to_unlisted_network_is_refused() {
    let h = Harness::new(LISK_SEPOLIA);
    assert!(h.engine.connect().await);
    assert!(!h.engine.switch_network(Some(ChainId::new(31337))).await);
    assert!(h.wallet.switch_requests().is_empty());
}

#[tokio::test]
async fn concurrent_votes_on_same_poll_are_refused() {
    let mut h = Harness::new(LISK_SEPOLIA);
    let id = h.seed(bob(), "Q");
    assert!(h.engine.connect().await);
    h.ledger.hold_receipts();

    let (first, second) = tokio::join!(h.engine.vote(id, 0), async {
        while !h.engine.is_action_in_flight(ActionKind::Vote, Some(id)) {
            yield_now().await;
        }
        let second = h.engine.vote(id, 1).await;
        h.ledger.release_receipts(1);
        second
    });

    assert!(first);
    assert!(!second);
    assert_eq!(h.ledger.count(is_vote), 1);
    let notices = h.drain_notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].kind, FailureKind::Busy);
    assert_eq!(h.engine.in_flight(), 0);
}

#[tokio::test]
async fn votes_on_different_polls_proceed_together() {
    let h = Harness::new(LISK_SEPOLIA);
    let a = h.seed(bob(), "A?");
    let b = h.seed(bob(), "B?");
    assert!(h.engine.connect().await);
    h.ledger.hold_receipts();

    let (first, second, ()) = tokio::join!(h.engine.vote(a, 0), h.engine.vote(b, 1), async {
        while h.ledger.count(is_receipt_wait) < 2 {
            yield_now().await;
        }
        assert_eq!(h.engine.in_flight(), 2);
        assert!(h.engine.is_loading());
        h.ledger.release_receipts(2);
    });

    assert!(first && second);
    let polls = h.engine.polls();
    assert_eq!(polls.iter().map(|p| p.total_votes).sum::<u64>(), 2);
}

#[tokio::test(start_paused = true)]
async fn unconfirmed_transaction_times_out() {
    let config = SyncConfig {
        confirmation_timeout_secs: 5,
        ..SyncConfig::default()
    };
    let mut h = Harness::with_config(LISK_SEPOLIA, config);
    assert!(h.engine.connect().await);
    h.ledger.never_confirm();

    assert!(!h.engine.create_poll(CreatePoll::new("Q", ["A", "B"], 24)).await);

    assert_eq!(h.engine.last_failure(), Some(FailureKind::TimedOut));
    assert!(h.engine.pending_creates().is_empty());
    assert!(h.engine.polls().is_empty());
    let notices = h.drain_notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].kind, FailureKind::TimedOut);
    assert!(notices[0].message.starts_with("Error creating poll"));
}

#[tokio::test]
async fn cancelling_resolves_inflight_wait() {
    let mut h = Harness::new(LISK_SEPOLIA);
    let id = h.seed(bob(), "Q");
    assert!(h.engine.connect().await);
    h.ledger.never_confirm();

    let (voted, ()) = tokio::join!(h.engine.vote(id, 0), async {
        while h.ledger.count(is_receipt_wait) == 0 {
            yield_now().await;
        }
        h.engine.cancel_token().cancel();
    });

    assert!(!voted);
    assert_eq!(h.engine.last_failure(), Some(FailureKind::Cancelled));
    assert!(h.drain_notices().is_empty());

    // Nothing new is submitted once cancelled.
    let other = h.seed(bob(), "Q2");
    assert!(!h.engine.vote(other, 0).await);
    assert_eq!(h.ledger.count(is_vote), 1);
}

#[tokio::test]
async fn pending_create_is_visible_until_resolved() {
    let h = Harness::new(LISK_SEPOLIA);
    assert!(h.engine.connect().await);
    h.ledger.hold_receipts();

    let (created, ()) = tokio::join!(h.engine.create_poll(CreatePoll::new("Q", ["A", "B"], 2)), async {
        while h.ledger.count(is_receipt_wait) == 0 {
            yield_now().await;
        }
        let pending = h.engine.pending_creates();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].request.question, "Q");
        assert_eq!(pending[0].creator, alice());
        assert!(pending[0].tx_hash.is_some());
        let projected = pending[0].projection();
        assert_eq!(projected.votes, vec![0, 0]);
        assert_eq!(projected.end_time, Timestamp::new(START + 2 * 3600));
        assert!(h.engine.polls().is_empty());
        h.ledger.release_receipts(1);
    });

    assert!(created);
    assert!(h.engine.pending_creates().is_empty());
    assert_eq!(h.engine.polls().len(), 1);
}

#[tokio::test]
async fn pending_create_is_dropped_on_failure() {
    let mut h = Harness::new(LISK_SEPOLIA);
    assert!(h.engine.connect().await);
    h.ledger.fail_next_receipt(LedgerError::Reverted {
        tx_hash: Some("0x01".into()),
        reason: Some("out of gas".into()),
    });

    assert!(!h.engine.create_poll(CreatePoll::new("Q", ["A", "B"], 2)).await);

    assert!(h.engine.pending_creates().is_empty());
    assert!(h.engine.polls().is_empty());
    assert_eq!(
        h.drain_notices(),
        vec![Notice::new(FailureKind::Reverted, "Error creating poll: out of gas")]
    );
}

#[tokio::test]
async fn insufficient_funds_names_the_native_asset() {
    let mut h = Harness::new(LISK_SEPOLIA);
    let id = h.seed(bob(), "Q");
    assert!(h.engine.connect().await);
    h.ledger
        .fail_next_submit(LedgerError::InsufficientFunds("insufficient funds for gas".into()));

    assert!(!h.engine.vote(id, 0).await);

    assert_eq!(
        h.drain_notices(),
        vec![Notice::new(
            FailureKind::InsufficientFunds,
            "Insufficient funds for transaction. Please add more ETH to your wallet."
        )]
    );
}

#[tokio::test]
async fn rejected_signature_is_silent() {
    let mut h = Harness::new(LISK_SEPOLIA);
    let id = h.seed(alice(), "Q");
    assert!(h.engine.connect().await);
    h.ledger.fail_next_submit(LedgerError::UserRejected);

    assert!(!h.engine.end_poll(id).await);
    assert!(h.drain_notices().is_empty());
    assert_eq!(h.engine.last_failure(), Some(FailureKind::UserRejected));
}

#[tokio::test]
async fn only_the_creator_can_end_a_poll() {
    let mut h = Harness::new(LISK_SEPOLIA);
    let theirs = h.seed(bob(), "Theirs");
    let mine = h.seed(alice(), "Mine");
    assert!(h.engine.connect().await);

    assert!(!h.engine.end_poll(theirs).await);
    assert_eq!(
        h.drain_notices(),
        vec![Notice::new(FailureKind::Reverted, "Error ending poll: Only creator can modify poll")]
    );

    assert!(h.engine.end_poll(mine).await);
    assert!(h.engine.active_polls().iter().all(|p| p.id != mine));
    let (_, ended) = h.engine.views();
    assert!(ended.is_empty(), "active strategy only returns open polls");
}

#[tokio::test]
async fn extend_moves_the_end_time() {
    let mut h = Harness::new(LISK_SEPOLIA);
    let id = h.seed(alice(), "Mine");
    assert!(h.engine.connect().await);
    let before = h.engine.polls()[0].end_time;

    assert!(!h.engine.extend_poll(id, 0).await);
    assert_eq!(h.drain_notices()[0].kind, FailureKind::InvalidInput);
    assert_eq!(h.ledger.mutation_count(), 0);

    assert!(h.engine.extend_poll(id, 2).await);
    assert_eq!(h.engine.polls()[0].end_time, before.plus_secs(2 * 3600));
}

#[tokio::test]
async fn account_change_rebinds_the_ledger() {
    let h = Harness::new(LISK_SEPOLIA);
    assert!(h.engine.connect().await);
    assert_eq!(h.binder.binds().len(), 1);

    h.wallet.select_account(bob());
    assert_eq!(h.engine.handle_wallet_events().await, 1);

    let binds = h.binder.binds();
    assert_eq!(binds.len(), 2);
    assert_eq!(binds[1].address, bob());
    assert!(binds[1].generation > binds[0].generation);

    // The new signer is the one submitting.
    assert!(h.engine.create_poll(CreatePoll::new("Q", ["A", "B"], 1)).await);
    assert_eq!(h.engine.polls()[0].creator, bob());
}

#[tokio::test]
async fn chain_change_to_unlisted_chain_clears_polls() {
    let h = Harness::new(LISK_SEPOLIA);
    h.seed(bob(), "Q");
    assert!(h.engine.connect().await);
    assert_eq!(h.engine.polls().len(), 1);

    h.wallet.select_chain(UNLISTED_CHAIN);
    h.engine.handle_wallet_events().await;

    assert!(!h.engine.network_supported());
    assert!(h.engine.polls().is_empty());
    let session = h.engine.session();
    assert!(session.is_connected);
    assert_eq!(session.address, Some(alice()));
    assert_eq!(session.chain_id, Some(UNLISTED_CHAIN));
}

#[tokio::test]
async fn chain_without_contract_has_no_binding() {
    let h = Harness::new(LISK_MAINNET);
    h.seed(bob(), "Q");
    assert!(h.engine.connect().await);

    assert!(h.engine.network_supported());
    assert!(h.binder.binds().is_empty());
    assert!(h.engine.polls().is_empty());
    assert!(!h.engine.load_polls().await);
    assert!(h.ledger.calls().is_empty());
}

#[tokio::test]
async fn run_loop_follows_wallet_events_until_cancelled() {
    let h = Harness::new(LISK_SEPOLIA);
    assert!(h.engine.connect().await);

    tokio::join!(h.engine.run(), async {
        h.wallet.select_account(bob());
        while h.binder.binds().len() < 2 {
            yield_now().await;
        }
        h.engine.cancel_token().cancel();
    });

    assert_eq!(h.engine.session().address, Some(bob()));
}

#[tokio::test]
async fn run_loop_started_before_connect_follows_later_session() {
    let h = Harness::new(LISK_SEPOLIA);

    tokio::join!(h.engine.run(), async {
        assert_eq!(h.wallet.subscriber_count(), 1);
        assert!(h.engine.connect().await);
        assert_eq!(h.wallet.subscriber_count(), 1);
        h.wallet.select_account(bob());
        while h.binder.binds().len() < 2 {
            yield_now().await;
        }
        h.engine.cancel_token().cancel();
    });

    assert_eq!(h.engine.session().address, Some(bob()));
}

#[tokio::test]
async fn inconsistent_polls_are_filtered_out() {
    let h = Harness::new(LISK_SEPOLIA);
    h.seed(bob(), "Fine");
    h.ledger.seed_poll(Poll {
        id: PollId::new(1),
        question: "Broken".into(),
        options: vec!["A".into(), "B".into()],
        votes: vec![1, 1],
        total_votes: 5,
        creator: bob(),
        is_active: true,
        created_at: Timestamp::new(START),
        end_time: Timestamp::new(START + 3600),
    });
    assert!(h.engine.connect().await);

    let polls = h.engine.polls();
    assert_eq!(polls.len(), 1);
    assert_eq!(polls[0].question, "Fine");
}

#[tokio::test]
async fn undeployed_contract_yields_empty_list() {
    let h = Harness::new(LISK_SEPOLIA);
    h.seed(bob(), "Q");
    h.ledger.set_deployed(false);
    assert!(h.engine.connect().await);

    assert!(h.engine.polls().is_empty());
    assert!(!h.engine.load_polls().await);
    assert_eq!(h.ledger.count(|c| matches!(c, LedgerCall::ActivePolls)), 0);
}

#[tokio::test]
async fn node_failure_degrades_to_empty_list() {
    let mut h = Harness::new(LISK_SEPOLIA);
    h.seed(bob(), "Q");
    assert!(h.engine.connect().await);
    assert_eq!(h.engine.polls().len(), 1);

    h.ledger
        .fail_reads(Some(LedgerError::Transport("connection reset".into())));
    assert!(!h.engine.load_polls().await);
    assert!(h.engine.polls().is_empty());
    assert!(h.drain_notices().is_empty());

    h.ledger.fail_reads(None);
    assert!(h.engine.load_polls().await);
    assert_eq!(h.engine.polls().len(), 1);
}

#[tokio::test]
async fn paged_strategy_walks_every_page() {
    let config = SyncConfig {
        load_strategy: LoadStrategy::Paged,
        page_size: 2,
        ..SyncConfig::default()
    };
    let h = Harness::with_config(LISK_SEPOLIA, config);
    for i in 0..5 {
        h.seed(bob(), &format!("Q{i}"));
    }
    h.clock.advance(48 * 3600);
    assert!(h.engine.connect().await);

    assert_eq!(h.engine.polls().len(), 5);
    assert_eq!(h.ledger.count(|c| matches!(c, LedgerCall::Polls { .. })), 3);
    assert!(h.engine.active_polls().is_empty());
    assert_eq!(h.engine.ended_polls().len(), 5);
    let (active, ended) = h.engine.views();
    assert!(active.is_empty());
    assert!(ended.iter().all(|v| v.remaining_label == "Ended" && !v.can_vote));
}

#[tokio::test]
async fn read_only_queries() {
    let h = Harness::new(LISK_SEPOLIA);
    assert_eq!(h.engine.stats().await, None);

    let mine = h.seed(alice(), "Mine");
    let theirs = h.seed(bob(), "Theirs");
    h.ledger.vote_directly(theirs, alice(), 1).unwrap();
    h.ledger.vote_directly(theirs, bob(), 0).unwrap();
    assert!(h.engine.connect().await);

    let stats = h.engine.stats().await.unwrap();
    assert_eq!(stats.total_polls, 2);
    assert_eq!(stats.total_votes, 2);
    assert_eq!(stats.total_participants, 2);
    assert_eq!(h.engine.poll_count().await, Some(2));
    assert_eq!(h.engine.my_polls().await, Some(vec![mine]));
    assert_eq!(h.engine.my_votes().await, Some(vec![theirs]));
    assert_eq!(h.engine.has_voted(mine).await, Some(false));
    assert_eq!(h.engine.user_vote(theirs).await, Some(1));
    assert_eq!(h.engine.user_vote(mine).await, None);

    h.ledger.fail_reads(Some(LedgerError::Transport("down".into())));
    assert_eq!(h.engine.stats().await, None);
}

#[tokio::test]
async fn disconnect_clears_everything() {
    let h = Harness::new(LISK_SEPOLIA);
    h.seed(bob(), "Q");
    assert!(h.engine.connect().await);
    assert_eq!(h.engine.polls().len(), 1);

    h.engine.disconnect();

    let session = h.engine.session();
    assert!(!session.is_connected);
    assert_eq!(session.address, None);
    assert_eq!(session.chain_id, None);
    assert!(h.engine.polls().is_empty());
    assert_eq!(h.engine.network_status(), NetworkStatus::Unknown);

    h.ledger.clear_calls();
    assert!(!h.engine.create_poll(CreatePoll::new("Q", ["A", "B"], 1)).await);
    assert_eq!(h.engine.last_failure(), Some(FailureKind::NotConnected));
    assert!(h.ledger.calls().is_empty());
}

#[tokio::test]
async fn restore_reconnects_authorised_wallet() {
    let clock = Arc::new(NullClock::new(START));
    let wallet = Arc::new(NullWalletProvider::new(alice(), LISK_SEPOLIA).authorized());
    let ledger = Arc::new(NullLedger::new(contract(), clock.clone()));
    ledger.create_directly(bob(), &CreatePoll::new("Q", ["A", "B"], 1));
    let binder = Arc::new(NullLedgerBinder::new());
    binder.deploy(LISK_SEPOLIA, ledger);
    let provider: Arc<dyn WalletProvider> = wallet;
    let session = Arc::new(SessionManager::new(Some(provider)));
    let (engine, _notices) = PollSyncEngine::new(session, registry(), binder, clock, &SyncConfig::default());

    assert!(engine.restore().await);
    assert_eq!(engine.session().address, Some(alice()));
    assert_eq!(engine.polls().len(), 1);
}

#[tokio::test]
async fn missing_provider_is_noticed_once() {
    let session = Arc::new(SessionManager::new(None));
    let (engine, mut notices) = PollSyncEngine::new(
        session,
        registry(),
        Arc::new(NullLedgerBinder::new()),
        Arc::new(NullClock::new(START)),
        &SyncConfig::default(),
    );

    assert!(!engine.connect().await);
    assert!(!engine.connect().await);
    assert!(!engine.restore().await);

    let first = notices.try_recv().unwrap();
    assert_eq!(first.kind, FailureKind::NoProvider);
    assert!(notices.try_recv().is_err());
    assert_eq!(engine.last_failure(), Some(FailureKind::NoProvider));
}

#[tokio::test]
async fn ledger_events_reach_listeners() {
    let clock = Arc::new(NullClock::new(START));
    let wallet = Arc::new(NullWalletProvider::new(alice(), LISK_SEPOLIA));
    let ledger = Arc::new(NullLedger::new(contract(), clock.clone()));
    let binder = Arc::new(NullLedgerBinder::new());
    binder.deploy(LISK_SEPOLIA, ledger);
    let provider: Arc<dyn WalletProvider> = wallet;
    let session = Arc::new(SessionManager::new(Some(provider)));
    let (mut engine, _notices) = PollSyncEngine::new(session, registry(), binder, clock, &SyncConfig::default());

    let created = Arc::new(AtomicUsize::new(0));
    let seen = created.clone();
    engine.on_ledger_event(move |event| {
        if matches!(event, chainvote_ledger::LedgerEvent::PollCreated { .. }) {
            seen.fetch_add(1, Ordering::SeqCst);
        }
    });

    assert!(engine.connect().await);
    assert!(engine.create_poll(CreatePoll::new("Q", ["A", "B"], 1)).await);
    assert!(engine.create_poll(CreatePoll::new("R", ["A", "B"], 1)).await);
    assert_eq!(created.load(Ordering::SeqCst), 2);
}
