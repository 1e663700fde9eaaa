use proptest::prelude::*;

use chainvote_types::{partition, Address, ChainId, Poll, PollId, Timestamp};

fn arb_poll() -> impl Strategy<Value = Poll> {
    (
        prop::collection::vec(0u64..10_000, 2..8),
        any::<bool>(),
        0u64..1_000_000,
        1u64..1_000_000,
    )
        .prop_map(|(votes, is_active, created, duration)| Poll {
            id: PollId::new(1),
            question: "q".into(),
            options: (0..votes.len()).map(|i| format!("o{i}")).collect(),
            total_votes: votes.iter().sum(),
            votes,
            creator: Address::ZERO,
            is_active,
            created_at: Timestamp::new(created),
            end_time: Timestamp::new(created + duration),
        })
}

proptest! {
    /// A poll whose total matches its counters always passes the invariant check.
    #[test]
    fn consistent_tally_passes(poll in arb_poll()) {
        prop_assert!(poll.check_invariants().is_ok());
    }

    /// Any drift between totalVotes and the counter sum is rejected.
    #[test]
    fn drifted_tally_fails(poll in arb_poll(), delta in 1u64..100) {
        let mut drifted = poll;
        drifted.total_votes += delta;
        prop_assert!(drifted.check_invariants().is_err());
    }

    /// Open is exactly `is_active && now < end_time`, for every `now`.
    #[test]
    fn open_predicate(poll in arb_poll(), now in 0u64..3_000_000) {
        let now = Timestamp::new(now);
        prop_assert_eq!(poll.is_open_at(now), poll.is_active && now < poll.end_time);
    }

    /// Partition covers every poll exactly once.
    #[test]
    fn partition_is_total(polls in prop::collection::vec(arb_poll(), 0..10), now in 0u64..3_000_000) {
        let (open, ended) = partition(&polls, Timestamp::new(now));
        prop_assert_eq!(open.len() + ended.len(), polls.len());
        prop_assert!(open.iter().all(|p| p.is_open_at(Timestamp::new(now))));
        prop_assert!(ended.iter().all(|p| !p.is_open_at(Timestamp::new(now))));
    }

    /// The winner holds the maximum and no earlier option ties it.
    #[test]
    fn winner_is_first_maximum(poll in arb_poll()) {
        let winner = poll.winning_option().unwrap();
        let max = *poll.votes.iter().max().unwrap();
        prop_assert_eq!(poll.votes[winner], max);
        prop_assert!(poll.votes[..winner].iter().all(|v| *v < max));
    }

    /// Percentages never exceed 100.
    #[test]
    fn percentage_bounded(poll in arb_poll()) {
        for i in 0..poll.options.len() {
            prop_assert!(poll.vote_percentage(i) <= 100);
        }
    }

    /// Chain id hex form parses back to the same id.
    #[test]
    fn chain_id_hex(id in any::<u64>()) {
        let chain = ChainId::new(id);
        prop_assert_eq!(ChainId::from_hex(&chain.to_hex()).unwrap(), chain);
    }

    /// Address display parses back to the same bytes.
    #[test]
    fn address_display_parses(bytes in prop::array::uniform20(any::<u8>())) {
        let addr = Address::new(bytes);
        prop_assert_eq!(Address::parse(&addr.to_string()).unwrap(), addr);
    }
}
