//! Property tests for toggle convergence and exchange minimality.
//!
//! A reference model (plain flag flips with saturating counter moves) is
//! compared against the engine across random tap bursts and random
//! tap/dispatch interleavings.

#![forbid(unsafe_code)]

use proptest::prelude::*;

use feedloom_engage::{EngagementEngine, EngagementSeed, PostId, RemoteCommand};

/// Reference model: apply `taps` flag flips with saturating counter moves.
fn model(mut flag: bool, mut count: u32, taps: usize) -> (bool, u32) {
    for _ in 0..taps {
        flag = !flag;
        count = if flag {
            count.saturating_add(1)
        } else {
            count.saturating_sub(1)
        };
    }
    (flag, count)
}

/// Drain and confirm every outstanding exchange, correctives included.
/// Returns the number of commands that would have hit the wire.
fn settle_ok(engine: &mut EngagementEngine) -> usize {
    let mut dispatched = 0;
    loop {
        let cmds: Vec<RemoteCommand> = engine.take_commands();
        if cmds.is_empty() {
            break;
        }
        dispatched += cmds.len();
        for cmd in cmds {
            engine.resolve(cmd.ticket, Ok(()));
        }
    }
    dispatched
}

proptest! {
    /// A burst of taps before any dispatch costs at most one exchange:
    /// exactly one when the parity is odd, zero when the taps cancel out.
    #[test]
    fn tap_burst_is_coalesced_to_parity(
        taps in 1usize..=8,
        likes in 0u32..1_000,
        liked in any::<bool>(),
    ) {
        let mut engine = EngagementEngine::new();
        engine.insert(EngagementSeed::new("p1").likes(likes).liked(liked));
        let id = PostId::new("p1");

        for _ in 0..taps {
            engine.toggle_like(&id).unwrap();
        }
        let dispatched = settle_ok(&mut engine);

        prop_assert_eq!(dispatched, taps % 2);
        let (flag, count) = model(liked, likes, taps);
        let snap = engine.snapshot(&id).unwrap();
        prop_assert_eq!(snap.liked, flag);
        prop_assert_eq!(snap.like_count, count);
        prop_assert!(!engine.has_pending());
    }

    /// Taps interleaved with dispatch boundaries still converge to the last
    /// intent, never exceed one exchange per boundary plus one corrective
    /// stream, and leave nothing pending.
    #[test]
    fn interleaved_taps_converge_to_last_intent(
        schedule in proptest::collection::vec(any::<bool>(), 1..24),
        likes in 0u32..1_000,
        liked in any::<bool>(),
    ) {
        let mut engine = EngagementEngine::new();
        engine.insert(EngagementSeed::new("p1").likes(likes).liked(liked));
        let id = PostId::new("p1");

        let mut taps = 0usize;
        let mut dispatched = 0usize;
        for step in schedule {
            if step {
                engine.toggle_like(&id).unwrap();
                taps += 1;
            } else {
                // Dispatch boundary: whatever is staged goes out and confirms.
                for cmd in engine.take_commands() {
                    dispatched += 1;
                    engine.resolve(cmd.ticket, Ok(()));
                }
            }
        }
        dispatched += settle_ok(&mut engine);

        prop_assert!(dispatched <= taps, "dispatched {dispatched} for {taps} taps");
        let (flag, count) = model(liked, likes, taps);
        let snap = engine.snapshot(&id).unwrap();
        prop_assert_eq!(snap.liked, flag);
        prop_assert_eq!(snap.like_count, count);
        prop_assert!(!engine.has_pending());
    }

    /// Like and repost streams on the same post never interfere.
    #[test]
    fn actions_stay_independent(
        like_taps in 0usize..6,
        repost_taps in 0usize..6,
        likes in 0u32..100,
        reposts in 0u32..100,
    ) {
        let mut engine = EngagementEngine::new();
        engine.insert(EngagementSeed::new("p1").likes(likes).reposts(reposts));
        let id = PostId::new("p1");

        for _ in 0..like_taps {
            engine.toggle_like(&id).unwrap();
        }
        for _ in 0..repost_taps {
            engine.toggle_repost(&id).unwrap();
        }
        settle_ok(&mut engine);

        let (liked, like_count) = model(false, likes, like_taps);
        let (reposted, repost_count) = model(false, reposts, repost_taps);
        let snap = engine.snapshot(&id).unwrap();
        prop_assert_eq!(snap.liked, liked);
        prop_assert_eq!(snap.like_count, like_count);
        prop_assert_eq!(snap.reposted, reposted);
        prop_assert_eq!(snap.repost_count, repost_count);
    }
}
