use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use commonware_macros::test_traced;
use commonware_runtime::{deterministic, Clock, Metrics, Runner};

use dicepit_execution::{payout, simulate, DiceRng};
use dicepit_types::{
    game::{
        AssetStats, BoostState, GameSettings, GameStateValue, GameType, PopulationStats,
        RoundSequence, ROLLS_PER_ROUND,
    },
    AssetId, ChannelId, UserId, Wallet,
};

use crate::{
    board,
    manager::{self, Manager},
    mocks::{MemoryLedger, MemorySink, MemoryStore, StaticAssets},
    Error, RenderMode, Scheduler,
};

struct Harness {
    store: MemoryStore,
    source: StaticAssets,
    ledger: MemoryLedger,
    sink: MemorySink,
}

fn harness() -> Harness {
    let harness = Harness {
        store: MemoryStore::new(),
        source: StaticAssets::new(),
        ledger: MemoryLedger::new(),
        sink: MemorySink::new(),
    };
    harness.source.set_population(PopulationStats {
        avg_total_games: 50.0,
        avg_wins: 20.0,
        avg_rank: 10.0,
    });
    harness
}

fn config(harness: &Harness) -> manager::Config<MemoryStore, StaticAssets, MemoryLedger, MemorySink>
{
    manager::Config {
        persistence: harness.store.clone(),
        participants: harness.source.clone(),
        ledger: harness.ledger.clone(),
        renderer: harness.sink.clone(),
        render_mode: RenderMode::Lightweight,
        mailbox_size: 16,
    }
}

fn stats(total_games: u64, wins: u64, rank: u32) -> AssetStats {
    AssetStats {
        total_games,
        wins,
        rank,
    }
}

async fn wait_for(context: &impl Clock, mut condition: impl FnMut() -> bool) {
    for _ in 0..600 {
        if condition() {
            return;
        }
        context.sleep(Duration::from_millis(100)).await;
    }
    panic!("condition never reached");
}

/// Replay the lockstep scan to predict a duel's winner off-line.
fn expected_duel_outcome(channel: ChannelId, nonce: u64, users: [u64; 2]) -> (u64, u32, bool) {
    let sequences: Vec<RoundSequence> = users
        .iter()
        .map(|user| simulate(&mut DiceRng::new(channel, nonce, *user)).unwrap())
        .collect();
    let max_rounds = sequences.iter().map(|s| s.rounds.len()).max().unwrap();
    for round in 0..max_rounds {
        for roll in 0..ROLLS_PER_ROUND {
            for (i, sequence) in sequences.iter().enumerate() {
                if sequence.wins_at(round, roll) {
                    return (users[i], sequence.win_round, sequence.zen);
                }
            }
        }
    }
    unreachable!("every sequence ends in a win");
}

#[test_traced("WARN")]
fn test_duel_lifecycle() {
    let runner = deterministic::Runner::seeded(1);
    runner.start(|context| async move {
        let harness = harness();
        let channel = ChannelId(1);
        harness
            .store
            .put_settings(GameSettings::for_channel(channel, GameType::Duel));
        harness.source.grant(UserId(1), AssetId(10), stats(5, 1, 40));
        harness.source.grant(UserId(2), AssetId(20), stats(80, 50, 2));

        let mut manager = Manager::new(context.with_label("manager"), config(&harness));
        let failures = manager.start_all(vec![channel]).await;
        assert!(failures.is_empty());
        assert_eq!(
            manager.state(channel).await.unwrap(),
            GameStateValue::WaitingRoom
        );
        assert_eq!(
            harness
                .sink
                .alive_with_title(channel, board::WAITING_ROOM_TITLE)
                .len(),
            1
        );
        // The room reference is persisted for restart recovery.
        assert!(harness.store.message_reference(channel).is_some());

        manager
            .join(channel, UserId(1), Wallet("0xaa".into()), AssetId(10))
            .await
            .unwrap();
        // The second join fills the room and the game runs to completion.
        manager
            .join(channel, UserId(2), Wallet("0xbb".into()), AssetId(20))
            .await
            .unwrap();
        wait_for(&context, || !harness.store.encounters().is_empty()).await;
        wait_for(&context, || {
            harness
                .sink
                .alive_with_title(channel, board::WAITING_ROOM_TITLE)
                .len()
                == 1
        })
        .await;
        assert_eq!(
            manager.state(channel).await.unwrap(),
            GameStateValue::WaitingRoom
        );

        let records = harness.store.encounters();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.outcomes.len(), 2);
        assert_eq!(record.outcomes.iter().filter(|o| o.is_winner).count(), 1);

        // The winner and payout are fully determined by the dice seeds.
        let (winner_user, win_round, zen) = expected_duel_outcome(channel, 1, [1, 2]);
        let winner = record.outcomes.iter().find(|o| o.is_winner).unwrap();
        assert_eq!(winner.user, UserId(winner_user));
        assert_eq!(record.win_round, Some(win_round));
        let token = GameSettings::for_channel(channel, GameType::Duel).token;
        let expected = payout::winner_payout(&token, win_round, zen).unwrap();
        assert_eq!(winner.payout, expected);

        let issued = harness.ledger.issued();
        assert_eq!(issued.len(), 1);
        assert_eq!(issued[0].0, UserId(winner_user));
        assert_eq!(issued[0].3, expected);

        // Both humans received a cooldown.
        for outcome in &record.outcomes {
            assert!(outcome.cooldown_ms > 0);
        }
    });
}

#[test_traced("WARN")]
fn test_solo_npc_never_mutated() {
    let runner = deterministic::Runner::seeded(2);
    runner.start(|context| async move {
        let harness = harness();
        let channel = ChannelId(2);
        harness
            .store
            .put_settings(GameSettings::for_channel(channel, GameType::SoloNpc));
        harness.source.grant(UserId(7), AssetId(70), stats(10, 2, 30));

        let mut manager = Manager::new(context.with_label("manager"), config(&harness));
        assert!(manager.start_all(vec![channel]).await.is_empty());
        manager
            .join(channel, UserId(7), Wallet("0x07".into()), AssetId(70))
            .await
            .unwrap();
        wait_for(&context, || !harness.store.encounters().is_empty()).await;

        let records = harness.store.encounters();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.outcomes.len(), 2);

        let npc = record.outcomes.iter().find(|o| o.is_npc).unwrap();
        // NPC seats are never mutated: no payout, no cooldown, win or lose.
        assert_eq!(npc.payout, 0);
        assert_eq!(npc.cooldown_ms, 0);
        assert!(!npc.cooldown_adjusted);

        let human = record.outcomes.iter().find(|o| !o.is_npc).unwrap();
        assert_eq!(human.user, UserId(7));
        assert!(human.cooldown_ms > 0);

        // Tokens only ever flow to the human, and only on a human win.
        for (user, _, _, _) in harness.ledger.issued() {
            assert_eq!(user, UserId(7));
        }
        if npc.is_winner {
            assert!(harness.ledger.issued().is_empty());
        }
    });
}

#[test_traced("WARN")]
fn test_reset_idempotent_in_waiting_room() {
    let runner = deterministic::Runner::seeded(3);
    runner.start(|context| async move {
        let harness = harness();
        let channel = ChannelId(3);
        harness
            .store
            .put_settings(GameSettings::for_channel(channel, GameType::Duel));

        let mut manager = Manager::new(context.with_label("manager"), config(&harness));
        assert!(manager.start_all(vec![channel]).await.is_empty());
        let sends = harness.sink.sends();

        manager.reset(channel).await.unwrap();
        manager.reset(channel).await.unwrap();

        // No duplicate side effects: nothing new was rendered.
        assert_eq!(harness.sink.sends(), sends);
        assert_eq!(
            harness
                .sink
                .alive_with_title(channel, board::WAITING_ROOM_TITLE)
                .len(),
            1
        );
    });
}

#[test_traced("WARN")]
fn test_reset_cancels_active_game() {
    let runner = deterministic::Runner::seeded(4);
    runner.start(|context| async move {
        let harness = harness();
        let channel = ChannelId(4);
        harness
            .store
            .put_settings(GameSettings::for_channel(channel, GameType::SoloNpc));
        harness.source.grant(UserId(9), AssetId(90), stats(1, 0, 50));

        let mut manager = Manager::new(context.with_label("manager"), config(&harness));
        assert!(manager.start_all(vec![channel]).await.is_empty());

        // The solo room fills immediately and the game starts stepping.
        manager
            .join(channel, UserId(9), Wallet("0x09".into()), AssetId(90))
            .await
            .unwrap();

        // Joining mid-game is rejected rather than silently ignored.
        assert!(matches!(
            manager
                .join(channel, UserId(10), Wallet("0x0a".into()), AssetId(91))
                .await,
            Err(Error::RegistryLocked)
        ));

        // Cancel mid-sequence.
        manager.reset(channel).await.unwrap();
        wait_for(&context, || {
            harness
                .sink
                .alive_with_title(channel, board::WAITING_ROOM_TITLE)
                .len()
                == 1
        })
        .await;
        assert_eq!(
            manager.state(channel).await.unwrap(),
            GameStateValue::WaitingRoom
        );

        // Cleanup ran: the board is gone, nothing was settled.
        assert!(harness
            .sink
            .alive_with_title(channel, board::GAME_BOARD_TITLE)
            .is_empty());
        assert!(harness.store.encounters().is_empty());
        assert!(harness.ledger.issued().is_empty());
    });
}

#[test_traced("WARN")]
fn test_join_validation() {
    let runner = deterministic::Runner::seeded(5);
    runner.start(|context| async move {
        let harness = harness();
        let channel = ChannelId(5);
        harness
            .store
            .put_settings(GameSettings::for_channel(channel, GameType::Duel));
        harness.source.grant(UserId(1), AssetId(10), stats(1, 0, 5));
        harness.source.grant(UserId(1), AssetId(11), stats(2, 0, 6));

        let mut manager = Manager::new(context.with_label("manager"), config(&harness));
        assert!(manager.start_all(vec![channel]).await.is_empty());

        // Unowned asset.
        assert!(matches!(
            manager
                .join(channel, UserId(1), Wallet("0x01".into()), AssetId(99))
                .await,
            Err(Error::AssetNotOwned { .. })
        ));

        manager
            .join(channel, UserId(1), Wallet("0x01".into()), AssetId(10))
            .await
            .unwrap();

        // Same identity, same asset: rejected, count unchanged.
        assert!(matches!(
            manager
                .join(channel, UserId(1), Wallet("0x01".into()), AssetId(10))
                .await,
            Err(Error::AlreadyRegistered(_))
        ));

        // Same identity, different asset: replaced in place.
        manager
            .join(channel, UserId(1), Wallet("0x01".into()), AssetId(11))
            .await
            .unwrap();
        let room = harness.sink.alive_with_title(channel, board::WAITING_ROOM_TITLE)[0];
        assert!(harness.sink.content_of(room).unwrap().body.contains("1/2"));

        // Withdraw reports presence.
        assert!(manager.withdraw(channel, UserId(1)).await.unwrap());
        assert!(!manager.withdraw(channel, UserId(1)).await.unwrap());
        let room = harness.sink.alive_with_title(channel, board::WAITING_ROOM_TITLE)[0];
        assert!(harness.sink.content_of(room).unwrap().body.contains("0/2"));
    });
}

#[test_traced("WARN")]
fn test_maintenance_suppresses_rooms() {
    let runner = deterministic::Runner::seeded(6);
    runner.start(|context| async move {
        let harness = harness();
        let channel = ChannelId(6);
        harness
            .store
            .put_settings(GameSettings::for_channel(channel, GameType::Duel));
        harness.store.set_maintenance(true);
        harness.source.grant(UserId(1), AssetId(10), stats(1, 0, 5));

        let mut manager = Manager::new(context.with_label("manager"), config(&harness));
        assert!(manager.start_all(vec![channel]).await.is_empty());
        assert_eq!(
            manager.state(channel).await.unwrap(),
            GameStateValue::Maintenance
        );
        assert!(harness
            .sink
            .alive_with_title(channel, board::WAITING_ROOM_TITLE)
            .is_empty());

        // Capacity-triggered starts are suppressed: joins are refused.
        assert!(matches!(
            manager
                .join(channel, UserId(1), Wallet("0x01".into()), AssetId(10))
                .await,
            Err(Error::UnderMaintenance)
        ));

        // Clearing the flag lets the sweep reopen the room.
        harness.store.set_maintenance(false);
        assert!(manager.sweep_maintenance().await.is_empty());
        assert_eq!(
            manager.state(channel).await.unwrap(),
            GameStateValue::WaitingRoom
        );
        assert_eq!(
            harness
                .sink
                .alive_with_title(channel, board::WAITING_ROOM_TITLE)
                .len(),
            1
        );
    });
}

#[test_traced("WARN")]
fn test_boost_scales_payout() {
    let runner = deterministic::Runner::seeded(7);
    runner.start(|context| async move {
        let harness = harness();
        let channel = ChannelId(7);
        harness
            .store
            .put_settings(GameSettings::for_channel(channel, GameType::Duel));
        harness.source.grant(UserId(1), AssetId(10), stats(5, 1, 40));
        harness.source.grant(UserId(2), AssetId(20), stats(8, 2, 20));

        let mut manager = Manager::new(context.with_label("manager"), config(&harness));
        assert!(manager.start_all(vec![channel]).await.is_empty());

        // Window spans all of virtual time after the first millisecond.
        manager
            .set_boost(BoostState {
                starts_at_ms: 0,
                expires_at_ms: u64::MAX,
                multiplier: 2,
            })
            .await
            .unwrap();
        // Malformed windows are rejected before writing.
        assert!(manager
            .set_boost(BoostState {
                starts_at_ms: 5,
                expires_at_ms: 5,
                multiplier: 2,
            })
            .await
            .is_err());
        assert!(manager
            .set_boost(BoostState {
                starts_at_ms: 0,
                expires_at_ms: u64::MAX,
                multiplier: 0,
            })
            .await
            .is_err());

        manager
            .join(channel, UserId(1), Wallet("0xaa".into()), AssetId(10))
            .await
            .unwrap();
        manager
            .join(channel, UserId(2), Wallet("0xbb".into()), AssetId(20))
            .await
            .unwrap();
        wait_for(&context, || !harness.ledger.issued().is_empty()).await;

        let (_, win_round, zen) = expected_duel_outcome(channel, 1, [1, 2]);
        let token = GameSettings::for_channel(channel, GameType::Duel).token;
        let unboosted = payout::winner_payout(&token, win_round, zen).unwrap();
        assert_eq!(harness.ledger.issued()[0].3, unboosted * 2);
    });
}

#[test_traced("WARN")]
fn test_boost_read_failure_degrades() {
    let runner = deterministic::Runner::seeded(8);
    runner.start(|context| async move {
        let harness = harness();
        let channel = ChannelId(8);
        harness
            .store
            .put_settings(GameSettings::for_channel(channel, GameType::Duel));
        harness.source.grant(UserId(1), AssetId(10), stats(5, 1, 40));
        harness.source.grant(UserId(2), AssetId(20), stats(8, 2, 20));
        harness.store.set_boost(BoostState {
            starts_at_ms: 0,
            expires_at_ms: u64::MAX,
            multiplier: 5,
        });
        harness.store.fail_boost_reads(true);

        let mut manager = Manager::new(context.with_label("manager"), config(&harness));
        assert!(manager.start_all(vec![channel]).await.is_empty());
        manager
            .join(channel, UserId(1), Wallet("0xaa".into()), AssetId(10))
            .await
            .unwrap();
        manager
            .join(channel, UserId(2), Wallet("0xbb".into()), AssetId(20))
            .await
            .unwrap();
        wait_for(&context, || !harness.ledger.issued().is_empty()).await;

        // The read failure degrades to no modifier; the game still settles.
        let (_, win_round, zen) = expected_duel_outcome(channel, 1, [1, 2]);
        let token = GameSettings::for_channel(channel, GameType::Duel).token;
        let unboosted = payout::winner_payout(&token, win_round, zen).unwrap();
        assert_eq!(harness.ledger.issued()[0].3, unboosted);
        assert_eq!(harness.store.encounters().len(), 1);
    });
}

#[test_traced("WARN")]
fn test_start_all_aggregates_failures() {
    let runner = deterministic::Runner::seeded(9);
    runner.start(|context| async move {
        let harness = harness();
        // Settings exist for channels 1 and 3 only.
        harness
            .store
            .put_settings(GameSettings::for_channel(ChannelId(1), GameType::Duel));
        harness
            .store
            .put_settings(GameSettings::for_channel(ChannelId(3), GameType::SoloNpc));

        let mut manager = Manager::new(context.with_label("manager"), config(&harness));
        let failures = manager
            .start_all(vec![ChannelId(1), ChannelId(2), ChannelId(3)])
            .await;

        // One channel failed; the others opened anyway.
        assert_eq!(failures.len(), 1);
        assert!(matches!(
            failures[0],
            (ChannelId(2), Error::SettingsUnavailable(ChannelId(2)))
        ));
        assert_eq!(
            manager.state(ChannelId(1)).await.unwrap(),
            GameStateValue::WaitingRoom
        );
        assert_eq!(
            manager.state(ChannelId(3)).await.unwrap(),
            GameStateValue::WaitingRoom
        );

        // A channel registers exactly one instance.
        let failures = manager.start_all(vec![ChannelId(1)]).await;
        assert!(matches!(failures[0].1, Error::InstanceExists(_)));
    });
}

#[test_traced("WARN")]
fn test_stale_room_swept_on_open() {
    let runner = deterministic::Runner::seeded(10);
    runner.start(|context| async move {
        let harness = harness();
        let channel = ChannelId(10);
        harness
            .store
            .put_settings(GameSettings::for_channel(channel, GameType::Duel));

        // A waiting room from a previous process, found by title marker.
        let stale = harness.sink.seed_message(
            channel,
            crate::BoardContent {
                title: board::WAITING_ROOM_TITLE.to_string(),
                body: "left over".to_string(),
            },
        );
        let unrelated = harness.sink.seed_message(
            channel,
            crate::BoardContent {
                title: "chatter".to_string(),
                body: "hello".to_string(),
            },
        );

        let mut manager = Manager::new(context.with_label("manager"), config(&harness));
        assert!(manager.start_all(vec![channel]).await.is_empty());

        assert!(!harness.sink.is_alive(stale));
        assert!(harness.sink.is_alive(unrelated));
        assert_eq!(
            harness
                .sink
                .alive_with_title(channel, board::WAITING_ROOM_TITLE)
                .len(),
            1
        );
    });
}

#[test_traced("WARN")]
fn test_render_failures_do_not_stop_the_game() {
    let runner = deterministic::Runner::seeded(11);
    runner.start(|context| async move {
        let harness = harness();
        let channel = ChannelId(11);
        harness
            .store
            .put_settings(GameSettings::for_channel(channel, GameType::Duel));
        harness.source.grant(UserId(1), AssetId(10), stats(5, 1, 40));
        harness.source.grant(UserId(2), AssetId(20), stats(8, 2, 20));

        let mut manager = Manager::new(context.with_label("manager"), config(&harness));
        assert!(manager.start_all(vec![channel]).await.is_empty());

        // The channel becomes unreachable before the game starts.
        harness.sink.fail_sends(true);
        manager
            .join(channel, UserId(1), Wallet("0xaa".into()), AssetId(10))
            .await
            .unwrap();
        manager
            .join(channel, UserId(2), Wallet("0xbb".into()), AssetId(20))
            .await
            .unwrap();

        // The game still runs to completion and pays out.
        wait_for(&context, || !harness.store.encounters().is_empty()).await;
        assert_eq!(harness.ledger.issued().len(), 1);
    });
}

#[test_traced("WARN")]
fn test_failed_issuance_skips_stat_record() {
    let runner = deterministic::Runner::seeded(12);
    runner.start(|context| async move {
        let harness = harness();
        let channel = ChannelId(12);
        harness
            .store
            .put_settings(GameSettings::for_channel(channel, GameType::Duel));
        harness.source.grant(UserId(1), AssetId(10), stats(5, 1, 40));
        harness.source.grant(UserId(2), AssetId(20), stats(8, 2, 20));
        harness.ledger.fail(true);

        let mut manager = Manager::new(context.with_label("manager"), config(&harness));
        assert!(manager.start_all(vec![channel]).await.is_empty());
        manager
            .join(channel, UserId(1), Wallet("0xaa".into()), AssetId(10))
            .await
            .unwrap();
        manager
            .join(channel, UserId(2), Wallet("0xbb".into()), AssetId(20))
            .await
            .unwrap();
        wait_for(&context, || !harness.store.encounters().is_empty()).await;

        // The winner's issuance failed, so their stat record is skipped too;
        // the loser's outcome still lands.
        let records = harness.store.encounters();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].outcomes.len(), 1);
        assert!(!records[0].outcomes[0].is_winner);
        assert!(harness.ledger.issued().is_empty());
    });
}

#[test_traced("WARN")]
fn test_scheduler_runs_registered_jobs() {
    let runner = deterministic::Runner::seeded(13);
    runner.start(|context| async move {
        let ticks = Arc::new(AtomicU64::new(0));
        let mut scheduler = Scheduler::new(context.with_label("scheduler"));
        let counter = ticks.clone();
        scheduler.register("tick", Duration::from_millis(200), move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });
        assert_eq!(scheduler.jobs(), 1);

        context.sleep(Duration::from_millis(1_100)).await;
        assert!(ticks.load(Ordering::SeqCst) >= 5);

        // Aborted jobs stop ticking.
        scheduler.abort();
        let frozen = ticks.load(Ordering::SeqCst);
        context.sleep(Duration::from_millis(1_000)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), frozen);
    });
}
