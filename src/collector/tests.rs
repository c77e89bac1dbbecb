#![allow(non_snake_case)]

use super::*;
use crate::{
    achievements::catalog::bits,
    ledger::{
        ChannelEventSource,
        InMemoryLedger,
    },
};
use fuels::types::{
    Address,
    Identity,
};

fn alice() -> Identity {
    Identity::Address(Address::from([1u8; 32]))
}

fn bob() -> Identity {
    Identity::Address(Address::from([2u8; 32]))
}

fn collector() -> SoulCollector<InMemoryLedger, ChannelEventSource> {
    let (ledger, events) = InMemoryLedger::new_with_events();
    SoulCollector::new(ledger, events, &GameConfig::default())
}

fn deferred_collector() -> SoulCollector<InMemoryLedger, ChannelEventSource> {
    let (ledger, events) = InMemoryLedger::new_with_events();
    SoulCollector::new(ledger.deferred_confirmations(), events, &GameConfig::default())
}

#[tokio::test]
async fn collect_soul__without_session_reports_no_active_session() {
    let mut collector = collector();

    let result = collector.collect_soul().await;

    assert_eq!(result, Err(BatchError::NoActiveSession));
    assert_eq!(collector.ledger().submissions().unwrap(), 0);
}

#[tokio::test]
async fn collect_soul__tenth_soul_submits_one_batch() {
    // given
    let mut collector = collector();
    collector.start_session(SessionKey::new(alice(), 1)).await.unwrap();
    for expected in 1..10 {
        let outcome = collector.collect_soul().await.unwrap();
        assert_eq!(outcome, CollectOutcome::Queued { queued: expected });
    }

    // when
    let outcome = collector.collect_soul().await.unwrap();
    let handled = collector.sync_events().await.unwrap();

    // then
    assert_eq!(
        outcome,
        CollectOutcome::Submitted {
            count: 10,
            points_awarded: 100
        }
    );
    assert_eq!(handled, 2);
    assert_eq!(collector.ledger().submissions().unwrap(), 1);
    assert_eq!(collector.state().queued_count, 0);
    assert_eq!(collector.state().confirmed_count, 10);
    assert_eq!(collector.state().confirmed_points, 100);
    assert!(collector.last_collection().is_some());
}

#[tokio::test]
async fn submit_batch__failure_then_retry_reconciles() {
    // given
    let mut collector = collector();
    let key = SessionKey::new(alice(), 1);
    collector.start_session(key).await.unwrap();
    for _ in 0..3 {
        collector.collect_soul().await.unwrap();
    }
    collector.ledger().fail_next_submissions(1).unwrap();

    // when
    let failed = collector.submit_batch().await;

    // then
    assert!(matches!(
        failed,
        Err(BatchError::SubmissionFailed { count: 3, .. })
    ));
    assert_eq!(collector.state().queued_count, 3);
    assert!(!collector.state().pending_submission);
    assert_eq!(collector.phase(), BatchPhase::Accumulating);

    // when
    let confirmed_before = collector.state().confirmed_count;
    let awarded = collector.submit_batch().await.unwrap();
    collector.sync_events().await.unwrap();

    // then
    assert_eq!(awarded, 30);
    assert_eq!(collector.state().queued_count, 0);
    assert!(!collector.state().pending_submission);
    assert_eq!(collector.state().confirmed_count, confirmed_before + 3);
    assert_eq!(collector.optimistic_count(), 3);
}

#[tokio::test]
async fn handle_event__stale_confirmation_is_discarded() {
    // given
    let mut collector = deferred_collector();
    collector.start_session(SessionKey::new(alice(), 2)).await.unwrap();
    collector.collect_soul().await.unwrap();
    collector.collect_soul().await.unwrap();
    collector.submit_batch().await.unwrap();
    collector.sync_events().await.unwrap();
    let before = collector.state().clone();

    // when
    collector
        .handle_event(LedgerEvent::batch_confirmed(alice(), 1, 500))
        .await
        .unwrap();
    collector
        .handle_event(LedgerEvent::batch_confirmed(bob(), 2, 500))
        .await
        .unwrap();

    // then
    assert_eq!(collector.state(), &before);
    assert!(collector.state().pending_submission);
}

#[tokio::test]
async fn souls_collected_in_flight_are_held_and_flushed_at_session_end() {
    // given
    let mut collector = deferred_collector();
    collector.start_session(SessionKey::new(alice(), 3)).await.unwrap();
    collector.collect_soul().await.unwrap();
    collector.collect_soul().await.unwrap();
    collector.submit_batch().await.unwrap();

    // when
    let outcome = collector.collect_soul().await.unwrap();

    // then
    assert_eq!(outcome, CollectOutcome::Held { held: 1 });
    assert_eq!(collector.optimistic_count(), 3);

    // when
    let summary = collector.end_session().await.unwrap();

    // then
    assert_eq!(summary.confirmed_count, 3);
    assert_eq!(summary.confirmed_points, 30);
    assert_eq!(summary.unconfirmed, 0);
    assert_eq!(collector.ledger().submissions().unwrap(), 2);
    assert!(collector.session().is_none());
}

#[tokio::test]
async fn end_session__force_flushes_partial_batch() {
    // given
    let mut collector = collector();
    let key = SessionKey::new(alice(), 4);
    collector.start_session(key.clone()).await.unwrap();
    for _ in 0..4 {
        collector.collect_soul().await.unwrap();
    }

    // when
    let summary = collector.end_session().await.unwrap();

    // then
    assert_eq!(summary.session, key);
    assert_eq!(summary.confirmed_count, 4);
    assert_eq!(summary.confirmed_points, 40);
    assert_eq!(summary.unconfirmed, 0);
    assert_eq!(collector.phase(), BatchPhase::Idle);
}

#[tokio::test]
async fn end_session__failure_keeps_session_for_retry() {
    // given
    let mut collector = collector();
    collector.start_session(SessionKey::new(alice(), 5)).await.unwrap();
    collector.collect_soul().await.unwrap();
    collector.ledger().fail_next_submissions(1).unwrap();

    // when
    let result = collector.end_session().await;

    // then
    assert!(matches!(result, Err(BatchError::SubmissionFailed { .. })));
    assert!(collector.session().is_some());
    assert_eq!(collector.state().queued_count, 1);

    let summary = collector.end_session().await.unwrap();
    assert_eq!(summary.confirmed_count, 1);
}

#[tokio::test]
async fn end_session__with_empty_queue_is_clean() {
    let mut collector = collector();
    collector.start_session(SessionKey::new(alice(), 6)).await.unwrap();

    let summary = collector.end_session().await.unwrap();

    assert_eq!(summary.confirmed_count, 0);
    assert_eq!(collector.ledger().submissions().unwrap(), 0);
}

#[tokio::test]
async fn start_session__seeds_confirmed_count_and_drops_old_queue() {
    // given
    let (ledger, events) = InMemoryLedger::new_with_events();
    ledger.batch_submit(&SessionKey::new(alice(), 7), 12).await.unwrap();
    let mut collector = SoulCollector::new(ledger, events, &GameConfig::default());
    collector.start_session(SessionKey::new(alice(), 6)).await.unwrap();
    collector.collect_soul().await.unwrap();

    // when
    collector.start_session(SessionKey::new(alice(), 7)).await.unwrap();
    collector.sync_events().await.unwrap();

    // then
    assert_eq!(collector.state().queued_count, 0);
    assert_eq!(collector.state().confirmed_count, 12);
}

#[tokio::test]
async fn achievements__decodes_ledger_flags_and_dates_unlocks() {
    // given
    let mut collector = collector();
    collector.start_session(SessionKey::new(alice(), 8)).await.unwrap();
    let baseline = collector.achievements().await.unwrap();
    assert!(baseline.iter().all(|record| !record.unlocked));

    // when
    collector
        .ledger()
        .unlock_achievement(&alice(), bits::FIRST_BLOOD)
        .unwrap();
    collector.sync_events().await.unwrap();
    let records = collector.achievements().await.unwrap();

    // then
    let unlocked: Vec<_> = records.iter().filter(|record| record.unlocked).collect();
    assert_eq!(unlocked.len(), 1);
    assert_eq!(unlocked[0].id, 0);
    assert!(collector.timeline().unlocked_at(0).is_some());
    let (percentage, per_category) = collector.achievement_progress().await.unwrap();
    assert!(percentage > 0.0 && percentage < 100.0);
    assert_eq!(per_category.len(), 7);
}

#[tokio::test]
async fn achievement_flags__served_from_cache_until_invalidated() {
    // given
    let mut collector = collector();
    collector.start_session(SessionKey::new(alice(), 9)).await.unwrap();
    let first = collector.achievement_flags().await.unwrap();

    // when the ledger changes without an event, the cached value is served
    let mut words = [0u64; 4];
    words[1] = 1 << (bits::LUCKY_SEVEN - 64);
    collector
        .ledger()
        .set_achievement_flags(&alice(), U256(words))
        .unwrap();
    let cached = collector.achievement_flags().await.unwrap();

    // then
    assert_eq!(first, U256::zero());
    assert_eq!(cached, U256::zero());

    // when an unlock event arrives, the cache is invalidated
    collector
        .ledger()
        .unlock_achievement(&alice(), bits::NIGHT_OWL)
        .unwrap();
    collector.sync_events().await.unwrap();
    let fresh = collector.achievement_flags().await.unwrap();

    assert!(fresh.bit(usize::from(bits::LUCKY_SEVEN)));
    assert!(fresh.bit(usize::from(bits::NIGHT_OWL)));
}

#[tokio::test]
async fn handle_event__ignores_other_players() {
    let mut collector = collector();
    collector.start_session(SessionKey::new(alice(), 10)).await.unwrap();
    collector.collect_soul().await.unwrap();

    collector
        .handle_event(LedgerEvent::soul_collected(bob(), 10, 5, Utc::now()))
        .await
        .unwrap();

    assert!(collector.last_collection().is_none());
    assert_eq!(collector.state().queued_count, 1);
}

#[tokio::test]
async fn start_session__resumed_session_reports_ledger_points() {
    // given
    let (ledger, events) = InMemoryLedger::new_with_events();
    let key = SessionKey::new(alice(), 11);
    ledger.batch_submit(&key, 5).await.unwrap();
    let mut collector = SoulCollector::new(ledger, events, &GameConfig::default());

    // when
    collector.start_session(key.clone()).await.unwrap();

    // then
    assert_eq!(collector.optimistic_count(), 5);
    assert_eq!(collector.optimistic_points(), 50);
    let summary = collector.end_session().await.unwrap();
    assert_eq!(summary.confirmed_count, 5);
    assert_eq!(summary.confirmed_points, 50);
    assert_eq!(collector.ledger().submissions().unwrap(), 1);
}

#[tokio::test]
async fn handle_event__held_souls_filling_a_batch_are_submitted_on_confirmation() {
    // given
    let mut collector = deferred_collector();
    let key = SessionKey::new(alice(), 12);
    collector.start_session(key.clone()).await.unwrap();
    for _ in 0..10 {
        collector.collect_soul().await.unwrap();
    }
    for _ in 0..15 {
        collector.collect_soul().await.unwrap();
    }
    assert_eq!(collector.state().held_count, 15);

    // when
    collector.ledger().force_flush(&key).await.unwrap();
    collector.sync_events().await.unwrap();

    // then
    assert_eq!(collector.ledger().submissions().unwrap(), 2);
    assert_eq!(collector.phase(), BatchPhase::Submitting);
    assert_eq!(collector.state().queued_count, 15);
    assert_eq!(collector.state().confirmed_count, 10);
    let souls = collector.ledger().session_souls(&key).await.unwrap();
    assert_eq!(souls.pending_batch, 15);

    let summary = collector.end_session().await.unwrap();
    assert_eq!(summary.confirmed_count, 25);
    assert_eq!(summary.confirmed_points, 250);
    assert_eq!(summary.unconfirmed, 0);
}
