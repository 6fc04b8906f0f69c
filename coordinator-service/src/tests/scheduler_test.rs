use brewcrew_shared::models::Drink;
use brewcrew_shared::settings::PROMPT_INTERVAL_KEY;
use brewcrew_shared::store::SettingsStore;
use brewcrew_shared::transport::DeliveryMode;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{advance, Instant};
use tokio_util::sync::CancellationToken;

use super::{TestEnv, DAYTIME, NIGHT};
use crate::messages::REMINDER_TEXT;
use crate::notify::Notice;

const COOLDOWN: Duration = Duration::from_secs(1200);

/// Lets spawned tasks run on the paused runtime.
async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

fn nudges(env: &TestEnv) -> usize {
    env.transport
        .containing("nobody has pressed")
        .into_iter()
        .filter(|d| d.mode == DeliveryMode::Ephemeral)
        .count()
}

#[tokio::test(start_paused = true)]
async fn test_prompts_go_to_members_below_threshold() {
    let env = TestEnv::new().await;
    env.add_member(1, "Ann").await;
    env.add_member(2, "Bob").await;
    env.add_member(3, "Cat").await;
    env.set_state(1, 9, Drink::Coffee).await;
    env.set_state(2, 3, Drink::Coffee).await;

    let report = env.scheduler().tick().await.unwrap();

    assert_eq!(report.prompts, Notice::Sent { delivered: 2, failed: 0 });
    assert_eq!(report.nudge, Notice::NotReady { ready: 1, total: 3 });
    assert_eq!(env.transport.ephemeral_recipients(), vec![2, 3]);
    assert_eq!(env.transport.containing(REMINDER_TEXT).len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_quiet_hours_silence_the_tick() {
    let env = TestEnv::new().await;
    env.clock.set_hour(NIGHT);
    env.add_member(1, "Ann").await;
    env.add_member(2, "Bob").await;

    let report = env.scheduler().tick().await.unwrap();

    assert_eq!(report.prompts, Notice::QuietHours);
    assert!(env.transport.delivered().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_nudge_respects_cooldown() {
    let env = TestEnv::new().await;
    env.add_member(1, "Ann").await;
    env.add_member(2, "Bob").await;
    env.set_state(1, 8, Drink::Coffee).await;
    env.set_state(2, 10, Drink::Latte).await;
    let scheduler = env.scheduler();

    let first = scheduler.tick().await.unwrap();
    assert_eq!(first.prompts, Notice::NoRecipients);
    assert_eq!(first.nudge, Notice::Sent { delivered: 2, failed: 0 });
    assert_eq!(env.transport.ephemeral_recipients(), vec![1, 2]);
    assert!(env.transport.recipients().is_empty());

    advance(COOLDOWN - Duration::from_secs(1)).await;
    let second = scheduler.tick().await.unwrap();
    assert_eq!(second.nudge, Notice::CoolingDown);
    assert_eq!(nudges(&env), 2);

    advance(Duration::from_secs(1)).await;
    let third = scheduler.tick().await.unwrap();
    assert!(third.nudge.was_sent());
    assert_eq!(nudges(&env), 4);
}

#[tokio::test(start_paused = true)]
async fn test_nudge_skipped_at_night_is_sent_in_the_morning() {
    let env = TestEnv::new().await;
    env.clock.set_hour(NIGHT);
    env.add_member(1, "Ann").await;
    env.set_state(1, 10, Drink::Coffee).await;
    let scheduler = env.scheduler();

    let night = scheduler.tick().await.unwrap();
    assert_eq!(night.nudge, Notice::QuietHours);

    env.clock.set_hour(DAYTIME);
    let morning = scheduler.tick().await.unwrap();
    assert!(morning.nudge.was_sent());
}

#[tokio::test(start_paused = true)]
async fn test_empty_group_gets_nothing() {
    let env = TestEnv::new().await;
    let report = env.scheduler().tick().await.unwrap();
    assert_eq!(report.prompts, Notice::NoRecipients);
    assert_eq!(report.nudge, Notice::NoRecipients);
}

#[tokio::test(start_paused = true)]
async fn test_unreachable_member_does_not_stop_prompts() {
    let env = TestEnv::new().await;
    env.add_member(1, "Ann").await;
    env.add_member(2, "Bob").await;
    env.add_member(3, "Cat").await;
    env.transport.make_unreachable(1);

    let report = env.scheduler().tick().await.unwrap();

    assert_eq!(report.prompts, Notice::Sent { delivered: 2, failed: 1 });
    assert_eq!(env.transport.ephemeral_recipients(), vec![2, 3]);
}

#[tokio::test(start_paused = true)]
async fn test_loop_survives_store_outage() {
    let env = TestEnv::new().await;
    env.add_member(1, "Ann").await;
    env.store
        .set_setting(PROMPT_INTERVAL_KEY, "60")
        .await
        .unwrap();
    env.store.set_outage(true);

    let scheduler = Arc::new(env.scheduler());
    let cancel = CancellationToken::new();
    let handle = tokio::spawn({
        let scheduler = scheduler.clone();
        let cancel = cancel.clone();
        async move { scheduler.run(cancel).await }
    });

    settle().await;
    assert!(env.transport.delivered().is_empty());

    // The interval could not be read during the outage, so the loop
    // falls back to the default before its next tick.
    env.store.set_outage(false);
    advance(Duration::from_secs(3600)).await;
    settle().await;
    assert_eq!(env.transport.ephemeral_recipients(), vec![1]);
    assert!(!handle.is_finished());

    cancel.cancel();
    handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_interval_change_applies_from_next_cycle() {
    let env = TestEnv::new().await;
    env.add_member(1, "Ann").await;
    env.store
        .set_setting(PROMPT_INTERVAL_KEY, "60")
        .await
        .unwrap();

    let scheduler = Arc::new(env.scheduler());
    let cancel = CancellationToken::new();
    let handle = tokio::spawn({
        let scheduler = scheduler.clone();
        let cancel = cancel.clone();
        async move { scheduler.run(cancel).await }
    });

    settle().await;
    assert_eq!(env.transport.delivered().len(), 1);

    // The current sleep keeps its 60s period.
    env.store
        .set_setting(PROMPT_INTERVAL_KEY, "600")
        .await
        .unwrap();
    advance(Duration::from_secs(60)).await;
    settle().await;
    assert_eq!(env.transport.delivered().len(), 2);

    advance(Duration::from_secs(300)).await;
    settle().await;
    assert_eq!(env.transport.delivered().len(), 2);

    advance(Duration::from_secs(300)).await;
    settle().await;
    assert_eq!(env.transport.delivered().len(), 3);

    cancel.cancel();
    handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_cancel_aborts_the_sleep() {
    let env = TestEnv::new().await;
    let scheduler = Arc::new(env.scheduler());
    let cancel = CancellationToken::new();
    let started = Instant::now();

    let handle = tokio::spawn({
        let scheduler = scheduler.clone();
        let cancel = cancel.clone();
        async move { scheduler.run(cancel).await }
    });
    settle().await;

    cancel.cancel();
    handle.await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(3600));
}
