//! Recurring reminder prompts and motivational nudges.

use brewcrew_shared::clock::Clock;
use brewcrew_shared::models::{MemberId, ReadinessSnapshot};
use brewcrew_shared::settings::CoordinatorSettings;
use brewcrew_shared::store::Store;
use brewcrew_shared::transport::{DeliveryMode, Transport};
use log::{debug, error, info};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::NotificationPolicy;
use crate::error::Result;
use crate::messages;
use crate::notify::{broadcast, Notice};

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TickReport {
    pub prompts: Notice,
    pub nudge: Notice,
}

pub struct NotificationScheduler<S: Store> {
    store: Arc<S>,
    transport: Arc<dyn Transport>,
    clock: Arc<dyn Clock>,
    policy: NotificationPolicy,
    last_nudge: Mutex<Option<Instant>>,
}

impl<S: Store> NotificationScheduler<S> {
    pub fn new(
        store: Arc<S>,
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
        policy: NotificationPolicy,
    ) -> Self {
        Self {
            store,
            transport,
            clock,
            policy,
            last_nudge: Mutex::new(None),
        }
    }

    /// One pass: desire prompts first, then the motivational nudge.
    pub async fn tick(&self) -> Result<TickReport> {
        let settings = CoordinatorSettings::load(self.store.as_ref()).await?;
        let members = self.store.list_members().await?;
        let snapshot = ReadinessSnapshot::new(members, settings.threshold);

        let prompts = self.send_prompts(&snapshot).await;
        let nudge = self.send_nudge(&snapshot).await;
        Ok(TickReport { prompts, nudge })
    }

    async fn send_prompts(&self, snapshot: &ReadinessSnapshot) -> Notice {
        if self.policy.quiet_hours.is_active(self.clock.as_ref()) {
            debug!("Quiet hours, skipping desire prompts");
            return Notice::QuietHours;
        }
        let waiting: Vec<MemberId> = snapshot.not_ready().map(|m| m.id).collect();
        broadcast(
            self.transport.as_ref(),
            "desire prompt",
            &waiting,
            &messages::desire_reminder(),
            DeliveryMode::Ephemeral,
            self.policy.delivery_timeout,
        )
        .await
    }

    async fn send_nudge(&self, snapshot: &ReadinessSnapshot) -> Notice {
        if snapshot.members.is_empty() {
            return Notice::NoRecipients;
        }
        if !snapshot.is_fully_ready() {
            return Notice::NotReady {
                ready: snapshot.ready_count(),
                total: snapshot.members.len(),
            };
        }

        let mut last_nudge = self.last_nudge.lock().await;
        if let Some(at) = *last_nudge {
            if at.elapsed() < self.policy.motivation_cooldown {
                debug!("Motivational nudge cooling down");
                return Notice::CoolingDown;
            }
        }
        if self.policy.quiet_hours.is_active(self.clock.as_ref()) {
            info!("Group is ready but it is quiet hours, no nudge");
            return Notice::QuietHours;
        }

        let notice = broadcast(
            self.transport.as_ref(),
            "motivational nudge",
            &snapshot.member_ids(),
            &messages::motivation_nudge(messages::random_motivation()),
            DeliveryMode::Ephemeral,
            self.policy.delivery_timeout,
        )
        .await;
        *last_nudge = Some(Instant::now());
        notice
    }

    /// Interval for the next sleep, re-read every cycle.
    async fn next_interval(&self) -> Duration {
        match CoordinatorSettings::load(self.store.as_ref()).await {
            Ok(settings) => settings.prompt_interval,
            Err(e) => {
                error!("Failed to read reminder interval, using default: {}", e);
                CoordinatorSettings::default().prompt_interval
            }
        }
    }

    /// Runs ticks until `cancel` fires. A failing tick is logged and the loop
    /// carries on with the next one.
    pub async fn run(&self, cancel: CancellationToken) {
        info!("Notification scheduler started");
        loop {
            match self.tick().await {
                Ok(report) => debug!("Scheduler tick: {:?}", report),
                Err(e) => error!("Scheduler tick failed: {}", e),
            }

            let interval = self.next_interval().await;
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }
        }
        info!("Notification scheduler stopped");
    }
}
