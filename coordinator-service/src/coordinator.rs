//! Readiness coordination: member actions, group readiness evaluation and
//! the notifications they trigger.

use brewcrew_shared::clock::Clock;
use brewcrew_shared::models::events::consumption_payload;
use brewcrew_shared::models::{
    DesireLevel, Drink, EventKind, InviteToken, Member, MemberId, NewEvent, ReadinessSnapshot,
};
use brewcrew_shared::settings::{
    clamp_threshold, CoordinatorSettings, PROMPT_INTERVAL_KEY, THRESHOLD_KEY,
};
use brewcrew_shared::stats::StatsAggregator;
use brewcrew_shared::store::{Store, StoreError};
use brewcrew_shared::transport::{DeliveryMode, Outbound, Transport};
use log::{debug, info};
use serde::Serialize;
use std::sync::Arc;

use crate::config::NotificationPolicy;
use crate::error::{AppError, Result};
use crate::invites::{generate_invite_code, normalize_invite_code};
use crate::messages;
use crate::models::Actor;
use crate::notify::{broadcast, Notice};

const INVITE_CODE_ATTEMPTS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "member", rename_all = "snake_case")]
pub enum JoinOutcome {
    Joined(Member),
    Returning(Member),
}

impl JoinOutcome {
    pub fn member(&self) -> &Member {
        match self {
            JoinOutcome::Joined(m) | JoinOutcome::Returning(m) => m,
        }
    }
}

/// Result of a level or drink update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOutcome {
    pub member: Member,
    pub peers: Notice,
    pub readiness: Notice,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmOutcome {
    pub drink: Drink,
    pub broadcast: Notice,
}

pub struct Coordinator<S: Store> {
    store: Arc<S>,
    transport: Arc<dyn Transport>,
    clock: Arc<dyn Clock>,
    policy: NotificationPolicy,
    stats: StatsAggregator<S>,
}

impl<S: Store> Coordinator<S> {
    pub fn new(
        store: Arc<S>,
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
        policy: NotificationPolicy,
    ) -> Self {
        let stats = StatsAggregator::new(store.clone(), clock.clone());
        Self {
            store,
            transport,
            clock,
            policy,
            stats,
        }
    }

    pub fn stats(&self) -> &StatsAggregator<S> {
        &self.stats
    }

    pub fn policy(&self) -> &NotificationPolicy {
        &self.policy
    }

    fn in_quiet_hours(&self) -> bool {
        self.policy.quiet_hours.is_active(self.clock.as_ref())
    }

    async fn log_event(
        &self,
        kind: EventKind,
        actor: &Actor,
        payload: impl Into<String>,
    ) -> Result<()> {
        self.store
            .append_event(NewEvent::by(
                kind,
                actor.id,
                &actor.name,
                payload,
                self.clock.now_utc(),
            ))
            .await?;
        Ok(())
    }

    pub async fn require_member(&self, actor: &Actor) -> Result<Member> {
        self.store.get_member(actor.id).await?.ok_or_else(|| {
            AppError::forbidden(
                "This group is invite-only. Ask a member to generate an invite code.".into(),
            )
        })
    }

    async fn load_settings(&self) -> Result<CoordinatorSettings> {
        Ok(CoordinatorSettings::load(self.store.as_ref()).await?)
    }

    async fn send(
        &self,
        kind: &str,
        recipients: &[MemberId],
        message: &Outbound,
        mode: DeliveryMode,
    ) -> Notice {
        broadcast(
            self.transport.as_ref(),
            kind,
            recipients,
            message,
            mode,
            self.policy.delivery_timeout,
        )
        .await
    }

    /// Current readiness snapshot.
    pub async fn snapshot(&self) -> Result<ReadinessSnapshot> {
        let settings = self.load_settings().await?;
        let members = self.store.list_members().await?;
        Ok(ReadinessSnapshot::new(members, settings.threshold))
    }

    /// Registers the actor, consuming an invite if they are not a member yet.
    pub async fn join(&self, actor: &Actor, invite_code: Option<&str>) -> Result<JoinOutcome> {
        let now = self.clock.now_utc();

        if self.store.member_exists(actor.id).await? {
            let member = self.store.upsert_member(actor.id, &actor.name, now).await?;
            self.log_event(EventKind::Join, actor, "existing_member").await?;
            return Ok(JoinOutcome::Returning(member));
        }

        let code = invite_code.and_then(normalize_invite_code).ok_or_else(|| {
            AppError::forbidden(
                "This group is invite-only. Ask a member to generate an invite code.".into(),
            )
        })?;

        let member = match self
            .store
            .redeem_invite(code, actor.id, &actor.name, now)
            .await?
        {
            Some(member) => member,
            None => {
                info!("Rejected invite {} for {}", code, actor.id);
                return Err(AppError::redemption_failed(
                    "The invite code is invalid or has already been used.".into(),
                ));
            }
        };
        self.log_event(EventKind::InviteConsumed, actor, code).await?;
        info!("{} ({}) joined with invite {}", actor.name, actor.id, code);
        Ok(JoinOutcome::Joined(member))
    }

    /// Sets the actor's desire to an absolute level.
    pub async fn set_level(&self, actor: &Actor, level: i64) -> Result<UpdateOutcome> {
        let member = self.require_member(actor).await?;
        let level = DesireLevel::new(level)?;
        self.apply_level(actor, member, level, format!("level:{}", level))
            .await
    }

    /// Moves the actor's desire by `delta`, clamped to the scale.
    pub async fn adjust_level(&self, actor: &Actor, delta: i64) -> Result<UpdateOutcome> {
        let member = self.require_member(actor).await?;
        let level = member.desire.adjusted(delta);
        self.apply_level(actor, member, level, format!("adjust:{}", level))
            .await
    }

    async fn apply_level(
        &self,
        actor: &Actor,
        mut member: Member,
        level: DesireLevel,
        payload: String,
    ) -> Result<UpdateOutcome> {
        self.store
            .upsert_member(actor.id, &actor.name, self.clock.now_utc())
            .await?;
        self.store.set_desire(actor.id, level).await?;
        self.log_event(EventKind::DesireSet, actor, payload).await?;
        debug!("{} set desire to {}", actor.id, level);

        member.display_name = actor.name.clone();
        member.desire = level;
        self.after_update(member).await
    }

    /// Changes the actor's preferred drink.
    pub async fn set_drink(&self, actor: &Actor, code: &str) -> Result<UpdateOutcome> {
        let mut member = self.require_member(actor).await?;
        let drink: Drink = code.parse()?;

        self.store
            .upsert_member(actor.id, &actor.name, self.clock.now_utc())
            .await?;
        self.store.set_drink(actor.id, drink).await?;
        self.log_event(EventKind::DrinkSet, actor, drink.code()).await?;
        debug!("{} picked {}", actor.id, drink);

        member.display_name = actor.name.clone();
        member.drink = drink;
        self.after_update(member).await
    }

    /// Peer notification for the updated member, then a readiness check.
    async fn after_update(&self, member: Member) -> Result<UpdateOutcome> {
        let snapshot = self.snapshot().await?;
        let peers = self.notify_peers(&member, &snapshot).await;
        let readiness = self.evaluate_snapshot(&snapshot).await;
        Ok(UpdateOutcome {
            member,
            peers,
            readiness,
        })
    }

    /// Tells every other member that `member` wants a drink. Fires on every
    /// qualifying update; there is no cooldown.
    async fn notify_peers(&self, member: &Member, snapshot: &ReadinessSnapshot) -> Notice {
        if !snapshot.is_ready(member) {
            return Notice::BelowThreshold;
        }
        if self.in_quiet_hours() {
            debug!("Quiet hours, not telling peers about {}", member.id);
            return Notice::QuietHours;
        }
        let others: Vec<MemberId> = snapshot
            .members
            .iter()
            .map(|m| m.id)
            .filter(|&id| id != member.id)
            .collect();
        self.send(
            "peer interest",
            &others,
            &messages::peer_interest(member),
            DeliveryMode::Ephemeral,
        )
        .await
    }

    /// Re-evaluates group readiness from the store.
    pub async fn evaluate(&self) -> Result<Notice> {
        let snapshot = self.snapshot().await?;
        Ok(self.evaluate_snapshot(&snapshot).await)
    }

    async fn evaluate_snapshot(&self, snapshot: &ReadinessSnapshot) -> Notice {
        if snapshot.members.is_empty() {
            return Notice::NoRecipients;
        }
        if !snapshot.is_fully_ready() {
            return Notice::NotReady {
                ready: snapshot.ready_count(),
                total: snapshot.members.len(),
            };
        }
        if self.in_quiet_hours() {
            info!("Group is ready but it is quiet hours");
            return Notice::QuietHours;
        }

        let message = messages::all_ready(&snapshot.members, messages::random_motivation());
        self.send(
            "all ready",
            &snapshot.member_ids(),
            &message,
            DeliveryMode::Ephemeral,
        )
        .await
    }

    /// Confirms the drink was had: resets everyone and tells the group.
    pub async fn confirm(&self, actor: &Actor) -> Result<ConfirmOutcome> {
        let member = self.require_member(actor).await?;

        self.store.reset_all_desires().await?;
        let drink = member.drink;
        self.log_event(EventKind::Consumption, actor, consumption_payload(drink))
            .await?;
        info!("{} confirmed consumption ({})", actor.name, drink);

        let recipients: Vec<MemberId> = self
            .store
            .list_members()
            .await?
            .iter()
            .map(|m| m.id)
            .collect();
        let broadcast = self
            .send(
                "consumption confirmation",
                &recipients,
                &messages::consumption_confirmed(&actor.name, drink),
                DeliveryMode::Persistent,
            )
            .await;

        Ok(ConfirmOutcome { drink, broadcast })
    }

    pub async fn status(&self, actor: &Actor) -> Result<ReadinessSnapshot> {
        self.require_member(actor).await?;
        self.snapshot().await
    }

    pub async fn settings(&self, actor: &Actor) -> Result<CoordinatorSettings> {
        self.require_member(actor).await?;
        self.load_settings().await
    }

    /// Moves the threshold by `delta`, clamped to `1..=10`. No notifications.
    pub async fn adjust_threshold(&self, actor: &Actor, delta: i64) -> Result<CoordinatorSettings> {
        self.require_member(actor).await?;
        let mut settings = self.load_settings().await?;
        settings.threshold = clamp_threshold(settings.threshold, delta);
        self.store
            .set_setting(THRESHOLD_KEY, &settings.threshold.to_string())
            .await?;
        info!("{} set threshold to {}", actor.id, settings.threshold);
        Ok(settings)
    }

    /// Sets the reminder interval; takes effect on the scheduler's next cycle.
    pub async fn set_interval(&self, actor: &Actor, seconds: i64) -> Result<CoordinatorSettings> {
        self.require_member(actor).await?;
        if seconds <= 0 {
            return Err(AppError::bad_request(format!(
                "Reminder interval must be a positive number of seconds, got {}",
                seconds
            )));
        }
        self.store
            .set_setting(PROMPT_INTERVAL_KEY, &seconds.to_string())
            .await?;
        info!("{} set reminder interval to {}s", actor.id, seconds);
        self.load_settings().await
    }

    /// Issues a fresh single-use invite on behalf of a member.
    pub async fn create_invite(&self, actor: &Actor) -> Result<InviteToken> {
        self.require_member(actor).await?;

        for _ in 0..INVITE_CODE_ATTEMPTS {
            let code = generate_invite_code();
            if self.store.get_invite(&code).await?.is_some() {
                continue;
            }
            let invite = self
                .store
                .create_invite(&code, Some(actor.id), self.clock.now_utc())
                .await?;
            self.log_event(EventKind::InviteCreated, actor, code.as_str())
                .await?;
            info!("{} created invite {}", actor.id, code);
            return Ok(invite);
        }

        Err(StoreError::Conflict("could not allocate a unique invite code".into()).into())
    }

    /// Makes sure the configured bootstrap invite is redeemable.
    pub async fn ensure_bootstrap_invite(&self, code: &str) -> Result<InviteToken> {
        let code = normalize_invite_code(code)
            .ok_or_else(|| AppError::bad_request("Bootstrap invite code is empty".into()))?;
        let invite = self
            .store
            .create_invite(code, None, self.clock.now_utc())
            .await?;
        info!("Bootstrap invite ensured: {}", code);
        Ok(invite)
    }
}
