use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

use super::{EventStore, InviteStore, MemberStore, SettingsStore, StoreError, StoreResult};
use crate::models::{
    DesireLevel, DomainEvent, Drink, EventKind, InviteToken, Member, MemberId, NewEvent,
};

#[derive(Default)]
struct Tables {
    members: BTreeMap<MemberId, Member>,
    invites: HashMap<String, InviteToken>,
    events: Vec<DomainEvent>,
    settings: HashMap<String, String>,
}

/// In-process store. Each operation takes the table lock once, so invite
/// redemption and member creation happen as one update.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    outage: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, every operation fails with `StoreError::Unavailable`.
    pub fn set_outage(&self, down: bool) {
        self.outage.store(down, Ordering::SeqCst);
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.outage.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store is offline".into()));
        }
        Ok(())
    }

    /// Number of events of the given kind, for assertions.
    pub async fn count_events(&self, kind: EventKind) -> usize {
        let tables = self.tables.read().await;
        tables.events.iter().filter(|e| e.kind == kind).count()
    }
}

#[async_trait]
impl MemberStore for MemoryStore {
    async fn member_exists(&self, id: MemberId) -> StoreResult<bool> {
        self.check_available()?;
        Ok(self.tables.read().await.members.contains_key(&id))
    }

    async fn upsert_member(
        &self,
        id: MemberId,
        display_name: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Member> {
        self.check_available()?;
        let mut tables = self.tables.write().await;
        let member = tables
            .members
            .entry(id)
            .and_modify(|m| m.display_name = display_name.to_string())
            .or_insert_with(|| {
                debug!("Adding member {} ({})", id, display_name);
                Member::new(id, display_name, now)
            });
        Ok(member.clone())
    }

    async fn get_member(&self, id: MemberId) -> StoreResult<Option<Member>> {
        self.check_available()?;
        Ok(self.tables.read().await.members.get(&id).cloned())
    }

    async fn list_members(&self) -> StoreResult<Vec<Member>> {
        self.check_available()?;
        Ok(self.tables.read().await.members.values().cloned().collect())
    }

    async fn set_desire(&self, id: MemberId, level: DesireLevel) -> StoreResult<()> {
        self.check_available()?;
        let mut tables = self.tables.write().await;
        let member = tables
            .members
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("member {}", id)))?;
        member.desire = level;
        Ok(())
    }

    async fn set_drink(&self, id: MemberId, drink: Drink) -> StoreResult<()> {
        self.check_available()?;
        let mut tables = self.tables.write().await;
        let member = tables
            .members
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("member {}", id)))?;
        member.drink = drink;
        Ok(())
    }

    async fn reset_all_desires(&self) -> StoreResult<()> {
        self.check_available()?;
        let mut tables = self.tables.write().await;
        for member in tables.members.values_mut() {
            member.desire = DesireLevel::MIN;
        }
        Ok(())
    }
}

#[async_trait]
impl InviteStore for MemoryStore {
    async fn create_invite(
        &self,
        code: &str,
        created_by: Option<MemberId>,
        now: DateTime<Utc>,
    ) -> StoreResult<InviteToken> {
        self.check_available()?;
        let mut tables = self.tables.write().await;
        let invite = InviteToken::new(code, created_by, now);
        tables.invites.insert(code.to_string(), invite.clone());
        Ok(invite)
    }

    async fn redeem_invite(
        &self,
        code: &str,
        consumer: MemberId,
        consumer_name: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Member>> {
        self.check_available()?;
        let mut tables = self.tables.write().await;
        match tables.invites.get_mut(code) {
            Some(invite) if invite.is_redeemable() => {
                invite.active = false;
                invite.used_by = Some(consumer);
                invite.used_at = Some(now);
            }
            _ => return Ok(None),
        }
        let member = tables
            .members
            .entry(consumer)
            .and_modify(|m| m.display_name = consumer_name.to_string())
            .or_insert_with(|| Member::new(consumer, consumer_name, now))
            .clone();
        debug!("Invite {} redeemed by {} ({})", code, consumer, consumer_name);
        Ok(Some(member))
    }

    async fn get_invite(&self, code: &str) -> StoreResult<Option<InviteToken>> {
        self.check_available()?;
        Ok(self.tables.read().await.invites.get(code).cloned())
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn append_event(&self, event: NewEvent) -> StoreResult<DomainEvent> {
        self.check_available()?;
        let mut tables = self.tables.write().await;
        let stored = DomainEvent {
            id: tables.events.len() as u64 + 1,
            kind: event.kind,
            actor_id: event.actor_id,
            actor_name: event.actor_name,
            payload: event.payload,
            created_at: event.created_at,
        };
        tables.events.push(stored.clone());
        Ok(stored)
    }

    async fn consumption_timestamps(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> StoreResult<Vec<DateTime<Utc>>> {
        let events = self.events_since(since).await?;
        Ok(events
            .into_iter()
            .filter(|e| e.kind == EventKind::Consumption)
            .map(|e| e.created_at)
            .collect())
    }

    async fn events_since(&self, since: Option<DateTime<Utc>>) -> StoreResult<Vec<DomainEvent>> {
        self.check_available()?;
        let tables = self.tables.read().await;
        let mut events: Vec<DomainEvent> = tables
            .events
            .iter()
            .filter(|e| since.map_or(true, |s| e.created_at >= s))
            .cloned()
            .collect();
        events.sort_by_key(|e| (e.created_at, e.id));
        Ok(events)
    }
}

#[async_trait]
impl SettingsStore for MemoryStore {
    async fn get_setting(&self, key: &str) -> StoreResult<Option<String>> {
        self.check_available()?;
        Ok(self.tables.read().await.settings.get(key).cloned())
    }

    async fn set_setting(&self, key: &str, value: &str) -> StoreResult<()> {
        self.check_available()?;
        self.tables
            .write()
            .await
            .settings
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn set_setting_if_absent(&self, key: &str, value: &str) -> StoreResult<()> {
        self.check_available()?;
        self.tables
            .write()
            .await
            .settings
            .entry(key.to_string())
            .or_insert_with(|| value.to_string());
        Ok(())
    }
}
