use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{DesireLevel, DomainEvent, Drink, InviteToken, Member, MemberId, NewEvent};

pub mod memory;
pub mod postgres;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Membership and per-member desire state.
#[async_trait]
pub trait MemberStore: Send + Sync {
    async fn member_exists(&self, id: MemberId) -> StoreResult<bool>;

    /// Inserts a new member (desire 0, coffee) or refreshes the display name
    /// of an existing one. Returns the stored record.
    async fn upsert_member(
        &self,
        id: MemberId,
        display_name: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Member>;

    async fn get_member(&self, id: MemberId) -> StoreResult<Option<Member>>;

    async fn list_members(&self) -> StoreResult<Vec<Member>>;

    async fn set_desire(&self, id: MemberId, level: DesireLevel) -> StoreResult<()>;

    async fn set_drink(&self, id: MemberId, drink: Drink) -> StoreResult<()>;

    async fn reset_all_desires(&self) -> StoreResult<()>;
}

/// Single-use invite ledger.
#[async_trait]
pub trait InviteStore: Send + Sync {
    /// Creates the invite, or re-activates it if the code already exists.
    async fn create_invite(
        &self,
        code: &str,
        created_by: Option<MemberId>,
        now: DateTime<Utc>,
    ) -> StoreResult<InviteToken>;

    /// Consumes the invite and registers the consumer as a member in one
    /// atomic step. `None` when the invite was not redeemable, in which case
    /// nothing is written.
    async fn redeem_invite(
        &self,
        code: &str,
        consumer: MemberId,
        consumer_name: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Member>>;

    async fn get_invite(&self, code: &str) -> StoreResult<Option<InviteToken>>;
}

/// Append-only domain event log.
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn append_event(&self, event: NewEvent) -> StoreResult<DomainEvent>;

    /// Consumption instants at or after `since` (all of them when `None`), oldest first.
    async fn consumption_timestamps(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> StoreResult<Vec<DateTime<Utc>>>;

    /// Every event at or after `since`, oldest first.
    async fn events_since(&self, since: Option<DateTime<Utc>>) -> StoreResult<Vec<DomainEvent>>;
}

/// Loosely typed key/value settings.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn get_setting(&self, key: &str) -> StoreResult<Option<String>>;

    async fn set_setting(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Writes `value` only when `key` has no value yet.
    async fn set_setting_if_absent(&self, key: &str, value: &str) -> StoreResult<()>;
}

/// Everything the coordinator needs from persistence.
pub trait Store: MemberStore + InviteStore + EventStore + SettingsStore + 'static {}

impl<T> Store for T where T: MemberStore + InviteStore + EventStore + SettingsStore + 'static {}
