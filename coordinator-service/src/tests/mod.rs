mod routes_test;
mod scheduler_test;

use brewcrew_shared::clock::Clock;
use brewcrew_shared::models::{DesireLevel, Drink, MemberId};
use brewcrew_shared::settings::ensure_default_settings;
use brewcrew_shared::store::memory::MemoryStore;
use brewcrew_shared::store::MemberStore;
use brewcrew_shared::test_utils::clock::FixedClock;
use brewcrew_shared::test_utils::recording_transport::RecordingTransport;
use brewcrew_shared::test_utils::test_logging::init_test_logging;
use brewcrew_shared::transport::Transport;
use chrono::Utc;
use std::sync::Arc;

use crate::config::NotificationPolicy;
use crate::coordinator::Coordinator;
use crate::models::Actor;
use crate::scheduler::NotificationScheduler;

/// Local hour outside the default quiet window.
pub const DAYTIME: u32 = 12;
/// Local hour inside the default quiet window.
pub const NIGHT: u32 = 3;

pub struct TestEnv {
    pub store: Arc<MemoryStore>,
    pub transport: Arc<RecordingTransport>,
    pub clock: Arc<FixedClock>,
    pub policy: NotificationPolicy,
}

impl TestEnv {
    pub async fn new() -> Self {
        init_test_logging();
        let store = Arc::new(MemoryStore::new());
        ensure_default_settings(store.as_ref()).await.unwrap();
        Self {
            store,
            transport: Arc::new(RecordingTransport::new()),
            clock: Arc::new(FixedClock::at(Utc::now(), DAYTIME)),
            policy: NotificationPolicy::default(),
        }
    }

    fn transport(&self) -> Arc<dyn Transport> {
        self.transport.clone()
    }

    fn clock(&self) -> Arc<dyn Clock> {
        self.clock.clone()
    }

    pub fn coordinator(&self) -> Coordinator<MemoryStore> {
        Coordinator::new(
            self.store.clone(),
            self.transport(),
            self.clock(),
            self.policy,
        )
    }

    pub fn scheduler(&self) -> NotificationScheduler<MemoryStore> {
        NotificationScheduler::new(
            self.store.clone(),
            self.transport(),
            self.clock(),
            self.policy,
        )
    }

    /// Registers a member directly in the store.
    pub async fn add_member(&self, id: MemberId, name: &str) -> Actor {
        self.store
            .upsert_member(id, name, self.clock.now_utc())
            .await
            .unwrap();
        Actor::new(id, name)
    }

    pub async fn set_state(&self, id: MemberId, level: i64, drink: Drink) {
        self.store
            .set_desire(id, DesireLevel::new(level).unwrap())
            .await
            .unwrap();
        self.store.set_drink(id, drink).await.unwrap();
    }

    pub async fn level_of(&self, id: MemberId) -> u8 {
        self.store
            .get_member(id)
            .await
            .unwrap()
            .map(|m| m.desire.value())
            .unwrap()
    }
}
