//! Consumption gap statistics and per-member behaviour summaries.
//!
//! The aggregation itself is pure; [`StatsAggregator`] only picks the window
//! and reads the event log.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::clock::Clock;
use crate::models::{DomainEvent, Drink, EventKind, MemberId};
use crate::store::{EventStore, StoreResult};

pub const WEEK_DAYS: i64 = 7;

/// Longest trailing window a caller may ask for.
pub const MAX_WINDOW_DAYS: i64 = 36_500;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GapStats {
    pub count: usize,
    /// Seconds.
    pub shortest_gap: Option<i64>,
    pub longest_gap: Option<i64>,
    pub average_gap: Option<i64>,
    pub first_at: Option<DateTime<Utc>>,
    pub last_at: Option<DateTime<Utc>>,
}

/// Gap statistics over a set of consumption instants in any order.
pub fn gap_stats(timestamps: &[DateTime<Utc>]) -> GapStats {
    let mut times = timestamps.to_vec();
    times.sort();

    let gaps: Vec<i64> = times
        .windows(2)
        .map(|pair| (pair[1] - pair[0]).num_seconds())
        .collect();

    let average_gap = if gaps.is_empty() {
        None
    } else {
        Some(gaps.iter().sum::<i64>() / gaps.len() as i64)
    };

    GapStats {
        count: times.len(),
        shortest_gap: gaps.iter().copied().min(),
        longest_gap: gaps.iter().copied().max(),
        average_gap,
        first_at: times.first().copied(),
        last_at: times.last().copied(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserSummary {
    pub user_id: MemberId,
    pub username: Option<String>,
    pub want_count: u32,
    pub drink_selects: BTreeMap<Drink, u32>,
    pub consumed_total: u32,
    pub consumed_by_drink: BTreeMap<Drink, u32>,
}

impl UserSummary {
    fn new(user_id: MemberId) -> Self {
        Self {
            user_id,
            username: None,
            want_count: 0,
            drink_selects: BTreeMap::new(),
            consumed_total: 0,
            consumed_by_drink: BTreeMap::new(),
        }
    }
}

/// One summary per actor seen at or after `since`, in order of first appearance.
/// Actor-less events are skipped; actors without events are absent.
pub fn summarize_by_actor(events: &[DomainEvent], since: Option<DateTime<Utc>>) -> Vec<UserSummary> {
    let mut summaries: Vec<UserSummary> = Vec::new();
    let mut index: HashMap<MemberId, usize> = HashMap::new();

    let in_window = events
        .iter()
        .filter(|e| since.map_or(true, |s| e.created_at >= s));

    for event in in_window {
        let Some(actor) = event.actor_id else {
            continue;
        };
        let slot = *index.entry(actor).or_insert_with(|| {
            summaries.push(UserSummary::new(actor));
            summaries.len() - 1
        });
        let entry = &mut summaries[slot];
        if event.actor_name.is_some() {
            entry.username = event.actor_name.clone();
        }

        match event.kind {
            EventKind::DesireSet => entry.want_count += 1,
            EventKind::DrinkSet => *entry.drink_selects.entry(event.drink()).or_insert(0) += 1,
            EventKind::Consumption => {
                entry.consumed_total += 1;
                *entry.consumed_by_drink.entry(event.drink()).or_insert(0) += 1;
            }
            EventKind::Join | EventKind::InviteCreated | EventKind::InviteConsumed => {}
        }
    }

    summaries
}

/// Reads the event log over a trailing window relative to the clock.
pub struct StatsAggregator<S: ?Sized> {
    events: Arc<S>,
    clock: Arc<dyn Clock>,
}

impl<S> StatsAggregator<S>
where
    S: EventStore + ?Sized,
{
    pub fn new(events: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self { events, clock }
    }

    /// Start of a trailing window. `None` when the window reaches past the
    /// representable range, which reads as "everything".
    fn since_days(&self, days: i64) -> Option<DateTime<Utc>> {
        Duration::try_days(days).and_then(|d| self.clock.now_utc().checked_sub_signed(d))
    }

    pub async fn stats_since_days(&self, days: Option<i64>) -> StoreResult<GapStats> {
        let since = days.and_then(|d| self.since_days(d));
        let timestamps = self.events.consumption_timestamps(since).await?;
        Ok(gap_stats(&timestamps))
    }

    pub async fn weekly_stats(&self) -> StoreResult<GapStats> {
        self.stats_since_days(Some(WEEK_DAYS)).await
    }

    pub async fn all_time_stats(&self) -> StoreResult<GapStats> {
        self.stats_since_days(None).await
    }

    pub async fn user_stats(&self, days: i64) -> StoreResult<Vec<UserSummary>> {
        let since = self.since_days(days);
        let events = self.events.events_since(since).await?;
        Ok(summarize_by_actor(&events, since))
    }

    pub async fn user_weekly_stats(&self) -> StoreResult<Vec<UserSummary>> {
        self.user_stats(WEEK_DAYS).await
    }
}
