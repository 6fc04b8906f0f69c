use chrono::{DateTime, Local, Timelike, Utc};
use serde::Serialize;

/// Wall-clock access, injectable so quiet hours can be tested.
pub trait Clock: Send + Sync {
    fn now_utc(&self) -> DateTime<Utc>;

    /// Local hour of day, `0..=23`.
    fn local_hour(&self) -> u32;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn local_hour(&self) -> u32 {
        Local::now().hour()
    }
}

/// Local time-of-day window `[start, end)` with no proactive notifications.
/// A window with `start > end` wraps past midnight; `start == end` is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuietHours {
    pub start: u32,
    pub end: u32,
}

impl Default for QuietHours {
    fn default() -> Self {
        Self { start: 0, end: 8 }
    }
}

impl QuietHours {
    pub fn new(start: u32, end: u32) -> Self {
        Self {
            start: start % 24,
            end: end % 24,
        }
    }

    pub fn contains(&self, hour: u32) -> bool {
        if self.start <= self.end {
            self.start <= hour && hour < self.end
        } else {
            hour >= self.start || hour < self.end
        }
    }

    /// Evaluated against the clock at every call, never cached.
    pub fn is_active(&self, clock: &dyn Clock) -> bool {
        self.contains(clock.local_hour())
    }
}
