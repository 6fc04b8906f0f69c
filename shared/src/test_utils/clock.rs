use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, PoisonError};

use crate::clock::Clock;

/// Clock with a settable instant and local hour.
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
    hour: AtomicU32,
}

impl FixedClock {
    pub fn at(now: DateTime<Utc>, local_hour: u32) -> Self {
        Self {
            now: Mutex::new(now),
            hour: AtomicU32::new(local_hour),
        }
    }

    /// Current time, local hour as given.
    pub fn at_hour(local_hour: u32) -> Self {
        Self::at(Utc::now(), local_hour)
    }

    pub fn set_hour(&self, local_hour: u32) {
        self.hour.store(local_hour, Ordering::SeqCst);
    }

    pub fn set_now(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = now;
    }
}

impl Clock for FixedClock {
    fn now_utc(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn local_hour(&self) -> u32 {
        self.hour.load(Ordering::SeqCst)
    }
}
