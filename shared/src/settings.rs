//! Runtime-tunable settings backed by the loosely typed settings store.
//!
//! Values are stored as strings. Reading falls back to the documented default
//! when a key is absent, unparsable, or outside its valid range.

use log::warn;
use serde::Serialize;
use std::time::Duration;

use crate::store::{SettingsStore, StoreResult};

pub const THRESHOLD_KEY: &str = "threshold";
pub const PROMPT_INTERVAL_KEY: &str = "prompt_interval";

pub const DEFAULT_THRESHOLD: u8 = 7;
pub const DEFAULT_PROMPT_INTERVAL_SECS: u64 = 3600;

pub const MIN_THRESHOLD: u8 = 1;
pub const MAX_THRESHOLD: u8 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoordinatorSettings {
    pub threshold: u8,
    #[serde(rename = "promptIntervalSecs", serialize_with = "serialize_secs")]
    pub prompt_interval: Duration,
}

fn serialize_secs<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_secs())
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            prompt_interval: Duration::from_secs(DEFAULT_PROMPT_INTERVAL_SECS),
        }
    }
}

impl CoordinatorSettings {
    /// Builds typed settings from raw stored values.
    pub fn from_raw(threshold: Option<&str>, prompt_interval: Option<&str>) -> Self {
        Self {
            threshold: parse_threshold(threshold),
            prompt_interval: parse_prompt_interval(prompt_interval),
        }
    }

    pub async fn load<S>(store: &S) -> StoreResult<Self>
    where
        S: SettingsStore + ?Sized,
    {
        let threshold = store.get_setting(THRESHOLD_KEY).await?;
        let interval = store.get_setting(PROMPT_INTERVAL_KEY).await?;
        Ok(Self::from_raw(threshold.as_deref(), interval.as_deref()))
    }
}

pub fn parse_threshold(raw: Option<&str>) -> u8 {
    let Some(raw) = raw else {
        return DEFAULT_THRESHOLD;
    };
    match raw.trim().parse::<u8>() {
        Ok(v) if (MIN_THRESHOLD..=MAX_THRESHOLD).contains(&v) => v,
        _ => {
            warn!("Ignoring stored threshold {:?}, using {}", raw, DEFAULT_THRESHOLD);
            DEFAULT_THRESHOLD
        }
    }
}

pub fn parse_prompt_interval(raw: Option<&str>) -> Duration {
    let Some(raw) = raw else {
        return Duration::from_secs(DEFAULT_PROMPT_INTERVAL_SECS);
    };
    match raw.trim().parse::<u64>() {
        Ok(v) if v > 0 => Duration::from_secs(v),
        _ => {
            warn!(
                "Ignoring stored prompt interval {:?}, using {}s",
                raw, DEFAULT_PROMPT_INTERVAL_SECS
            );
            Duration::from_secs(DEFAULT_PROMPT_INTERVAL_SECS)
        }
    }
}

/// Applies `delta` to `current`, keeping the result within `1..=10`.
pub fn clamp_threshold(current: u8, delta: i64) -> u8 {
    i64::from(current)
        .saturating_add(delta)
        .clamp(i64::from(MIN_THRESHOLD), i64::from(MAX_THRESHOLD)) as u8
}

/// Seeds the defaults for keys that have never been written.
pub async fn ensure_default_settings<S>(store: &S) -> StoreResult<()>
where
    S: SettingsStore + ?Sized,
{
    store
        .set_setting_if_absent(THRESHOLD_KEY, &DEFAULT_THRESHOLD.to_string())
        .await?;
    store
        .set_setting_if_absent(PROMPT_INTERVAL_KEY, &DEFAULT_PROMPT_INTERVAL_SECS.to_string())
        .await
}
