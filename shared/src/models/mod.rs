use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub mod events;
pub mod readiness;

pub use events::{DomainEvent, EventKind, NewEvent, UnknownEventKind};
pub use readiness::ReadinessSnapshot;

/// Opaque member identifier (the chat id on the transport side).
pub type MemberId = i64;

/// Drinks a member can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Drink {
    #[default]
    Coffee,
    Latte,
    Milk,
    Espresso,
}

impl Drink {
    pub const ALL: [Drink; 4] = [Drink::Coffee, Drink::Latte, Drink::Milk, Drink::Espresso];

    /// Stable code used in event payloads and transport commands.
    pub fn code(self) -> &'static str {
        match self {
            Drink::Coffee => "coffee",
            Drink::Latte => "latte",
            Drink::Milk => "milk",
            Drink::Espresso => "espresso",
        }
    }

    /// Human readable label.
    pub fn label(self) -> &'static str {
        match self {
            Drink::Coffee => "Coffee",
            Drink::Latte => "Coffee with milk",
            Drink::Milk => "Just milk",
            Drink::Espresso => "Espresso",
        }
    }
}

impl fmt::Display for Drink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown drink code: {0}")]
pub struct UnknownDrink(pub String);

impl FromStr for Drink {
    type Err = UnknownDrink;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Drink::ALL
            .into_iter()
            .find(|d| d.code() == s)
            .ok_or_else(|| UnknownDrink(s.to_string()))
    }
}

/// A desire level, always within `0..=10`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct DesireLevel(u8);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("desire level must be between 0 and 10, got {0}")]
pub struct LevelOutOfRange(pub i64);

impl DesireLevel {
    pub const MIN: DesireLevel = DesireLevel(0);
    pub const MAX: DesireLevel = DesireLevel(10);

    pub fn new(value: i64) -> Result<Self, LevelOutOfRange> {
        if (0..=10).contains(&value) {
            Ok(DesireLevel(value as u8))
        } else {
            Err(LevelOutOfRange(value))
        }
    }

    /// Moves the level by `delta`, saturating at both ends of the scale.
    pub fn adjusted(self, delta: i64) -> Self {
        let next = (i64::from(self.0)).saturating_add(delta).clamp(0, 10);
        DesireLevel(next as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn meets(self, threshold: u8) -> bool {
        self.0 >= threshold
    }
}

impl TryFrom<u8> for DesireLevel {
    type Error = LevelOutOfRange;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        DesireLevel::new(i64::from(value))
    }
}

impl From<DesireLevel> for u8 {
    fn from(level: DesireLevel) -> u8 {
        level.0
    }
}

impl fmt::Display for DesireLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A registered participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: MemberId,
    pub display_name: String,
    pub desire: DesireLevel,
    pub drink: Drink,
    pub joined_at: DateTime<Utc>,
}

impl Member {
    pub fn new(id: MemberId, display_name: impl Into<String>, joined_at: DateTime<Utc>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            desire: DesireLevel::MIN,
            drink: Drink::default(),
            joined_at,
        }
    }
}

/// Single-use invite token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteToken {
    pub code: String,
    /// `None` for the bootstrap invite created at startup.
    pub created_by: Option<MemberId>,
    pub created_at: DateTime<Utc>,
    pub used_by: Option<MemberId>,
    pub used_at: Option<DateTime<Utc>>,
    pub active: bool,
}

impl InviteToken {
    pub fn new(code: impl Into<String>, created_by: Option<MemberId>, created_at: DateTime<Utc>) -> Self {
        Self {
            code: code.into(),
            created_by,
            created_at,
            used_by: None,
            used_at: None,
            active: true,
        }
    }

    pub fn is_redeemable(&self) -> bool {
        self.active && self.used_by.is_none()
    }
}
