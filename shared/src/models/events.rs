use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::{Drink, MemberId};

/// Kinds of entries in the append-only event log
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Join,
    DesireSet,
    DrinkSet,
    Consumption,
    InviteCreated,
    InviteConsumed,
}

impl EventKind {
    pub const ALL: [EventKind; 6] = [
        EventKind::Join,
        EventKind::DesireSet,
        EventKind::DrinkSet,
        EventKind::Consumption,
        EventKind::InviteCreated,
        EventKind::InviteConsumed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Join => "join",
            EventKind::DesireSet => "desire_set",
            EventKind::DrinkSet => "drink_set",
            EventKind::Consumption => "consumption",
            EventKind::InviteCreated => "invite_created",
            EventKind::InviteConsumed => "invite_consumed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown event kind: {0}")]
pub struct UnknownEventKind(pub String);

impl FromStr for EventKind {
    type Err = UnknownEventKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| UnknownEventKind(s.to_string()))
    }
}

/// Event as it is handed to the event log
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
    pub kind: EventKind,
    pub actor_id: Option<MemberId>,
    pub actor_name: Option<String>,
    pub payload: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl NewEvent {
    pub fn by(
        kind: EventKind,
        actor_id: MemberId,
        actor_name: &str,
        payload: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            kind,
            actor_id: Some(actor_id),
            actor_name: Some(actor_name.to_string()),
            payload: Some(payload.into()),
            created_at,
        }
    }
}

/// Event as stored in the event log
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct DomainEvent {
    pub id: u64,
    pub kind: EventKind,
    pub actor_id: Option<MemberId>,
    pub actor_name: Option<String>,
    pub payload: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl DomainEvent {
    /// Drink carried by a drink-set or consumption payload.
    ///
    /// Accepts both `drink:<code>` and a bare `<code>`. Anything absent,
    /// empty or not a known drink counts as coffee.
    pub fn drink(&self) -> Drink {
        let raw = match self.payload.as_deref() {
            Some(raw) => raw,
            None => return Drink::default(),
        };
        let code = raw.strip_prefix("drink:").unwrap_or(raw).trim();
        code.parse().unwrap_or_default()
    }
}

/// Payload recorded with a consumption event.
pub fn consumption_payload(drink: Drink) -> String {
    format!("drink:{}", drink.code())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event_with(payload: Option<&str>) -> DomainEvent {
        DomainEvent {
            id: 1,
            kind: EventKind::Consumption,
            actor_id: Some(1),
            actor_name: Some("Ann".into()),
            payload: payload.map(str::to_string),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_drink_parsed_from_payload() {
        assert_eq!(event_with(Some("drink:latte")).drink(), Drink::Latte);
        assert_eq!(event_with(Some("espresso")).drink(), Drink::Espresso);
        assert_eq!(event_with(Some(&consumption_payload(Drink::Milk))).drink(), Drink::Milk);
    }

    #[test]
    fn test_drink_defaults_to_coffee_when_absent_or_malformed() {
        assert_eq!(event_with(None).drink(), Drink::Coffee);
        assert_eq!(event_with(Some("")).drink(), Drink::Coffee);
        assert_eq!(event_with(Some("drink:")).drink(), Drink::Coffee);
        assert_eq!(event_with(Some("drink:tea")).drink(), Drink::Coffee);
    }

    #[test]
    fn test_event_kind_serializes_snake_case() {
        let json = serde_json::to_string(&EventKind::InviteConsumed).unwrap();
        assert_eq!(json, "\"invite_consumed\"");
        assert_eq!(EventKind::DesireSet.as_str(), "desire_set");
    }

    #[test]
    fn test_event_kind_parses_its_stored_name() {
        for kind in EventKind::ALL {
            assert_eq!(kind.as_str().parse::<EventKind>(), Ok(kind));
        }
        assert!("tea_break".parse::<EventKind>().is_err());
    }
}
