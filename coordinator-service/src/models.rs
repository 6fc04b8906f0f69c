use brewcrew_shared::models::MemberId;
use serde::Deserialize;
use std::str::FromStr;

use crate::error::AppError;

/// Identity of whoever triggered the request, as asserted by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: MemberId,
    pub name: String,
}

impl Actor {
    pub fn new(id: MemberId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

// Request DTOs
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    pub invite_code: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct SetLevelRequest {
    pub level: i64,
}

#[derive(Deserialize, Debug)]
pub struct AdjustRequest {
    pub delta: i64,
}

#[derive(Deserialize, Debug)]
pub struct SetDrinkRequest {
    pub drink: String,
}

#[derive(Deserialize, Debug)]
pub struct SetIntervalRequest {
    pub seconds: i64,
}

#[derive(Deserialize, Debug)]
pub struct CommandRequest {
    pub command: String,
}

#[derive(Deserialize, Debug, Default)]
pub struct StatsQuery {
    pub days: Option<i64>,
}

/// Actions a member can trigger from the chat keyboards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberAction {
    MainMenu,
    ChooseLevel,
    DrinkMenu,
    SetLevel(i64),
    AdjustLevel(i64),
    SetDrink(String),
    ConfirmConsumption,
    Status,
    Settings,
    AdjustThreshold(i64),
    SetInterval(i64),
    CreateInvite,
    WeeklyStats,
    AllStats,
    WeeklyUserStats,
}

impl FromStr for MemberAction {
    type Err = AppError;

    /// Parses a transport command such as `level:7` or `adjust:-1`.
    fn from_str(command: &str) -> Result<Self, Self::Err> {
        let command = command.trim();
        let (name, arg) = match command.split_once(':') {
            Some((name, arg)) => (name, Some(arg.trim())),
            None => (command, None),
        };

        let number = |arg: Option<&str>| -> Result<i64, AppError> {
            let raw = arg.ok_or_else(|| {
                AppError::bad_request(format!("Command {} needs an argument", name))
            })?;
            raw.trim_start_matches('+').parse::<i64>().map_err(|_| {
                AppError::bad_request(format!("Command {} has a malformed argument {:?}", name, raw))
            })
        };

        let action = match (name, arg) {
            ("back_to_menu", None) => MemberAction::MainMenu,
            ("choose_level", None) => MemberAction::ChooseLevel,
            ("drink_menu", None) => MemberAction::DrinkMenu,
            ("level", _) => MemberAction::SetLevel(number(arg)?),
            ("adjust", _) => MemberAction::AdjustLevel(number(arg)?),
            ("drink", Some(code)) if !code.is_empty() => MemberAction::SetDrink(code.to_string()),
            ("reset", None) => MemberAction::ConfirmConsumption,
            ("status", None) => MemberAction::Status,
            ("settings", None) => MemberAction::Settings,
            ("set_threshold", _) => MemberAction::AdjustThreshold(number(arg)?),
            ("set_interval", _) => MemberAction::SetInterval(number(arg)?),
            ("invite", None) => MemberAction::CreateInvite,
            ("weekly_stats", None) => MemberAction::WeeklyStats,
            ("all_stats", None) => MemberAction::AllStats,
            ("weekly_user_stats", None) => MemberAction::WeeklyUserStats,
            _ => {
                return Err(AppError::bad_request(format!(
                    "Unknown command {:?}",
                    command
                )))
            }
        };
        Ok(action)
    }
}
