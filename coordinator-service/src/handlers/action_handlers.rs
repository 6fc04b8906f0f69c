use axum::{
    extract::{Extension, State},
    Json,
};
use brewcrew_shared::stats::WEEK_DAYS;
use brewcrew_shared::store::Store;
use brewcrew_shared::transport::Outbound;
use log::debug;
use serde_json::json;
use std::sync::Arc;

use crate::coordinator::{Coordinator, UpdateOutcome};
use crate::error::Result;
use crate::messages;
use crate::models::{Actor, CommandRequest, MemberAction};

/// Runs one keyboard action and builds the reply shown to the actor.
pub async fn dispatch<S>(
    coordinator: &Coordinator<S>,
    actor: &Actor,
    action: MemberAction,
) -> Result<Outbound>
where
    S: Store,
{
    let reply = match action {
        MemberAction::MainMenu => {
            coordinator.require_member(actor).await?;
            Outbound::new("What would you like to do?", messages::main_menu())
        }
        MemberAction::ChooseLevel => {
            coordinator.require_member(actor).await?;
            Outbound::new("How much do you want coffee?", messages::level_keyboard())
        }
        MemberAction::DrinkMenu => {
            coordinator.require_member(actor).await?;
            Outbound::new("What would you like to drink?", messages::drink_keyboard())
        }
        MemberAction::SetLevel(level) => {
            let outcome = coordinator.set_level(actor, level).await?;
            level_reply(&outcome)
        }
        MemberAction::AdjustLevel(delta) => {
            let outcome = coordinator.adjust_level(actor, delta).await?;
            level_reply(&outcome)
        }
        MemberAction::SetDrink(code) => {
            let outcome = coordinator.set_drink(actor, &code).await?;
            Outbound::new(
                format!("You picked: {}", outcome.member.drink.label()),
                messages::main_menu(),
            )
        }
        MemberAction::ConfirmConsumption => {
            let outcome = coordinator.confirm(actor).await?;
            Outbound::new(
                format!("Enjoy your {}! Levels are reset.", outcome.drink.label()),
                messages::main_menu(),
            )
        }
        MemberAction::Status => {
            let snapshot = coordinator.status(actor).await?;
            Outbound::new(messages::status_text(&snapshot), messages::main_menu())
        }
        MemberAction::Settings => {
            let settings = coordinator.settings(actor).await?;
            Outbound::new(
                messages::settings_text(&settings, &coordinator.policy().quiet_hours),
                messages::settings_keyboard(),
            )
        }
        MemberAction::AdjustThreshold(delta) => {
            let settings = coordinator.adjust_threshold(actor, delta).await?;
            Outbound::new(
                format!("Readiness threshold is now {}", settings.threshold),
                messages::settings_keyboard(),
            )
        }
        MemberAction::SetInterval(seconds) => {
            let settings = coordinator.set_interval(actor, seconds).await?;
            Outbound::new(
                format!(
                    "Reminder interval is now {} min",
                    settings.prompt_interval.as_secs() / 60
                ),
                messages::settings_keyboard(),
            )
        }
        MemberAction::CreateInvite => {
            let invite = coordinator.create_invite(actor).await?;
            Outbound::new(
                format!("New invite code: {}\nIt can be used once.", invite.code),
                messages::main_menu(),
            )
        }
        MemberAction::WeeklyStats => {
            coordinator.require_member(actor).await?;
            let stats = coordinator.stats().weekly_stats().await?;
            Outbound::new(
                messages::gap_stats_block("Last 7 days", &stats),
                messages::main_menu(),
            )
        }
        MemberAction::AllStats => {
            coordinator.require_member(actor).await?;
            let stats = coordinator.stats().all_time_stats().await?;
            Outbound::new(
                messages::gap_stats_block("All time", &stats),
                messages::main_menu(),
            )
        }
        MemberAction::WeeklyUserStats => {
            coordinator.require_member(actor).await?;
            let summaries = coordinator.stats().user_weekly_stats().await?;
            Outbound::new(
                messages::user_stats_text(&summaries, WEEK_DAYS),
                messages::main_menu(),
            )
        }
    };
    Ok(reply)
}

fn level_reply(outcome: &UpdateOutcome) -> Outbound {
    Outbound::new(
        format!("Your coffee desire: {}/10", outcome.member.desire),
        messages::drink_keyboard(),
    )
}

// POST /actions
pub async fn handle_action<S>(
    State(coordinator): State<Arc<Coordinator<S>>>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<CommandRequest>,
) -> Result<Json<serde_json::Value>>
where
    S: Store,
{
    debug!("Action {:?} from {}", request.command, actor.id);
    let action: MemberAction = request.command.parse()?;
    let reply = dispatch(&coordinator, &actor, action).await?;
    Ok(Json(json!({ "command": request.command, "reply": reply })))
}
