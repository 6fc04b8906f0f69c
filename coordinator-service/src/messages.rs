//! Texts and action keyboards sent to members.

use brewcrew_shared::clock::QuietHours;
use brewcrew_shared::models::{Drink, Member, ReadinessSnapshot};
use brewcrew_shared::settings::CoordinatorSettings;
use brewcrew_shared::stats::{GapStats, UserSummary};
use brewcrew_shared::transport::{Action, Outbound};
use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use std::collections::BTreeMap;

pub const MOTIVATION_LINES: [&str; 5] = [
    "Coffee is waiting for you! A boost of energy is on its way.",
    "The best decisions come with a cup of coffee. Go!",
    "Time to take a break and pour a fragrant coffee.",
    "Team coffee, team success. Don't slow down!",
    "Just a little more, and coffee will lift everyone's mood!",
];

pub const ALL_READY_HEADER: &str = "COFFEE TIME!";
pub const REMINDER_TEXT: &str = "Remind us of your current desire for coffee:";

pub fn random_motivation() -> &'static str {
    MOTIVATION_LINES
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(MOTIVATION_LINES[0])
}

pub fn main_menu() -> Vec<Vec<Action>> {
    vec![
        vec![Action::new("I want coffee", "choose_level")],
        vec![Action::new("Settings", "settings")],
    ]
}

pub fn level_keyboard() -> Vec<Vec<Action>> {
    let row = |levels: &[u8]| {
        levels
            .iter()
            .map(|n| Action::new(n.to_string(), format!("level:{}", n)))
            .collect::<Vec<_>>()
    };
    vec![
        row(&[0, 1, 2, 3]),
        row(&[4, 5, 6, 7]),
        row(&[8, 9, 10]),
        vec![Action::new("-1", "adjust:-1"), Action::new("+1", "adjust:+1")],
        vec![Action::new("Back", "back_to_menu")],
    ]
}

pub fn drink_keyboard() -> Vec<Vec<Action>> {
    let button = |d: Drink| Action::new(d.label(), format!("drink:{}", d.code()));
    vec![
        vec![button(Drink::Coffee), button(Drink::Latte)],
        vec![button(Drink::Milk), button(Drink::Espresso)],
        vec![Action::new("Back", "back_to_menu")],
    ]
}

/// Settings screen: everything that is not a level or drink choice.
pub fn settings_keyboard() -> Vec<Vec<Action>> {
    vec![
        vec![
            Action::new("Status", "status"),
            Action::new("Coffee's done", "reset"),
        ],
        vec![Action::new("Drink", "drink_menu")],
        vec![
            Action::new("7 days", "weekly_stats"),
            Action::new("7 days by person", "weekly_user_stats"),
        ],
        vec![Action::new("All time", "all_stats")],
        vec![Action::new("Invite", "invite")],
        vec![
            Action::new("Threshold -1", "set_threshold:-1"),
            Action::new("Threshold +1", "set_threshold:+1"),
        ],
        vec![
            Action::new("Interval 30m", "set_interval:1800"),
            Action::new("Interval 60m", "set_interval:3600"),
            Action::new("Interval 90m", "set_interval:5400"),
        ],
        vec![Action::new("Back", "back_to_menu")],
    ]
}

pub fn confirm_keyboard() -> Vec<Vec<Action>> {
    vec![vec![Action::new("Coffee's done", "reset")]]
}

/// Sent to every member once the whole group is ready.
pub fn all_ready(members: &[Member], motivation: &str) -> Outbound {
    let mut text = format!("{}\n\nEveryone wants coffee:\n", ALL_READY_HEADER);
    for m in members {
        text.push_str(&format!(
            "- {}: {}/10 ({})\n",
            m.display_name,
            m.desire,
            m.drink.label()
        ));
    }
    text.push_str(&format!("\n{}\n", motivation));
    text.push_str("Once the coffee is drunk, press \"Coffee's done\" to reset the levels.");
    Outbound::new(text, confirm_keyboard())
}

/// Sent to the other members when someone is ready.
pub fn peer_interest(member: &Member) -> Outbound {
    Outbound::new(
        format!(
            "{} wants {} ({}/10).\nHow much do you want it? Update your level:",
            member.display_name,
            member.drink.label(),
            member.desire
        ),
        level_keyboard(),
    )
}

pub fn desire_reminder() -> Outbound {
    Outbound::new(REMINDER_TEXT, level_keyboard())
}

pub fn motivation_nudge(motivation: &str) -> Outbound {
    Outbound::new(
        format!(
            "{}\n\nEveryone wants coffee, but nobody has pressed \"Coffee's done\" yet. \
             Have that coffee and keep the mood up!",
            motivation
        ),
        confirm_keyboard(),
    )
}

pub fn consumption_confirmed(actor_name: &str, drink: Drink) -> Outbound {
    Outbound::new(
        format!(
            "{} marked the coffee as drunk ({}). All levels are reset.",
            actor_name,
            drink.label()
        ),
        main_menu(),
    )
}

pub fn status_text(snapshot: &ReadinessSnapshot) -> String {
    let mut text = String::from("Current coffee desire:\n");
    for m in &snapshot.members {
        let ready = snapshot.is_ready(m);
        let icon = if ready { "[ready]" } else { "[wait]" };
        let drink = if ready {
            format!(" ({})", m.drink.label())
        } else {
            String::new()
        };
        text.push_str(&format!("{} {}: {}/10{}\n", icon, m.display_name, m.desire, drink));
    }
    text
}

pub fn settings_text(settings: &CoordinatorSettings, quiet_hours: &QuietHours) -> String {
    format!(
        "Settings\n- Readiness threshold: {}\n- Reminder interval: {} min\n- Quiet hours: {}:00-{}:00\n",
        settings.threshold,
        settings.prompt_interval.as_secs() / 60,
        quiet_hours.start,
        quiet_hours.end
    )
}

pub fn format_gap(seconds: Option<i64>) -> String {
    match seconds {
        None => "-".to_string(),
        Some(s) => format!("{}h {}m", s / 3600, (s % 3600) / 60),
    }
}

pub fn format_datetime(at: Option<DateTime<Utc>>) -> String {
    match at {
        None => "-".to_string(),
        Some(at) => at.format("%Y-%m-%d %H:%M").to_string(),
    }
}

pub fn format_drink_counts(counts: &BTreeMap<Drink, u32>) -> String {
    if counts.is_empty() {
        return "-".to_string();
    }
    counts
        .iter()
        .map(|(drink, n)| format!("{}: {}", drink.label(), n))
        .collect::<Vec<_>>()
        .join("; ")
}

pub fn gap_stats_block(label: &str, stats: &GapStats) -> String {
    format!(
        "{}\n- Cups: {}\n- Shortest break: {}\n- Longest break: {}\n- Average break: {}\n- First cup: {}\n- Last cup: {}\n",
        label,
        stats.count,
        format_gap(stats.shortest_gap),
        format_gap(stats.longest_gap),
        format_gap(stats.average_gap),
        format_datetime(stats.first_at),
        format_datetime(stats.last_at),
    )
}

pub fn user_stats_text(summaries: &[UserSummary], days: i64) -> String {
    if summaries.is_empty() {
        return format!("No data for the last {} days.", days);
    }
    let blocks: Vec<String> = summaries
        .iter()
        .map(|s| {
            format!(
                "{}:\n- Wanted a drink: {} time(s)\n- Drink choices: {}\n- Cups: {} ({})",
                s.username.as_deref().unwrap_or("Unknown"),
                s.want_count,
                format_drink_counts(&s.drink_selects),
                s.consumed_total,
                format_drink_counts(&s.consumed_by_drink)
            )
        })
        .collect();
    format!("Per-person stats for {} days:\n\n{}", days, blocks.join("\n\n"))
}
