use axum::{
    extract::{Extension, Query, State},
    Json,
};
use brewcrew_shared::stats::{MAX_WINDOW_DAYS, WEEK_DAYS};
use brewcrew_shared::store::Store;
use serde_json::json;
use std::sync::Arc;

use crate::coordinator::Coordinator;
use crate::error::{AppError, Result};
use crate::messages;
use crate::models::{Actor, StatsQuery};

// GET /stats
pub async fn get_stats<S>(
    State(coordinator): State<Arc<Coordinator<S>>>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<serde_json::Value>>
where
    S: Store,
{
    coordinator.require_member(&actor).await?;
    let weekly = coordinator.stats().weekly_stats().await?;
    let all_time = coordinator.stats().all_time_stats().await?;
    let text = format!(
        "{}\n{}",
        messages::gap_stats_block("Last 7 days", &weekly),
        messages::gap_stats_block("All time", &all_time)
    );
    Ok(Json(json!({ "weekly": weekly, "allTime": all_time, "text": text })))
}

// GET /stats/weekly
pub async fn get_weekly_stats<S>(
    State(coordinator): State<Arc<Coordinator<S>>>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<serde_json::Value>>
where
    S: Store,
{
    coordinator.require_member(&actor).await?;
    let stats = coordinator.stats().weekly_stats().await?;
    let text = messages::gap_stats_block("Last 7 days", &stats);
    Ok(Json(json!({ "stats": stats, "text": text })))
}

// GET /stats/all-time
pub async fn get_all_time_stats<S>(
    State(coordinator): State<Arc<Coordinator<S>>>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<serde_json::Value>>
where
    S: Store,
{
    coordinator.require_member(&actor).await?;
    let stats = coordinator.stats().all_time_stats().await?;
    let text = messages::gap_stats_block("All time", &stats);
    Ok(Json(json!({ "stats": stats, "text": text })))
}

// GET /stats/members?days=N
pub async fn get_member_stats<S>(
    State(coordinator): State<Arc<Coordinator<S>>>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<serde_json::Value>>
where
    S: Store,
{
    coordinator.require_member(&actor).await?;
    let days = query.days.unwrap_or(WEEK_DAYS);
    if !(1..=MAX_WINDOW_DAYS).contains(&days) {
        return Err(AppError::bad_request(format!(
            "days must be between 1 and {}, got {}",
            MAX_WINDOW_DAYS, days
        )));
    }
    let summaries = coordinator.stats().user_stats(days).await?;
    let text = messages::user_stats_text(&summaries, days);
    Ok(Json(json!({ "days": days, "members": summaries, "text": text })))
}
