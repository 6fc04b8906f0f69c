use axum::{
    extract::{Extension, State},
    Json,
};
use brewcrew_shared::settings::CoordinatorSettings;
use brewcrew_shared::store::Store;
use serde_json::json;
use std::sync::Arc;

use crate::coordinator::Coordinator;
use crate::error::Result;
use crate::messages;
use crate::models::{Actor, AdjustRequest, SetIntervalRequest};

fn settings_body<S: Store>(
    coordinator: &Coordinator<S>,
    settings: &CoordinatorSettings,
) -> serde_json::Value {
    let quiet_hours = coordinator.policy().quiet_hours;
    json!({
        "threshold": settings.threshold,
        "promptIntervalSecs": settings.prompt_interval.as_secs(),
        "quietHours": quiet_hours,
        "text": messages::settings_text(settings, &quiet_hours),
    })
}

// GET /settings
pub async fn get_settings<S>(
    State(coordinator): State<Arc<Coordinator<S>>>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<serde_json::Value>>
where
    S: Store,
{
    let settings = coordinator.settings(&actor).await?;
    Ok(Json(settings_body(&coordinator, &settings)))
}

// PATCH /settings/threshold
pub async fn adjust_threshold<S>(
    State(coordinator): State<Arc<Coordinator<S>>>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<AdjustRequest>,
) -> Result<Json<serde_json::Value>>
where
    S: Store,
{
    let settings = coordinator.adjust_threshold(&actor, request.delta).await?;
    Ok(Json(settings_body(&coordinator, &settings)))
}

// PUT /settings/interval
pub async fn set_interval<S>(
    State(coordinator): State<Arc<Coordinator<S>>>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<SetIntervalRequest>,
) -> Result<Json<serde_json::Value>>
where
    S: Store,
{
    let settings = coordinator.set_interval(&actor, request.seconds).await?;
    Ok(Json(settings_body(&coordinator, &settings)))
}
