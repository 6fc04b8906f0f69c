use axum::{
    extract::{Extension, State},
    Json,
};
use brewcrew_shared::store::Store;
use log::info;
use serde_json::json;
use std::sync::Arc;

use crate::coordinator::{ConfirmOutcome, Coordinator, JoinOutcome, UpdateOutcome};
use crate::error::Result;
use crate::messages;
use crate::models::{Actor, AdjustRequest, JoinRequest, SetDrinkRequest, SetLevelRequest};

// POST /join
pub async fn join<S>(
    State(coordinator): State<Arc<Coordinator<S>>>,
    Extension(actor): Extension<Actor>,
    body: Option<Json<JoinRequest>>,
) -> Result<Json<JoinOutcome>>
where
    S: Store,
{
    let request = body.map(|Json(r)| r).unwrap_or_default();
    info!("Join request from {} ({})", actor.name, actor.id);
    let outcome = coordinator
        .join(&actor, request.invite_code.as_deref())
        .await?;
    Ok(Json(outcome))
}

// GET /status
pub async fn get_status<S>(
    State(coordinator): State<Arc<Coordinator<S>>>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<serde_json::Value>>
where
    S: Store,
{
    let snapshot = coordinator.status(&actor).await?;
    let members: Vec<_> = snapshot
        .members
        .iter()
        .map(|m| {
            json!({
                "id": m.id,
                "displayName": m.display_name,
                "desire": m.desire,
                "drink": m.drink,
                "ready": snapshot.is_ready(m),
            })
        })
        .collect();

    Ok(Json(json!({
        "threshold": snapshot.threshold,
        "fullyReady": snapshot.is_fully_ready(),
        "members": members,
        "text": messages::status_text(&snapshot),
    })))
}

// PUT /members/me/desire
pub async fn set_desire<S>(
    State(coordinator): State<Arc<Coordinator<S>>>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<SetLevelRequest>,
) -> Result<Json<UpdateOutcome>>
where
    S: Store,
{
    Ok(Json(coordinator.set_level(&actor, request.level).await?))
}

// PATCH /members/me/desire
pub async fn adjust_desire<S>(
    State(coordinator): State<Arc<Coordinator<S>>>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<AdjustRequest>,
) -> Result<Json<UpdateOutcome>>
where
    S: Store,
{
    Ok(Json(coordinator.adjust_level(&actor, request.delta).await?))
}

// PUT /members/me/drink
pub async fn set_drink<S>(
    State(coordinator): State<Arc<Coordinator<S>>>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<SetDrinkRequest>,
) -> Result<Json<UpdateOutcome>>
where
    S: Store,
{
    Ok(Json(coordinator.set_drink(&actor, &request.drink).await?))
}

// POST /consumption
pub async fn confirm_consumption<S>(
    State(coordinator): State<Arc<Coordinator<S>>>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<ConfirmOutcome>>
where
    S: Store,
{
    Ok(Json(coordinator.confirm(&actor).await?))
}
