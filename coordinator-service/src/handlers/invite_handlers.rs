use axum::{
    extract::{Extension, State},
    http::StatusCode,
    Json,
};
use brewcrew_shared::models::InviteToken;
use brewcrew_shared::store::Store;
use std::sync::Arc;

use crate::coordinator::Coordinator;
use crate::error::Result;
use crate::models::Actor;

// POST /invites
pub async fn create_invite<S>(
    State(coordinator): State<Arc<Coordinator<S>>>,
    Extension(actor): Extension<Actor>,
) -> Result<(StatusCode, Json<InviteToken>)>
where
    S: Store,
{
    let invite = coordinator.create_invite(&actor).await?;
    Ok((StatusCode::CREATED, Json(invite)))
}
