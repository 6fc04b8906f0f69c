use axum::{extract::Request, middleware::Next, response::Response};
use log::{debug, warn};

use crate::error::AppError;
use crate::models::Actor;

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_NAME_HEADER: &str = "x-actor-name";

/// Resolves the actor from the request headers and stores it as an extension.
/// A missing display name falls back to the numeric id.
pub async fn actor_middleware(mut req: Request, next: Next) -> Result<Response, AppError> {
    let raw_id = req
        .headers()
        .get(ACTOR_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            warn!("Request without actor id: {} {}", req.method(), req.uri());
            AppError::unauthorized("Missing actor identity".into())
        })?;

    let id = raw_id
        .trim()
        .parse::<i64>()
        .map_err(|_| AppError::unauthorized(format!("Invalid actor id {:?}", raw_id)))?;

    let name = req
        .headers()
        .get(ACTOR_NAME_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| id.to_string());

    debug!("Actor {} ({})", id, name);
    req.extensions_mut().insert(Actor::new(id, name));
    Ok(next.run(req).await)
}
