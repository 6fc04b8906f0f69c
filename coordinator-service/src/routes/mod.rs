use axum::{
    extract::Request,
    middleware,
    routing::{get, patch, post, put},
    Router,
};
use brewcrew_shared::store::Store;
use log::{info, warn};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::auth::actor_middleware;
use crate::coordinator::Coordinator;
use crate::handlers::{
    action_handlers::handle_action,
    invite_handlers::create_invite,
    member_handlers::{
        adjust_desire, confirm_consumption, get_status, join, set_desire, set_drink,
    },
    settings_handlers::{adjust_threshold, get_settings, set_interval},
    stats_handlers::{get_all_time_stats, get_member_stats, get_stats, get_weekly_stats},
};

/// Creates a router around an already wired coordinator.
pub fn create_router_with_coordinator<S>(coordinator: Arc<Coordinator<S>>) -> Router
where
    S: Store,
{
    info!("Setting up API routes");

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Logging middleware to trace all requests
    async fn logging_middleware(
        req: Request,
        next: axum::middleware::Next,
    ) -> impl axum::response::IntoResponse {
        info!(
            "Router received request: method={}, uri={}",
            req.method(),
            req.uri()
        );
        next.run(req).await
    }

    let api_routes = Router::new()
        .route("/join", post(join))
        .route("/status", get(get_status))
        .route("/members/me/desire", put(set_desire).patch(adjust_desire))
        .route("/members/me/drink", put(set_drink))
        .route("/consumption", post(confirm_consumption))
        .route("/settings", get(get_settings))
        .route("/settings/threshold", patch(adjust_threshold))
        .route("/settings/interval", put(set_interval))
        .route("/invites", post(create_invite))
        .route("/stats", get(get_stats))
        .route("/stats/weekly", get(get_weekly_stats))
        .route("/stats/all-time", get(get_all_time_stats))
        .route("/stats/members", get(get_member_stats))
        .route("/actions", post(handle_action))
        .route_layer(middleware::from_fn(actor_middleware))
        .with_state(coordinator);

    let router = api_routes
        .layer(cors)
        .layer(middleware::from_fn(logging_middleware));

    // Add a fallback handler for 404s
    router.fallback(|req: Request| async move {
        warn!("No route matched for: {} {}", req.method(), req.uri());
        (
            axum::http::StatusCode::NOT_FOUND,
            "The requested resource was not found".to_string(),
        )
    })
}
