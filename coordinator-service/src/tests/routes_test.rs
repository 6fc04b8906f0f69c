use axum::{http::StatusCode, Router};
use brewcrew_shared::models::{Drink, EventKind};
use brewcrew_shared::store::{EventStore, MemberStore};
use brewcrew_shared::test_utils::http_test_utils::{
    create_anonymous_request, create_test_request, response_to_json,
};
use chrono::Duration as ChronoDuration;
use serde_json::json;
use std::sync::Arc;
use tower::ServiceExt;

use super::TestEnv;
use crate::routes::create_router_with_coordinator;

async fn create_test_app() -> (Router, TestEnv) {
    let env = TestEnv::new().await;
    let app = create_router_with_coordinator(Arc::new(env.coordinator()));
    (app, env)
}

#[tokio::test]
async fn test_missing_actor_is_unauthorized() {
    let (app, _env) = create_test_app().await;

    let response = app
        .oneshot(create_anonymous_request("GET", "/status"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = response_to_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("actor"));
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let (app, _env) = create_test_app().await;

    let response = app
        .oneshot(create_anonymous_request("GET", "/nope"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_non_member_is_forbidden() {
    let (app, _env) = create_test_app().await;

    let response = app
        .oneshot(create_test_request(
            "PUT",
            "/members/me/desire",
            42,
            "Stranger",
            Some(json!({ "level": 8 })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_join_flow() {
    let (app, env) = create_test_app().await;
    env.coordinator()
        .ensure_bootstrap_invite("START")
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(create_test_request(
            "POST",
            "/join",
            1,
            "Ann",
            Some(json!({ "inviteCode": "START" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_to_json(response).await;
    assert_eq!(body["status"], "joined");
    assert_eq!(body["member"]["displayName"], "Ann");
    assert_eq!(body["member"]["drink"], "coffee");

    let response = app
        .clone()
        .oneshot(create_test_request(
            "POST",
            "/join",
            2,
            "Bob",
            Some(json!({ "inviteCode": "START" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .oneshot(create_test_request("POST", "/join", 1, "Ann", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response_to_json(response).await["status"], "returning");
}

#[tokio::test]
async fn test_set_desire_and_status() {
    let (app, env) = create_test_app().await;
    env.add_member(1, "Ann").await;
    env.add_member(2, "Bob").await;

    let response = app
        .clone()
        .oneshot(create_test_request(
            "PUT",
            "/members/me/desire",
            1,
            "Ann",
            Some(json!({ "level": 8 })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_to_json(response).await;
    assert_eq!(body["member"]["desire"], 8);
    assert_eq!(body["peers"]["outcome"], "sent");
    assert_eq!(body["readiness"]["outcome"], "not_ready");

    let response = app
        .oneshot(create_test_request("GET", "/status", 2, "Bob", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_to_json(response).await;
    assert_eq!(body["threshold"], 7);
    assert_eq!(body["fullyReady"], false);
    assert_eq!(body["members"][0]["ready"], true);
    assert_eq!(body["members"][1]["ready"], false);
}

#[tokio::test]
async fn test_invalid_level_is_bad_request() {
    let (app, env) = create_test_app().await;
    env.add_member(1, "Ann").await;

    let response = app
        .oneshot(create_test_request(
            "PUT",
            "/members/me/desire",
            1,
            "Ann",
            Some(json!({ "level": 12 })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_store_outage_is_a_generic_failure() {
    let (app, env) = create_test_app().await;
    env.add_member(1, "Ann").await;
    env.store.set_outage(true);

    let response = app
        .oneshot(create_test_request("GET", "/status", 1, "Ann", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = response_to_json(response).await;
    assert!(!body["error"].as_str().unwrap().contains("offline"));
}

#[tokio::test]
async fn test_settings_routes() {
    let (app, env) = create_test_app().await;
    env.add_member(1, "Ann").await;

    let response = app
        .clone()
        .oneshot(create_test_request(
            "PATCH",
            "/settings/threshold",
            1,
            "Ann",
            Some(json!({ "delta": -2 })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response_to_json(response).await["threshold"], 5);

    let response = app
        .clone()
        .oneshot(create_test_request(
            "PUT",
            "/settings/interval",
            1,
            "Ann",
            Some(json!({ "seconds": 0 })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(create_test_request("GET", "/settings", 1, "Ann", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_to_json(response).await;
    assert_eq!(body["threshold"], 5);
    assert_eq!(body["promptIntervalSecs"], 3600);
    assert_eq!(body["quietHours"]["start"], 0);
    assert_eq!(body["quietHours"]["end"], 8);
}

#[tokio::test]
async fn test_create_invite_route() {
    let (app, env) = create_test_app().await;
    env.add_member(1, "Ann").await;

    let response = app
        .oneshot(create_test_request("POST", "/invites", 1, "Ann", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_to_json(response).await;
    assert_eq!(body["code"].as_str().unwrap().len(), 8);
    assert_eq!(body["createdBy"], 1);
    assert_eq!(body["active"], true);
}

#[tokio::test]
async fn test_consumption_route_resets_levels() {
    let (app, env) = create_test_app().await;
    env.add_member(1, "Ann").await;
    env.add_member(2, "Bob").await;
    env.set_state(1, 9, Drink::Espresso).await;
    env.set_state(2, 9, Drink::Milk).await;

    let response = app
        .oneshot(create_test_request("POST", "/consumption", 2, "Bob", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_to_json(response).await;
    assert_eq!(body["drink"], "milk");
    assert_eq!(body["broadcast"]["delivered"], 2);
    for member in env.store.list_members().await.unwrap() {
        assert_eq!(member.desire.value(), 0);
    }
}

#[tokio::test]
async fn test_stats_routes() {
    let (app, env) = create_test_app().await;
    let ann = env.add_member(1, "Ann").await;
    let coordinator = env.coordinator();

    let start = chrono::Utc::now() - ChronoDuration::days(2);
    env.clock.set_now(start);
    coordinator.confirm(&ann).await.unwrap();
    env.clock.set_now(start + ChronoDuration::hours(3));
    coordinator.set_level(&ann, 9).await.unwrap();
    coordinator.confirm(&ann).await.unwrap();
    env.clock.set_now(start + ChronoDuration::days(1));

    let response = app
        .clone()
        .oneshot(create_test_request("GET", "/stats/weekly", 1, "Ann", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_to_json(response).await;
    assert_eq!(body["stats"]["count"], 2);
    assert_eq!(body["stats"]["shortestGap"], 3 * 3600);
    assert!(body["text"].as_str().unwrap().contains("3h 0m"));

    let response = app
        .clone()
        .oneshot(create_test_request("GET", "/stats", 1, "Ann", None))
        .await
        .unwrap();
    let body = response_to_json(response).await;
    assert_eq!(body["allTime"]["count"], 2);

    let response = app
        .oneshot(create_test_request(
            "GET",
            "/stats/members?days=7",
            1,
            "Ann",
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_to_json(response).await;
    assert_eq!(body["members"][0]["user_id"], 1);
    assert_eq!(body["members"][0]["want_count"], 1);
    assert_eq!(body["members"][0]["consumed_total"], 2);
    assert_eq!(body["members"][0]["consumed_by_drink"]["coffee"], 2);
}

#[tokio::test]
async fn test_member_stats_window_is_bounded() {
    let (app, env) = create_test_app().await;
    env.add_member(1, "Ann").await;

    for days in ["0", "36501", "9223372036854775807"] {
        let response = app
            .clone()
            .oneshot(create_test_request(
                "GET",
                &format!("/stats/members?days={}", days),
                1,
                "Ann",
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "days={}", days);
    }

    let response = app
        .oneshot(create_test_request(
            "GET",
            "/stats/members?days=36500",
            1,
            "Ann",
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_settings_action_offers_settings_keyboard() {
    let (app, env) = create_test_app().await;
    env.add_member(1, "Ann").await;

    let response = app
        .oneshot(create_test_request(
            "POST",
            "/actions",
            1,
            "Ann",
            Some(json!({ "command": "settings" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_to_json(response).await;
    let commands: Vec<String> = body["reply"]["actions"]
        .as_array()
        .unwrap()
        .iter()
        .flat_map(|row| row.as_array().unwrap().iter())
        .map(|button| button["command"].as_str().unwrap().to_string())
        .collect();
    assert!(commands.contains(&"set_interval:1800".to_string()));
    assert!(commands.contains(&"set_threshold:+1".to_string()));
    assert!(commands.contains(&"back_to_menu".to_string()));
}

#[tokio::test]
async fn test_action_dispatch() {
    let (app, env) = create_test_app().await;
    env.add_member(1, "Ann").await;

    let response = app
        .clone()
        .oneshot(create_test_request(
            "POST",
            "/actions",
            1,
            "Ann",
            Some(json!({ "command": "drink:latte" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_to_json(response).await;
    assert_eq!(body["reply"]["text"], "You picked: Coffee with milk");

    let response = app
        .clone()
        .oneshot(create_test_request(
            "POST",
            "/actions",
            1,
            "Ann",
            Some(json!({ "command": "adjust:+1" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(env.level_of(1).await, 1);

    let response = app
        .oneshot(create_test_request(
            "POST",
            "/actions",
            1,
            "Ann",
            Some(json!({ "command": "teleport" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let events = env.store.events_since(None).await.unwrap();
    let kinds: Vec<_> = events.iter().map(|e| e.kind).collect();
    assert_eq!(kinds, vec![EventKind::DrinkSet, EventKind::DesireSet]);
}
