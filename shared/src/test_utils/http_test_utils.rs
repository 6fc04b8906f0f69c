use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use http_body_util::BodyExt;

use crate::models::MemberId;

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_NAME_HEADER: &str = "x-actor-name";

/// Builds a request carrying the actor headers the service expects.
pub fn create_test_request(
    method: &str,
    uri: &str,
    actor_id: MemberId,
    actor_name: &str,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(ACTOR_ID_HEADER, actor_id.to_string())
        .header(ACTOR_NAME_HEADER, actor_name);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string())),
        None => builder.body(Body::empty()),
    };
    request.expect("failed to build test request")
}

/// Same as [`create_test_request`] but without any actor identity.
pub fn create_anonymous_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("failed to build test request")
}

/// Collects a response body and parses it as JSON.
pub async fn response_to_json(response: Response) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("failed to read response body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("response body is not JSON")
}
