//! Integration tests for the HTTP API
//!
//! Tests endpoints against a router sharing one app state

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use codex_runtime::core::create_router;
use codex_runtime::types::CodexDocument;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn create_test_router() -> Router {
    create_router(Arc::new(CodexDocument::builtin().unwrap()))
}

async fn body_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

async fn post_json(app: &Router, uri: &str, body: Value) -> axum::response::Response {
    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
}

async fn get(app: &Router, uri: &str) -> axum::response::Response {
    app.clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn new_session(app: &Router, body: Value) -> String {
    let response = post_json(app, "/session/new", body).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    json["session_id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_test_router();
    let response = get(&app, "/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["codex_version"], "2.1.0");
    assert_eq!(json["codex_valid"], true);
    assert_eq!(json["codex_fingerprint"].as_str().unwrap().len(), 64);
    assert_eq!(json["sessions_active"], 0);
}

#[tokio::test]
async fn test_codex_validate_endpoint() {
    let app = create_test_router();
    let response = get(&app, "/codex/validate").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["ok"], true);
    assert_eq!(json["errors"], json!([]));
}

#[tokio::test]
async fn test_create_session_with_overrides() {
    let app = create_test_router();
    let response = post_json(&app, "/session/new", json!({"overrides": {"stakes": "high"}})).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert!(json["session_id"].is_string());
    assert!(json["websocket_url"].as_str().unwrap().starts_with("/ws/"));
    assert_eq!(json["handshake"]["stakes"], "high");
    assert_eq!(json["handshake"]["min_confidence"], 0.75);
    assert_eq!(json["handshake"]["codex_version"], "2.1.0");

    let health = body_json(get(&app, "/health").await).await;
    assert_eq!(health["sessions_active"], 1);
}

#[tokio::test]
async fn test_out_of_range_override_is_ignored() {
    let app = create_test_router();
    let response =
        post_json(&app, "/session/new", json!({"overrides": {"min_confidence": 1.5}})).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["handshake"]["min_confidence"], 0.70);
    let id = json["session_id"].as_str().unwrap().to_string();

    let evaluated =
        body_json(post_json(&app, &format!("/session/{}/evaluate", id), json!({"confidence": 0.9})).await)
            .await;
    assert_eq!(evaluated["meets_confidence"], true);
}

#[tokio::test]
async fn test_delete_session() {
    let app = create_test_router();
    let id = new_session(&app, json!({})).await;
    let uri = format!("/session/{}", id);

    let delete = |app: &Router| {
        app.clone()
            .oneshot(Request::builder().method("DELETE").uri(&uri).body(Body::empty()).unwrap())
    };
    assert_eq!(delete(&app).await.unwrap().status(), StatusCode::NO_CONTENT);
    assert_eq!(get(&app, &uri).await.status(), StatusCode::NOT_FOUND);
    assert_eq!(delete(&app).await.unwrap().status(), StatusCode::NOT_FOUND);

    let health = body_json(get(&app, "/health").await).await;
    assert_eq!(health["sessions_active"], 0);
}

#[tokio::test]
async fn test_session_not_found() {
    let app = create_test_router();
    assert_eq!(get(&app, "/session/nonexistent").await.status(), StatusCode::NOT_FOUND);

    let response = post_json(&app, "/session/nonexistent/evaluate", json!({"confidence": 0.5})).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_handshake_update_reports_ignored() {
    let app = create_test_router();
    let id = new_session(&app, json!({})).await;

    let response = post_json(
        &app,
        &format!("/session/{}/handshake", id),
        json!({"mode": "direct", "cite_policy": "sometimes"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["normalized"]["mode"], "direct");
    assert_eq!(json["normalized"]["cite_policy"], "auto");
    assert_eq!(json["ignored"][0]["field"], "cite_policy");
    assert_eq!(json["ignored"][0]["value"], "sometimes");

    let current = body_json(get(&app, &format!("/session/{}", id)).await).await;
    assert_eq!(current["mode"], "direct");
}

#[tokio::test]
async fn test_evaluate_full_decision() {
    let app = create_test_router();
    let id = new_session(&app, json!({"overrides": {"stakes": "high"}})).await;

    let response = post_json(
        &app,
        &format!("/session/{}/evaluate", id),
        json!({
            "confidence": 0.33,
            "scores": {"hallucination": 0.81, "fallacy": 0.2},
            "turns_since_recap": 12,
            "user_text": "is this true?"
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["cite"], true);
    assert_eq!(json["anchor_required"], true);
    assert_eq!(json["omission_scan"], true);
    assert_eq!(json["meets_confidence"], false);
    assert_eq!(json["blocked"], true);
    assert_eq!(json["reflexes"]["outcomes"][0]["reflex"], "hallucination");
    assert_eq!(json["reflexes"]["outcomes"][0]["block"], true);
    assert_eq!(json["decay"]["expired"], true);
    assert_eq!(json["decay"]["fallback_mode"], "recap");
    assert_eq!(json["outcome"], "hedge");
    assert_eq!(json["failure"]["action"], "answer_with_qualifiers");
}

#[tokio::test]
async fn test_evaluate_ambiguous_asks_to_clarify() {
    let app = create_test_router();
    let id = new_session(&app, json!({})).await;

    let response = post_json(
        &app,
        &format!("/session/{}/evaluate", id),
        json!({"confidence": 0.95, "ambiguous": true}),
    )
    .await;
    let json = body_json(response).await;
    assert_eq!(json["outcome"], "ok");
    assert_eq!(json["failure"]["action"], "request_clarification");
    assert_eq!(json["decay"]["expired"], false);
    assert!(json["decay"].get("fallback_mode").is_none());
}
