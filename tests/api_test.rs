// tests/api_test.rs

mod common;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use tend::policy::PolicyReply;
use tend::proposal::DraftOperation;
use tend::server;
use tend::state::AppState;

async fn scripted_router(replies: Vec<PolicyReply>) -> Router {
    let store = Arc::new(common::memory_store().await);
    let policy = Arc::new(common::ScriptedPolicy::new(replies));
    let sink = Arc::new(common::CapturingSink::new());
    server::router(AppState::new(store, policy, sink))
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn chat_returns_a_tagged_proposal_reply() {
    let drafts: Vec<DraftOperation> = serde_json::from_value(json!([
        { "operation": "create", "type": "task", "data": { "title": "Buy milk" } }
    ]))
    .unwrap();
    let app = scripted_router(vec![PolicyReply::Propose {
        summary: "scripted".into(),
        drafts,
    }])
    .await;

    let response = app
        .oneshot(post_json(
            "/chat",
            json!({ "user_id": "u1", "message": "add buy milk" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let reply = body_json(response).await;
    assert_eq!(reply["kind"], "proposal");
    assert_eq!(reply["summary"], "I'll create 1 task.");
    assert_eq!(reply["operations"][0]["type"], "task");
    assert!(reply["proposal_id"].as_str().is_some());
}

#[tokio::test]
async fn chat_maps_scope_violations_to_403() {
    let drafts: Vec<DraftOperation> = serde_json::from_value(json!([
        { "operation": "create", "type": "note", "data": { "title": "Nope", "content": "" } }
    ]))
    .unwrap();
    let app = scripted_router(vec![PolicyReply::Propose {
        summary: "scripted".into(),
        drafts,
    }])
    .await;

    let response = app
        .oneshot(post_json(
            "/chat",
            json!({ "user_id": "u1", "message": "note this", "scope": "tasks" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let reply = body_json(response).await;
    assert!(reply["error"]
        .as_str()
        .unwrap()
        .contains("not allowed in tasks scope"));
}

#[tokio::test]
async fn chat_maps_validation_failures_to_422() {
    let drafts: Vec<DraftOperation> = serde_json::from_value(json!([
        { "operation": "create", "type": "task", "data": { "title": "x".repeat(51) } }
    ]))
    .unwrap();
    let app = scripted_router(vec![PolicyReply::Propose {
        summary: "scripted".into(),
        drafts,
    }])
    .await;

    let response = app
        .oneshot(post_json(
            "/chat",
            json!({ "user_id": "u1", "message": "add it" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn unknown_proposals_are_404() {
    let app = scripted_router(vec![]).await;

    let response = app
        .clone()
        .oneshot(post_json("/proposals/nope/confirm", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .oneshot(post_json("/proposals/nope/toggle", json!({ "index": 0 })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cancel_returns_no_content() {
    let drafts: Vec<DraftOperation> = serde_json::from_value(json!([
        { "operation": "create", "type": "task", "data": { "title": "Buy milk" } }
    ]))
    .unwrap();
    let app = scripted_router(vec![PolicyReply::Propose {
        summary: "scripted".into(),
        drafts,
    }])
    .await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/chat",
            json!({ "user_id": "u1", "message": "add buy milk" }),
        ))
        .await
        .unwrap();
    let proposal_id = body_json(response).await["proposal_id"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app
        .oneshot(post_json(
            &format!("/proposals/{}/cancel", proposal_id),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn full_review_cycle_over_http() {
    let drafts: Vec<DraftOperation> = serde_json::from_value(json!([
        { "operation": "create", "type": "task", "data": { "title": "First" } },
        { "operation": "create", "type": "task", "data": { "title": "Second" } }
    ]))
    .unwrap();
    let app = scripted_router(vec![PolicyReply::Propose {
        summary: "scripted".into(),
        drafts,
    }])
    .await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/chat",
            json!({ "user_id": "u1", "message": "add both" }),
        ))
        .await
        .unwrap();
    let reply = body_json(response).await;
    let proposal_id = reply["proposal_id"].as_str().unwrap().to_string();

    // Deselect the first operation.
    let response = app
        .clone()
        .oneshot(post_json(
            &format!("/proposals/{}/toggle", proposal_id),
            json!({ "index": 0 }),
        ))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["selected"], json!([1]));

    // Edit the surviving one.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri(format!("/proposals/{}/operations/1", proposal_id))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json!({ "title": "Second, revised" }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await["data"]["title"],
        "Second, revised"
    );

    let response = app
        .oneshot(post_json(
            &format!("/proposals/{}/confirm", proposal_id),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let report = body_json(response).await;
    assert_eq!(report["success_count"], 1);
    assert_eq!(report["error_count"], 0);
    assert_eq!(report["lines"][0], "Created task \"Second, revised\"");
}
