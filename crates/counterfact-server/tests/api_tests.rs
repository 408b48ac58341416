//! Integration tests for the session API endpoints.
//!
//! Tests use Axum's `Router` directly via `tower::ServiceExt` without
//! starting a TCP server. The state runs on the deterministic collaborator
//! and the built-in scenario.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use counterfact_core::content::ContentCache;
use counterfact_core::fallback::DeterministicCollaborator;
use counterfact_server::router::build_router;
use counterfact_server::state::AppState;
use serde_json::{Value, json};
use tower::ServiceExt;

fn make_state() -> Arc<AppState> {
    Arc::new(AppState::deterministic(
        DeterministicCollaborator::builtin().unwrap(),
        ContentCache::new(),
    ))
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn get(router: &Router, uri: &str) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    (status, body_to_json(response.into_body()).await)
}

async fn post(router: &Router, uri: &str, body: &str) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(
            Request::post(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_owned()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    (status, body_to_json(response.into_body()).await)
}

/// Create a session on the built-in scenario and return its id.
async fn create_session(router: &Router) -> String {
    let (status, json) = post(router, "/api/sessions", "").await;
    assert_eq!(status, StatusCode::CREATED);
    json.get("sessionId")
        .and_then(Value::as_str)
        .unwrap()
        .to_owned()
}

async fn fork(router: &Router, session: &str, parent: &str, description: &str) -> (StatusCode, Value) {
    let body = json!({"parentNodeId": parent, "description": description}).to_string();
    post(router, &format!("/api/sessions/{session}/fork"), &body).await
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn health_reports_deterministic_mode() {
    let router = build_router(make_state());
    let (status, json) = get(&router, "/api/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.get("status"), Some(&json!("ok")));
    assert_eq!(json.get("collaborator"), Some(&json!("deterministic")));
    assert_eq!(json.get("llmConfigured"), Some(&json!(false)));
    assert_eq!(json.get("sessions"), Some(&json!(0)));
}

#[tokio::test]
async fn create_session_returns_mainline() {
    let state = make_state();
    let router = build_router(Arc::clone(&state));
    let (status, json) = post(&router, "/api/sessions", "").await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json.get("title"), Some(&json!("The Second World War")));
    assert_eq!(json.get("fallbackUsed"), Some(&json!(false)));
    let mainline = json.get("mainline").and_then(Value::as_array).unwrap();
    assert_eq!(mainline.len(), 8);
    assert_eq!(mainline.first().and_then(|n| n.get("id")), Some(&json!("main-0")));
    assert_eq!(state.store.len().await, 1);
}

#[tokio::test]
async fn create_session_for_topic_uses_collaborator() {
    let router = build_router(make_state());
    let (status, json) = post(&router, "/api/sessions", r#"{"topic": "  The Pacific War  "}"#).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json.get("title"), Some(&json!("The Pacific War")));
    assert_eq!(json.get("fallbackUsed"), Some(&json!(true)));
}

#[tokio::test]
async fn create_session_rejects_malformed_body() {
    let router = build_router(make_state());
    let (status, json) = post(&router, "/api/sessions", "{not json").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json.get("status"), Some(&json!(400)));
}

#[tokio::test]
async fn unknown_and_invalid_sessions() {
    let router = build_router(make_state());

    let (status, json) = get(
        &router,
        "/api/sessions/01890a5d-ac96-774b-bcce-b302099a8057/branches",
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json.get("status"), Some(&json!(404)));

    let (status, _) = get(&router, "/api/sessions/not-a-uuid/branches").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn timeline_of_unknown_branch_is_not_found() {
    let router = build_router(make_state());
    let session = create_session(&router).await;

    let (status, json) = get(&router, &format!("/api/sessions/{session}/timeline/branch-nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(
        json.get("error")
            .and_then(Value::as_str)
            .is_some_and(|e| e.contains("branch-nope"))
    );

    let (status, json) = get(&router, &format!("/api/sessions/{session}/timeline/main")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.get("timeline").and_then(Value::as_array).map(Vec::len), Some(8));
}

#[tokio::test]
async fn node_and_render_pack_lookup() {
    let router = build_router(make_state());
    let session = create_session(&router).await;

    let (status, json) = get(&router, &format!("/api/sessions/{session}/nodes/main-1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.pointer("/node/id"), Some(&json!("main-1")));
    assert_eq!(json.pointer("/node/parentId"), Some(&json!("main-0")));
    assert!(json.pointer("/node/worldState/causalVars").is_some());
    assert_eq!(json.pointer("/renderPack/contentKey"), Some(&json!("main-1")));

    let (status, json) = get(&router, &format!("/api/sessions/{session}/render-packs/main-1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.get("eventNodeId"), Some(&json!("main-1")));

    let (status, _) = get(&router, &format!("/api/sessions/{session}/nodes/main-99")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = get(&router, &format!("/api/sessions/{session}/render-packs/main-99")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn fork_creates_branch_and_broadcasts() {
    let state = make_state();
    let mut rx = state.subscribe();
    let router = build_router(Arc::clone(&state));
    let session = create_session(&router).await;

    let (status, json) = fork(&router, &session, "main-2", "Germany surrenders early").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json.get("fallbackUsed"), Some(&json!(true)));
    let branch = json.get("branchId").and_then(Value::as_str).unwrap().to_owned();
    let fork_node = json.pointer("/forkNode/id").and_then(Value::as_str).unwrap().to_owned();
    assert_eq!(json.pointer("/forkNode/parentId"), Some(&json!("main-2")));
    assert_eq!(json.get("rippleNodes").and_then(Value::as_array).map(Vec::len), Some(2));
    assert_eq!(json.get("renderPacks").and_then(Value::as_array).map(Vec::len), Some(3));

    let notice = rx.try_recv().unwrap();
    assert_eq!(notice.branch_id.as_str(), branch);
    assert_eq!(notice.fork_node_id.as_str(), fork_node);
    assert_eq!(notice.parent_id.as_str(), "main-2");
    assert_eq!(notice.ripple_count, 2);

    // Branch list: main plus the new branch.
    let (_, json) = get(&router, &format!("/api/sessions/{session}/branches")).await;
    assert_eq!(json.get("branches").and_then(Value::as_array).map(Vec::len), Some(2));

    // Timeline: shared prefix main-0..main-2, then the fork and two ripples.
    let (status, json) = get(&router, &format!("/api/sessions/{session}/timeline/{branch}")).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = json
        .get("timeline")
        .and_then(Value::as_array)
        .unwrap()
        .iter()
        .filter_map(|n| n.get("id").and_then(Value::as_str))
        .collect();
    assert_eq!(ids.len(), 6);
    assert_eq!(ids.get(..3), Some(&["main-0", "main-1", "main-2"][..]));
    assert_eq!(ids.get(3).copied(), Some(fork_node.as_str()));

    // The mainline is untouched.
    let (_, json) = get(&router, &format!("/api/sessions/{session}/timeline/main")).await;
    assert_eq!(json.get("timeline").and_then(Value::as_array).map(Vec::len), Some(8));

    // Forks at the parent.
    let (status, json) = get(&router, &format!("/api/sessions/{session}/nodes/main-2/forks")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.pointer("/forks/0/id"), Some(&json!(branch)));
    assert_eq!(json.pointer("/forks/0/forkPointId"), Some(&json!("main-2")));

    // Diff from the parent to the fork node.
    let (status, json) = get(
        &router,
        &format!("/api/sessions/{session}/nodes/main-2/diff/{fork_node}"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(
        json.get("changes")
            .and_then(Value::as_array)
            .is_some_and(|c| !c.is_empty())
    );

    // The fork node has a render pack.
    let (status, _) = get(&router, &format!("/api/sessions/{session}/render-packs/{fork_node}")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn fork_validation_errors() {
    let router = build_router(make_state());
    let session = create_session(&router).await;

    let (status, json) = fork(&router, &session, "main-2", "   ").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json.get("status"), Some(&json!(400)));

    let (status, _) = post(
        &router,
        &format!("/api/sessions/{session}/fork"),
        r#"{"description": "no parent"}"#,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = fork(&router, &session, "main-99", "Germany surrenders").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, json) = get(&router, &format!("/api/sessions/{session}/branches")).await;
    assert_eq!(json.get("branches").and_then(Value::as_array).map(Vec::len), Some(1));
}

#[tokio::test]
async fn forks_at_unknown_node_and_bad_diff() {
    let router = build_router(make_state());
    let session = create_session(&router).await;

    let (status, _) = get(&router, &format!("/api/sessions/{session}/nodes/main-99/forks")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, json) = get(&router, &format!("/api/sessions/{session}/nodes/main-2/forks")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.get("forks"), Some(&json!([])));

    let (status, _) = get(
        &router,
        &format!("/api/sessions/{session}/nodes/main-0/diff/main-99"),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn voice_command_is_interpreted() {
    let router = build_router(make_state());
    let session = create_session(&router).await;
    let uri = format!("/api/sessions/{session}/voice");

    let (status, json) = post(&router, &uri, r#"{"transcript": "What if Paris held out?"}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.get("intent"), Some(&json!("fork")));
    assert_eq!(json.get("fallbackUsed"), Some(&json!(true)));

    let (status, json) = post(&router, &uri, r#"{"transcript": "go to main-3"}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.get("intent"), Some(&json!("navigate")));
    assert_eq!(json.get("targetNodeId"), Some(&json!("main-3")));

    let (status, _) = post(&router, &uri, r#"{"transcript": " "}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
