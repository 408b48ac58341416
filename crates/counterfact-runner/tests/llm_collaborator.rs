//! Drives [`LlmCollaborator`] against an in-process mock of the LLM APIs.

#![allow(clippy::unwrap_used)]

use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use chrono::NaiveDate;
use counterfact_core::collaborator::{
    Collaborator, ForkRequest, NarrationRequest, Resilient,
};
use counterfact_core::config::LlmConfig;
use counterfact_core::error::CollaboratorError;
use counterfact_core::fallback::DeterministicCollaborator;
use counterfact_runner::LlmCollaborator;
use counterfact_types::{EventSpec, NodeId, VoiceIntentKind};
use counterfact_world::WorldState;
use serde_json::{Value, json};

/// What the mock endpoint answers, and what it was sent.
#[derive(Clone)]
struct Mock {
    status: StatusCode,
    reply: String,
    requests: Arc<Mutex<Vec<(HeaderMap, Value)>>>,
}

impl Mock {
    fn new(status: StatusCode, reply: &str) -> Self {
        Self {
            status,
            reply: reply.to_owned(),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn last_request(&self) -> (HeaderMap, Value) {
        self.requests.lock().unwrap().last().cloned().unwrap()
    }
}

async fn chat_completions(
    State(mock): State<Mock>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    mock.requests.lock().unwrap().push((headers, body));
    (
        mock.status,
        Json(json!({"choices": [{"message": {"content": mock.reply}}]})),
    )
}

async fn messages(
    State(mock): State<Mock>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    mock.requests.lock().unwrap().push((headers, body));
    (
        mock.status,
        Json(json!({"content": [{"type": "text", "text": mock.reply}]})),
    )
}

/// Serve the mock on an ephemeral port and return a collaborator for it.
async fn collaborator(backend: &str, mock: &Mock) -> LlmCollaborator {
    let app = Router::new()
        .route("/v1/chat/completions", post(chat_completions))
        .route("/v1/messages", post(messages))
        .with_state(mock.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    LlmCollaborator::from_config(&LlmConfig {
        enabled: true,
        backend: backend.to_owned(),
        api_url: format!("http://{addr}/v1/"),
        model: String::from("test-model"),
        request_timeout_ms: 5000,
        templates_dir: None,
        api_key: Some(String::from("secret")),
    })
    .unwrap()
}

fn fork_request() -> ForkRequest {
    let scenario = counterfact_core::seed::builtin_scenario().unwrap();
    ForkRequest {
        world_state: WorldState::from(scenario.initial_state),
        description: String::from("Germany surrenders early"),
        upcoming_events: vec![EventSpec {
            title: String::from("Fall of France"),
            ..EventSpec::default()
        }],
        event_index: Some(0),
    }
}

fn narration_request() -> NarrationRequest {
    NarrationRequest {
        event_spec: EventSpec {
            title: String::from("Operation Sea Lion"),
            description: String::from("German troops land in Kent."),
            category: String::from("military"),
        },
        is_branch: true,
        timestamp: NaiveDate::from_ymd_opt(1940, 9, 15).unwrap(),
        world_state: WorldState::empty(),
    }
}

const PROPOSAL: &str = r#"```json
{
  "delta": {
    "eventSpec": {"title": "Berlin capitulates", "description": "d", "category": "political"},
    "entityChanges": [{"entityId": "germany", "field": "status", "newValue": "surrendered"}],
    "causalVarChanges": [{"varName": "escalation", "delta": -20}],
  },
  "continuationEvents": [
    {"eventSpec": {"title": "Occupation"}, "timestamp": "1940-02-01"},
    {"eventSpec": {"title": "Peace conference"}}
  ],
  "branchScores": {"plausibility": 30, "coherence": 70, "novelty": 85},
  "contentKey": "branch-9-9"
}
```"#;

#[tokio::test]
async fn fork_proposal_is_parsed_and_validated() {
    let mock = Mock::new(StatusCode::OK, PROPOSAL);
    let llm = collaborator("openai", &mock).await;

    let proposal = llm.execute_fork(&fork_request()).await.unwrap();
    assert_eq!(proposal.delta.event_spec.title, "Berlin capitulates");
    assert_eq!(proposal.continuation_events.len(), 2);
    assert_eq!(proposal.branch_scores.novelty, 85);
    assert!(proposal.content_key.is_none());

    let (headers, body) = mock.last_request();
    assert_eq!(
        headers.get("authorization").and_then(|v| v.to_str().ok()),
        Some("Bearer secret")
    );
    assert_eq!(body.get("model"), Some(&json!("test-model")));
    assert_eq!(
        body.pointer("/response_format/type"),
        Some(&json!("json_object"))
    );
    let user = body
        .pointer("/messages/1/content")
        .and_then(Value::as_str)
        .unwrap();
    assert!(user.contains("Germany surrenders early"));
    assert!(user.contains("Fall of France"));
    assert!(user.contains("\"escalation\": 45"));
}

#[tokio::test]
async fn wrong_continuation_count_is_malformed() {
    let reply = r#"{
        "delta": {"eventSpec": {"title": "Short"}},
        "continuationEvents": [{"eventSpec": {"title": "Only one"}}],
        "branchScores": {"plausibility": 50, "coherence": 50, "novelty": 50}
    }"#;
    let mock = Mock::new(StatusCode::OK, reply);
    let llm = collaborator("openai", &mock).await;

    assert!(matches!(
        llm.execute_fork(&fork_request()).await,
        Err(CollaboratorError::Malformed(_))
    ));
}

#[tokio::test]
async fn http_failure_is_a_backend_error() {
    let mock = Mock::new(StatusCode::INTERNAL_SERVER_ERROR, "overloaded");
    let llm = collaborator("openai", &mock).await;

    assert!(matches!(
        llm.generate_narration(&narration_request()).await,
        Err(CollaboratorError::Backend(_))
    ));
}

#[tokio::test]
async fn failing_backend_falls_back_to_deterministic() {
    let mock = Mock::new(StatusCode::OK, "I would rather not say.");
    let llm = collaborator("openai", &mock).await;
    let resilient = Resilient::new(Some(llm), DeterministicCollaborator::builtin().unwrap());

    let assisted = resilient.execute_fork(&fork_request()).await.unwrap();
    assert!(assisted.fallback_used);
    let germany = assisted
        .value
        .delta
        .changes
        .entity_changes
        .iter()
        .find(|c| c.entity_id == "germany")
        .unwrap();
    assert_eq!(germany.new_value, json!("surrendered"));
}

#[tokio::test]
async fn narration_is_plain_text() {
    let mock = Mock::new(StatusCode::OK, "\"The barges come ashore at dawn.\"\n");
    let llm = collaborator("openai", &mock).await;

    let text = llm.generate_narration(&narration_request()).await.unwrap();
    assert_eq!(text, "The barges come ashore at dawn.");

    let (_, body) = mock.last_request();
    assert!(body.get("response_format").is_none());
    assert_eq!(body.get("max_tokens"), Some(&json!(300)));
    let user = body
        .pointer("/messages/1/content")
        .and_then(Value::as_str)
        .unwrap();
    assert!(user.contains("15 September 1940"));
}

#[tokio::test]
async fn voice_command_through_anthropic() {
    let mock = Mock::new(
        StatusCode::OK,
        r#"{"intent": "navigate", "description": "D-Day", "targetNodeId": "main-6"}"#,
    );
    let llm = collaborator("claude", &mock).await;
    assert_eq!(llm.name(), "anthropic");

    let intent = llm.parse_voice_command("jump to D-Day").await.unwrap();
    assert_eq!(intent.intent, VoiceIntentKind::Navigate);
    assert_eq!(intent.target_node_id, Some(NodeId::new("main-6")));

    let (headers, body) = mock.last_request();
    assert_eq!(
        headers.get("x-api-key").and_then(|v| v.to_str().ok()),
        Some("secret")
    );
    assert!(body.get("system").and_then(Value::as_str).is_some());
    assert_eq!(
        body.pointer("/messages/0/content")
            .and_then(Value::as_str)
            .map(|s| s.contains("jump to D-Day")),
        Some(true)
    );
}

#[tokio::test]
async fn scenario_without_events_falls_back_to_builtin() {
    let mock = Mock::new(StatusCode::OK, r#"{"title": "Nothing", "events": []}"#);
    let llm = collaborator("openai", &mock).await;
    assert!(matches!(
        llm.generate_scenario("The Cuban missile crisis").await,
        Err(CollaboratorError::Malformed(_))
    ));

    let resilient = Resilient::new(Some(llm), DeterministicCollaborator::builtin().unwrap());
    let assisted = resilient
        .generate_scenario("The Cuban missile crisis")
        .await
        .unwrap();
    assert!(assisted.fallback_used);
    assert!(!assisted.value.events.is_empty());
}
