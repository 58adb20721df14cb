// ABOUTME: Shared fixtures for bridge integration tests: a stub A2A agent served over axum SSE.
// ABOUTME: Also writes tool schema documents pointing at the stub.

use std::convert::Infallible;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use agentpack_bridge::BridgeSettings;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::response::sse::{Event as SseEvent, Sse};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::stream;
use serde_json::{Value, json};

/// One SSE frame sent by the stub agent.
#[derive(Debug, Clone)]
pub enum Frame {
    /// Wrapped in a JSON-RPC response.
    Result(Value),
    /// Sent as the data field verbatim.
    Raw(String),
}

#[derive(Clone)]
struct AgentState {
    base_url: String,
    frames: Arc<Vec<Frame>>,
    requests: Arc<Mutex<Vec<Value>>>,
}

pub struct StubAgent {
    pub base_url: String,
    requests: Arc<Mutex<Vec<Value>>>,
}

impl StubAgent {
    pub fn requests(&self) -> Vec<Value> {
        self.requests.lock().unwrap().clone()
    }
}

async fn agent_card(State(state): State<AgentState>) -> Json<Value> {
    Json(json!({
        "name": "stub agent",
        "url": format!("{}/rpc", state.base_url),
        "version": "1.0.0",
        "capabilities": {"streaming": true}
    }))
}

async fn rpc(State(state): State<AgentState>, Json(body): Json<Value>) -> impl IntoResponse {
    state.requests.lock().unwrap().push(body.clone());
    let frames: Vec<Result<SseEvent, Infallible>> = state
        .frames
        .iter()
        .map(|frame| {
            let data = match frame {
                Frame::Result(result) => {
                    json!({"jsonrpc": "2.0", "id": body["id"], "result": result}).to_string()
                }
                Frame::Raw(raw) => raw.clone(),
            };
            Ok(SseEvent::default().data(data))
        })
        .collect();
    Sse::new(stream::iter(frames))
}

/// Serve an agent that answers every message/stream call with `results`.
pub async fn spawn_agent(results: Vec<Value>) -> StubAgent {
    spawn_agent_frames(results.into_iter().map(Frame::Result).collect()).await
}

/// Serve an agent that answers every message/stream call with `frames`.
pub async fn spawn_agent_frames(frames: Vec<Frame>) -> StubAgent {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    let requests = Arc::new(Mutex::new(Vec::new()));

    let state = AgentState {
        base_url: base_url.clone(),
        frames: Arc::new(frames),
        requests: Arc::clone(&requests),
    };
    let app = Router::new()
        .route("/.well-known/agent.json", get(agent_card))
        .route("/rpc", post(rpc))
        .with_state(state);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    StubAgent { base_url, requests }
}

pub fn status(state: &str) -> Value {
    json!({
        "kind": "status-update",
        "taskId": "t-1",
        "contextId": "c-1",
        "status": {"state": state},
        "final": false
    })
}

pub fn agent_message(text: &str) -> Value {
    json!({
        "kind": "message",
        "role": "agent",
        "messageId": "m-1",
        "parts": [{"kind": "text", "text": text}]
    })
}

/// Write an API-key tool `agent0` and a flow tool `agent1` that both call `endpoint`.
pub fn write_tools(root: &Path, endpoint: &str) -> BridgeSettings {
    let tools = root.join("tools");
    fs::create_dir_all(&tools).unwrap();
    fs::write(
        tools.join("agent0.yaml"),
        format!(
            r#"identity:
  name: agent0
parameters:
  - name: query
    required: true
    type: string
out_parameters: []
api_key: k-1
endpoint: {}
"#,
            endpoint
        ),
    )
    .unwrap();
    fs::write(
        tools.join("agent1.yaml"),
        format!(
            r#"identity:
  name: agent1
parameters: null
out_parameters:
  - name: result_a
    required: true
    type: string
flow_id: flow-7
endpoint: {}
"#,
            endpoint
        ),
    )
    .unwrap();

    BridgeSettings {
        tool_root: root.to_path_buf(),
        ..BridgeSettings::default()
    }
}
