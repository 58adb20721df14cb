// ABOUTME: Bridge drives one tool call from configuration lookup to the final result.
// ABOUTME: The returned stream is lazy: nothing is resolved, spawned or sent until it is first polled.

use std::collections::VecDeque;
use std::mem;
use std::sync::Arc;

use futures::StreamExt;
use futures::stream;

use crate::config::load_tool_config;
use crate::message::{DiagnosticKind, Tool, ToolMessage, ToolMessageStream, ToolParameters};
use crate::payload::{Session, build_request};
use crate::relay::EventRelay;
use crate::settings::BridgeSettings;
use crate::transport::{EventStream, EventTransport};

/// A single-use call to the remote agent behind one packaged tool.
pub struct Bridge {
    tool_name: String,
    settings: BridgeSettings,
    transport: Option<Arc<dyn EventTransport>>,
}

enum Phase {
    Start(Bridge, ToolParameters),
    Streaming(EventStream, EventRelay),
    Done,
}

struct CallState {
    pending: VecDeque<ToolMessage>,
    phase: Phase,
}

impl Bridge {
    pub fn new(tool_name: impl Into<String>, settings: BridgeSettings) -> Self {
        Self {
            tool_name: tool_name.into(),
            settings,
            transport: None,
        }
    }

    /// Use `transport` instead of the one selected by the settings' mode.
    pub fn with_transport(mut self, transport: Arc<dyn EventTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Run the call.
    pub fn invoke(self, parameters: ToolParameters) -> ToolMessageStream {
        let state = CallState {
            pending: VecDeque::new(),
            phase: Phase::Start(self, parameters),
        };

        stream::unfold(state, |mut state| async move {
            loop {
                if let Some(message) = state.pending.pop_front() {
                    return Some((message, state));
                }
                match mem::replace(&mut state.phase, Phase::Done) {
                    Phase::Start(bridge, parameters) => {
                        state.phase = bridge.open(parameters, &mut state.pending).await;
                    }
                    Phase::Streaming(mut events, mut relay) => match events.next().await {
                        Some(Ok(event)) => {
                            state.pending.extend(relay.on_event(event));
                            state.phase = Phase::Streaming(events, relay);
                        }
                        Some(Err(e)) => {
                            let recoverable = e.is_recoverable();
                            state.pending.push_back(relay.on_error(e));
                            state.phase = if recoverable {
                                Phase::Streaming(events, relay)
                            } else {
                                Phase::Done
                            };
                        }
                        None => state.pending.extend(relay.finish()),
                    },
                    Phase::Done => return None,
                }
            }
        })
        .boxed()
    }

    /// Resolve configuration and open the exchange. Messages produced along
    /// the way are pushed to `pending`.
    async fn open(self, parameters: ToolParameters, pending: &mut VecDeque<ToolMessage>) -> Phase {
        let config = match load_tool_config(&self.tool_name, &self.settings).await {
            Ok(config) => config,
            Err(e) => {
                tracing::error!("{}: {}", self.tool_name, e);
                pending.push_back(ToolMessage::diagnostic(
                    DiagnosticKind::ConfigurationMissing,
                    e.to_string(),
                ));
                return Phase::Done;
            }
        };

        let session = Session {
            user_id: self.settings.user_id.clone(),
        };
        let request = build_request(&config, &parameters, &session);
        let transport = self
            .transport
            .clone()
            .unwrap_or_else(|| self.settings.transport());

        tracing::info!(
            "invoking {} at {} via {}",
            self.tool_name,
            config.endpoint,
            transport.name()
        );
        let mut relay = EventRelay::new(config.variant, config.output_names());
        match transport.open(&config.endpoint, &request).await {
            Ok(events) => Phase::Streaming(events, relay),
            Err(e) => {
                pending.push_back(relay.on_error(e));
                Phase::Done
            }
        }
    }
}

/// Invoke a packaged tool using settings from the environment. Settings
/// errors surface as a single diagnostic.
pub fn invoke(tool_name: &str, parameters: ToolParameters) -> ToolMessageStream {
    match BridgeSettings::from_env() {
        Ok(settings) => Bridge::new(tool_name, settings).invoke(parameters),
        Err(e) => {
            let message =
                ToolMessage::diagnostic(DiagnosticKind::ConfigurationMissing, e.to_string());
            stream::iter([message]).boxed()
        }
    }
}

/// A packaged tool bound to fixed settings.
#[derive(Debug, Clone)]
pub struct RemoteAgentTool {
    pub name: String,
    pub settings: BridgeSettings,
}

impl Tool for RemoteAgentTool {
    fn invoke(&self, parameters: ToolParameters) -> ToolMessageStream {
        Bridge::new(self.name.clone(), self.settings.clone()).invoke(parameters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StubTransport;
    use serde_json::{Value, json};
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    const SUMMARY_TOOL: &str = r#"
identity:
  name: agent0
parameters:
  - name: query
    required: true
    type: string
out_parameters: []
api_key: k-1
endpoint: http://stub
"#;

    const FLOW_TOOL: &str = r#"
identity:
  name: agent1
parameters: null
out_parameters:
  - name: result_a
    type: string
flow_id: flow-7
"#;

    fn tool_root(dir: &Path) -> BridgeSettings {
        fs::create_dir_all(dir.join("tools")).unwrap();
        fs::write(dir.join("tools/agent0.yaml"), SUMMARY_TOOL).unwrap();
        fs::write(dir.join("tools/agent1.yaml"), FLOW_TOOL).unwrap();
        BridgeSettings {
            tool_root: dir.to_path_buf(),
            user_id: "u-9".into(),
            ..BridgeSettings::default()
        }
    }

    fn rpc(result: Value) -> Value {
        json!({"jsonrpc": "2.0", "id": "1", "result": result})
    }

    fn params(pairs: &[(&str, &str)]) -> ToolParameters {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[tokio::test]
    async fn streams_events_then_summary() {
        let dir = TempDir::new().unwrap();
        let transport = Arc::new(
            StubTransport::new()
                .event(rpc(json!({"kind": "status-update", "status": {"state": "submitted"}})))
                .event(rpc(json!({"kind": "status-update", "status": {"state": "working"}})))
                .event(rpc(json!({
                    "kind": "message",
                    "parts": [{"kind": "text", "text": "hi there"}]
                }))),
        );

        let messages: Vec<ToolMessage> = Bridge::new("agent0", tool_root(dir.path()))
            .with_transport(transport.clone())
            .invoke(params(&[("query", "hello")]))
            .collect()
            .await;

        assert_eq!(messages.len(), 4);
        assert!(messages[..3].iter().all(ToolMessage::is_event));
        assert_eq!(messages[3], ToolMessage::Summary("hi there".into()));

        let calls = transport.calls();
        assert_eq!(calls[0].0, "http://stub");
        let data = &calls[0].1["message"]["parts"][0]["data"];
        assert_eq!(data["inputs"][0]["value"], "hello");
        assert_eq!(data["agent_request_params"]["user_id"], "u-9");
    }

    #[tokio::test]
    async fn missing_configuration_is_a_single_diagnostic() {
        let dir = TempDir::new().unwrap();
        let transport = Arc::new(StubTransport::new().event(rpc(json!({"kind": "message"}))));

        let messages: Vec<ToolMessage> = Bridge::new("agent9", tool_root(dir.path()))
            .with_transport(transport.clone())
            .invoke(ToolParameters::new())
            .collect()
            .await;

        assert_eq!(messages.len(), 1);
        assert!(matches!(
            &messages[0],
            ToolMessage::Diagnostic { kind: DiagnosticKind::ConfigurationMissing, text }
                if text.contains("agent9")
        ));
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn nothing_happens_until_polled() {
        let dir = TempDir::new().unwrap();
        let transport = Arc::new(StubTransport::new());
        let stream = Bridge::new("agent0", tool_root(dir.path()))
            .with_transport(transport.clone())
            .invoke(ToolParameters::new());

        assert!(transport.calls().is_empty());
        drop(stream);
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn decode_failures_are_reported_and_skipped() {
        let dir = TempDir::new().unwrap();
        let transport = Arc::new(
            StubTransport::new()
                .malformed("{broken")
                .event(rpc(json!({"kind": "task", "status": {"state": "completed"}}))),
        );

        let messages: Vec<ToolMessage> = Bridge::new("agent0", tool_root(dir.path()))
            .with_transport(transport)
            .invoke(ToolParameters::new())
            .collect()
            .await;

        assert_eq!(messages.len(), 3);
        assert!(matches!(
            messages[0],
            ToolMessage::Diagnostic { kind: DiagnosticKind::DecodeFailure, .. }
        ));
        assert!(messages[1].is_event());
        assert_eq!(messages[2], ToolMessage::Summary("task completed".into()));
    }

    #[tokio::test]
    async fn crash_ends_the_call() {
        let dir = TempDir::new().unwrap();
        let transport = Arc::new(StubTransport::new().crash(Some(1), "boom"));

        let messages: Vec<ToolMessage> = Bridge::new("agent0", tool_root(dir.path()))
            .with_transport(transport)
            .invoke(ToolParameters::new())
            .collect()
            .await;

        assert_eq!(messages.len(), 1);
        assert!(matches!(
            &messages[0],
            ToolMessage::Diagnostic { kind: DiagnosticKind::WorkerCrash, text }
                if text.contains("boom")
        ));
    }

    #[tokio::test]
    async fn unreachable_agent_is_a_transport_diagnostic() {
        let dir = TempDir::new().unwrap();
        let transport = Arc::new(StubTransport::new().refuse("connection refused"));

        let messages: Vec<ToolMessage> = Bridge::new("agent0", tool_root(dir.path()))
            .with_transport(transport)
            .invoke(ToolParameters::new())
            .collect()
            .await;

        assert_eq!(messages.len(), 1);
        assert!(matches!(
            messages[0],
            ToolMessage::Diagnostic { kind: DiagnosticKind::Transport, .. }
        ));
    }

    #[tokio::test]
    async fn flow_tool_emits_outputs_and_uses_flow_endpoint() {
        let dir = TempDir::new().unwrap();
        let transport = Arc::new(
            StubTransport::new()
                .event(rpc(json!({
                    "kind": "artifact-update",
                    "artifact": {
                        "parts": [{"kind": "data", "data": {"result_a": {"value": "42"}}}]
                    },
                    "lastChunk": true
                })))
                .event(rpc(json!({
                    "kind": "status-update",
                    "status": {"state": "completed"},
                    "final": true
                }))),
        );

        let tool = RemoteAgentTool {
            name: "agent1".into(),
            settings: tool_root(dir.path()),
        };
        let messages: Vec<ToolMessage> = tool
            .with_stub(transport.clone())
            .invoke(ToolParameters::new())
            .collect()
            .await;

        let outputs: Vec<&ToolMessage> = messages
            .iter()
            .filter(|m| matches!(m, ToolMessage::Output { .. }))
            .collect();
        assert_eq!(
            outputs,
            vec![&ToolMessage::Output {
                name: "result_a".into(),
                value: "42".into()
            }]
        );
        assert!(!messages.iter().any(|m| matches!(m, ToolMessage::Summary(_))));

        let (endpoint, request) = &transport.calls()[0];
        assert_eq!(endpoint, "http://127.0.0.1:8889");
        let data = &request["message"]["parts"][0]["data"];
        assert_eq!(data["agent_request_params"], json!({"flow_id": "flow-7"}));
        assert_eq!(data["outputs"][0]["name"], "result_a");
    }

    impl RemoteAgentTool {
        fn with_stub(&self, transport: Arc<StubTransport>) -> Bridge {
            Bridge::new(self.name.clone(), self.settings.clone()).with_transport(transport)
        }
    }
}
