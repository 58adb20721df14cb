// ABOUTME: RemoteEvent wraps one decoded response from an A2A message/stream exchange.
// ABOUTME: Provides typed accessors over the JSON-RPC result without fixing the full A2A schema.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const TASK_KIND: &str = "task";
pub const MESSAGE_KIND: &str = "message";
pub const STATUS_UPDATE_KIND: &str = "status-update";
pub const ARTIFACT_UPDATE_KIND: &str = "artifact-update";

/// A single decoded streaming event, usually a JSON-RPC response of the
/// form `{"jsonrpc": "2.0", "id": ..., "result": {...}}`.
///
/// Agents in the wild disagree on the exact event shapes, so the event is
/// kept as JSON and inspected through accessors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteEvent(Value);

impl RemoteEvent {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    /// The object the event describes: the JSON-RPC `result` when present,
    /// otherwise the event itself.
    pub fn payload(&self) -> &Value {
        self.0.get("result").unwrap_or(&self.0)
    }

    pub fn kind(&self) -> Option<&str> {
        self.payload().get("kind").and_then(Value::as_str)
    }

    pub fn is_final(&self) -> bool {
        self.payload()
            .get("final")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    pub fn is_last_chunk(&self) -> bool {
        self.payload()
            .get("lastChunk")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Task state from `status.state`, for tasks and status updates.
    pub fn task_state(&self) -> Option<&str> {
        self.payload()
            .get("status")
            .and_then(|s| s.get("state"))
            .and_then(Value::as_str)
    }

    /// The JSON-RPC error message, if the remote answered with an error.
    pub fn error_message(&self) -> Option<String> {
        let error = self.0.get("error")?;
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .map(String::from)
            .unwrap_or_else(|| error.to_string());
        Some(message)
    }

    /// Data objects carried by an artifact-update's parts.
    pub fn artifact_data(&self) -> Vec<&Map<String, Value>> {
        if self.kind() != Some(ARTIFACT_UPDATE_KIND) {
            return Vec::new();
        }
        self.payload()
            .get("artifact")
            .and_then(|a| a.get("parts"))
            .and_then(Value::as_array)
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|p| p.get("data").and_then(Value::as_object))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Condense the event into human-readable text.
    ///
    /// Messages and artifacts yield their part text; tasks and status
    /// updates yield their status message, falling back to the task state.
    pub fn summary_text(&self) -> String {
        let payload = self.payload();
        let text = match self.kind() {
            Some(MESSAGE_KIND) => parts_text(payload.get("parts")),
            Some(ARTIFACT_UPDATE_KIND) => {
                parts_text(payload.get("artifact").and_then(|a| a.get("parts")))
            }
            Some(STATUS_UPDATE_KIND) => status_text(payload),
            Some(TASK_KIND) => {
                let status = status_text(payload);
                if status.is_empty() {
                    last_artifact_text(payload)
                } else {
                    status
                }
            }
            _ => String::new(),
        };

        if !text.is_empty() {
            return text;
        }
        match (self.task_state(), self.error_message()) {
            (_, Some(error)) => format!("remote agent error: {}", error),
            (Some(state), None) => format!("task {}", state),
            (None, None) => payload.to_string(),
        }
    }
}

impl From<Value> for RemoteEvent {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

fn status_text(payload: &Value) -> String {
    parts_text(
        payload
            .get("status")
            .and_then(|s| s.get("message"))
            .and_then(|m| m.get("parts")),
    )
}

fn last_artifact_text(payload: &Value) -> String {
    payload
        .get("artifacts")
        .and_then(Value::as_array)
        .and_then(|artifacts| artifacts.last())
        .map(|artifact| parts_text(artifact.get("parts")))
        .unwrap_or_default()
}

/// Join the textual content of A2A parts. Data parts render as JSON and
/// file parts as their URI or name.
fn parts_text(parts: Option<&Value>) -> String {
    let Some(parts) = parts.and_then(Value::as_array) else {
        return String::new();
    };

    parts
        .iter()
        .filter_map(|part| {
            if let Some(text) = part.get("text").and_then(Value::as_str) {
                return Some(text.to_string());
            }
            if let Some(data) = part.get("data") {
                return Some(data.to_string());
            }
            part.get("file").and_then(|file| {
                file.get("uri")
                    .or_else(|| file.get("name"))
                    .and_then(Value::as_str)
                    .map(String::from)
            })
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rpc(result: Value) -> RemoteEvent {
        RemoteEvent::new(json!({"jsonrpc": "2.0", "id": "1", "result": result}))
    }

    #[test]
    fn message_summary_is_its_text() {
        let event = rpc(json!({
            "kind": "message",
            "role": "agent",
            "messageId": "m1",
            "parts": [{"kind": "text", "text": "hello back"}]
        }));
        assert_eq!(event.kind(), Some("message"));
        assert_eq!(event.summary_text(), "hello back");
    }

    #[test]
    fn status_update_falls_back_to_state() {
        let event = rpc(json!({
            "kind": "status-update",
            "taskId": "t",
            "contextId": "c",
            "status": {"state": "completed"},
            "final": true
        }));
        assert!(event.is_final());
        assert_eq!(event.task_state(), Some("completed"));
        assert_eq!(event.summary_text(), "task completed");
    }

    #[test]
    fn task_prefers_status_message_then_artifacts() {
        let event = rpc(json!({
            "kind": "task",
            "id": "t",
            "contextId": "c",
            "status": {"state": "completed"},
            "artifacts": [
                {"artifactId": "a1", "parts": [{"kind": "text", "text": "first"}]},
                {"artifactId": "a2", "parts": [{"kind": "text", "text": "second"}]}
            ]
        }));
        assert_eq!(event.summary_text(), "second");
    }

    #[test]
    fn artifact_data_reads_data_parts_only_for_artifact_updates() {
        let event = rpc(json!({
            "kind": "artifact-update",
            "taskId": "t",
            "contextId": "c",
            "artifact": {
                "artifactId": "a",
                "parts": [
                    {"kind": "text", "text": "ignored"},
                    {"kind": "data", "data": {"result_a": {"value": "42"}}}
                ]
            }
        }));
        let data = event.artifact_data();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0]["result_a"]["value"], "42");

        let message = rpc(json!({
            "kind": "message",
            "parts": [{"kind": "data", "data": {"x": 1}}]
        }));
        assert!(message.artifact_data().is_empty());
    }

    #[test]
    fn error_response_summary_mentions_error() {
        let event = RemoteEvent::new(json!({
            "jsonrpc": "2.0",
            "id": "1",
            "error": {"code": -32001, "message": "Task not found"}
        }));
        assert_eq!(event.error_message().as_deref(), Some("Task not found"));
        assert_eq!(event.summary_text(), "remote agent error: Task not found");
    }

    #[test]
    fn bare_event_without_envelope_is_its_own_payload() {
        let event = RemoteEvent::new(json!({"kind": "artifact-update", "lastChunk": true}));
        assert!(event.is_last_chunk());
        assert_eq!(event.kind(), Some("artifact-update"));
    }
}
