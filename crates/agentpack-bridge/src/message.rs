// ABOUTME: Caller-facing surface of a packaged tool: the Tool trait and the messages its stream yields.
// ABOUTME: Messages serialize as tagged JSON so hosts and the CLI can print them line by line.

use std::collections::HashMap;
use std::fmt;

use agentpack_core::RemoteEvent;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

/// Flat name to value map supplied by the caller.
pub type ToolParameters = HashMap<String, String>;

/// Lazy, finite, single-use stream of messages for one call.
pub type ToolMessageStream = BoxStream<'static, ToolMessage>;

/// What went wrong when a call could not proceed normally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    ConfigurationMissing,
    DecodeFailure,
    WorkerCrash,
    Transport,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::ConfigurationMissing => "configuration missing",
            Self::DecodeFailure => "decode failure",
            Self::WorkerCrash => "worker crash",
            Self::Transport => "transport",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "content", rename_all = "snake_case")]
pub enum ToolMessage {
    /// A remote event, forwarded unchanged.
    Event(RemoteEvent),
    /// A named output extracted from a flow agent's artifact.
    Output { name: String, value: String },
    /// The condensed result of the call.
    Summary(String),
    Diagnostic { kind: DiagnosticKind, text: String },
}

impl ToolMessage {
    pub fn diagnostic(kind: DiagnosticKind, text: impl Into<String>) -> Self {
        Self::Diagnostic {
            kind,
            text: text.into(),
        }
    }

    pub fn is_event(&self) -> bool {
        matches!(self, Self::Event(_))
    }
}

/// A tool the host can invoke.
pub trait Tool {
    fn invoke(&self, parameters: ToolParameters) -> ToolMessageStream;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn messages_serialize_tagged() {
        let summary = serde_json::to_value(ToolMessage::Summary("done".into())).unwrap();
        assert_eq!(summary, json!({"type": "summary", "content": "done"}));

        let diag = serde_json::to_value(ToolMessage::diagnostic(
            DiagnosticKind::WorkerCrash,
            "boom",
        ))
        .unwrap();
        assert_eq!(
            diag,
            json!({"type": "diagnostic", "content": {"kind": "worker_crash", "text": "boom"}})
        );

        let event = ToolMessage::Event(RemoteEvent::new(json!({"a": 1})));
        let event = serde_json::to_value(event).unwrap();
        assert_eq!(event, json!({"type": "event", "content": {"a": 1}}));
    }
}
