// ABOUTME: EventRelay turns transport items into caller-facing ToolMessages for one call.
// ABOUTME: Guarantees a single result per call: a summary, extracted outputs, or a fatal diagnostic.

use agentpack_core::{AgentVariant, RemoteEvent, classify};
use serde_json::Value;

use crate::message::ToolMessage;
use crate::transport::TransportError;

const NO_RESPONSE: &str = "remote agent returned no events";

/// Per-call forwarding state.
#[derive(Debug)]
pub struct EventRelay {
    variant: AgentVariant,
    outputs: Vec<String>,
    result_emitted: bool,
    outputs_emitted: usize,
    last_event: Option<RemoteEvent>,
}

impl EventRelay {
    pub fn new(variant: AgentVariant, outputs: Vec<String>) -> Self {
        Self {
            variant,
            outputs,
            result_emitted: false,
            outputs_emitted: 0,
            last_event: None,
        }
    }

    /// Forward one event, followed by whatever it resolves.
    pub fn on_event(&mut self, event: RemoteEvent) -> Vec<ToolMessage> {
        let terminal = classify(&event);
        if let Some(reason) = &terminal {
            tracing::debug!("terminal event ({:?})", reason);
        }

        let mut messages = Vec::new();
        match self.variant {
            AgentVariant::Summary => {
                let summary =
                    (terminal.is_some() && !self.result_emitted).then(|| event.summary_text());
                messages.push(ToolMessage::Event(event.clone()));
                if let Some(summary) = summary {
                    self.result_emitted = true;
                    messages.push(ToolMessage::Summary(summary));
                }
            }
            AgentVariant::Outputs => {
                let outputs = self.extract_outputs(&event);
                messages.push(ToolMessage::Event(event.clone()));
                self.outputs_emitted += outputs.len();
                messages.extend(outputs);
            }
        }
        self.last_event = Some(event);
        messages
    }

    /// Report a transport error. Anything but a decode failure ends the call
    /// and stands in for its result.
    pub fn on_error(&mut self, error: TransportError) -> ToolMessage {
        if error.is_recoverable() {
            tracing::warn!("skipping undecodable event: {}", error);
        } else {
            tracing::error!("call failed: {}", error);
            self.result_emitted = true;
        }
        ToolMessage::diagnostic(error.diagnostic_kind(), error.to_string())
    }

    /// Close the call, emitting a fallback summary if no result was produced.
    pub fn finish(&mut self) -> Option<ToolMessage> {
        let needs_result = match self.variant {
            AgentVariant::Summary => !self.result_emitted,
            AgentVariant::Outputs => !self.result_emitted && self.outputs_emitted == 0,
        };
        if !needs_result {
            return None;
        }
        self.result_emitted = true;

        let text = self
            .last_event
            .as_ref()
            .map(RemoteEvent::summary_text)
            .unwrap_or_else(|| NO_RESPONSE.to_string());
        Some(ToolMessage::Summary(text))
    }

    /// Declared outputs carried by an artifact-update, in declaration order.
    fn extract_outputs(&self, event: &RemoteEvent) -> Vec<ToolMessage> {
        let data = event.artifact_data();
        let mut messages = Vec::new();
        for name in &self.outputs {
            for entry in data.iter().filter_map(|d| d.get(name)) {
                let Some(value) = entry.get("value") else {
                    tracing::warn!("output '{}' has no value", name);
                    continue;
                };
                let value = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                messages.push(ToolMessage::Output {
                    name: name.clone(),
                    value,
                });
            }
        }
        messages
    }
}
