// ABOUTME: Test utilities for agentpack-bridge, including a scripted in-memory transport.
// ABOUTME: Lets bridge and worker tests run without a network or child processes.

use std::sync::Mutex;

use agentpack_core::RemoteEvent;
use async_trait::async_trait;
use futures::StreamExt;
use futures::stream;
use serde_json::Value;

use crate::a2a::DecodeFailure;
use crate::transport::{EventStream, EventTransport, TransportError};

#[derive(Debug, Clone)]
enum Scripted {
    Event(Value),
    Malformed(String),
    Crash { code: Option<i32>, stderr: String },
}

/// A transport that replays a fixed script on every open and records
/// the endpoint and request it was called with.
#[derive(Debug, Default)]
pub struct StubTransport {
    script: Vec<Scripted>,
    refuse: Option<String>,
    calls: Mutex<Vec<(String, Value)>>,
}

impl StubTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn event(mut self, value: Value) -> Self {
        self.script.push(Scripted::Event(value));
        self
    }

    /// A line that fails to decode.
    pub fn malformed(mut self, raw: &str) -> Self {
        self.script.push(Scripted::Malformed(raw.to_owned()));
        self
    }

    /// End the stream with a worker crash.
    pub fn crash(mut self, code: Option<i32>, stderr: &str) -> Self {
        self.script.push(Scripted::Crash {
            code,
            stderr: stderr.to_owned(),
        });
        self
    }

    /// Fail `open` itself, as an unreachable agent card would.
    pub fn refuse(mut self, reason: &str) -> Self {
        self.refuse = Some(reason.to_owned());
        self
    }

    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl EventTransport for StubTransport {
    async fn open(&self, endpoint: &str, request: &Value) -> Result<EventStream, TransportError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((endpoint.to_owned(), request.clone()));
        }
        if let Some(reason) = &self.refuse {
            return Err(TransportError::Io(std::io::Error::other(reason.clone())));
        }

        let items: Vec<Result<RemoteEvent, TransportError>> = self
            .script
            .iter()
            .cloned()
            .map(|step| match step {
                Scripted::Event(value) => Ok(RemoteEvent::new(value)),
                Scripted::Malformed(raw) => {
                    Err(TransportError::Decode(DecodeFailure::new(&raw, "stub")))
                }
                Scripted::Crash { code, stderr } => {
                    Err(TransportError::WorkerCrash { code, stderr })
                }
            })
            .collect();
        Ok(stream::iter(items).boxed())
    }

    fn name(&self) -> &str {
        "stub"
    }
}
