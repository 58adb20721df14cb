// ABOUTME: Minimal A2A client: agent-card discovery and the streaming message/stream JSON-RPC call.
// ABOUTME: Includes an incremental server-sent-events decoder that turns response bytes into RemoteEvents.

use std::collections::VecDeque;

use agentpack_core::RemoteEvent;
use futures::StreamExt;
use futures::stream::{self, BoxStream};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;
use ulid::Ulid;

pub const AGENT_CARD_PATH: &str = "/.well-known/agent.json";
pub const STREAM_METHOD: &str = "message/stream";

/// Longest excerpt of an undecodable payload kept in a DecodeFailure.
const EXCERPT_LEN: usize = 200;

/// Largest SSE line or frame the decoder buffers before discarding it.
pub const MAX_FRAME_BYTES: usize = 4 * 1024 * 1024;

/// One event that could not be decoded. The stream it came from continues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("malformed event ({reason}): {excerpt}")]
pub struct DecodeFailure {
    pub excerpt: String,
    pub reason: String,
}

impl DecodeFailure {
    pub fn new(raw: &str, reason: impl Into<String>) -> Self {
        let excerpt = match raw.char_indices().nth(EXCERPT_LEN) {
            Some((cut, _)) => format!("{}...", &raw[..cut]),
            None => raw.to_string(),
        };
        Self {
            excerpt,
            reason: reason.into(),
        }
    }
}

/// Decode one serialized event.
pub fn decode_event(raw: &str) -> Result<RemoteEvent, DecodeFailure> {
    match serde_json::from_str::<Value>(raw) {
        Ok(value @ Value::Object(_)) => Ok(RemoteEvent::new(value)),
        Ok(_) => Err(DecodeFailure::new(raw, "event is not a JSON object")),
        Err(e) => Err(DecodeFailure::new(raw, e.to_string())),
    }
}

#[derive(Debug, Error)]
pub enum A2aError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} answered {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    #[error("invalid agent card at {url}: {reason}")]
    AgentCard { url: String, reason: String },

    #[error(transparent)]
    Decode(#[from] DecodeFailure),
}

/// Client for one remote agent, addressed by the base URL its card is served from.
#[derive(Debug, Clone)]
pub struct A2aClient {
    http: reqwest::Client,
    endpoint: String,
}

impl A2aClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), endpoint)
    }

    pub fn with_client(http: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
        }
    }

    pub fn card_url(&self) -> String {
        format!("{}{}", self.endpoint.trim_end_matches('/'), AGENT_CARD_PATH)
    }

    /// Fetch the agent card and return the service URL it advertises.
    pub async fn service_url(&self) -> Result<String, A2aError> {
        let url = self.card_url();
        let response = self.http.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(A2aError::Status {
                url,
                status: status.as_u16(),
                body,
            });
        }

        let card: Value = response.json().await.map_err(|e| A2aError::AgentCard {
            url: url.clone(),
            reason: e.to_string(),
        })?;
        card.get("url")
            .and_then(Value::as_str)
            .map(String::from)
            .ok_or_else(|| A2aError::AgentCard {
                url,
                reason: "missing 'url'".to_string(),
            })
    }

    /// Wrap message parameters in a `message/stream` JSON-RPC request.
    pub fn stream_request(params: &Value) -> Value {
        json!({
            "jsonrpc": "2.0",
            "id": Ulid::new().to_string(),
            "method": STREAM_METHOD,
            "params": params,
        })
    }

    /// Start a streaming exchange. Events are decoded lazily as the response
    /// body arrives; dropping the stream closes the connection.
    pub async fn stream_message(
        &self,
        params: &Value,
    ) -> Result<BoxStream<'static, Result<RemoteEvent, A2aError>>, A2aError> {
        let url = self.service_url().await?;
        let body = Self::stream_request(params);
        tracing::debug!("POST {} {}", url, STREAM_METHOD);

        let response = self
            .http
            .post(&url)
            .header(ACCEPT, "text/event-stream")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(A2aError::Status {
                url,
                status: status.as_u16(),
                body,
            });
        }

        let is_sse = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("text/event-stream"));

        if !is_sse {
            // A plain JSON-RPC response, typically an error.
            let text = response.text().await?;
            let event = decode_event(&text).map_err(A2aError::from);
            return Ok(stream::once(async move { event }).boxed());
        }

        Ok(sse_events(response.bytes_stream().boxed()))
    }
}

/// Decode an SSE byte stream into events, one frame at a time.
fn sse_events<B>(
    bytes: BoxStream<'static, Result<B, reqwest::Error>>,
) -> BoxStream<'static, Result<RemoteEvent, A2aError>>
where
    B: AsRef<[u8]> + Send + 'static,
{
    struct State<B> {
        bytes: BoxStream<'static, Result<B, reqwest::Error>>,
        decoder: SseDecoder,
        pending: VecDeque<Result<RemoteEvent, A2aError>>,
        finished: bool,
    }

    let state = State {
        bytes,
        decoder: SseDecoder::default(),
        pending: VecDeque::new(),
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                return Some((item, state));
            }
            if state.finished {
                return None;
            }
            match state.bytes.next().await {
                Some(Ok(chunk)) => {
                    let decoded = state.decoder.feed(chunk.as_ref());
                    state.pending.extend(decoded.into_iter().map(|r| r.map_err(A2aError::from)));
                }
                Some(Err(e)) => {
                    state.finished = true;
                    state.pending.push_back(Err(A2aError::Http(e)));
                }
                None => {
                    state.finished = true;
                    let decoded = state.decoder.finish();
                    state.pending.extend(decoded.into_iter().map(|r| r.map_err(A2aError::from)));
                }
            }
        }
    })
    .boxed()
}

/// Incremental decoder for `text/event-stream` bodies. Only `data` fields
/// are significant; comments and other fields are ignored. A line or frame
/// over [`MAX_FRAME_BYTES`] is reported once as a DecodeFailure and dropped.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    data: Vec<String>,
    data_len: usize,
    // Skip the rest of an oversized line.
    skip_line: bool,
    // Skip the rest of an oversized frame.
    skip_frame: bool,
}

impl SseDecoder {
    /// Feed a chunk of bytes and return every event completed by it.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Result<RemoteEvent, DecodeFailure>> {
        self.buffer.extend_from_slice(chunk);
        let mut out = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if std::mem::take(&mut self.skip_line) {
                continue;
            }
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            let line = String::from_utf8_lossy(&line).into_owned();
            if let Some(event) = self.process_line(&line) {
                out.push(event);
            }
        }
        if self.buffer.len() > MAX_FRAME_BYTES {
            let head = &self.buffer[..EXCERPT_LEN];
            out.push(Err(oversized(&String::from_utf8_lossy(head))));
            self.buffer.clear();
            self.skip_line = true;
            self.skip_frame = true;
            self.clear_data();
        }
        out
    }

    /// Flush a trailing frame left open when the body ended.
    pub fn finish(&mut self) -> Vec<Result<RemoteEvent, DecodeFailure>> {
        let mut out = Vec::new();
        if std::mem::take(&mut self.skip_line) {
            self.buffer.clear();
        }
        if !self.buffer.is_empty() {
            let rest = std::mem::take(&mut self.buffer);
            let line = String::from_utf8_lossy(&rest).trim_end_matches('\r').to_string();
            if let Some(event) = self.process_line(&line) {
                out.push(event);
            }
        }
        if let Some(event) = self.dispatch() {
            out.push(event);
        }
        out
    }

    fn process_line(&mut self, line: &str) -> Option<Result<RemoteEvent, DecodeFailure>> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        if field != "data" || self.skip_frame {
            return None;
        }
        self.data_len += value.len();
        if self.data_len > MAX_FRAME_BYTES {
            self.skip_frame = true;
            let head = self.data.first().map_or(value, String::as_str);
            let failure = oversized(head);
            self.clear_data();
            return Some(Err(failure));
        }
        self.data.push(value.to_string());
        None
    }

    fn dispatch(&mut self) -> Option<Result<RemoteEvent, DecodeFailure>> {
        if std::mem::take(&mut self.skip_frame) || self.data.is_empty() {
            self.clear_data();
            return None;
        }
        let payload = std::mem::take(&mut self.data).join("\n");
        self.data_len = 0;
        Some(decode_event(&payload))
    }

    fn clear_data(&mut self) {
        self.data.clear();
        self.data_len = 0;
    }
}

fn oversized(head: &str) -> DecodeFailure {
    DecodeFailure::new(head, format!("frame exceeds {} bytes", MAX_FRAME_BYTES))
}
