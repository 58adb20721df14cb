// ABOUTME: EventTransport abstracts how a call reaches its remote agent.
// ABOUTME: DirectTransport calls in-process; WorkerTransport delegates to an isolated worker process.

use std::path::PathBuf;
use std::process::Stdio;

use agentpack_core::RemoteEvent;
use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::{self, BoxStream};
use serde_json::Value;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdout, Command};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::SplitStream;

use crate::a2a::{A2aClient, A2aError, DecodeFailure};
use crate::message::DiagnosticKind;
use crate::worker::{WorkerEnvelope, decode_worker_line};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error(transparent)]
    Decode(DecodeFailure),

    #[error("remote agent unreachable: {0}")]
    Remote(A2aError),

    #[error("failed to start worker '{program}': {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("worker exited with status {}: {stderr}", exit_label(.code))]
    WorkerCrash { code: Option<i32>, stderr: String },

    #[error("worker i/o failed: {0}")]
    Io(#[from] std::io::Error),
}

fn exit_label(code: &Option<i32>) -> String {
    code.map_or_else(|| "signal".to_string(), |c| c.to_string())
}

impl From<A2aError> for TransportError {
    fn from(err: A2aError) -> Self {
        match err {
            A2aError::Decode(failure) => Self::Decode(failure),
            other => Self::Remote(other),
        }
    }
}

impl From<DecodeFailure> for TransportError {
    fn from(failure: DecodeFailure) -> Self {
        Self::Decode(failure)
    }
}

impl TransportError {
    pub fn diagnostic_kind(&self) -> DiagnosticKind {
        match self {
            Self::Decode(_) => DiagnosticKind::DecodeFailure,
            Self::WorkerCrash { .. } => DiagnosticKind::WorkerCrash,
            Self::Remote(_) | Self::Spawn { .. } | Self::Io(_) => DiagnosticKind::Transport,
        }
    }

    /// Whether the stream can continue after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Decode(_))
    }
}

/// Events of one exchange. Decode failures are yielded in place; any other
/// error is the last item.
pub type EventStream = BoxStream<'static, Result<RemoteEvent, TransportError>>;

/// Opens a streaming exchange with a remote agent.
#[async_trait]
pub trait EventTransport: Send + Sync {
    async fn open(&self, endpoint: &str, request: &Value) -> Result<EventStream, TransportError>;

    /// Short name for logging.
    fn name(&self) -> &str;
}

/// Runs the HTTP exchange in the caller's task.
#[derive(Debug, Clone, Default)]
pub struct DirectTransport {
    http: reqwest::Client,
}

impl DirectTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventTransport for DirectTransport {
    async fn open(&self, endpoint: &str, request: &Value) -> Result<EventStream, TransportError> {
        let client = A2aClient::with_client(self.http.clone(), endpoint);
        let events = client.stream_message(request).await?;
        Ok(events.map(|item| item.map_err(TransportError::from)).boxed())
    }

    fn name(&self) -> &str {
        "direct"
    }
}

/// Runs the HTTP exchange in a child process speaking the worker protocol:
/// one JSON envelope on stdin, one JSON event or failure line per stdout line.
#[derive(Debug, Clone)]
pub struct WorkerTransport {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl WorkerTransport {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }
}

struct WorkerState {
    child: Child,
    lines: SplitStream<BufReader<ChildStdout>>,
    stderr: Option<JoinHandle<String>>,
    done: bool,
}

impl WorkerState {
    async fn next(&mut self) -> Option<Result<RemoteEvent, TransportError>> {
        if self.done {
            return None;
        }
        loop {
            match self.lines.next().await {
                Some(Ok(line)) if line.iter().all(u8::is_ascii_whitespace) => continue,
                Some(Ok(line)) => {
                    let line = line.strip_suffix(b"\r").unwrap_or(&line);
                    return Some(decode_worker_line(line).map_err(TransportError::from));
                }
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(TransportError::Io(e)));
                }
                None => {
                    self.done = true;
                    return self.exit_status().await;
                }
            }
        }
    }

    /// Reap the worker once stdout is closed. Only a failed exit yields an item.
    async fn exit_status(&mut self) -> Option<Result<RemoteEvent, TransportError>> {
        let status = match self.child.wait().await {
            Ok(status) => status,
            Err(e) => return Some(Err(TransportError::Io(e))),
        };
        let stderr = match self.stderr.take() {
            Some(handle) => handle.await.unwrap_or_default(),
            None => String::new(),
        };

        if status.success() {
            tracing::debug!("worker exited cleanly");
            return None;
        }
        tracing::warn!("worker exited with {}", status);
        Some(Err(TransportError::WorkerCrash {
            code: status.code(),
            stderr: stderr.trim().to_string(),
        }))
    }
}

#[async_trait]
impl EventTransport for WorkerTransport {
    async fn open(&self, endpoint: &str, request: &Value) -> Result<EventStream, TransportError> {
        let program = self.program.display().to_string();
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| TransportError::Spawn {
                program: program.clone(),
                source,
            })?;

        let missing = |pipe: &str| {
            TransportError::Io(std::io::Error::other(format!("worker {} not captured", pipe)))
        };
        let mut stdin = child.stdin.take().ok_or_else(|| missing("stdin"))?;
        let stdout = child.stdout.take().ok_or_else(|| missing("stdout"))?;
        let mut stderr = child.stderr.take().ok_or_else(|| missing("stderr"))?;

        let stderr_task = tokio::spawn(async move {
            let mut buf = String::new();
            if let Err(e) = stderr.read_to_string(&mut buf).await {
                tracing::warn!("failed to read worker stderr: {}", e);
            }
            buf
        });

        let envelope = WorkerEnvelope {
            endpoint: endpoint.to_string(),
            request: request.clone(),
        };
        let bytes = serde_json::to_vec(&envelope).map_err(std::io::Error::other)?;
        // A worker that exits before reading its input is reported by its
        // exit status, not by the broken pipe.
        if let Err(e) = stdin.write_all(&bytes).await {
            tracing::warn!("failed to write worker envelope: {}", e);
        }
        drop(stdin);

        tracing::debug!("spawned worker {} for {}", program, endpoint);
        let state = WorkerState {
            child,
            lines: SplitStream::new(BufReader::new(stdout).split(b'\n')),
            stderr: Some(stderr_task),
            done: false,
        };

        Ok(stream::unfold(state, |mut state| async move {
            let item = state.next().await?;
            Some((item, state))
        })
        .boxed())
    }

    fn name(&self) -> &str {
        "worker"
    }
}
