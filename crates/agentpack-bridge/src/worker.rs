// ABOUTME: The worker side of the worker protocol: read one envelope, stream events as JSON lines.
// ABOUTME: Used by the agentpack-worker binary; stdout carries only event and failure lines.

use agentpack_core::RemoteEvent;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::a2a::{DecodeFailure, decode_event};
use crate::transport::{EventTransport, TransportError};

/// What the parent writes to the worker's stdin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerEnvelope {
    pub endpoint: String,
    /// `message/stream` parameters.
    pub request: Value,
}

/// A stdout line standing in for an event the worker could not decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FailureLine {
    pub decode_failure: DecodeFailure,
}

/// Decode one worker stdout line. Invalid UTF-8, invalid JSON and failure
/// lines all come back as a DecodeFailure for that line alone.
pub fn decode_worker_line(raw: &[u8]) -> Result<RemoteEvent, DecodeFailure> {
    let text = std::str::from_utf8(raw).map_err(|e| {
        let lossy = String::from_utf8_lossy(raw);
        DecodeFailure::new(&lossy, format!("worker line is not UTF-8: {}", e))
    })?;
    if let Ok(line) = serde_json::from_str::<FailureLine>(text) {
        return Err(line.decode_failure);
    }
    decode_event(text)
}

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("failed to read envelope: {0}")]
    Input(std::io::Error),

    #[error("invalid envelope: {0}")]
    Envelope(#[from] serde_json::Error),

    #[error("failed to write event: {0}")]
    Output(std::io::Error),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Serve one call: read the envelope from `input` until EOF, open the
/// exchange, and write each event to `output` as a JSON line. An event that
/// fails to decode is written as a [`FailureLine`]. Returns the number of
/// events written.
pub async fn run_worker<R, W>(
    mut input: R,
    mut output: W,
    transport: &dyn EventTransport,
) -> Result<usize, WorkerError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut raw = Vec::new();
    input.read_to_end(&mut raw).await.map_err(WorkerError::Input)?;
    let envelope: WorkerEnvelope = serde_json::from_slice(&raw)?;

    tracing::info!("worker calling {} via {}", envelope.endpoint, transport.name());
    let mut events = transport.open(&envelope.endpoint, &envelope.request).await?;

    let mut written = 0;
    let mut failed = 0;
    while let Some(item) = events.next().await {
        let line = match item {
            Ok(event) => {
                written += 1;
                serde_json::to_vec(&event)?
            }
            Err(TransportError::Decode(decode_failure)) => {
                tracing::warn!("forwarding undecodable event: {}", decode_failure);
                failed += 1;
                serde_json::to_vec(&FailureLine { decode_failure })?
            }
            Err(e) => return Err(e.into()),
        };
        write_line(&mut output, line).await?;
    }

    tracing::info!("worker forwarded {} event(s), {} undecodable", written, failed);
    Ok(written)
}

async fn write_line<W>(output: &mut W, mut line: Vec<u8>) -> Result<(), WorkerError>
where
    W: AsyncWrite + Unpin,
{
    line.push(b'\n');
    output.write_all(&line).await.map_err(WorkerError::Output)?;
    output.flush().await.map_err(WorkerError::Output)
}
