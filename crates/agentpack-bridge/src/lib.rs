// ABOUTME: Call-time bridge for agentpack tools: resolves a tool's schema, calls its remote A2A agent,
// ABOUTME: and turns the streamed exchange into ToolMessages, directly or through an isolated worker.

pub mod a2a;
pub mod bridge;
pub mod config;
pub mod message;
pub mod payload;
pub mod relay;
pub mod settings;
pub mod testing;
pub mod transport;
pub mod worker;

pub use a2a::{A2aClient, A2aError, DecodeFailure, SseDecoder};
pub use bridge::{Bridge, RemoteAgentTool, invoke};
pub use config::{ResolveError, ToolConfig, load_tool_config, resolve_tool_config};
pub use message::{DiagnosticKind, Tool, ToolMessage, ToolMessageStream, ToolParameters};
pub use payload::{Session, build_request};
pub use relay::EventRelay;
pub use settings::{BridgeMode, BridgeSettings, ConfigError};
pub use transport::{DirectTransport, EventStream, EventTransport, TransportError, WorkerTransport};
pub use worker::{FailureLine, WorkerEnvelope, WorkerError, decode_worker_line, run_worker};
