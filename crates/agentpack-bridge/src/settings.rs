// ABOUTME: Call-time bridge settings loaded from environment variables.
// ABOUTME: Selects direct or worker transport and supplies default endpoints per agent variant.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use agentpack_core::AgentVariant;
use thiserror::Error;

use crate::transport::{DirectTransport, EventTransport, WorkerTransport};

pub const DEFAULT_AGENT_URL: &str = "http://127.0.0.1:8888";
pub const DEFAULT_FLOW_AGENT_URL: &str = "http://127.0.0.1:8889";
pub const DEFAULT_WORKER_BIN: &str = "agentpack-worker";
pub const DEFAULT_USER_ID: &str = "anonymous";

/// Errors that can occur during settings loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid bridge mode '{0}': expected 'direct' or 'worker'")]
    InvalidMode(String),

    #[error("{0} is set but empty")]
    Empty(&'static str),
}

/// How a call reaches the remote agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeMode {
    /// The HTTP exchange runs in the caller's own task.
    Direct,
    /// The HTTP exchange runs in a separate worker process.
    Worker,
}

impl FromStr for BridgeMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "direct" => Ok(Self::Direct),
            "worker" => Ok(Self::Worker),
            other => Err(ConfigError::InvalidMode(other.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BridgeSettings {
    pub mode: BridgeMode,
    pub worker_bin: PathBuf,
    pub agent_url: String,
    pub flow_agent_url: String,
    pub user_id: String,
    /// Directory searched for tool schema documents.
    pub tool_root: PathBuf,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            mode: BridgeMode::Worker,
            worker_bin: PathBuf::from(DEFAULT_WORKER_BIN),
            agent_url: DEFAULT_AGENT_URL.to_string(),
            flow_agent_url: DEFAULT_FLOW_AGENT_URL.to_string(),
            user_id: DEFAULT_USER_ID.to_string(),
            tool_root: PathBuf::from("."),
        }
    }
}

impl BridgeSettings {
    /// Load settings from environment variables with defaults.
    ///
    /// Environment variables:
    /// - AGENTPACK_BRIDGE_MODE: `direct` or `worker` (default: worker)
    /// - AGENTPACK_WORKER_BIN: worker executable (default: agentpack-worker on PATH)
    /// - AGENTPACK_AGENT_URL: endpoint for API-key agents (default: http://127.0.0.1:8888)
    /// - AGENTPACK_FLOW_AGENT_URL: endpoint for flow agents (default: http://127.0.0.1:8889)
    /// - AGENTPACK_USER_ID: user id sent with API-key requests (default: anonymous)
    /// - AGENTPACK_TOOL_ROOT: where tool schema documents are searched (default: .)
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let mode = match std::env::var("AGENTPACK_BRIDGE_MODE") {
            Ok(value) => value.parse()?,
            Err(_) => defaults.mode,
        };

        Ok(Self {
            mode,
            worker_bin: non_empty("AGENTPACK_WORKER_BIN")?
                .map(PathBuf::from)
                .unwrap_or(defaults.worker_bin),
            agent_url: non_empty("AGENTPACK_AGENT_URL")?.unwrap_or(defaults.agent_url),
            flow_agent_url: non_empty("AGENTPACK_FLOW_AGENT_URL")?
                .unwrap_or(defaults.flow_agent_url),
            user_id: non_empty("AGENTPACK_USER_ID")?.unwrap_or(defaults.user_id),
            tool_root: non_empty("AGENTPACK_TOOL_ROOT")?
                .map(PathBuf::from)
                .unwrap_or(defaults.tool_root),
        })
    }

    /// Endpoint used when a tool's schema does not name one.
    pub fn default_endpoint(&self, variant: AgentVariant) -> &str {
        match variant {
            AgentVariant::Summary => &self.agent_url,
            AgentVariant::Outputs => &self.flow_agent_url,
        }
    }

    /// The transport for the configured mode.
    pub fn transport(&self) -> Arc<dyn EventTransport> {
        match self.mode {
            BridgeMode::Direct => Arc::new(DirectTransport::new()),
            BridgeMode::Worker => Arc::new(WorkerTransport::new(self.worker_bin.clone())),
        }
    }
}

fn non_empty(name: &'static str) -> Result<Option<String>, ConfigError> {
    match std::env::var(name) {
        Ok(value) if value.trim().is_empty() => Err(ConfigError::Empty(name)),
        Ok(value) => Ok(Some(value.trim().to_string())),
        Err(_) => Ok(None),
    }
}
