// ABOUTME: Resolves a packaged tool's schema document into the configuration a call needs.
// ABOUTME: Searches the tool root for `<tool>.yaml` by exact file stem.

use std::fs;
use std::path::{Path, PathBuf};

use agentpack_core::{AgentVariant, Credential, OutputParameter, SchemaParameter, ToolSchema};
use thiserror::Error;
use walkdir::WalkDir;

use crate::settings::BridgeSettings;

/// Why a tool's configuration could not be resolved.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("configuration not found: no {tool}.yaml under {}", .root.display())]
    NotFound { tool: String, root: PathBuf },

    #[error("failed to read {}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid tool schema {}: {source}", .path.display())]
    Invalid {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("configuration lookup for {tool} did not finish: {reason}")]
    Interrupted { tool: String, reason: String },
}

/// Everything a call needs to know about its tool.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolConfig {
    pub tool_name: String,
    pub endpoint: String,
    pub credential: Credential,
    pub inputs: Vec<SchemaParameter>,
    pub outputs: Vec<OutputParameter>,
    pub variant: AgentVariant,
}

impl ToolConfig {
    pub fn from_schema(tool_name: &str, schema: ToolSchema, settings: &BridgeSettings) -> Self {
        let variant = schema.variant();
        let endpoint = schema
            .endpoint
            .clone()
            .unwrap_or_else(|| settings.default_endpoint(variant).to_string());
        let credential = match (schema.flow_id, schema.api_key) {
            (Some(flow_id), _) => Credential::FlowId(flow_id),
            (None, api_key) => Credential::ApiKey(api_key.unwrap_or_default()),
        };

        Self {
            tool_name: tool_name.to_string(),
            endpoint,
            credential,
            inputs: schema.parameters.unwrap_or_default(),
            outputs: schema.out_parameters,
            variant,
        }
    }

    pub fn output_names(&self) -> Vec<String> {
        self.outputs.iter().map(|o| o.name.clone()).collect()
    }
}

/// Find and load the schema document for `tool_name` under `root`.
pub fn resolve_tool_config(
    root: &Path,
    tool_name: &str,
    settings: &BridgeSettings,
) -> Result<ToolConfig, ResolveError> {
    let path = find_schema(root, tool_name).ok_or_else(|| ResolveError::NotFound {
        tool: tool_name.to_string(),
        root: root.to_path_buf(),
    })?;

    let text = fs::read_to_string(&path).map_err(|source| ResolveError::Unreadable {
        path: path.clone(),
        source,
    })?;
    let schema = ToolSchema::from_yaml(&text).map_err(|source| ResolveError::Invalid {
        path: path.clone(),
        source,
    })?;

    tracing::debug!("resolved {} from {}", tool_name, path.display());
    Ok(ToolConfig::from_schema(tool_name, schema, settings))
}

/// [`resolve_tool_config`] for `tool_name` under `settings.tool_root`, run on
/// the blocking pool so the directory walk stays off the async workers.
pub async fn load_tool_config(
    tool_name: &str,
    settings: &BridgeSettings,
) -> Result<ToolConfig, ResolveError> {
    let tool = tool_name.to_string();
    let settings = settings.clone();
    tokio::task::spawn_blocking(move || resolve_tool_config(&settings.tool_root, &tool, &settings))
        .await
        .map_err(|e| ResolveError::Interrupted {
            tool: tool_name.to_string(),
            reason: e.to_string(),
        })?
}

fn find_schema(root: &Path, tool_name: &str) -> Option<PathBuf> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .find(|path| {
            path.extension().is_some_and(|ext| ext == "yaml")
                && path.file_stem().is_some_and(|stem| stem == tool_name)
        })
}
