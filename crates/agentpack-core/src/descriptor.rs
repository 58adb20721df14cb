// ABOUTME: Defines AgentDescriptor, the externally supplied record describing one agent to package.
// ABOUTME: Field names follow the upstream agent registry's camelCase JSON so records round-trip unchanged.

use std::collections::HashSet;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Errors raised when a descriptor violates its own invariants.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DescriptorError {
    #[error("agent {agent_id}: duplicate parameter name '{name}'")]
    DuplicateParameter { agent_id: String, name: String },
}

/// One declared input or output of an agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub required: bool,
    /// Declared type from the registry vocabulary (`text`, `file`, ...).
    /// Mapped to a wire type during specialization.
    #[serde(rename = "type")]
    pub declared_type: String,
}

/// A single agent as published by the registry. Immutable once appended
/// to the descriptor log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentDescriptor {
    #[serde(rename = "agentId")]
    pub id: String,
    #[serde(rename = "agentTitle", default)]
    pub title: String,
    #[serde(rename = "agentDescription", default)]
    pub description: String,
    #[serde(
        rename = "defaultInputModesList",
        default,
        deserialize_with = "nullable_list"
    )]
    pub inputs: Vec<ParameterSpec>,
    #[serde(
        rename = "defaultOutputModesList",
        default,
        deserialize_with = "nullable_list"
    )]
    pub outputs: Vec<ParameterSpec>,
    #[serde(rename = "apiKey", default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(rename = "flowId", default, skip_serializing_if = "Option::is_none")]
    pub flow_id: Option<String>,
    #[serde(rename = "agentUrl", default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

/// The credential a packaged tool presents to its remote agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    ApiKey(String),
    FlowId(String),
}

/// Which bridge behavior a packaged tool uses at call time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentVariant {
    /// Forwards every event and condenses the terminal one into a summary.
    Summary,
    /// Flow agents: additionally emits each declared output as it appears.
    Outputs,
}

impl AgentDescriptor {
    /// Resolve the descriptor's credential. A flow id wins over an API key;
    /// a descriptor with neither gets an empty API key.
    pub fn credential(&self) -> Credential {
        match (&self.flow_id, &self.api_key) {
            (Some(flow_id), _) => Credential::FlowId(flow_id.clone()),
            (None, Some(api_key)) => Credential::ApiKey(api_key.clone()),
            (None, None) => Credential::ApiKey(String::new()),
        }
    }

    pub fn variant(&self) -> AgentVariant {
        match self.credential() {
            Credential::FlowId(_) => AgentVariant::Outputs,
            Credential::ApiKey(_) => AgentVariant::Summary,
        }
    }

    /// Check that input and output parameter names are each unique.
    pub fn validate(&self) -> Result<(), DescriptorError> {
        for params in [&self.inputs, &self.outputs] {
            let mut seen = HashSet::new();
            for param in params {
                if !seen.insert(param.name.as_str()) {
                    return Err(DescriptorError::DuplicateParameter {
                        agent_id: self.id.clone(),
                        name: param.name.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// The registry sends `null` instead of `[]` for agents without parameters.
fn nullable_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
