// ABOUTME: The tool schema document written next to every generated tool source.
// ABOUTME: Typed view over the host's tool YAML; unknown template keys are preserved on round-trip.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::descriptor::AgentVariant;

/// Text carried in the host's two display locales.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizedText {
    #[serde(rename = "en_US", default)]
    pub en_us: String,
    #[serde(rename = "zh_Hans", default, skip_serializing_if = "Option::is_none")]
    pub zh_hans: Option<String>,
}

impl LocalizedText {
    pub fn new(en_us: impl Into<String>, zh_hans: impl Into<String>) -> Self {
        Self {
            en_us: en_us.into(),
            zh_hans: Some(zh_hans.into()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolIdentity {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub label: LocalizedText,
    #[serde(flatten)]
    pub rest: BTreeMap<String, serde_yaml::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolDescription {
    #[serde(default)]
    pub human: LocalizedText,
    #[serde(default)]
    pub llm: String,
}

/// An input parameter as the host presents it to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaParameter {
    pub name: String,
    #[serde(default = "default_form")]
    pub form: String,
    #[serde(default)]
    pub human_description: LocalizedText,
    #[serde(default)]
    pub label: LocalizedText,
    #[serde(default)]
    pub llm_description: String,
    #[serde(default)]
    pub required: bool,
    #[serde(rename = "type")]
    pub wire_type: String,
}

fn default_form() -> String {
    "llm".to_string()
}

/// A declared output of a flow agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputParameter {
    pub name: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub wire_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolExtra {
    /// Back-reference to the generated source, relative to the package root.
    #[serde(default)]
    pub source: String,
    #[serde(flatten)]
    pub rest: BTreeMap<String, serde_yaml::Value>,
}

/// A complete tool schema document.
///
/// `parameters` is `None` when the agent takes no inputs; it serializes as
/// an explicit `null`, which the host treats differently from `[]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    #[serde(default)]
    pub identity: ToolIdentity,
    #[serde(default)]
    pub description: ToolDescription,
    #[serde(default)]
    pub parameters: Option<Vec<SchemaParameter>>,
    #[serde(default)]
    pub out_parameters: Vec<OutputParameter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub extra: ToolExtra,
    #[serde(flatten)]
    pub rest: BTreeMap<String, serde_yaml::Value>,
}

impl ToolSchema {
    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(text)
    }

    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    /// Flow agents carry a flow id and use the outputs variant.
    pub fn variant(&self) -> AgentVariant {
        if self.flow_id.is_some() {
            AgentVariant::Outputs
        } else {
            AgentVariant::Summary
        }
    }

    /// Declared inputs, treating the "no parameters" marker as empty.
    pub fn inputs(&self) -> &[SchemaParameter] {
        self.parameters.as_deref().unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEMPLATE: &str = r#"
identity:
  name: agent
  author: agentpack
  label:
    en_US: Agent
  icon: icon.svg
description:
  human:
    en_US: Template agent
  llm: Template agent
parameters: []
out_parameters: []
extra:
  source: _template/agent.rs
  timeout: 30
"#;

    #[test]
    fn parses_template_and_preserves_unknown_keys() {
        let schema = ToolSchema::from_yaml(TEMPLATE).unwrap();
        assert_eq!(schema.identity.name, "agent");
        assert_eq!(schema.extra.source, "_template/agent.rs");
        assert!(schema.identity.rest.contains_key("icon"));
        assert!(schema.extra.rest.contains_key("timeout"));

        let yaml = schema.to_yaml().unwrap();
        assert!(yaml.contains("icon: icon.svg"));
        assert!(yaml.contains("timeout: 30"));
    }

    #[test]
    fn missing_parameters_serialize_as_null() {
        let mut schema = ToolSchema::from_yaml(TEMPLATE).unwrap();
        schema.parameters = None;

        let yaml = schema.to_yaml().unwrap();
        assert!(yaml.contains("parameters: null"), "yaml was: {}", yaml);

        let back = ToolSchema::from_yaml(&yaml).unwrap();
        assert!(back.parameters.is_none());
        assert!(back.inputs().is_empty());
    }

    #[test]
    fn empty_parameter_list_stays_distinct_from_null() {
        let schema = ToolSchema::from_yaml(TEMPLATE).unwrap();
        assert_eq!(schema.parameters, Some(vec![]));
    }

    #[test]
    fn variant_follows_flow_id() {
        let mut schema = ToolSchema::default();
        assert_eq!(schema.variant(), AgentVariant::Summary);
        schema.flow_id = Some("flow-1".into());
        assert_eq!(schema.variant(), AgentVariant::Outputs);
    }
}
