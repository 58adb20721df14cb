// ABOUTME: Relative locations of the template files inside a staged package tree.
// ABOUTME: Defaults match the template tree shipped in the repository's template/ directory.

use std::path::{Path, PathBuf};

use agentpack_core::AgentVariant;

/// Where the assembler finds template inputs and writes shared outputs,
/// relative to the staged directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateLayout {
    pub plugin_manifest: PathBuf,
    pub provider_source: PathBuf,
    pub provider_dist: PathBuf,
    pub tool_schema: PathBuf,
    pub summary_source: PathBuf,
    pub outputs_source: PathBuf,
}

impl Default for TemplateLayout {
    fn default() -> Self {
        Self {
            plugin_manifest: PathBuf::from("manifest.yaml"),
            provider_source: PathBuf::from("_template/provider.yaml"),
            provider_dist: PathBuf::from("provider/agents.yaml"),
            tool_schema: PathBuf::from("_template/tool.yaml"),
            summary_source: PathBuf::from("_template/agent.rs"),
            outputs_source: PathBuf::from("_template/agent_outputs.rs"),
        }
    }
}

impl TemplateLayout {
    /// The template source used for agents of the given variant.
    pub fn source_for(&self, variant: AgentVariant) -> &Path {
        match variant {
            AgentVariant::Summary => &self.summary_source,
            AgentVariant::Outputs => &self.outputs_source,
        }
    }
}
