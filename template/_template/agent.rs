// ABOUTME: Tool template for API-key agents, specialized once per packaged agent.
// ABOUTME: Streams the remote exchange and finishes with a summary of the terminal event.

use agentpack_bridge::{Tool, ToolMessageStream, ToolParameters};

/// A packaged remote agent. Its schema document is `<name>.yaml`.
#[allow(non_camel_case_types)]
#[derive(Debug, Default, Clone, Copy)]
pub struct agent;

impl agent {
    pub const NAME: &'static str = stringify!(agent);
}

fn agent_label() -> String {
    format!("remote agent {}", agent::NAME)
}

impl Tool for agent {
    fn invoke(&self, parameters: ToolParameters) -> ToolMessageStream {
        tracing::debug!("{} invoked with {} parameter(s)", agent_label(), parameters.len());
        agentpack_bridge::invoke(agent::NAME, parameters)
    }
}
