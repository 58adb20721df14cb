// ABOUTME: Tool template for flow agents, specialized once per packaged agent.
// ABOUTME: Streams the remote exchange and emits each declared output as it appears.

use agentpack_bridge::{Tool, ToolMessage, ToolMessageStream, ToolParameters};
use futures::StreamExt;

/// A packaged flow agent. Its schema document is `<name>.yaml`.
#[allow(non_camel_case_types)]
#[derive(Debug, Default, Clone, Copy)]
pub struct agent;

impl agent {
    pub const NAME: &'static str = stringify!(agent);

    /// Run the flow and keep only its outputs.
    pub async fn outputs(&self, parameters: ToolParameters) -> Vec<(String, String)> {
        self.invoke(parameters)
            .filter_map(|message| async move {
                match message {
                    ToolMessage::Output { name, value } => Some((name, value)),
                    _ => None,
                }
            })
            .collect()
            .await
    }
}

impl Tool for agent {
    fn invoke(&self, parameters: ToolParameters) -> ToolMessageStream {
        tracing::debug!(r#"flow "{}" invoked"#, agent::NAME);
        agentpack_bridge::invoke(agent::NAME, parameters)
    }
}
