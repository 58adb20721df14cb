// ABOUTME: Derives a uniquely named, self-consistent tool artifact pair from the shared template.
// ABOUTME: Pure given its inputs; each (descriptor, index) is specialized independently of the others.

pub mod schema;
pub mod source;

use agentpack_core::{AgentDescriptor, ToolSchema};
use thiserror::Error;

use crate::transliterate::Transliterator;

pub use schema::{map_parameter_type, specialize_schema};
pub use source::{count_identifier, specialize_source};

/// Errors that abort generation of one artifact. Other agents are unaffected.
#[derive(Debug, Error)]
pub enum SpecializeError {
    #[error("agent {agent_id}: unknown parameter type '{declared}' for '{parameter}'")]
    UnknownParameterType {
        agent_id: String,
        parameter: String,
        declared: String,
    },

    #[error("agent {agent_id}: parameter name '{name}' is not unique")]
    DuplicateParameter { agent_id: String, name: String },

    #[error("template source is malformed: {0}")]
    SourceMalformed(String),
}

/// The schema document and source file generated for one agent.
#[derive(Debug, Clone)]
pub struct SpecializedArtifact {
    pub index: usize,
    pub schema: ToolSchema,
    pub source: String,
}

/// Specialize the template for the agent at `index`.
pub fn specialize(
    descriptor: &AgentDescriptor,
    index: usize,
    template_schema: &ToolSchema,
    template_source: &str,
    transliterator: &dyn Transliterator,
) -> Result<SpecializedArtifact, SpecializeError> {
    let schema = specialize_schema(descriptor, index, template_schema, transliterator)?;
    let source = specialize_source(template_source, index)?;

    Ok(SpecializedArtifact {
        index,
        schema,
        source,
    })
}
