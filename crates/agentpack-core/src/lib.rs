// ABOUTME: Core library for agentpack, containing the shared domain model.
// ABOUTME: Descriptors, tool schema documents, manifests, remote stream events and terminal classification.

pub mod descriptor;
pub mod event;
pub mod manifest;
pub mod naming;
pub mod schema;
pub mod terminal;

pub use descriptor::{AgentDescriptor, AgentVariant, Credential, DescriptorError, ParameterSpec};
pub use event::RemoteEvent;
pub use manifest::{PluginManifest, ProviderManifest};
pub use schema::{LocalizedText, OutputParameter, SchemaParameter, ToolSchema};
pub use terminal::{TerminalReason, classify, is_terminal};
