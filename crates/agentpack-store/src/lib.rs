// ABOUTME: Persistence layer for agentpack.
// ABOUTME: Provides the append-only JSONL log of every agent descriptor ever packaged.

pub mod jsonl;

pub use jsonl::{DescriptorLog, JsonlError, Replay};
