// ABOUTME: Classifies a streamed RemoteEvent as terminal or not.
// ABOUTME: Shared by every bridge variant so they agree on when an exchange has reached a final state.

use crate::event::{ARTIFACT_UPDATE_KIND, MESSAGE_KIND, RemoteEvent, TASK_KIND};

/// Task states after which the remote agent will not make further progress.
pub const TERMINAL_TASK_STATES: [&str; 5] =
    ["completed", "canceled", "failed", "rejected", "unknown"];

/// Why an event was classified as terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalReason {
    /// The event carries `final: true`.
    Final,
    /// An artifact-update carrying `lastChunk: true`.
    LastChunk,
    /// A fully resolved message; messages are never chunked.
    Message,
    /// A task in one of [`TERMINAL_TASK_STATES`].
    TaskState(String),
}

/// Classify an event. Returns `None` for progress events.
pub fn classify(event: &RemoteEvent) -> Option<TerminalReason> {
    if event.is_final() {
        return Some(TerminalReason::Final);
    }

    match event.kind() {
        Some(ARTIFACT_UPDATE_KIND) if event.is_last_chunk() => Some(TerminalReason::LastChunk),
        Some(MESSAGE_KIND) => Some(TerminalReason::Message),
        Some(TASK_KIND) => event
            .task_state()
            .filter(|state| TERMINAL_TASK_STATES.contains(state))
            .map(|state| TerminalReason::TaskState(state.to_string())),
        _ => None,
    }
}

pub fn is_terminal(event: &RemoteEvent) -> bool {
    classify(event).is_some()
}
