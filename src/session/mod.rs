//! Session orchestration
//!
//! The controller owns the session identifier and the turn state machine,
//! routes accepted input to the session service, and is the only writer of
//! the conversation log.

mod controller;
mod uploads;

pub use controller::{SessionController, SKIP_ANSWER};
pub use uploads::PendingUploads;

/// Controller lifecycle phase.
///
/// `Initializing` doubles as the duplicate-start guard: a second
/// initialization attempt in any other phase (or while one is in flight) is
/// a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Session not yet created, or creation in flight
    Initializing,
    /// Expecting a text or transcribed-speech answer
    AwaitingText,
    /// Expecting a document upload batch (or an explicit skip)
    AwaitingUpload,
    /// Flow complete; only reset is accepted
    Done,
    /// Initialization failed; only reset is accepted
    Failed,
}

/// Turn state derived from the most recent service response.
///
/// The client never infers the next input mode from message content; these
/// three fields alone drive it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TurnState {
    pub awaiting_followup: bool,
    pub done: bool,
    pub question_index: u32,
}
