//! Pacer state management

use tokio::sync::watch;

/// Streaming pacer state machine
///
/// Transitions are validated so every stage of the pipeline observes a
/// consistent lifecycle: `Idle → Loading → Ready → Streaming ⇄ Looping →
/// Stopped`, with `Error` reachable from `Loading` and `Streaming`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacerState {
    /// No source loaded, nothing running
    Idle,

    /// Opening the source and probing stream info
    Loading,

    /// Source open, armed to stream from the pending start time
    Ready,

    /// Actively pulling, reordering and sending samples
    Streaming,

    /// Between play-throughs: offset advanced, source re-opening
    Looping,

    /// Play-through finished (or session stopped) with looping disabled
    Stopped,

    /// A fatal media or transport error ended the play-through
    Error,
}

impl PacerState {
    /// Check if this state transition is valid
    pub fn can_transition_to(&self, target: &PacerState) -> bool {
        use PacerState::*;

        match (self, target) {
            // From Idle
            (Idle, Loading) => true,

            // From Loading
            (Loading, Ready) => true,
            (Loading, Error) => true,

            // From Ready
            (Ready, Streaming) => true,
            (Ready, Loading) => true, // seek re-arms with a new start time
            (Ready, Stopped) => true,

            // From Streaming
            (Streaming, Looping) => true,
            (Streaming, Stopped) => true,
            (Streaming, Error) => true,

            // From Looping
            (Looping, Streaming) => true,
            (Looping, Stopped) => true,
            (Looping, Error) => true,

            // Terminal states can be re-armed by a new load
            (Stopped, Loading) => true,
            (Error, Loading) => true,

            // Self-transitions
            (a, b) if a == b => true,

            // All other transitions invalid
            _ => false,
        }
    }

    /// Get a human-readable description of this state
    pub fn description(&self) -> &'static str {
        match self {
            PacerState::Idle => "Idle",
            PacerState::Loading => "Loading",
            PacerState::Ready => "Ready",
            PacerState::Streaming => "Streaming",
            PacerState::Looping => "Looping",
            PacerState::Stopped => "Stopped",
            PacerState::Error => "Error",
        }
    }

    /// Check if the pacer is actively streaming (including loop turnaround)
    pub fn is_active(&self) -> bool {
        matches!(self, PacerState::Streaming | PacerState::Looping)
    }

    pub fn is_streaming(&self) -> bool {
        matches!(self, PacerState::Streaming)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PacerState::Stopped | PacerState::Error)
    }
}

/// Publish a state change through a watch channel, enforcing the
/// transition rules. Invalid transitions are logged and dropped so a
/// racing observer never sees an inconsistent lifecycle.
pub fn publish(tx: &watch::Sender<PacerState>, next: PacerState) -> bool {
    tx.send_if_modified(|current| {
        if *current == next {
            return false;
        }
        if !current.can_transition_to(&next) {
            log::warn!("ignoring invalid pacer transition {} -> {}", current, next);
            return false;
        }
        log::debug!("pacer state {} -> {}", current, next);
        *current = next;
        true
    })
}

impl std::fmt::Display for PacerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}
