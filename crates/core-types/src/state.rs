//! Bridge lifecycle state machine.
//!
//! ## State transition diagram
//!
//! ```text
//!              ┌────────────┐
//!              │ Connecting │
//!              └─────┬──────┘
//!      both open     │     fatal / cancel
//!          ┌─────────┴────────────┐
//!          ▼                      ▼
//!    ┌──────────┐          ┌──────────────┐     ┌─────────┐
//! ┌─►│ Bridging │─────────►│ ShuttingDown │────►│ Stopped │
//! │  └───┬──┬───┘ fatal /  └──────────────┘     └─────────┘
//! │      │  │     cancel          ▲
//! │ serial  │ pipe                │ fatal / cancel
//! │ fault│  │ drop                │
//! │      ▼  ▼                     │
//! │ ┌───────────────────────┐     │
//! └─┤ ReconnectingSerial /  ├─────┘
//!   │ ReconnectingPipe      │
//!   └───────────────────────┘
//! ```
//!
//! ## State invariants
//!
//! - **Bridging**: both endpoint handles are live.
//! - **ReconnectingSerial**: the pipe handle stays live and untouched.
//! - **ReconnectingPipe**: the serial handle stays live and untouched.
//! - **ShuttingDown**: both handles are being released; always reaches
//!   Stopped.

/// Lifecycle state of the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    /// Opening both endpoints for the first time.
    Connecting,
    /// Both endpoints open, bytes being forwarded.
    Bridging,
    /// Serial handle lost; re-establishing it.
    ReconnectingSerial,
    /// Pipe handle lost; re-establishing it.
    ReconnectingPipe,
    /// Tearing down both endpoints.
    ShuttingDown,
    /// Terminal.
    Stopped,
}

impl BridgeState {
    /// Validate that moving to `next` is a legal transition.
    pub fn can_transition_to(self, next: BridgeState) -> bool {
        use BridgeState::*;

        match (self, next) {
            (Connecting, Bridging) => true,
            (Connecting, ShuttingDown) => true, // startup failed or cancelled

            (Bridging, ReconnectingSerial) => true,
            (Bridging, ReconnectingPipe) => true,
            (Bridging, ShuttingDown) => true,

            (ReconnectingSerial, Bridging) => true,
            (ReconnectingSerial, ShuttingDown) => true,
            (ReconnectingPipe, Bridging) => true,
            (ReconnectingPipe, ShuttingDown) => true,

            (ShuttingDown, Stopped) => true,

            _ => false,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, BridgeState::Stopped)
    }

    /// Operator-facing description.
    pub fn status_text(self) -> &'static str {
        match self {
            BridgeState::Connecting => "Connecting...",
            BridgeState::Bridging => "Bridging",
            BridgeState::ReconnectingSerial => "Serial port lost, reconnecting...",
            BridgeState::ReconnectingPipe => "Pipe lost, reconnecting...",
            BridgeState::ShuttingDown => "Shutting down...",
            BridgeState::Stopped => "Stopped",
        }
    }
}
