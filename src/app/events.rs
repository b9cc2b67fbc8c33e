//! Outbound node events.
//!
//! The [`Node`](super::node::Node) emits these through the
//! [`EventSink`](super::ports::EventSink) port. Adapters on the other side
//! decide what to do with them: the stock sink logs them, a fleet
//! dashboard adapter could forward them elsewhere. These are observability
//! events only; protocol-visible state travels over the bus topics.

use crate::link::protocol::Command;
use crate::puzzle::PuzzleState;

/// Structured events emitted by the node core.
#[derive(Debug, Clone)]
pub enum NodeEvent {
    /// The puzzle moved between lifecycle states.
    StateChanged { from: PuzzleState, to: PuzzleState },

    /// The coordination link reached the broker.
    LinkUp,

    /// The coordination link lost the broker (unexpectedly).
    LinkDown,

    /// A liveness ping was published.
    PingSent,

    /// A recognized command arrived and was dispatched.
    CommandReceived(Command),

    /// A registered hook returned an error (dispatch continued).
    HookFault { event: &'static str },

    /// The room controller requested a reboot; the link is down for good
    /// and the host process should act.
    RebootRequested,

    /// The node started (carries the initial puzzle state).
    Started(PuzzleState),
}
