//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured node events to the
//! process logger. A fleet-monitoring adapter would implement the same
//! trait and forward these elsewhere; the core never knows the
//! difference.

use log::info;

use crate::app::events::NodeEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`NodeEvent`].
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &NodeEvent) {
        match event {
            NodeEvent::StateChanged { from, to } => {
                info!("STATE  | {from} -> {to}");
            }
            NodeEvent::LinkUp => {
                info!("LINK   | up");
            }
            NodeEvent::LinkDown => {
                info!("LINK   | down, reconnecting");
            }
            NodeEvent::PingSent => {
                info!("PING   | sent");
            }
            NodeEvent::CommandReceived(command) => {
                info!("CMD    | {command}");
            }
            NodeEvent::HookFault { event } => {
                info!("HOOK   | '{event}' handler fault");
            }
            NodeEvent::RebootRequested => {
                info!("REBOOT | ordered by room controller");
            }
            NodeEvent::Started(state) => {
                info!("START  | initial_state={state}");
            }
        }
    }
}
