//! In-process broker stand-in.
//!
//! One node-side [`BusPort`] plus a driver-side handle on the same shared
//! state. The driver clone plays room controller: inject frames, observe
//! everything the node published, script connect failures, and cut the
//! connection to watch the will fire. Deterministic and offline, which is
//! what the bench binary and the integration tests run against.
//!
//! Semantics follow the real broker where it matters here: a graceful
//! `disconnect` withdraws the will, an ungraceful loss publishes it
//! retained; subscriptions die with the session.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::BusError;
use crate::link::bus::{BusPort, ConnectRequest};
use crate::link::channels::LinkMailbox;

/// One frame as the broker saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedFrame {
    pub topic: String,
    pub payload: String,
    pub retain: bool,
}

#[derive(Default)]
struct BrokerState {
    connect_attempts: u32,
    fail_next_connects: u32,
    connected: bool,
    mailbox: Option<LinkMailbox>,
    will: Option<(String, String)>,
    subscriptions: Vec<String>,
    published: Vec<PublishedFrame>,
}

#[derive(Clone, Default)]
pub struct MemoryBus {
    shared: Arc<Mutex<BrokerState>>,
}

impl MemoryBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, BrokerState> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ── scripting ──

    /// Make the next `n` connect attempts fail.
    pub fn fail_next_connects(&self, n: u32) {
        self.state().fail_next_connects = n;
    }

    /// Deliver a frame as the room controller. Returns `false` when the
    /// node is offline, not subscribed, or its mailbox refused the frame.
    pub fn inject(&self, topic: &str, payload: &str) -> bool {
        let state = self.state();
        if !state.connected {
            return false;
        }
        if !state
            .subscriptions
            .iter()
            .any(|filter| filter_matches(filter, topic))
        {
            return false;
        }
        state
            .mailbox
            .as_ref()
            .is_some_and(|mailbox| mailbox.deliver(topic, payload))
    }

    /// Cut the session from the broker side. The registered will is
    /// published retained, exactly as a real broker announces a vanished
    /// client.
    pub fn drop_connection(&self) {
        let mut state = self.state();
        if !state.connected {
            return;
        }
        state.connected = false;
        state.subscriptions.clear();
        if let Some(mailbox) = state.mailbox.take() {
            mailbox.mark_disconnected();
        }
        if let Some((topic, payload)) = state.will.take() {
            state.published.push(PublishedFrame {
                topic,
                payload,
                retain: true,
            });
        }
    }

    // ── inspection ──

    pub fn is_connected(&self) -> bool {
        self.state().connected
    }

    pub fn connect_attempts(&self) -> u32 {
        self.state().connect_attempts
    }

    pub fn subscriptions(&self) -> Vec<String> {
        self.state().subscriptions.clone()
    }

    pub fn published(&self) -> Vec<PublishedFrame> {
        self.state().published.clone()
    }

    /// Payloads seen on one topic, in publish order.
    pub fn published_on(&self, topic: &str) -> Vec<String> {
        self.state()
            .published
            .iter()
            .filter(|frame| frame.topic == topic)
            .map(|frame| frame.payload.clone())
            .collect()
    }
}

impl BusPort for MemoryBus {
    fn connect(&mut self, req: &ConnectRequest<'_>, mailbox: LinkMailbox) -> Result<(), BusError> {
        let mut state = self.state();
        state.connect_attempts += 1;
        if state.fail_next_connects > 0 {
            state.fail_next_connects -= 1;
            return Err(BusError::ConnectFailed);
        }
        mailbox.mark_connected();
        state.mailbox = Some(mailbox);
        state.will = Some((req.will_topic.to_string(), req.will_payload.to_string()));
        state.connected = true;
        Ok(())
    }

    fn disconnect(&mut self) {
        let mut state = self.state();
        state.connected = false;
        state.will = None;
        state.subscriptions.clear();
        if let Some(mailbox) = state.mailbox.take() {
            mailbox.mark_disconnected();
        }
    }

    fn subscribe(&mut self, filter: &str) -> Result<(), BusError> {
        let mut state = self.state();
        if !state.connected {
            return Err(BusError::NotConnected);
        }
        state.subscriptions.push(filter.to_string());
        Ok(())
    }

    fn publish(&mut self, topic: &str, payload: &str, retain: bool) -> Result<(), BusError> {
        let mut state = self.state();
        if !state.connected {
            return Err(BusError::NotConnected);
        }
        state.published.push(PublishedFrame {
            topic: topic.to_string(),
            payload: payload.to_string(),
            retain,
        });
        Ok(())
    }
}

/// Exact match plus the trailing `/#` wildcard, which is the only filter
/// shape the link uses.
fn filter_matches(filter: &str, topic: &str) -> bool {
    match filter.strip_suffix("/#") {
        Some(prefix) => {
            topic == prefix
                || topic
                    .strip_prefix(prefix)
                    .is_some_and(|rest| rest.starts_with('/'))
        }
        None => filter == topic,
    }
}
