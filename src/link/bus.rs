//! Message-bus seam.
//!
//! [`BusPort`] is the one boundary the coordination link drives. Adapters
//! own the client library and its threads; the contract here is that
//! `connect` registers the given [`LinkMailbox`] so delivery and the
//! connected flag are the only things a network callback ever touches.

use crate::error::BusError;
use crate::link::channels::LinkMailbox;

/// Session parameters for one connection attempt. The will is registered
/// with the broker at connect time and fires only on ungraceful loss.
#[derive(Debug, Clone, Copy)]
pub struct ConnectRequest<'a> {
    pub client_id: &'a str,
    pub keep_alive_secs: u16,
    pub will_topic: &'a str,
    pub will_payload: &'a str,
}

/// Pub/sub transport as seen by the link.
///
/// All methods are synchronous calls on the poll thread; an adapter that
/// wraps an asynchronous client resolves each call before returning.
pub trait BusPort {
    /// Open a session and hand the adapter its delivery mailbox. On `Ok`
    /// the adapter has stored the mailbox and marked it connected.
    fn connect(&mut self, req: &ConnectRequest<'_>, mailbox: LinkMailbox) -> Result<(), BusError>;

    /// Graceful teardown; must not fire the will and must mark the
    /// mailbox disconnected. Safe to call when already down.
    fn disconnect(&mut self);

    fn subscribe(&mut self, filter: &str) -> Result<(), BusError>;

    fn publish(&mut self, topic: &str, payload: &str, retain: bool) -> Result<(), BusError>;
}

/// Bus that accepts every call and delivers nothing. Stands in when a
/// node runs stand-alone, and as a placeholder in tests that never reach
/// the network.
pub struct NullBus {
    mailbox: Option<LinkMailbox>,
}

impl NullBus {
    pub fn new() -> Self {
        Self { mailbox: None }
    }
}

impl Default for NullBus {
    fn default() -> Self {
        Self::new()
    }
}

impl BusPort for NullBus {
    fn connect(&mut self, _req: &ConnectRequest<'_>, mailbox: LinkMailbox) -> Result<(), BusError> {
        mailbox.mark_connected();
        self.mailbox = Some(mailbox);
        Ok(())
    }

    fn disconnect(&mut self) {
        if let Some(mailbox) = self.mailbox.take() {
            mailbox.mark_disconnected();
        }
    }

    fn subscribe(&mut self, _filter: &str) -> Result<(), BusError> {
        Ok(())
    }

    fn publish(&mut self, _topic: &str, _payload: &str, _retain: bool) -> Result<(), BusError> {
        Ok(())
    }
}
