//! Bounded hand-off points between network callbacks and the poll thread.
//!
//! ```text
//!   bus client thread                       poll thread
//!   ─────────────────                       ───────────
//!   on_message ──► LinkMailbox.deliver ──►  dispatch_inbound
//!   on_connect ──► mark_connected      ──►  (flag read)
//!
//!   puzzle hooks ─► StatusOutbox.send  ──►  drain_outbox ─► publish
//! ```
//!
//! Callbacks perform only benign writes: push a frame, flip the connected
//! flag. All protocol decisions happen later on the poll thread. Both
//! queues are fixed-depth; when full, the newest item is dropped and
//! counted rather than blocking the delivering thread.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;

use crate::link::protocol::Status;

pub const FRAME_TOPIC_CAP: usize = 96;
pub const FRAME_PAYLOAD_CAP: usize = 192;

const INBOUND_DEPTH: usize = 16;
const STATUS_DEPTH: usize = 8;

/// One raw frame as delivered by the bus, bounded so a hostile publisher
/// cannot balloon the queue.
#[derive(Debug, Clone, Default)]
pub struct InboundFrame {
    pub topic: heapless::String<FRAME_TOPIC_CAP>,
    pub payload: heapless::String<FRAME_PAYLOAD_CAP>,
}

// ───────────────────────────── inbound mailbox ─────────────────────────────

struct MailboxShared {
    connected: AtomicBool,
    frames: Channel<CriticalSectionRawMutex, InboundFrame, INBOUND_DEPTH>,
    dropped: AtomicU32,
}

/// Handle given to bus adapters; cloned freely across threads.
#[derive(Clone)]
pub struct LinkMailbox {
    shared: Arc<MailboxShared>,
}

impl LinkMailbox {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(MailboxShared {
                connected: AtomicBool::new(false),
                frames: Channel::new(),
                dropped: AtomicU32::new(0),
            }),
        }
    }

    pub fn mark_connected(&self) {
        self.shared.connected.store(true, Ordering::Release);
    }

    pub fn mark_disconnected(&self) {
        self.shared.connected.store(false, Ordering::Release);
    }

    pub fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::Acquire)
    }

    /// Queue one frame for the poll thread. Returns `false` when the frame
    /// was dropped, either oversize or queue-full.
    pub fn deliver(&self, topic: &str, payload: &str) -> bool {
        let mut frame = InboundFrame::default();
        if frame.topic.push_str(topic).is_err() || frame.payload.push_str(payload).is_err() {
            self.shared.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        if self.shared.frames.try_send(frame).is_err() {
            self.shared.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        true
    }

    pub(crate) fn next_frame(&self) -> Option<InboundFrame> {
        self.shared.frames.try_receive().ok()
    }

    /// Frames discarded since start; nonzero means the poll loop is not
    /// keeping up or a publisher is flooding.
    pub fn dropped(&self) -> u32 {
        self.shared.dropped.load(Ordering::Relaxed)
    }
}

impl Default for LinkMailbox {
    fn default() -> Self {
        Self::new()
    }
}

// ───────────────────────────── status outbox ────────────────────────────────

/// Queue carrying status announcements from puzzle hooks to the link.
/// Hooks hold only this handle, never the link itself, so a command that
/// drives the puzzle cannot re-enter the link mid-dispatch.
#[derive(Clone)]
pub struct StatusOutbox {
    queue: Arc<Channel<CriticalSectionRawMutex, Status, STATUS_DEPTH>>,
}

impl StatusOutbox {
    pub fn new() -> Self {
        Self {
            queue: Arc::new(Channel::new()),
        }
    }

    /// Returns `false` when the outbox is full and the status was dropped.
    pub fn send(&self, status: Status) -> bool {
        self.queue.try_send(status).is_ok()
    }

    pub(crate) fn next(&self) -> Option<Status> {
        self.queue.try_receive().ok()
    }
}

impl Default for StatusOutbox {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mailbox_delivers_in_order() {
        let mailbox = LinkMailbox::new();
        assert!(mailbox.deliver("COPI/a/COMMANDS", "RESET"));
        assert!(mailbox.deliver("COPI/a/PONG", ""));

        let first = mailbox.next_frame().unwrap();
        assert_eq!(first.topic.as_str(), "COPI/a/COMMANDS");
        assert_eq!(first.payload.as_str(), "RESET");
        let second = mailbox.next_frame().unwrap();
        assert_eq!(second.topic.as_str(), "COPI/a/PONG");
        assert!(mailbox.next_frame().is_none());
    }

    #[test]
    fn oversize_frame_is_dropped_and_counted() {
        let mailbox = LinkMailbox::new();
        let long = "x".repeat(FRAME_PAYLOAD_CAP + 1);
        assert!(!mailbox.deliver("COPI/a/COMMANDS", &long));
        assert_eq!(mailbox.dropped(), 1);
        assert!(mailbox.next_frame().is_none());
    }

    #[test]
    fn full_mailbox_drops_newest() {
        let mailbox = LinkMailbox::new();
        for _ in 0..INBOUND_DEPTH {
            assert!(mailbox.deliver("COPI/a/COMMANDS", "RESET"));
        }
        assert!(!mailbox.deliver("COPI/a/COMMANDS", "RESET"));
        assert_eq!(mailbox.dropped(), 1);
    }

    #[test]
    fn connected_flag_is_shared_across_clones() {
        let mailbox = LinkMailbox::new();
        let handle = mailbox.clone();
        assert!(!mailbox.is_connected());
        handle.mark_connected();
        assert!(mailbox.is_connected());
        handle.mark_disconnected();
        assert!(!mailbox.is_connected());
    }

    #[test]
    fn outbox_reports_overflow() {
        let outbox = StatusOutbox::new();
        for _ in 0..STATUS_DEPTH {
            assert!(outbox.send(Status::Active));
        }
        assert!(!outbox.send(Status::Solved));
        assert_eq!(outbox.next(), Some(Status::Active));
        assert!(outbox.send(Status::Solved), "drain frees a slot");
    }
}
