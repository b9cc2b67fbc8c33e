//! Coordination link: broker session lifecycle, liveness pings, and
//! command dispatch for one node.
//!
//! ```text
//!                 connect ok
//!   Disconnected ────────────▶ Connected ──REBOOT──▶ Halted
//!        ▲  │                     │
//!        │  │ connect err         │ connection lost
//!        │  ▼                     ▼
//!        retry in 2,4,8,…,cap   retry immediately
//! ```
//!
//! Everything runs on the poll thread. Network callbacks only feed the
//! [`LinkMailbox`]; [`CoordinationLink::process_events`] does the protocol
//! work against deadlines on the monotonic clock, so a node with a dead
//! broker keeps scanning its sensors at full rate.

pub mod bus;
pub mod channels;
pub mod protocol;

use log::{debug, info, warn};

use crate::app::events::NodeEvent;
use crate::app::ports::{EventSink, SharedClock, SystemProbePort};
use crate::config::NodeConfig;
use crate::link::bus::{BusPort, ConnectRequest};
use crate::link::channels::{InboundFrame, LinkMailbox, StatusOutbox};
use crate::link::protocol::{Command, Inbound, PingPayload, Status, StatusMessage, Temperature};
use crate::puzzle::hooks::{Hook, HookError, HookResult};

// ---------------------------------------------------------------------------
// Connection state and retry schedule
// ---------------------------------------------------------------------------

/// Session state as seen by the poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// Offline; the next attempt is due at `retry_at_ms` on the monotonic
    /// clock.
    Disconnected { retry_at_ms: u64 },
    /// A connect call is in flight (transient within one poll).
    Connecting,
    Connected,
    /// Deliberate reboot teardown. Terminal; the link never reconnects.
    Halted,
}

/// Doubling retry schedule. Produces base, 2·base, 4·base, … capped, and
/// rearms to base after a successful connect. Deadlines are compared
/// against the clock; nothing here sleeps.
#[derive(Debug, Clone, Copy)]
struct Backoff {
    current_secs: u32,
    base_secs: u32,
    cap_secs: u32,
}

impl Backoff {
    fn new(base_secs: u32, cap_secs: u32) -> Self {
        Self {
            current_secs: base_secs,
            base_secs,
            cap_secs: cap_secs.max(base_secs),
        }
    }

    /// Delay to apply to the attempt that just failed.
    fn next_delay_secs(&mut self) -> u32 {
        let delay = self.current_secs;
        self.current_secs = (self.current_secs * 2).min(self.cap_secs);
        delay
    }

    fn reset(&mut self) {
        self.current_secs = self.base_secs;
    }
}

// ---------------------------------------------------------------------------
// Command callbacks
// ---------------------------------------------------------------------------

/// Slots the room controller can reach, plus the local ping/pong taps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkHook {
    Reset,
    Activate,
    Solve,
    Reboot,
    Pong,
    Ping,
}

impl LinkHook {
    pub fn name(self) -> &'static str {
        match self {
            Self::Reset => "reset",
            Self::Activate => "activate",
            Self::Solve => "solve",
            Self::Reboot => "reboot",
            Self::Pong => "pong",
            Self::Ping => "ping",
        }
    }
}

/// Registration table for command handlers. Unregistered slots are silent
/// no-ops; a handler error is reported on the error topic but never stops
/// dispatch.
#[derive(Default)]
pub struct CommandCallbacks {
    reset: Option<Hook>,
    activate: Option<Hook>,
    solve: Option<Hook>,
    reboot: Option<Hook>,
    pong: Option<Hook>,
    ping: Option<Hook>,
}

impl CommandCallbacks {
    pub fn on_reset(&mut self, hook: impl FnMut() -> HookResult + 'static) {
        self.reset = Some(Box::new(hook));
    }

    pub fn on_activate(&mut self, hook: impl FnMut() -> HookResult + 'static) {
        self.activate = Some(Box::new(hook));
    }

    pub fn on_solve(&mut self, hook: impl FnMut() -> HookResult + 'static) {
        self.solve = Some(Box::new(hook));
    }

    /// Runs after the deliberate reboot disconnect completes, once the
    /// link has halted.
    pub fn on_reboot(&mut self, hook: impl FnMut() -> HookResult + 'static) {
        self.reboot = Some(Box::new(hook));
    }

    pub fn on_pong(&mut self, hook: impl FnMut() -> HookResult + 'static) {
        self.pong = Some(Box::new(hook));
    }

    pub fn on_ping(&mut self, hook: impl FnMut() -> HookResult + 'static) {
        self.ping = Some(Box::new(hook));
    }

    fn fire(&mut self, which: LinkHook) -> Option<HookError> {
        let slot = match which {
            LinkHook::Reset => &mut self.reset,
            LinkHook::Activate => &mut self.activate,
            LinkHook::Solve => &mut self.solve,
            LinkHook::Reboot => &mut self.reboot,
            LinkHook::Pong => &mut self.pong,
            LinkHook::Ping => &mut self.ping,
        };
        slot.as_mut().and_then(|hook| hook().err())
    }
}

// ---------------------------------------------------------------------------
// The link
// ---------------------------------------------------------------------------

enum Parsed {
    Run(Command),
    Pong,
    Unknown,
}

/// Drives one [`BusPort`] session on behalf of a node.
pub struct CoordinationLink<B: BusPort> {
    bus: B,
    mailbox: LinkMailbox,
    outbox: StatusOutbox,
    clock: SharedClock,
    probe: Box<dyn SystemProbePort>,
    callbacks: CommandCallbacks,

    node_id: String,
    role: String,
    keep_alive_secs: u16,
    ping_interval_ms: u64,
    command_filter: String,
    state_topic: String,
    error_topic: String,
    ping_topic: String,

    state: LinkState,
    status: Status,
    backoff: Backoff,
    last_ping_ms: Option<u64>,
}

impl<B: BusPort> CoordinationLink<B> {
    pub fn new(
        config: &NodeConfig,
        bus: B,
        probe: Box<dyn SystemProbePort>,
        clock: SharedClock,
    ) -> Self {
        Self {
            bus,
            mailbox: LinkMailbox::new(),
            outbox: StatusOutbox::new(),
            clock,
            probe,
            callbacks: CommandCallbacks::default(),
            node_id: config.node_id.clone(),
            role: config.role.clone(),
            keep_alive_secs: config.keep_alive_secs,
            ping_interval_ms: (f64::from(config.ping_interval_secs) * 1000.0) as u64,
            command_filter: protocol::command_filter(&config.node_id),
            state_topic: protocol::state_topic(&config.node_id),
            error_topic: protocol::error_topic(&config.node_id),
            ping_topic: protocol::ping_topic(&config.node_id),
            state: LinkState::Disconnected { retry_at_ms: 0 },
            status: Status::Reset,
            backoff: Backoff::new(
                u32::from(config.backoff_base_secs),
                u32::from(config.backoff_cap_secs),
            ),
            last_ping_ms: None,
        }
    }

    // ── accessors ──

    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Administrative status, the last value announced (or recorded while
    /// offline) on the STATE topic.
    pub fn status(&self) -> Status {
        self.status
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.state, LinkState::Connected) && self.mailbox.is_connected()
    }

    pub fn is_halted(&self) -> bool {
        matches!(self.state, LinkState::Halted)
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn callbacks_mut(&mut self) -> &mut CommandCallbacks {
        &mut self.callbacks
    }

    /// Handle for announcing status changes from outside the link. Safe to
    /// call from puzzle hooks mid-dispatch; the queue is drained on the
    /// next poll step.
    pub fn outbox(&self) -> StatusOutbox {
        self.outbox.clone()
    }

    // ── poll step ──

    /// One poll step: reconnect when due, send the ping when due, dispatch
    /// everything the mailbox holds, publish queued status changes. Never
    /// blocks and never sleeps.
    pub fn process_events(&mut self, sink: &mut dyn EventSink) {
        let now_ms = self.clock.monotonic_ms();
        match self.state {
            LinkState::Halted | LinkState::Connecting => {}
            LinkState::Disconnected { retry_at_ms } => {
                self.drain_outbox();
                if now_ms >= retry_at_ms {
                    self.attempt_connect(now_ms, sink);
                }
            }
            LinkState::Connected => {
                if !self.mailbox.is_connected() {
                    self.handle_connection_loss(now_ms, sink);
                    return;
                }
                self.dispatch_inbound(sink);
                if self.mailbox.is_connected() {
                    self.maybe_ping(now_ms, sink);
                    self.drain_outbox();
                }
            }
        }
    }

    /// Graceful teardown on process exit. The broker sees a clean
    /// disconnect, so the will does not fire and the retained status stays
    /// as last announced.
    pub fn shutdown(&mut self) {
        if matches!(self.state, LinkState::Connected) {
            info!("link[{}]: shutting down", self.node_id);
            self.bus.disconnect();
            self.mailbox.mark_disconnected();
        }
        self.state = LinkState::Halted;
    }

    // ── connection lifecycle ──

    fn attempt_connect(&mut self, now_ms: u64, sink: &mut dyn EventSink) {
        self.state = LinkState::Connecting;
        info!("link[{}]: connecting", self.node_id);
        let req = ConnectRequest {
            client_id: &self.node_id,
            keep_alive_secs: self.keep_alive_secs,
            will_topic: &self.state_topic,
            will_payload: protocol::LAST_WILL_PAYLOAD,
        };
        match self.bus.connect(&req, self.mailbox.clone()) {
            Ok(()) => {
                self.mailbox.mark_connected();
                self.state = LinkState::Connected;
                self.backoff.reset();
                info!("link[{}]: connected", self.node_id);
                sink.emit(&NodeEvent::LinkUp);
                if let Err(err) = self.bus.subscribe(&self.command_filter) {
                    warn!("link[{}]: subscribe failed: {err}", self.node_id);
                }
                // Announce the current status and prove liveness right away.
                self.publish_status(self.status);
                self.send_ping(now_ms, sink);
            }
            Err(err) => {
                let delay_secs = self.backoff.next_delay_secs();
                warn!(
                    "link[{}]: connect failed ({err}); next attempt in {delay_secs}s",
                    self.node_id
                );
                self.state = LinkState::Disconnected {
                    retry_at_ms: now_ms + u64::from(delay_secs) * 1000,
                };
            }
        }
    }

    fn handle_connection_loss(&mut self, now_ms: u64, sink: &mut dyn EventSink) {
        if self.status == Status::Rebooting {
            info!("link[{}]: reboot teardown complete; link halted", self.node_id);
            self.state = LinkState::Halted;
            if let Some(err) = self.callbacks.fire(LinkHook::Reboot) {
                warn!(
                    "link[{}]: '{}' hook fault: {err}",
                    self.node_id,
                    LinkHook::Reboot.name()
                );
                sink.emit(&NodeEvent::HookFault {
                    event: LinkHook::Reboot.name(),
                });
            }
            sink.emit(&NodeEvent::RebootRequested);
        } else {
            warn!("link[{}]: connection lost; reconnecting", self.node_id);
            sink.emit(&NodeEvent::LinkDown);
            // First reattempt is immediate; failures then space out.
            self.state = LinkState::Disconnected { retry_at_ms: now_ms };
        }
    }

    // ── liveness ──

    fn maybe_ping(&mut self, now_ms: u64, sink: &mut dyn EventSink) {
        let due = match self.last_ping_ms {
            Some(last) => now_ms.saturating_sub(last) >= self.ping_interval_ms,
            None => true,
        };
        if due {
            self.send_ping(now_ms, sink);
        }
    }

    fn send_ping(&mut self, now_ms: u64, sink: &mut dyn EventSink) {
        let ip = self.probe.ip_address();
        let hardware_id = self.probe.hardware_id();
        let platform = self.probe.platform();
        let ping = PingPayload {
            timestamp: self.clock.epoch_secs(),
            puzzle_id: &self.node_id,
            ip_address: ip.as_deref(),
            uptime: self.probe.uptime_secs(),
            hardware_id: &hardware_id,
            temperature: Temperature::from(self.probe.temperature_c()),
            platform: &platform,
            role: &self.role,
        };
        match serde_json::to_string(&ping) {
            Ok(json) => {
                if let Err(err) = self.bus.publish(&self.ping_topic, &json, false) {
                    warn!("link[{}]: ping publish failed: {err}", self.node_id);
                } else {
                    debug!("link[{}]: ping sent", self.node_id);
                    sink.emit(&NodeEvent::PingSent);
                }
            }
            Err(err) => warn!("link[{}]: ping serialization failed: {err}", self.node_id),
        }
        self.last_ping_ms = Some(now_ms);
        self.fire_link_hook(LinkHook::Ping, sink);
    }

    // ── inbound dispatch ──

    fn dispatch_inbound(&mut self, sink: &mut dyn EventSink) {
        while let Some(frame) = self.mailbox.next_frame() {
            self.dispatch_frame(&frame, sink);
            if !self.mailbox.is_connected() {
                // Deliberate teardown mid-dispatch (REBOOT); leftover
                // frames die with the session.
                break;
            }
        }
    }

    fn dispatch_frame(&mut self, frame: &InboundFrame, sink: &mut dyn EventSink) {
        let parsed = match protocol::classify(
            &self.node_id,
            frame.topic.as_str(),
            frame.payload.as_str(),
        ) {
            Inbound::Command(msg) => Parsed::Run(msg.command),
            Inbound::Pong => Parsed::Pong,
            Inbound::Unknown { .. } => Parsed::Unknown,
        };
        match parsed {
            Parsed::Run(command) => {
                info!("link[{}]: command {command}", self.node_id);
                sink.emit(&NodeEvent::CommandReceived(command));
                self.run_command(command, sink);
            }
            Parsed::Pong => {
                debug!("link[{}]: pong", self.node_id);
                self.fire_link_hook(LinkHook::Pong, sink);
            }
            Parsed::Unknown => {
                warn!(
                    "link[{}]: unknown command: [{}]",
                    self.node_id, frame.payload
                );
                let report = format!("Unknown COMMAND received: [{}]", frame.payload);
                self.publish_error(&report);
                // Re-announce so the controller regains a known status.
                self.publish_status(self.status);
            }
        }
    }

    fn run_command(&mut self, command: Command, sink: &mut dyn EventSink) {
        match command {
            Command::Reset => self.fire_link_hook(LinkHook::Reset, sink),
            Command::Activate => self.fire_link_hook(LinkHook::Activate, sink),
            Command::Solve => self.fire_link_hook(LinkHook::Solve, sink),
            Command::Reboot => self.begin_reboot(),
        }
    }

    /// REBOOT announces, then tears the session down on purpose. The
    /// reboot callback itself runs once the loss is observed, after which
    /// the link is halted for good.
    fn begin_reboot(&mut self) {
        info!("link[{}]: REBOOT ordered; announcing and disconnecting", self.node_id);
        self.publish_status(Status::Rebooting);
        self.bus.disconnect();
        self.mailbox.mark_disconnected();
    }

    fn fire_link_hook(&mut self, which: LinkHook, sink: &mut dyn EventSink) {
        if let Some(err) = self.callbacks.fire(which) {
            warn!("link[{}]: '{}' hook fault: {err}", self.node_id, which.name());
            let report = format!("Callback fault [{}]: {err}", which.name());
            self.publish_error(&report);
            sink.emit(&NodeEvent::HookFault { event: which.name() });
        }
    }

    // ── outbound ──

    /// Record `status` and, when connected, announce it retained on the
    /// STATE topic. Repeats publish again on purpose; the controller
    /// treats the retained value as ground truth.
    fn publish_status(&mut self, status: Status) {
        self.status = status;
        if !matches!(self.state, LinkState::Connected) {
            debug!("link[{}]: offline; status {status} recorded", self.node_id);
            return;
        }
        let message = StatusMessage {
            node_id: &self.node_id,
            state: status,
            timestamp: self.clock.epoch_secs(),
        };
        info!("link[{}]: status -> {}", message.node_id, message.state);
        if let Err(err) = self.bus.publish(&self.state_topic, message.payload(), true) {
            warn!("link[{}]: status publish failed: {err}", self.node_id);
        }
    }

    fn publish_error(&mut self, text: &str) {
        if !matches!(self.state, LinkState::Connected) {
            return;
        }
        if let Err(err) = self.bus.publish(&self.error_topic, text, false) {
            warn!("link[{}]: error publish failed: {err}", self.node_id);
        }
    }

    fn drain_outbox(&mut self) {
        while let Some(status) = self.outbox.next() {
            self.publish_status(status);
        }
    }
}
