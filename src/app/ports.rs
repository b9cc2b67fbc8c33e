//! Port traits: the hexagonal boundary between puzzle logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ PuzzleStateMachine / CoordinationLink / Node
//! ```
//!
//! Driven adapters (contact banks, relay boards, NFC readers, host probes,
//! event sinks) implement these traits. The domain core consumes them
//! through the injected boxes, so puzzle logic never touches hardware
//! directly and every test can run against bench implementations.
//!
//! The bus client port lives with the link ([`crate::link::bus::BusPort`]);
//! everything else crosses the boundary here.

use std::sync::Arc;

use crate::error::SensorFault;

/// Bounded tag text. NFC payloads in the field are short dotted names
/// ("cellar.organ.chord-3"); anything longer is a misread.
pub const TAG_TEXT_CAP: usize = 64;
pub type TagText = heapless::String<TAG_TEXT_CAP>;

/// Identifies one binary contact input (a switch, a pressure pad, a
/// magnet-and-reed circuit). Values are adapter-defined channel numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContactId(pub u16);

impl core::fmt::Display for ContactId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "contact#{}", self.0)
    }
}

/// Identifies one binary output (relay, maglock, lamp).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OutputId(pub u16);

impl core::fmt::Display for OutputId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "output#{}", self.0)
    }
}

// ───────────────────────────────────────────────────────────────
// Contact sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port for binary contacts.
pub trait ContactSensorPort {
    /// Current level of one contact, `true` = closed/active.
    ///
    /// A momentary failure returns `Err`; the scanner treats it as
    /// "no reading this cycle" and keeps the last known level.
    fn read_contact(&mut self, id: ContactId) -> Result<bool, SensorFault>;
}

// ───────────────────────────────────────────────────────────────
// Output actuator port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Write-side port for binary outputs.
pub trait OutputActuatorPort {
    /// Drive one output to the given level, `true` = energised.
    fn drive_output(&mut self, id: OutputId, level: bool) -> Result<(), SensorFault>;
}

// ───────────────────────────────────────────────────────────────
// Tag reader port (driven adapter: NFC/RFID → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port for a tag reader.
pub trait TagReaderPort {
    /// Poll the reader once.
    ///
    /// * `Ok(Some(text))`: a tag is in the field and decoded.
    /// * `Ok(None)`: the field is empty.
    /// * `Err(_)`: the read failed; presence is unknown this cycle and
    ///   the scanner must not treat it as a removal.
    fn sense_tag(&mut self) -> Result<Option<TagText>, SensorFault>;
}

// ───────────────────────────────────────────────────────────────
// Clock port (shared; drives cadence and backoff deadlines)
// ───────────────────────────────────────────────────────────────

/// Time source shared by the state machine and the link.
///
/// Takes `&self` so one `Arc<dyn ClockPort>` can serve every consumer;
/// fake clocks advance through interior mutability.
pub trait ClockPort: Send + Sync {
    /// Wall-clock seconds since the Unix epoch (ping payload timestamps).
    fn epoch_secs(&self) -> f64;

    /// Monotonic milliseconds since an arbitrary origin (elapsed-time
    /// checks: backoff deadlines, ping cadence, event timestamps).
    fn monotonic_ms(&self) -> u64;
}

/// Shared handle alias used across the crate.
pub type SharedClock = Arc<dyn ClockPort>;

// ───────────────────────────────────────────────────────────────
// System probe port (host facts for the ping payload)
// ───────────────────────────────────────────────────────────────

/// Host facts reported in the liveness ping.
pub trait SystemProbePort {
    /// Stable hardware identifier (machine id, MAC, serial).
    fn hardware_id(&mut self) -> String;

    /// Best-effort primary IP address; `None` when the host has no route.
    fn ip_address(&mut self) -> Option<String>;

    /// Seconds since host boot.
    fn uptime_secs(&mut self) -> f64;

    /// Enclosure/SoC temperature in Celsius; `None` when no probe exists
    /// (reported on the wire as `"n/a"`).
    fn temperature_c(&mut self) -> Option<f32>;

    /// Human-readable platform string for fleet inventory.
    fn platform(&mut self) -> String;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (domain → logging / observability)
// ───────────────────────────────────────────────────────────────

/// The node emits structured [`NodeEvent`](super::events::NodeEvent)s
/// through this port. Adapters decide where they go; the stock adapter
/// forwards to the `log` facade.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::NodeEvent);
}
