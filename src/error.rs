//! Unified error types for the puzzle node.
//!
//! A single `Error` enum that every subsystem can convert into, keeping the
//! top-level poll loop's error handling uniform. All variants are `Copy` so
//! they can be cheaply passed through the link and state machine without
//! allocation; hook faults (which carry caller-supplied text) stay local to
//! the dispatch layer and never enter this type.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level node error
// ---------------------------------------------------------------------------

/// Every fallible operation in the node funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The pub/sub bus refused an operation.
    Bus(BusError),
    /// A sensor or actuator port could not be used this cycle.
    Sensor(SensorFault),
    /// Configuration is invalid or could not be loaded.
    Config(ConfigError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bus(e) => write!(f, "bus: {e}"),
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Bus errors
// ---------------------------------------------------------------------------

/// Failures surfaced by the pub/sub client. Connection loss is reported
/// through the mailbox flag, not through this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusError {
    /// The broker refused or never answered the connect attempt.
    ConnectFailed,
    /// Operation requires a live connection and there is none.
    NotConnected,
    /// Subscription to the command namespace was rejected.
    SubscribeFailed,
    /// A publish was rejected or could not be queued.
    PublishFailed,
}

impl fmt::Display for BusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectFailed => write!(f, "connect failed"),
            Self::NotConnected => write!(f, "not connected"),
            Self::SubscribeFailed => write!(f, "subscribe failed"),
            Self::PublishFailed => write!(f, "publish failed"),
        }
    }
}

impl std::error::Error for BusError {}

impl From<BusError> for Error {
    fn from(e: BusError) -> Self {
        Self::Bus(e)
    }
}

// ---------------------------------------------------------------------------
// Sensor/actuator faults
// ---------------------------------------------------------------------------

/// Momentary port faults. The scanners treat these as "no event this cycle";
/// they never escalate to a puzzle Failed transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorFault {
    /// A contact input could not be read.
    ContactReadFailed,
    /// The tag reader returned garbage or timed out.
    TagReadFailed,
    /// An output drive was rejected by the actuator.
    OutputWriteFailed,
}

impl fmt::Display for SensorFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ContactReadFailed => write!(f, "contact read failed"),
            Self::TagReadFailed => write!(f, "tag read failed"),
            Self::OutputWriteFailed => write!(f, "output write failed"),
        }
    }
}

impl std::error::Error for SensorFault {}

impl From<SensorFault> for Error {
    fn from(e: SensorFault) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// The config file could not be parsed at all.
    InvalidFormat(&'static str),
    /// Node id is empty or contains characters the topic scheme reserves.
    InvalidNodeId(&'static str),
    /// An interval or backoff bound is out of range.
    InvalidInterval(&'static str),
    /// A match-engine registration is unusable (empty pattern, oversize
    /// window, tag text beyond the bounded length).
    InvalidPattern(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidFormat(msg) => write!(f, "invalid format: {msg}"),
            Self::InvalidNodeId(msg) => write!(f, "invalid node id: {msg}"),
            Self::InvalidInterval(msg) => write!(f, "invalid interval: {msg}"),
            Self::InvalidPattern(msg) => write!(f, "invalid pattern: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_domain_prefix() {
        let e = Error::from(BusError::ConnectFailed);
        assert_eq!(e.to_string(), "bus: connect failed");
        let e = Error::from(SensorFault::TagReadFailed);
        assert_eq!(e.to_string(), "sensor: tag read failed");
        let e = Error::from(ConfigError::InvalidNodeId("empty"));
        assert_eq!(e.to_string(), "config: invalid node id: empty");
    }
}
