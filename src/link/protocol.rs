//! Wire vocabulary for the node↔room-controller protocol.
//!
//! The topic prefixes are historical and load-bearing: every deployed room
//! controller speaks them. `COPI` is the ROOM→NODE direction
//! (controller-out, puzzle-in), `CIPO` is NODE→ROOM. Command and status
//! payloads are bare upper-case words; recognition is whole-payload
//! equality, so `"RESET now"` is an unknown command, not RESET with
//! arguments. The ping payload is the one JSON message on the wire and its
//! field names are frozen.

use serde::Serialize;

/// ROOM→NODE topic prefix.
pub const ROOM_TO_NODE: &str = "COPI";
/// NODE→ROOM topic prefix.
pub const NODE_TO_ROOM: &str = "CIPO";

/// Broker-delivered payload on the STATE topic after an ungraceful
/// disconnect.
pub const LAST_WILL_PAYLOAD: &str = "UNKNOWN";

// ---------------------------------------------------------------------------
// Topics
// ---------------------------------------------------------------------------

/// Wildcard filter covering this node's whole inbound namespace.
pub fn command_filter(node_id: &str) -> String {
    format!("{ROOM_TO_NODE}/{node_id}/#")
}

/// Concrete COMMANDS topic; the room-controller side of [`command_filter`].
pub fn commands_topic(node_id: &str) -> String {
    format!("{ROOM_TO_NODE}/{node_id}/COMMANDS")
}

pub fn state_topic(node_id: &str) -> String {
    format!("{NODE_TO_ROOM}/{node_id}/STATE")
}

pub fn error_topic(node_id: &str) -> String {
    format!("{NODE_TO_ROOM}/{node_id}/ERROR")
}

/// Pings go under a shared PING branch keyed by node, so dashboards can
/// subscribe to `CIPO/PING/#` alone.
pub fn ping_topic(node_id: &str) -> String {
    format!("{NODE_TO_ROOM}/PING/{node_id}")
}

// ---------------------------------------------------------------------------
// Status vocabulary
// ---------------------------------------------------------------------------

/// Administrative status published on the STATE topic. The enum is the
/// whole vocabulary; any other spelling is unrepresentable outbound and
/// refused by [`Status::parse`] inbound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Reset,
    Active,
    Solved,
    Failed,
    Rebooting,
}

impl Status {
    pub fn as_wire(self) -> &'static str {
        match self {
            Self::Reset => "RESET",
            Self::Active => "ACTIVE",
            Self::Solved => "SOLVED",
            Self::Failed => "FAILED",
            Self::Rebooting => "REBOOTING",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "RESET" => Some(Self::Reset),
            "ACTIVE" => Some(Self::Active),
            "SOLVED" => Some(Self::Solved),
            "FAILED" => Some(Self::Failed),
            "REBOOTING" => Some(Self::Rebooting),
            _ => None,
        }
    }
}

impl core::fmt::Display for Status {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_wire())
    }
}

impl From<crate::puzzle::PuzzleState> for Status {
    fn from(state: crate::puzzle::PuzzleState) -> Self {
        use crate::puzzle::PuzzleState;
        match state {
            PuzzleState::Idle => Self::Reset,
            PuzzleState::Active => Self::Active,
            PuzzleState::Solved => Self::Solved,
            PuzzleState::Failed => Self::Failed,
            PuzzleState::Rebooting => Self::Rebooting,
        }
    }
}

// ---------------------------------------------------------------------------
// Command vocabulary
// ---------------------------------------------------------------------------

/// Commands the room controller may send on the COMMANDS topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Reset,
    Activate,
    Solve,
    Reboot,
}

impl Command {
    pub fn as_wire(self) -> &'static str {
        match self {
            Self::Reset => "RESET",
            Self::Activate => "ACTIVATE",
            Self::Solve => "SOLVE",
            Self::Reboot => "REBOOT",
        }
    }

    /// Whole-payload match, deliberately strict for wire compatibility.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "RESET" => Some(Self::Reset),
            "ACTIVATE" => Some(Self::Activate),
            "SOLVE" => Some(Self::Solve),
            "REBOOT" => Some(Self::Reboot),
            _ => None,
        }
    }
}

impl core::fmt::Display for Command {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_wire())
    }
}

// ---------------------------------------------------------------------------
// Message views
// ---------------------------------------------------------------------------

/// One outbound status publication.
#[derive(Debug, Clone, Copy)]
pub struct StatusMessage<'a> {
    pub node_id: &'a str,
    pub state: Status,
    pub timestamp: f64,
}

impl StatusMessage<'_> {
    pub fn payload(&self) -> &'static str {
        self.state.as_wire()
    }
}

/// One parsed inbound command. `args` is reserved room in the data model;
/// every current wire form is a bare verb, so it is always `None`.
#[derive(Debug, Clone, Copy)]
pub struct CommandMessage<'a> {
    pub node_id: &'a str,
    pub command: Command,
    pub args: Option<&'a str>,
}

/// Classification of one inbound frame from this node's namespace.
#[derive(Debug, Clone, Copy)]
pub enum Inbound<'a> {
    Command(CommandMessage<'a>),
    Pong,
    /// Unparseable command or unexpected topic suffix; `raw` is reported
    /// verbatim on the error channel.
    Unknown { raw: &'a str },
}

/// Sort one delivered frame by topic suffix and payload.
pub fn classify<'a>(node_id: &'a str, topic: &'a str, payload: &'a str) -> Inbound<'a> {
    let suffix = topic
        .strip_prefix(ROOM_TO_NODE)
        .and_then(|t| t.strip_prefix('/'))
        .and_then(|t| t.strip_prefix(node_id))
        .and_then(|t| t.strip_prefix('/'));

    match suffix {
        Some("COMMANDS") => match Command::parse(payload) {
            Some(command) => Inbound::Command(CommandMessage {
                node_id,
                command,
                args: None,
            }),
            None => Inbound::Unknown { raw: payload },
        },
        Some("PONG") => Inbound::Pong,
        _ => Inbound::Unknown { raw: payload },
    }
}

// ---------------------------------------------------------------------------
// Ping payload
// ---------------------------------------------------------------------------

/// Temperature field: a number, or the literal `"n/a"` when the node has
/// no probe.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(untagged)]
pub enum Temperature {
    Degrees(f32),
    Unavailable(&'static str),
}

impl From<Option<f32>> for Temperature {
    fn from(reading: Option<f32>) -> Self {
        match reading {
            Some(c) => Self::Degrees(c),
            None => Self::Unavailable("n/a"),
        }
    }
}

/// Liveness ping, serialized as JSON. Field names are wire-frozen; the
/// `puzzleID` spelling predates this implementation.
#[derive(Debug, Serialize)]
pub struct PingPayload<'a> {
    pub timestamp: f64,
    #[serde(rename = "puzzleID")]
    pub puzzle_id: &'a str,
    #[serde(rename = "ipAddress")]
    pub ip_address: Option<&'a str>,
    pub uptime: f64,
    #[serde(rename = "hardwareId")]
    pub hardware_id: &'a str,
    pub temperature: Temperature,
    pub platform: &'a str,
    pub role: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topics_follow_the_namespace_scheme() {
        assert_eq!(command_filter("fuel"), "COPI/fuel/#");
        assert_eq!(commands_topic("fuel"), "COPI/fuel/COMMANDS");
        assert_eq!(state_topic("fuel"), "CIPO/fuel/STATE");
        assert_eq!(error_topic("fuel"), "CIPO/fuel/ERROR");
        assert_eq!(ping_topic("fuel"), "CIPO/PING/fuel");
    }

    #[test]
    fn status_wire_roundtrip() {
        for s in [
            Status::Reset,
            Status::Active,
            Status::Solved,
            Status::Failed,
            Status::Rebooting,
        ] {
            assert_eq!(Status::parse(s.as_wire()), Some(s));
        }
        assert_eq!(Status::parse("ONLINE"), None);
        assert_eq!(Status::parse("reset"), None, "vocabulary is case-exact");
    }

    #[test]
    fn command_parse_is_whole_payload() {
        assert_eq!(Command::parse("RESET"), Some(Command::Reset));
        assert_eq!(Command::parse("RESET now"), None);
        assert_eq!(Command::parse(" RESET"), None);
        assert_eq!(Command::parse("activate"), None);
    }

    #[test]
    fn classify_sorts_by_suffix() {
        let inbound = classify("fuel", "COPI/fuel/COMMANDS", "ACTIVATE");
        let Inbound::Command(msg) = inbound else { panic!("expected command") };
        assert_eq!(msg.command, Command::Activate);
        assert_eq!(msg.node_id, "fuel");
        assert_eq!(msg.args, None);

        assert!(matches!(classify("fuel", "COPI/fuel/PONG", "x"), Inbound::Pong));
        assert!(matches!(
            classify("fuel", "COPI/fuel/COMMANDS", "DANCE"),
            Inbound::Unknown { raw: "DANCE" }
        ));
        assert!(matches!(
            classify("fuel", "COPI/fuel/NOISE", "RESET"),
            Inbound::Unknown { .. }
        ));
        assert!(matches!(
            classify("fuel", "COPI/other/COMMANDS", "RESET"),
            Inbound::Unknown { .. }
        ));
    }

    #[test]
    fn puzzle_states_map_onto_the_status_vocabulary() {
        use crate::puzzle::PuzzleState;
        assert_eq!(Status::from(PuzzleState::Idle), Status::Reset);
        assert_eq!(Status::from(PuzzleState::Active), Status::Active);
        assert_eq!(Status::from(PuzzleState::Solved), Status::Solved);
        assert_eq!(Status::from(PuzzleState::Failed), Status::Failed);
        assert_eq!(Status::from(PuzzleState::Rebooting), Status::Rebooting);
    }

    #[test]
    fn ping_payload_serializes_with_frozen_field_names() {
        let ping = PingPayload {
            timestamp: 1_723_456.5,
            puzzle_id: "fuel",
            ip_address: Some("10.0.0.17"),
            uptime: 321.75,
            hardware_id: "ab12cd34",
            temperature: Temperature::from(Some(41.5)),
            platform: "puzzlenode v0.3.0/linux",
            role: "puzzle",
        };
        let json = serde_json::to_string(&ping).unwrap();
        assert!(json.contains("\"puzzleID\":\"fuel\""));
        assert!(json.contains("\"ipAddress\":\"10.0.0.17\""));
        assert!(json.contains("\"hardwareId\":\"ab12cd34\""));
        assert!(json.contains("\"temperature\":41.5"));
        assert!(json.contains("\"role\":\"puzzle\""));
    }

    #[test]
    fn ping_payload_reports_missing_probe_as_na() {
        let ping = PingPayload {
            timestamp: 0.0,
            puzzle_id: "x",
            ip_address: None,
            uptime: 0.0,
            hardware_id: "h",
            temperature: Temperature::from(None),
            platform: "p",
            role: "puzzle",
        };
        let json = serde_json::to_string(&ping).unwrap();
        assert!(json.contains("\"temperature\":\"n/a\""));
        assert!(json.contains("\"ipAddress\":null"));
    }
}
