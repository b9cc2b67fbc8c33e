//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter      | Implements         | Connects to                    |
//! |--------------|--------------------|--------------------------------|
//! | `bench`      | ContactSensorPort  | Hand-driven bench contacts     |
//! |              | OutputActuatorPort | Recording output bank          |
//! |              | TagReaderPort      | Scripted tag feed              |
//! | `clock`      | ClockPort          | System time / manual test time |
//! | `host_probe` | SystemProbePort    | /etc, /proc, /sys, UDP route   |
//! | `log_sink`   | EventSink          | Structured log output          |
//! | `memory_bus` | BusPort            | In-process broker stand-in     |
//!
//! A production deployment swaps `memory_bus` for a real broker client
//! and `bench` for GPIO/reader drivers; everything above the port traits
//! stays untouched.

pub mod bench;
pub mod clock;
pub mod host_probe;
pub mod log_sink;
pub mod memory_bus;
