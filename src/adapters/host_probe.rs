//! Host facts for the liveness ping, read from the usual Linux places.
//!
//! - Hardware id: `/etc/machine-id` (stable across reboots), with the
//!   dbus copy as fallback.
//! - IP address: local end of a UDP socket "connected" to a public
//!   address. No packet is sent; the kernel just picks the route.
//! - Uptime: first field of `/proc/uptime`, falling back to process
//!   uptime on hosts without procfs.
//! - Temperature: `thermal_zone0` in millidegrees; absent probe reports
//!   as `"n/a"` on the wire.
//!
//! Every read is best-effort. A prop node in a dark closet must ping even
//! when the host is missing half of these files.

use std::fs;
use std::net::UdpSocket;
use std::time::Instant;

use crate::app::ports::SystemProbePort;

const MACHINE_ID_PATHS: [&str; 2] = ["/etc/machine-id", "/var/lib/dbus/machine-id"];
const UPTIME_PATH: &str = "/proc/uptime";
const THERMAL_PATH: &str = "/sys/class/thermal/thermal_zone0/temp";

/// Probe address for route selection; UDP connect sends nothing.
const ROUTE_PROBE_ADDR: &str = "8.8.8.8:80";

pub struct HostProbe {
    started: Instant,
    hardware_id: Option<String>,
}

impl HostProbe {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            hardware_id: None,
        }
    }
}

impl Default for HostProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemProbePort for HostProbe {
    fn hardware_id(&mut self) -> String {
        if let Some(id) = &self.hardware_id {
            return id.clone();
        }
        let id = MACHINE_ID_PATHS
            .iter()
            .find_map(|path| fs::read_to_string(path).ok())
            .map(|raw| raw.trim().to_string())
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| "unknown".to_string());
        self.hardware_id = Some(id.clone());
        id
    }

    fn ip_address(&mut self) -> Option<String> {
        let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
        socket.connect(ROUTE_PROBE_ADDR).ok()?;
        let ip = socket.local_addr().ok()?.ip();
        if ip.is_unspecified() {
            return None;
        }
        Some(ip.to_string())
    }

    fn uptime_secs(&mut self) -> f64 {
        fs::read_to_string(UPTIME_PATH)
            .ok()
            .and_then(|raw| parse_uptime(&raw))
            .unwrap_or_else(|| self.started.elapsed().as_secs_f64())
    }

    fn temperature_c(&mut self) -> Option<f32> {
        let raw = fs::read_to_string(THERMAL_PATH).ok()?;
        parse_millidegrees(&raw)
    }

    fn platform(&mut self) -> String {
        format!(
            "{} v{} on {}/{}",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION"),
            std::env::consts::OS,
            std::env::consts::ARCH,
        )
    }
}

fn parse_uptime(raw: &str) -> Option<f64> {
    raw.split_whitespace().next()?.parse().ok()
}

fn parse_millidegrees(raw: &str) -> Option<f32> {
    let milli: i32 = raw.trim().parse().ok()?;
    Some(milli as f32 / 1000.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uptime_takes_the_first_field() {
        assert_eq!(parse_uptime("12345.67 99999.00\n"), Some(12345.67));
        assert_eq!(parse_uptime(""), None);
        assert_eq!(parse_uptime("garbage"), None);
    }

    #[test]
    fn millidegrees_convert_to_celsius() {
        assert_eq!(parse_millidegrees("48350\n"), Some(48.35));
        assert_eq!(parse_millidegrees("-5000"), Some(-5.0));
        assert_eq!(parse_millidegrees("n/a"), None);
    }

    #[test]
    fn hardware_id_is_cached_and_nonempty() {
        let mut probe = HostProbe::new();
        let first = probe.hardware_id();
        assert!(!first.is_empty());
        assert_eq!(probe.hardware_id(), first);
    }

    #[test]
    fn platform_names_the_package() {
        let mut probe = HostProbe::new();
        assert!(probe.platform().starts_with("puzzlenode v"));
    }
}
