//! Hardware environment detection
//!
//! Block-device enumeration, network reachability and the privilege check.
//!
//! # Design
//!
//! - **Trait seam**: The wizard only sees `DiskProbe`; `LsblkProbe` is the
//!   production implementation, tests use fixed lists.
//! - **Pure Rust network check**: `TcpStream::connect_timeout`, not ping/shell
//! - **No `unwrap()`**: Probe failures degrade to the placeholder disk or
//!   `Offline`, and are logged.

use crate::command_runner::{CommandRunner, CommandSpec};
use crate::types::Disk;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fmt;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

/// Hosts tried in order by the connectivity check.
pub const PROBE_HOSTS: &[&str] = &["github.com:443", "cache.nixos.org:443"];

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Network connectivity state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkState {
    /// A TCP connection to one of the probe hosts succeeded
    Online,
    /// Every probe failed or timed out
    Offline,
}

impl NetworkState {
    pub fn is_online(self) -> bool {
        matches!(self, Self::Online)
    }
}

impl fmt::Display for NetworkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Online => write!(f, "Online"),
            Self::Offline => write!(f, "Offline"),
        }
    }
}

// ============================================================================
// Network
// ============================================================================

/// Try each of `hosts` (`host:port`) until one accepts a TCP connection.
pub fn probe_hosts(hosts: &[&str], timeout: Duration) -> NetworkState {
    for host in hosts {
        let addrs = match host.to_socket_addrs() {
            Ok(addrs) => addrs,
            Err(e) => {
                tracing::warn!("Could not resolve {}: {}", host, e);
                continue;
            }
        };
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(_stream) => {
                    tracing::info!("Network connectivity confirmed (TCP to {})", host);
                    return NetworkState::Online;
                }
                Err(e) => tracing::warn!("TCP to {} ({}) failed: {}", host, addr, e),
            }
        }
    }
    NetworkState::Offline
}

/// Connectivity check against the flake's upstreams.
pub fn detect_internet() -> NetworkState {
    probe_hosts(PROBE_HOSTS, PROBE_TIMEOUT)
}

// ============================================================================
// Privilege
// ============================================================================

pub fn is_root() -> bool {
    nix::unistd::geteuid().is_root()
}

// ============================================================================
// Disks
// ============================================================================

/// Block-device discovery used by the wizard.
pub trait DiskProbe {
    /// Whole disks, or a single placeholder entry when none are found.
    fn enumerate(&self) -> Vec<Disk>;

    /// Raw size of `path` in bytes, if it can be read.
    fn size_bytes(&self, path: &str) -> Option<u64>;
}

/// `lsblk`-backed probe.
#[derive(Debug, Default, Clone, Copy)]
pub struct LsblkProbe;

#[derive(Debug, Deserialize)]
struct LsblkOutput {
    blockdevices: Vec<LsblkDevice>,
}

#[derive(Debug, Deserialize)]
struct LsblkDevice {
    name: String,
    size: Option<LsblkSize>,
    #[serde(rename = "type")]
    kind: Option<String>,
    model: Option<String>,
}

/// Newer util-linux emits numbers for `-b`, older releases emit strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LsblkSize {
    Bytes(u64),
    Text(String),
}

impl LsblkSize {
    fn bytes(&self) -> Option<u64> {
        match self {
            Self::Bytes(b) => Some(*b),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl LsblkProbe {
    fn lsblk(&self, extra: &[&str]) -> Result<String> {
        let spec = CommandSpec::new("lsblk")
            .args(["-J", "-d", "-b", "-o", "NAME,SIZE,TYPE,MODEL"])
            .args(extra);
        // Read-only; runs even under dry-run
        let output = CommandRunner::new(false).run_checked(&spec)?;
        Ok(output.stdout)
    }
}

impl DiskProbe for LsblkProbe {
    fn enumerate(&self) -> Vec<Disk> {
        let disks = self
            .lsblk(&[])
            .and_then(|json| parse_lsblk_disks(&json))
            .unwrap_or_else(|e| {
                tracing::warn!("Disk enumeration failed: {:#}", e);
                Vec::new()
            });
        if disks.is_empty() {
            tracing::warn!("No disks found, offering placeholder");
            return vec![Disk::placeholder()];
        }
        tracing::info!("Found {} disk(s)", disks.len());
        disks
    }

    fn size_bytes(&self, path: &str) -> Option<u64> {
        let json = self
            .lsblk(&[path])
            .map_err(|e| tracing::warn!("Size probe for {} failed: {:#}", path, e))
            .ok()?;
        parse_lsblk_disks(&json)
            .ok()?
            .into_iter()
            .next()
            .and_then(|d| d.size_bytes)
    }
}

/// Parse `lsblk -J -d -b -o NAME,SIZE,TYPE,MODEL`, keeping whole disks only.
pub fn parse_lsblk_disks(json: &str) -> Result<Vec<Disk>> {
    let parsed: LsblkOutput =
        serde_json::from_str(json).context("Failed to parse lsblk output")?;

    Ok(parsed
        .blockdevices
        .into_iter()
        .filter(|d| d.kind.as_deref() == Some("disk"))
        .map(|d| {
            let size_bytes = d.size.as_ref().and_then(LsblkSize::bytes);
            let path = if d.name.starts_with("/dev/") {
                d.name
            } else {
                format!("/dev/{}", d.name)
            };
            Disk {
                path,
                size: size_bytes.map(human_size).unwrap_or_else(|| "?".to_string()),
                model: d.model.map(|m| m.trim().to_string()).unwrap_or_default(),
                size_bytes,
            }
        })
        .collect())
}

/// lsblk-style size string (e.g. `476.9G`).
pub fn human_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "K", "M", "G", "T", "P"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 || value.fract() < 0.05 {
        format!("{:.0}{}", value, UNITS[unit])
    } else {
        format!("{:.1}{}", value, UNITS[unit])
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "blockdevices": [
            {"name": "sda", "size": 500107862016, "type": "disk", "model": "Samsung SSD 860  "},
            {"name": "sr0", "size": 1073741312, "type": "rom", "model": "QEMU DVD-ROM"},
            {"name": "nvme0n1", "size": "1024209543168", "type": "disk", "model": null},
            {"name": "loop0", "size": 123456, "type": "loop", "model": null}
        ]
    }"#;

    #[test]
    fn test_parse_keeps_only_disks() {
        let disks = parse_lsblk_disks(SAMPLE).expect("parse");
        assert_eq!(disks.len(), 2);
        assert_eq!(disks[0].path, "/dev/sda");
        assert_eq!(disks[0].model, "Samsung SSD 860");
        assert_eq!(disks[0].size_bytes, Some(500_107_862_016));
        assert_eq!(disks[1].path, "/dev/nvme0n1");
        assert_eq!(disks[1].model, "");
    }

    #[test]
    fn test_parse_accepts_string_sizes() {
        let disks = parse_lsblk_disks(SAMPLE).expect("parse");
        assert_eq!(disks[1].size_bytes, Some(1_024_209_543_168));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_lsblk_disks("not json").is_err());
    }

    #[test]
    fn test_parse_empty_device_list() {
        let disks = parse_lsblk_disks(r#"{"blockdevices": []}"#).expect("parse");
        assert!(disks.is_empty());
    }

    #[test]
    fn test_human_size() {
        assert_eq!(human_size(512), "512B");
        assert_eq!(human_size(100 * 1024 * 1024 * 1024), "100G");
        assert_eq!(human_size(500_107_862_016), "465.8G");
        assert_eq!(human_size(2 * 1024 * 1024 * 1024 * 1024), "2T");
    }

    #[test]
    fn test_network_state_display() {
        assert_eq!(NetworkState::Online.to_string(), "Online");
        assert_eq!(NetworkState::Offline.to_string(), "Offline");
        assert!(NetworkState::Online.is_online());
        assert!(!NetworkState::Offline.is_online());
    }

    #[test]
    fn test_unresolvable_hosts_are_offline() {
        let state = probe_hosts(&["nonexistent.invalid:443"], Duration::from_millis(200));
        assert_eq!(state, NetworkState::Offline);
    }

    #[test]
    fn test_local_listener_is_online() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr").to_string();
        let state = probe_hosts(&[addr.as_str()], Duration::from_secs(1));
        assert_eq!(state, NetworkState::Online);
    }
}
