//! Host identification for the metrics publisher
//!
//! This module handles:
//! - Network interface enumeration (link-layer entries only)
//! - Selection of the first interface that is up, not loopback and hardware-addressed
//! - Host ID formatting from that interface's MAC address
//!
//! The host ID is resolved once at startup and namespaces every published topic.

use crate::error::IdentityError;
use mac_address::MacAddress;
use nix::ifaddrs::getifaddrs;
use nix::net::if_::InterfaceFlags;
use std::fmt;
use std::io;
use tracing::{debug, info, warn};

/// Stable identifier of this host (lowercase MAC, e.g. `aa:bb:cc:dd:ee:ff`).
///
/// May be empty when no interface qualifies; topics then degrade to
/// `metrics//...` instead of the process refusing to start.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostId(String);

/// Link-layer view of one network interface
#[derive(Debug, Clone)]
pub struct InterfaceCandidate {
    pub name: String,
    pub is_up: bool,
    pub is_loopback: bool,
    pub mac: Option<MacAddress>,
}

impl HostId {
    pub fn new(id: impl Into<String>) -> Self {
        HostId(id.into())
    }

    /// Enumerate the host's interfaces and pick the identifying hardware address
    pub fn resolve() -> Result<Self, IdentityError> {
        debug!("Enumerating network interfaces...");

        let candidates = enumerate_interfaces()?;
        let host_id = select_host_id(&candidates);

        if host_id.is_empty() {
            warn!(
                "No up, non-loopback interface with a hardware address among {} interfaces",
                candidates.len()
            );
        } else {
            info!("publishing with MAC: {}", host_id);
        }

        Ok(host_id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// MQTT client identifier for a given role (`pub`, `sub`)
    pub fn client_id(&self, role: &str) -> String {
        format!("{}_{}", self.0, role)
    }
}

impl fmt::Display for HostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl InterfaceCandidate {
    fn qualifies(&self) -> bool {
        self.is_up && !self.is_loopback && self.mac.is_some()
    }
}

/// First qualifying interface wins, in the order given.
///
/// Enumeration order is kept as the OS reports it so a host keeps the same
/// topic namespace across restarts of this publisher.
pub fn select_host_id(candidates: &[InterfaceCandidate]) -> HostId {
    candidates
        .iter()
        .filter(|candidate| candidate.qualifies())
        .find_map(|candidate| {
            debug!("Selected interface {} for host ID", candidate.name);
            candidate.mac.as_ref().map(format_mac)
        })
        .map(HostId)
        .unwrap_or_default()
}

fn format_mac(mac: &MacAddress) -> String {
    let bytes = mac.bytes();
    format!(
        "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
        bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5]
    )
}

fn enumerate_interfaces() -> Result<Vec<InterfaceCandidate>, IdentityError> {
    let addrs = getifaddrs().map_err(io::Error::from)?;

    let mut candidates = Vec::new();
    for ifaddr in addrs {
        // getifaddrs yields one entry per address family; only the
        // link-layer one carries the hardware address
        let Some(link) = ifaddr.address.as_ref().and_then(|addr| addr.as_link_addr()) else {
            continue;
        };

        let mac = link
            .addr()
            .filter(|bytes| bytes.iter().any(|&b| b != 0))
            .map(MacAddress::new);

        debug!("Found interface: {} ({:?})", ifaddr.interface_name, mac);
        candidates.push(InterfaceCandidate {
            name: ifaddr.interface_name,
            is_up: ifaddr.flags.contains(InterfaceFlags::IFF_UP),
            is_loopback: ifaddr.flags.contains(InterfaceFlags::IFF_LOOPBACK),
            mac,
        });
    }

    Ok(candidates)
}
