//! Type definitions and aliases

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

// Re-export commonly used types
pub use crate::error::{AppError, Result};

/// Protocols the engine knows how to select and route
///
/// The variants form a small containment lattice: `All` covers the two
/// transport families, `Udp` and `Tcp` cover their application protocols.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ValueEnum,
)]
pub enum Protocol {
    #[value(name = "all")]
    All,
    #[value(name = "udp")]
    Udp,
    #[value(name = "tcp")]
    Tcp,
    #[value(name = "coap")]
    Coap,
    #[value(name = "mqtt")]
    Mqtt,
    #[value(name = "dtls")]
    Dtls,
    #[value(name = "mdns")]
    Mdns,
    #[value(name = "ssdp")]
    Ssdp,
    #[value(name = "htcpcp")]
    Htcpcp,
    #[value(name = "rtsp")]
    Rtsp,
}

impl Protocol {
    /// Number of protocol variants
    pub const COUNT: usize = 10;

    /// Every variant, in report order
    pub const ALL_VARIANTS: [Protocol; Protocol::COUNT] = [
        Protocol::All,
        Protocol::Udp,
        Protocol::Tcp,
        Protocol::Coap,
        Protocol::Mqtt,
        Protocol::Dtls,
        Protocol::Mdns,
        Protocol::Ssdp,
        Protocol::Htcpcp,
        Protocol::Rtsp,
    ];

    /// Position of this variant in [`Protocol::ALL_VARIANTS`]
    pub fn index(self) -> usize {
        match self {
            Protocol::All => 0,
            Protocol::Udp => 1,
            Protocol::Tcp => 2,
            Protocol::Coap => 3,
            Protocol::Mqtt => 4,
            Protocol::Dtls => 5,
            Protocol::Mdns => 6,
            Protocol::Ssdp => 7,
            Protocol::Htcpcp => 8,
            Protocol::Rtsp => 9,
        }
    }

    /// Display name used in reports
    pub fn name(self) -> &'static str {
        match self {
            Protocol::All => "ALL",
            Protocol::Udp => "UDP",
            Protocol::Tcp => "TCP",
            Protocol::Coap => "CoAP",
            Protocol::Mqtt => "MQTT",
            Protocol::Dtls => "DTLS",
            Protocol::Mdns => "mDNS",
            Protocol::Ssdp => "SSDP",
            Protocol::Htcpcp => "HTCPCP",
            Protocol::Rtsp => "RTSP",
        }
    }

    /// Well-known port, if the protocol has one
    pub fn default_port(self) -> Option<u16> {
        match self {
            Protocol::All | Protocol::Udp | Protocol::Tcp => None,
            Protocol::Coap => Some(5683),
            Protocol::Mqtt => Some(1883),
            Protocol::Dtls => Some(4433),
            Protocol::Mdns => Some(5353),
            Protocol::Ssdp => Some(1900),
            Protocol::Htcpcp => Some(554),
            Protocol::Rtsp => Some(554),
        }
    }

    /// Transport strategy that carries this protocol
    ///
    /// Selector variants (`All`, `Udp`, `Tcp`) have no transport of their own.
    pub fn transport(self) -> Option<TransportKind> {
        match self {
            Protocol::Coap | Protocol::Dtls | Protocol::Mdns => Some(TransportKind::Connectionless),
            Protocol::Mqtt | Protocol::Htcpcp | Protocol::Rtsp => {
                Some(TransportKind::ConnectionOriented)
            }
            Protocol::Ssdp => Some(TransportKind::MulticastQuery),
            Protocol::All | Protocol::Udp | Protocol::Tcp => None,
        }
    }

    /// Whether the payload of this protocol is human-readable text
    pub fn is_text_framed(self) -> bool {
        matches!(self, Protocol::Ssdp | Protocol::Rtsp | Protocol::Htcpcp)
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Protocol {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        Protocol::ALL_VARIANTS
            .iter()
            .copied()
            .find(|p| p.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| AppError::config(format!("Unknown protocol: {}", s)))
    }
}

/// Whether `candidate` is selected by the protocol `mask`
pub fn protocol_enabled(candidate: Protocol, mask: Protocol) -> bool {
    if mask == Protocol::All || mask == candidate {
        return true;
    }
    match mask {
        Protocol::Udp => matches!(
            candidate,
            Protocol::Coap | Protocol::Dtls | Protocol::Mdns | Protocol::Ssdp
        ),
        Protocol::Tcp => matches!(
            candidate,
            Protocol::Mqtt | Protocol::Htcpcp | Protocol::Rtsp
        ),
        _ => false,
    }
}

/// Transport strategy families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportKind {
    /// Raw-frame UDP, optionally wrapped in DTLS
    Connectionless,
    /// Connected TCP stream
    ConnectionOriented,
    /// Multicast query with unicast replies
    MulticastQuery,
}

/// IP family of the current destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IpVersion {
    V4,
    V6,
}

impl IpVersion {
    pub fn of(address: &IpAddr) -> Self {
        match address {
            IpAddr::V4(_) => IpVersion::V4,
            IpAddr::V6(_) => IpVersion::V6,
        }
    }

    /// Numeric version, 4 or 6
    pub fn number(self) -> u8 {
        match self {
            IpVersion::V4 => 4,
            IpVersion::V6 => 6,
        }
    }
}
