//! Probe transport strategies
//!
//! Every strategy follows the same contract:
//!
//! 1. count the probe as sent before transmitting
//! 2. transmit and wait for a correlated response within the timeout
//! 3. count the response (and its RTT) when one arrives
//! 4. return a [`ProbeOutcome`]
//!
//! Ordinary network failures (timeouts, refusals, resets, unreachable
//! hosts) are outcomes here, never errors.

mod datagram;
mod frame;
mod multicast;
mod secure;
mod stream;

pub use datagram::DatagramTransport;
pub use frame::{build_ipv4_frame, build_ipv6_segment, is_ipv4_reply, is_udp_reply_to};
pub use multicast::MulticastTransport;
pub use stream::StreamTransport;

use crate::defaults::MIN_TIMEOUT;
use crate::models::TestParameters;
use crate::types::TransportKind;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::time::Duration;

/// Why a probe ended without a response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoResponseReason {
    /// Nothing correlated arrived before the deadline
    Timeout,
    /// The peer actively refused (TCP RST, ICMP port unreachable)
    Refused,
    /// Any other socket failure
    Io(String),
    /// The transport cannot carry this probe
    Unsupported(String),
    /// The protocol has no transport
    NotRoutable,
}

impl fmt::Display for NoResponseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => f.write_str("timed out"),
            Self::Refused => f.write_str("connection refused"),
            Self::Io(message) => write!(f, "I/O error: {}", message),
            Self::Unsupported(message) => write!(f, "unsupported: {}", message),
            Self::NotRoutable => f.write_str("no transport for protocol"),
        }
    }
}

impl From<io::Error> for NoResponseReason {
    fn from(error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => Self::Timeout,
            io::ErrorKind::ConnectionRefused | io::ErrorKind::ConnectionReset => Self::Refused,
            _ => Self::Io(error.to_string()),
        }
    }
}

/// Result of one probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Response(Vec<u8>),
    NoResponse(NoResponseReason),
}

impl ProbeOutcome {
    pub fn is_response(&self) -> bool {
        matches!(self, Self::Response(_))
    }

    /// Response bytes, if any
    pub fn response(&self) -> Option<&[u8]> {
        match self {
            Self::Response(bytes) => Some(bytes),
            Self::NoResponse(_) => None,
        }
    }

    pub fn into_response(self) -> Option<Vec<u8>> {
        match self {
            Self::Response(bytes) => Some(bytes),
            Self::NoResponse(_) => None,
        }
    }
}

/// A way of sending one probe and waiting for its answer
#[async_trait]
pub trait ProbeTransport: Send + Sync {
    fn kind(&self) -> TransportKind;

    /// Send `payload` to the current destination of `params`
    async fn probe(&self, params: &mut TestParameters, payload: &[u8]) -> ProbeOutcome;
}

/// Per-attempt timeout actually handed to sockets; never zero
pub fn effective_timeout(timeout: Duration) -> Duration {
    timeout.max(MIN_TIMEOUT)
}
