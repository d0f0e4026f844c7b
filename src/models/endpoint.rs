//! Network endpoint value type

use crate::defaults::{NET_MAX_PORT, NET_MIN_HIGH_PORT};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};

// Routable addresses used only to pick the outbound interface; nothing is sent.
const DISCOVERY_TARGET_V4: &str = "192.0.2.1:9";
const DISCOVERY_TARGET_V6: &str = "[2001:db8::1]:9";

/// One network peer, used for both the source and destination roles
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    pub address: IpAddr,
    /// IPv6 address of a local endpoint, when the host has one
    pub secondary_address: Option<Ipv6Addr>,
    pub port: u16,
}

impl Endpoint {
    /// Remote endpoint: address and port are always explicit
    pub fn remote(address: IpAddr, port: u16) -> Self {
        Self {
            address,
            secondary_address: None,
            port,
        }
    }

    /// Local endpoint
    ///
    /// A missing address is discovered from the outbound interface, a
    /// missing port is drawn from the ephemeral range.
    pub fn local(address: Option<IpAddr>, port: Option<u16>) -> Self {
        let (address, secondary_address) = match address {
            Some(address) => (address, None),
            None => discover_local_addresses(),
        };
        Self {
            address,
            secondary_address,
            port: port.unwrap_or_else(random_high_port),
        }
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.address, self.port)
    }

    /// Source address to use towards a destination of the given family
    pub fn address_for(&self, destination: &IpAddr) -> IpAddr {
        match (destination, self.address, self.secondary_address) {
            (IpAddr::V6(_), IpAddr::V4(_), Some(v6)) => IpAddr::V6(v6),
            (IpAddr::V6(_), IpAddr::V4(_), None) => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
            (IpAddr::V4(_), IpAddr::V6(_), _) => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            _ => self.address,
        }
    }

    /// Identifier used in classification tables (`ip:port`)
    pub fn identifier(&self) -> String {
        self.socket_addr().to_string()
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.socket_addr())
    }
}

/// Random port in the ephemeral range
pub fn random_high_port() -> u16 {
    rand::thread_rng().gen_range(NET_MIN_HIGH_PORT..=NET_MAX_PORT)
}

/// Outbound IPv4 address plus IPv6 address if one is routable
///
/// Falls back to the unspecified address when there is no route.
pub fn discover_local_addresses() -> (IpAddr, Option<Ipv6Addr>) {
    let v4 = probe_route("0.0.0.0:0", DISCOVERY_TARGET_V4)
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
    let v6 = match probe_route("[::]:0", DISCOVERY_TARGET_V6) {
        Some(IpAddr::V6(v6)) => Some(v6),
        _ => None,
    };
    (v4, v6)
}

fn probe_route(bind: &str, target: &str) -> Option<IpAddr> {
    let socket = UdpSocket::bind(bind).ok()?;
    socket.connect(target).ok()?;
    let local = socket.local_addr().ok()?.ip();
    if local.is_unspecified() {
        None
    } else {
        Some(local)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_endpoint_gets_high_port() {
        for _ in 0..32 {
            let endpoint = Endpoint::local(Some(IpAddr::V4(Ipv4Addr::LOCALHOST)), None);
            assert!(endpoint.port >= NET_MIN_HIGH_PORT);
        }
    }

    #[test]
    fn test_local_endpoint_keeps_explicit_values() {
        let endpoint = Endpoint::local(Some("10.1.2.3".parse().unwrap()), Some(4000));
        assert_eq!(endpoint.address.to_string(), "10.1.2.3");
        assert_eq!(endpoint.port, 4000);
        assert!(endpoint.secondary_address.is_none());
    }

    #[test]
    fn test_discovery_never_panics() {
        let endpoint = Endpoint::local(None, Some(5000));
        assert!(endpoint.address.is_ipv4());
    }

    #[test]
    fn test_identifier_format() {
        let v4 = Endpoint::remote("192.0.2.1".parse().unwrap(), 5683);
        let v6 = Endpoint::remote("2001:db8::1".parse().unwrap(), 80);
        assert_eq!(v4.identifier(), "192.0.2.1:5683");
        assert_eq!(v6.identifier(), "[2001:db8::1]:80");
        assert_eq!(v4.to_string(), v4.identifier());
    }

    #[test]
    fn test_address_for_family() {
        let mut source = Endpoint::remote("10.0.0.5".parse().unwrap(), 50000);
        let v6_dst: IpAddr = "2001:db8::1".parse().unwrap();
        let v4_dst: IpAddr = "192.0.2.1".parse().unwrap();

        assert_eq!(source.address_for(&v4_dst), source.address);
        assert!(source.address_for(&v6_dst).is_unspecified());

        source.secondary_address = Some("2001:db8::5".parse().unwrap());
        assert_eq!(source.address_for(&v6_dst).to_string(), "2001:db8::5");
    }
}
