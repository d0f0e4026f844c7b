//! IP/UDP frame construction and reply matching

use crate::error::{AppError, Result};
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::packet::ipv4::{self, Ipv4Packet, MutableIpv4Packet};
use pnet::packet::udp::{self, MutableUdpPacket, UdpPacket};
use pnet::packet::{MutablePacket, Packet};
use std::net::{Ipv4Addr, Ipv6Addr};

pub const IPV4_HEADER_LEN: usize = 20;
pub const UDP_HEADER_LEN: usize = 8;
const DEFAULT_TTL: u8 = 64;

/// Build a complete IPv4 frame (IP header + UDP header + payload)
///
/// The UDP checksum is left at zero, which IPv4 defines as "not computed".
pub fn build_ipv4_frame(
    source: Ipv4Addr,
    source_port: u16,
    destination: Ipv4Addr,
    destination_port: u16,
    payload: &[u8],
) -> Result<Vec<u8>> {
    let total_len = IPV4_HEADER_LEN + UDP_HEADER_LEN + payload.len();
    let total_len_u16 = u16::try_from(total_len)
        .map_err(|_| AppError::unsupported(format!("payload of {} bytes does not fit a frame", payload.len())))?;

    let mut buffer = vec![0u8; total_len];
    {
        let mut ip = MutableIpv4Packet::new(&mut buffer)
            .ok_or_else(|| AppError::internal("IPv4 buffer too small"))?;
        ip.set_version(4);
        ip.set_header_length((IPV4_HEADER_LEN / 4) as u8);
        ip.set_total_length(total_len_u16);
        ip.set_ttl(DEFAULT_TTL);
        ip.set_identification(rand::random());
        ip.set_next_level_protocol(IpNextHeaderProtocols::Udp);
        ip.set_source(source);
        ip.set_destination(destination);

        {
            let mut datagram = MutableUdpPacket::new(ip.payload_mut())
                .ok_or_else(|| AppError::internal("UDP buffer too small"))?;
            datagram.set_source(source_port);
            datagram.set_destination(destination_port);
            datagram.set_length((UDP_HEADER_LEN + payload.len()) as u16);
            datagram.set_checksum(0);
            datagram.set_payload(payload);
        }

        let checksum = ipv4::checksum(&ip.to_immutable());
        ip.set_checksum(checksum);
    }
    Ok(buffer)
}

/// Build a UDP segment for IPv6; the kernel supplies the IPv6 header
///
/// A zero checksum is illegal over IPv6, so it is filled in here.
pub fn build_ipv6_segment(
    source: Ipv6Addr,
    source_port: u16,
    destination: Ipv6Addr,
    destination_port: u16,
    payload: &[u8],
) -> Result<Vec<u8>> {
    let total_len = UDP_HEADER_LEN + payload.len();
    let total_len_u16 = u16::try_from(total_len)
        .map_err(|_| AppError::unsupported(format!("payload of {} bytes does not fit a segment", payload.len())))?;

    let mut buffer = vec![0u8; total_len];
    {
        let mut datagram = MutableUdpPacket::new(&mut buffer)
            .ok_or_else(|| AppError::internal("UDP buffer too small"))?;
        datagram.set_source(source_port);
        datagram.set_destination(destination_port);
        datagram.set_length(total_len_u16);
        datagram.set_payload(payload);
        let checksum = udp::ipv6_checksum(&datagram.to_immutable(), &source, &destination);
        datagram.set_checksum(checksum);
    }
    Ok(buffer)
}

/// Whether a received IPv4 frame is UDP from `from` addressed to `local_port`
pub fn is_ipv4_reply(frame: &[u8], from: Ipv4Addr, local_port: u16) -> bool {
    let ip = match Ipv4Packet::new(frame) {
        Some(ip) => ip,
        None => return false,
    };
    if ip.get_source() != from || ip.get_next_level_protocol() != IpNextHeaderProtocols::Udp {
        return false;
    }
    is_udp_reply_to(ip.payload(), local_port)
}

/// Whether a UDP segment is addressed to `local_port`
pub fn is_udp_reply_to(segment: &[u8], local_port: u16) -> bool {
    UdpPacket::new(segment).map_or(false, |datagram| datagram.get_destination() == local_port)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ipv4_frame_layout() {
        let source = Ipv4Addr::new(10, 0, 0, 5);
        let destination = Ipv4Addr::new(192, 0, 2, 1);
        let frame = build_ipv4_frame(source, 50000, destination, 5683, b"ping").unwrap();

        assert_eq!(frame.len(), 32);
        let ip = Ipv4Packet::new(&frame).unwrap();
        assert_eq!(ip.get_version(), 4);
        assert_eq!(ip.get_total_length(), 32);
        assert_eq!(ip.get_source(), source);
        assert_eq!(ip.get_destination(), destination);
        assert_eq!(ip.get_checksum(), ipv4::checksum(&ip));

        let datagram = UdpPacket::new(ip.payload()).unwrap();
        assert_eq!(datagram.get_source(), 50000);
        assert_eq!(datagram.get_destination(), 5683);
        assert_eq!(datagram.get_length(), 12);
        assert_eq!(datagram.get_checksum(), 0);
        assert_eq!(datagram.payload(), b"ping");
    }

    #[test]
    fn test_ipv6_segment_has_checksum() {
        let source: Ipv6Addr = "2001:db8::5".parse().unwrap();
        let destination: Ipv6Addr = "2001:db8::1".parse().unwrap();
        let segment = build_ipv6_segment(source, 50000, destination, 5683, b"ping").unwrap();

        let datagram = UdpPacket::new(&segment).unwrap();
        assert_ne!(datagram.get_checksum(), 0);
        assert_eq!(
            datagram.get_checksum(),
            udp::ipv6_checksum(&datagram, &source, &destination)
        );
    }

    #[test]
    fn test_oversized_payload_is_rejected() {
        let payload = vec![0u8; 70_000];
        assert!(build_ipv4_frame(Ipv4Addr::LOCALHOST, 1, Ipv4Addr::LOCALHOST, 2, &payload).is_err());
    }

    #[test]
    fn test_reply_matching() {
        let peer = Ipv4Addr::new(192, 0, 2, 1);
        let reply = build_ipv4_frame(peer, 5683, Ipv4Addr::new(10, 0, 0, 5), 50000, b"pong").unwrap();

        assert!(is_ipv4_reply(&reply, peer, 50000));
        assert!(!is_ipv4_reply(&reply, peer, 50001));
        assert!(!is_ipv4_reply(&reply, Ipv4Addr::new(192, 0, 2, 2), 50000));
        assert!(!is_ipv4_reply(&reply[..10], peer, 50000));
    }
}
