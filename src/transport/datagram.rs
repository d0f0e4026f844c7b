//! Connectionless (UDP) probes
//!
//! Frames are built by hand and sent through a raw socket so the source
//! endpoint can be chosen freely. Without the privilege to open raw sockets
//! the probe is sent through an ordinary kernel UDP socket instead.

use super::frame::{build_ipv4_frame, build_ipv6_segment, is_ipv4_reply, is_udp_reply_to};
use super::{effective_timeout, secure, NoResponseReason, ProbeOutcome, ProbeTransport};
use crate::defaults::INPUT_BUFFER_SIZE;
use crate::logging::ProbeLogger;
use crate::models::{Endpoint, SentToken, TestParameters};
use crate::types::{Protocol, TransportKind};
use async_trait::async_trait;
use socket2::{Domain, Protocol as SocketProtocol, Socket, Type};
use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

static RAW_SOCKETS_DENIED: AtomicBool = AtomicBool::new(false);

/// UDP probes with retries
#[derive(Clone)]
pub struct DatagramTransport {
    logger: ProbeLogger,
}

impl DatagramTransport {
    pub fn new(logger: ProbeLogger) -> Self {
        Self { logger }
    }

    async fn probe_cleartext(&self, params: &mut TestParameters, payload: &[u8]) -> ProbeOutcome {
        let request = DatagramRequest {
            protocol: params.protocol,
            source: params.src_endpoint.clone(),
            destination: params.dst_endpoint().clone(),
            payload: payload.to_vec(),
            timeout: effective_timeout(params.timeout),
            attempts: params.nr_retries.saturating_add(1),
            logger: self.logger.clone(),
        };

        let token = params.report_sent_packet();
        let result = tokio::task::spawn_blocking(move || request.execute())
            .await
            .unwrap_or_else(|join_error| Err(NoResponseReason::Io(join_error.to_string())));

        self.finish(params, token, result)
    }

    async fn probe_wrapped(&self, params: &mut TestParameters, payload: &[u8]) -> ProbeOutcome {
        let destination = params.dst_endpoint().socket_addr();
        let timeout = effective_timeout(params.timeout);
        let payload = payload.to_vec();

        let token = params.report_sent_packet();
        let result = tokio::task::spawn_blocking(move || {
            secure::exchange(destination, &payload, timeout)
        })
        .await
        .unwrap_or_else(|join_error| Err(NoResponseReason::Io(join_error.to_string())));

        if let Err(NoResponseReason::Unsupported(detail)) = &result {
            self.logger.log_unsupported(params.protocol, detail);
        }
        self.finish(params, token, result)
    }

    fn finish(
        &self,
        params: &mut TestParameters,
        token: SentToken,
        result: Result<Vec<u8>, NoResponseReason>,
    ) -> ProbeOutcome {
        let target = params.dst_endpoint().clone();
        match result {
            Ok(response) => {
                let rtt = params.report_received_packet(token);
                self.logger.log_response(params.protocol, &target, response.len(), rtt);
                ProbeOutcome::Response(response)
            }
            Err(reason) => {
                self.logger.log_probe_failure(params.protocol, &target, &reason.to_string());
                ProbeOutcome::NoResponse(reason)
            }
        }
    }
}

#[async_trait]
impl ProbeTransport for DatagramTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Connectionless
    }

    async fn probe(&self, params: &mut TestParameters, payload: &[u8]) -> ProbeOutcome {
        if wraps_secure_layer(params) {
            self.probe_wrapped(params, payload).await
        } else {
            self.probe_cleartext(params, payload).await
        }
    }
}

/// Only DTLS probes are wrapped; CoAP and mDNS stay cleartext under `--secure`
fn wraps_secure_layer(params: &TestParameters) -> bool {
    params.wrap_secure_layer && params.protocol == Protocol::Dtls
}

/// Everything one blocking exchange needs, owned
struct DatagramRequest {
    protocol: Protocol,
    source: Endpoint,
    destination: Endpoint,
    payload: Vec<u8>,
    timeout: Duration,
    attempts: u32,
    logger: ProbeLogger,
}

impl DatagramRequest {
    fn execute(self) -> Result<Vec<u8>, NoResponseReason> {
        let source_address = self.source.address_for(&self.destination.address);

        // A hand-built IPv6 checksum needs the real source address.
        let raw_possible = !RAW_SOCKETS_DENIED.load(Ordering::Relaxed)
            && !(source_address.is_ipv6() && source_address.is_unspecified());

        if raw_possible {
            match self.open_raw(source_address) {
                Ok(socket) => return self.exchange_raw(socket, source_address),
                Err(error) => {
                    if !RAW_SOCKETS_DENIED.swap(true, Ordering::Relaxed) {
                        self.logger.log_raw_socket_fallback(&error.to_string());
                    }
                }
            }
        }
        self.exchange_kernel()
    }

    fn open_raw(&self, source_address: IpAddr) -> io::Result<UdpSocket> {
        let socket = match self.destination.address {
            IpAddr::V4(_) => {
                let socket = Socket::new(Domain::IPV4, Type::RAW, Some(SocketProtocol::UDP))?;
                socket.set_header_included(true)?;
                socket
            }
            IpAddr::V6(_) => {
                let socket = Socket::new(Domain::IPV6, Type::RAW, Some(SocketProtocol::UDP))?;
                socket.bind(&SocketAddr::new(source_address, 0).into())?;
                socket
            }
        };
        socket.set_read_timeout(Some(self.timeout))?;
        Ok(socket.into())
    }

    fn exchange_raw(&self, socket: UdpSocket, source_address: IpAddr) -> Result<Vec<u8>, NoResponseReason> {
        let frame = match (source_address, self.destination.address) {
            (IpAddr::V4(source), IpAddr::V4(destination)) => build_ipv4_frame(
                source,
                self.source.port,
                destination,
                self.destination.port,
                &self.payload,
            ),
            (IpAddr::V6(source), IpAddr::V6(destination)) => build_ipv6_segment(
                source,
                self.source.port,
                destination,
                self.destination.port,
                &self.payload,
            ),
            _ => return Err(NoResponseReason::Unsupported("mixed address families".to_string())),
        }
        .map_err(|error| NoResponseReason::Unsupported(error.to_string()))?;

        // Raw sockets ignore the port; the frame carries it.
        let target = SocketAddr::new(self.destination.address, 0);
        let mut buffer = vec![0u8; INPUT_BUFFER_SIZE];

        for attempt in 1..=self.attempts {
            socket.send_to(&frame, target)?;
            self.logger.log_probe_sent(self.protocol, &self.destination, self.payload.len(), attempt);

            let deadline = Instant::now() + self.timeout;
            while let Some(remaining) = remaining_until(deadline) {
                socket.set_read_timeout(Some(remaining))?;
                let (read, from) = match socket.recv_from(&mut buffer) {
                    Ok(received) => received,
                    Err(error) if is_timeout(&error) => break,
                    Err(error) => return Err(error.into()),
                };
                if from.ip() != self.destination.address {
                    continue;
                }
                let received = &buffer[..read];
                let matched = match self.destination.address {
                    IpAddr::V4(peer) => is_ipv4_reply(received, peer, self.source.port),
                    IpAddr::V6(_) => is_udp_reply_to(received, self.source.port),
                };
                if matched {
                    return Ok(received.to_vec());
                }
            }
        }
        Err(NoResponseReason::Timeout)
    }

    fn exchange_kernel(&self) -> Result<Vec<u8>, NoResponseReason> {
        let socket = self.bind_kernel_socket()?;
        let target = self.destination.socket_addr();
        let mut buffer = vec![0u8; INPUT_BUFFER_SIZE];

        for attempt in 1..=self.attempts {
            socket.send_to(&self.payload, target)?;
            self.logger.log_probe_sent(self.protocol, &self.destination, self.payload.len(), attempt);

            let deadline = Instant::now() + self.timeout;
            while let Some(remaining) = remaining_until(deadline) {
                socket.set_read_timeout(Some(remaining))?;
                match socket.recv_from(&mut buffer) {
                    Ok((read, from)) if from.ip() == self.destination.address => {
                        return Ok(buffer[..read].to_vec());
                    }
                    Ok((_, from)) => {
                        self.logger.log_foreign_reply(from, &self.destination);
                    }
                    Err(error) if is_timeout(&error) => break,
                    Err(error) => return Err(error.into()),
                }
            }
        }
        Err(NoResponseReason::Timeout)
    }

    fn bind_kernel_socket(&self) -> Result<UdpSocket, NoResponseReason> {
        let unspecified = match self.destination.address {
            IpAddr::V4(_) => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            IpAddr::V6(_) => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
        };
        // Keep the requested source port when it is free.
        let socket = UdpSocket::bind(SocketAddr::new(unspecified, self.source.port))
            .or_else(|_| UdpSocket::bind(SocketAddr::new(unspecified, 0)))?;
        Ok(socket)
    }
}

fn remaining_until(deadline: Instant) -> Option<Duration> {
    let remaining = deadline.saturating_duration_since(Instant::now());
    if remaining.is_zero() {
        None
    } else {
        Some(remaining)
    }
}

fn is_timeout(error: &io::Error) -> bool {
    matches!(error.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut)
}
