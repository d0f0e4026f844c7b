//! Multicast-query (SSDP) probes
//!
//! The query goes to the multicast group; replies come back unicast from
//! every device that heard it. Only the reply from the current destination
//! endpoint answers the probe.

use super::{effective_timeout, NoResponseReason, ProbeOutcome, ProbeTransport};
use crate::defaults::{INPUT_BUFFER_SIZE, SSDP_MULTICAST_GROUP};
use crate::logging::ProbeLogger;
use crate::models::Endpoint;
use crate::models::TestParameters;
use crate::types::{IpVersion, TransportKind};
use async_trait::async_trait;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::{self, Instant};

#[derive(Clone)]
pub struct MulticastTransport {
    group: SocketAddr,
    logger: ProbeLogger,
}

impl MulticastTransport {
    /// Transport querying the well-known SSDP group
    pub fn new(logger: ProbeLogger) -> Self {
        Self::with_group(SocketAddr::V4(SSDP_MULTICAST_GROUP), logger)
    }

    /// Transport querying a different group (or a unicast relay)
    pub fn with_group(group: SocketAddr, logger: ProbeLogger) -> Self {
        Self { group, logger }
    }

    pub fn group(&self) -> SocketAddr {
        self.group
    }

    async fn query(
        &self,
        source_port: u16,
        destination: &Endpoint,
        payload: &[u8],
        timeout: Duration,
    ) -> Result<Vec<u8>, NoResponseReason> {
        let socket = match UdpSocket::bind((Ipv4Addr::UNSPECIFIED, source_port)).await {
            Ok(socket) => socket,
            Err(_) => UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await?,
        };
        socket.send_to(payload, self.group).await?;

        let expected = destination.socket_addr();
        let deadline = Instant::now() + timeout;
        let mut buffer = vec![0u8; INPUT_BUFFER_SIZE];

        loop {
            let (read, from) = time::timeout_at(deadline, socket.recv_from(&mut buffer))
                .await
                .map_err(|_| NoResponseReason::Timeout)??;
            if from == expected {
                buffer.truncate(read);
                return Ok(buffer);
            }
            self.logger.log_foreign_reply(from, destination);
        }
    }
}

#[async_trait]
impl ProbeTransport for MulticastTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::MulticastQuery
    }

    async fn probe(&self, params: &mut TestParameters, payload: &[u8]) -> ProbeOutcome {
        if params.ip_version() == IpVersion::V6 {
            self.logger.log_unsupported(params.protocol, "multicast query over IPv6");
            return ProbeOutcome::NoResponse(NoResponseReason::Unsupported(
                "IPv6 destinations are not supported for multicast queries".to_string(),
            ));
        }

        let target = params.dst_endpoint().clone();
        let timeout = effective_timeout(params.timeout);
        let source_port = params.src_endpoint.port;

        let token = params.report_sent_packet();
        self.logger.log_probe_sent(params.protocol, &target, payload.len(), 1);

        match self.query(source_port, &target, payload, timeout).await {
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
