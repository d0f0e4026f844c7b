//! Connection-oriented (TCP) probes

use super::{effective_timeout, NoResponseReason, ProbeOutcome, ProbeTransport};
use crate::defaults::INPUT_BUFFER_SIZE;
use crate::logging::ProbeLogger;
use crate::models::TestParameters;
use crate::types::TransportKind;
use async_trait::async_trait;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time;

/// One fresh TCP connection per probe, one bounded read
#[derive(Clone)]
pub struct StreamTransport {
    logger: ProbeLogger,
}

impl StreamTransport {
    pub fn new(logger: ProbeLogger) -> Self {
        Self { logger }
    }

    async fn exchange(
        target: SocketAddr,
        payload: &[u8],
        timeout: Duration,
    ) -> Result<Vec<u8>, NoResponseReason> {
        let mut stream = time::timeout(timeout, TcpStream::connect(target))
            .await
            .map_err(|_| NoResponseReason::Timeout)??;

        time::timeout(timeout, stream.write_all(payload))
            .await
            .map_err(|_| NoResponseReason::Timeout)??;

        let mut buffer = vec![0u8; INPUT_BUFFER_SIZE];
        let read = time::timeout(timeout, stream.read(&mut buffer))
            .await
            .map_err(|_| NoResponseReason::Timeout)??;
        buffer.truncate(read);
        Ok(buffer)
    }
}

#[async_trait]
impl ProbeTransport for StreamTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::ConnectionOriented
    }

    async fn probe(&self, params: &mut TestParameters, payload: &[u8]) -> ProbeOutcome {
        let target = params.dst_endpoint().clone();
        let timeout = effective_timeout(params.timeout);

        let token = params.report_sent_packet();
        self.logger.log_probe_sent(params.protocol, &target, payload.len(), 1);

        match Self::exchange(target.socket_addr(), payload, timeout).await {
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
