//! Routing of probes to transport strategies

use crate::error::{ErrorContext, Result};
use crate::logging::ProbeLogger;
use crate::models::TestParameters;
use crate::transport::{
    DatagramTransport, MulticastTransport, NoResponseReason, ProbeOutcome, ProbeTransport,
    StreamTransport,
};
use crate::types::{Protocol, TransportKind};
use std::fmt::Write as _;
use std::net::SocketAddr;
use std::path::Path;

/// Renders payload bytes for display
pub trait PayloadDecoder: Send + Sync {
    fn decode(&self, protocol: Protocol, payload: &[u8]) -> anyhow::Result<String>;
}

/// Text for text-framed protocols, a hex dump for everything else
#[derive(Debug, Default, Clone, Copy)]
pub struct TextPreviewDecoder;

impl PayloadDecoder for TextPreviewDecoder {
    fn decode(&self, protocol: Protocol, payload: &[u8]) -> anyhow::Result<String> {
        if protocol.is_text_framed() {
            let text = std::str::from_utf8(payload)
                .map_err(|e| anyhow::anyhow!("{} payload is not valid UTF-8: {}", protocol, e))?;
            return Ok(text.to_string());
        }
        Ok(hex_dump(payload))
    }
}

fn hex_dump(payload: &[u8]) -> String {
    let mut out = String::new();
    for (row, chunk) in payload.chunks(16).enumerate() {
        let _ = write!(out, "{:08x} ", row * 16);
        for byte in chunk {
            let _ = write!(out, " {:02x}", byte);
        }
        out.push('\n');
    }
    out
}

/// Selects the transport for the active protocol and forwards the probe
pub struct ProbeDispatcher {
    stream: StreamTransport,
    datagram: DatagramTransport,
    multicast: MulticastTransport,
    decoder: Box<dyn PayloadDecoder>,
    logger: ProbeLogger,
}

impl ProbeDispatcher {
    pub fn new(verbose: bool) -> Self {
        Self::with_logger(ProbeLogger::new(verbose))
    }

    pub fn with_logger(logger: ProbeLogger) -> Self {
        Self {
            stream: StreamTransport::new(logger.clone()),
            datagram: DatagramTransport::new(logger.clone()),
            multicast: MulticastTransport::new(logger.clone()),
            decoder: Box::new(TextPreviewDecoder),
            logger,
        }
    }

    /// Replace the payload decoder used for display
    pub fn with_decoder(mut self, decoder: Box<dyn PayloadDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    /// Send multicast queries somewhere other than the SSDP group
    pub fn with_multicast_group(mut self, group: SocketAddr) -> Self {
        self.multicast = MulticastTransport::with_group(group, self.logger.clone());
        self
    }

    /// Transport carrying `protocol`, if it has one
    pub fn transport_for(&self, protocol: Protocol) -> Option<&dyn ProbeTransport> {
        match protocol.transport()? {
            TransportKind::Connectionless => Some(&self.datagram),
            TransportKind::ConnectionOriented => Some(&self.stream),
            TransportKind::MulticastQuery => Some(&self.multicast),
        }
    }

    /// Send `payload` for `params.protocol` to the current destination
    pub async fn send_and_receive(
        &self,
        params: &mut TestParameters,
        payload: &[u8],
        display: bool,
    ) -> ProbeOutcome {
        let protocol = params.protocol;
        let transport = match self.transport_for(protocol) {
            Some(transport) => transport,
            None => {
                self.logger.log_unsupported(protocol, "no transport for this protocol selector");
                return ProbeOutcome::NoResponse(NoResponseReason::NotRoutable);
            }
        };

        if display {
            self.display(protocol, params.dst_endpoint().to_string(), payload);
        }

        transport.probe(params, payload).await
    }

    /// Like [`send_and_receive`](Self::send_and_receive), with the payload read from a file
    pub async fn send_and_receive_for_file(
        &self,
        params: &mut TestParameters,
        path: &Path,
        display: bool,
    ) -> Result<ProbeOutcome> {
        let payload = tokio::fs::read(path)
            .await
            .with_context(|| format!("Reading payload file {}", path.display()))?;
        Ok(self.send_and_receive(params, &payload, display).await)
    }

    fn display(&self, protocol: Protocol, target: String, payload: &[u8]) {
        match self.decoder.decode(protocol, payload) {
            Ok(text) => {
                println!("{} payload ({} bytes) to {}:", protocol, payload.len(), target);
                println!("{}", text.trim_end());
            }
            Err(error) => self.logger.log_decode_failure(protocol, &format!("{:#}", error)),
        }
    }
}
