//! Client tester
//!
//! The engine plays the server: it listens on the configured endpoint and
//! answers every client request with the payload. The client-test report is
//! printed exactly once when serving stops.

use crate::{
    defaults::{INPUT_BUFFER_SIZE, SERVER_POLL_INTERVAL},
    error::{AppError, Result},
    logging::ProbeLogger,
    models::TestParameters,
    output::Presenter,
    stats::ClientReport,
    transport::effective_timeout,
    types::TransportKind,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, UdpSocket};
use tokio::time::timeout;

/// Answers client requests on `params.src_endpoint`
pub struct ClientTester<P: Presenter> {
    params: TestParameters,
    payload: Vec<u8>,
    presenter: P,
    logger: ProbeLogger,
    max_requests: Option<u64>,
    poll_interval: Duration,
    handle_ctrl_c: bool,
    interrupt: Arc<AtomicBool>,
}

impl<P: Presenter> ClientTester<P> {
    pub fn new(params: TestParameters, payload: Vec<u8>, presenter: P) -> Self {
        let logger = ProbeLogger::new(params.verbose);
        Self {
            params,
            payload,
            presenter,
            logger,
            max_requests: None,
            poll_interval: SERVER_POLL_INTERVAL,
            handle_ctrl_c: false,
            interrupt: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_logger(mut self, logger: ProbeLogger) -> Self {
        self.logger = logger;
        self
    }

    /// Stop after this many requests; serve until interrupted when `None`
    pub fn with_max_requests(mut self, max_requests: Option<u64>) -> Self {
        self.max_requests = max_requests;
        self
    }

    /// Install a Ctrl-C handler while serving
    pub fn with_ctrl_c(mut self, handle_ctrl_c: bool) -> Self {
        self.handle_ctrl_c = handle_ctrl_c;
        self
    }

    /// Flag that stops serving once set
    pub fn interrupt_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.interrupt)
    }

    pub fn params(&self) -> &TestParameters {
        &self.params
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    /// Serve until interrupted or until `max_requests` requests arrived
    ///
    /// Setup errors end serving early; the report is printed either way.
    pub async fn serve(&mut self) -> Result<ClientReport> {
        let ctrl_c = self.handle_ctrl_c.then(|| {
            let flag = Arc::clone(&self.interrupt);
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    flag.store(true, Ordering::SeqCst);
                }
            })
        });

        let result = match self.params.protocol.transport() {
            Some(TransportKind::ConnectionOriented) => self.serve_stream().await,
            Some(TransportKind::Connectionless | TransportKind::MulticastQuery) => {
                self.serve_datagram().await
            }
            None => Err(AppError::config(format!(
                "Client test needs a single protocol, got {}",
                self.params.protocol
            ))),
        };

        if let Some(handle) = ctrl_c {
            handle.abort();
        }

        let report = self.params.statistics.client_report(&self.params.test_name);
        self.presenter.print_client_statistics(&report);
        result.map(|()| report)
    }

    fn should_stop(&self) -> bool {
        self.interrupt.load(Ordering::SeqCst)
            || self
                .max_requests
                .is_some_and(|max| self.params.statistics.packets_received >= max)
    }

    async fn serve_datagram(&mut self) -> Result<()> {
        let address = self.params.src_endpoint.socket_addr();
        let socket = UdpSocket::bind(address)
            .await
            .map_err(|e| AppError::network(format!("Cannot listen on {}: {}", address, e)))?;
        let mut buffer = vec![0u8; INPUT_BUFFER_SIZE];

        while !self.should_stop() {
            let (read, peer) = match timeout(self.poll_interval, socket.recv_from(&mut buffer)).await {
                Err(_) => continue,
                Ok(Err(error)) => {
                    self.logger.log_client_error(None, &error.to_string());
                    continue;
                }
                Ok(Ok(received)) => received,
            };

            self.params.statistics.packets_received += 1;
            self.logger.log_client_request(self.params.protocol, peer, read);

            match socket.send_to(&self.payload, peer).await {
                Ok(_) => self.params.statistics.packets_sent += 1,
                Err(error) => self.logger.log_client_error(Some(peer), &error.to_string()),
            }
        }
        Ok(())
    }

    async fn serve_stream(&mut self) -> Result<()> {
        let address = self.params.src_endpoint.socket_addr();
        let listener = TcpListener::bind(address)
            .await
            .map_err(|e| AppError::network(format!("Cannot listen on {}: {}", address, e)))?;
        let request_timeout = effective_timeout(self.params.timeout);
        let mut buffer = vec![0u8; INPUT_BUFFER_SIZE];

        while !self.should_stop() {
            let (mut stream, peer) = match timeout(self.poll_interval, listener.accept()).await {
                Err(_) => continue,
                Ok(Err(error)) => {
                    self.logger.log_client_error(None, &error.to_string());
                    continue;
                }
                Ok(Ok(accepted)) => accepted,
            };

            // One request per connection; a peer that closes or stays silent sent none
            let read = match timeout(request_timeout, stream.read(&mut buffer)).await {
                Ok(Ok(read)) if read > 0 => read,
                Ok(Ok(_)) => continue,
                Ok(Err(error)) => {
                    self.logger.log_client_error(Some(peer), &error.to_string());
                    continue;
                }
                Err(_) => {
                    self.logger.log_client_error(Some(peer), "no request before timeout");
                    continue;
                }
            };

            self.params.statistics.packets_received += 1;
            self.logger.log_client_request(self.params.protocol, peer, read);

            match stream.write_all(&self.payload).await {
                Ok(()) => self.params.statistics.packets_sent += 1,
                Err(error) => self.logger.log_client_error(Some(peer), &error.to_string()),
            }
        }
        Ok(())
    }
}
