//! DTLS wrapping for connectionless probes
//!
//! Available with the `dtls` cargo feature. The session is negotiated over a
//! connected UDP socket and only the payload is exchanged inside it. Peer
//! certificates are not verified: the point is to reach the service.

use super::NoResponseReason;
use std::net::SocketAddr;
use std::time::Duration;

#[cfg(feature = "dtls")]
pub fn exchange(
    destination: SocketAddr,
    payload: &[u8],
    timeout: Duration,
) -> Result<Vec<u8>, NoResponseReason> {
    use crate::defaults::INPUT_BUFFER_SIZE;
    use openssl::ssl::{HandshakeError, SslConnector, SslMethod, SslVerifyMode};
    use std::io::{Read, Write};

    let socket = bind_connected(destination, timeout)?;

    let mut builder = SslConnector::builder(SslMethod::dtls())
        .map_err(|error| NoResponseReason::Io(error.to_string()))?;
    builder.set_verify(SslVerifyMode::NONE);
    let connector = builder.build();

    let configuration = connector
        .configure()
        .map_err(|error| NoResponseReason::Io(error.to_string()))?
        .verify_hostname(false)
        .use_server_name_indication(false);

    let mut session = match configuration.connect("", DatagramChannel(socket)) {
        Ok(session) => session,
        Err(HandshakeError::WouldBlock(_)) => return Err(NoResponseReason::Timeout),
        Err(HandshakeError::Failure(mid)) => {
            return Err(mid.into_error().into_io_error().map_or_else(
                |ssl_error| NoResponseReason::Io(ssl_error.to_string()),
                NoResponseReason::from,
            ))
        }
        Err(HandshakeError::SetupFailure(error)) => {
            return Err(NoResponseReason::Io(error.to_string()))
        }
    };

    session.write_all(payload).map_err(NoResponseReason::from)?;

    let mut buffer = vec![0u8; INPUT_BUFFER_SIZE];
    let read = session.read(&mut buffer).map_err(NoResponseReason::from)?;
    buffer.truncate(read);
    Ok(buffer)
}

#[cfg(not(feature = "dtls"))]
pub fn exchange(
    _destination: SocketAddr,
    _payload: &[u8],
    _timeout: Duration,
) -> Result<Vec<u8>, NoResponseReason> {
    Err(NoResponseReason::Unsupported(
        "DTLS support was not compiled in (enable the `dtls` feature)".to_string(),
    ))
}

#[cfg(feature = "dtls")]
fn bind_connected(
    destination: SocketAddr,
    timeout: Duration,
) -> Result<std::net::UdpSocket, NoResponseReason> {
    use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, UdpSocket};

    let unspecified = match destination {
        SocketAddr::V4(_) => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        SocketAddr::V6(_) => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
    };
    let socket = UdpSocket::bind(SocketAddr::new(unspecified, 0))?;
    socket.connect(destination)?;
    socket.set_read_timeout(Some(timeout))?;
    socket.set_write_timeout(Some(timeout))?;
    Ok(socket)
}

/// Read/Write adapter over a connected UDP socket; one datagram per call
#[cfg(feature = "dtls")]
#[derive(Debug)]
struct DatagramChannel(std::net::UdpSocket);

#[cfg(feature = "dtls")]
impl std::io::Read for DatagramChannel {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.0.recv(buf)
    }
}

#[cfg(feature = "dtls")]
impl std::io::Write for DatagramChannel {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.send(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
