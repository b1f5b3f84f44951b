//! Connectionless record transport.

#![allow(missing_docs)]

use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::TelemetryError;

/// Hands one encoded record to the remote sink without waiting for delivery.
pub trait Transport: Send + Sync {
    /// Sends `payload` to `host:port`.
    fn send(&self, host: &str, port: u16, payload: &[u8]) -> Result<(), TelemetryError>;
}

/// One datagram per record, sent from an ephemeral socket.
///
/// The sink address is resolved once per `host:port` and reused.
#[derive(Debug)]
pub struct UdpTransport {
    write_timeout: Duration,
    resolved: Mutex<Option<(String, u16, SocketAddr)>>,
}

impl Default for UdpTransport {
    fn default() -> Self {
        Self::new(Duration::from_millis(200))
    }
}

impl UdpTransport {
    #[must_use]
    pub fn new(write_timeout: Duration) -> Self {
        Self {
            write_timeout,
            resolved: Mutex::new(None),
        }
    }

    fn target(&self, host: &str, port: u16) -> Result<SocketAddr, TelemetryError> {
        let mut resolved = self.resolved.lock();
        if let Some((cached_host, cached_port, addr)) = resolved.as_ref() {
            if cached_host == host && *cached_port == port {
                return Ok(*addr);
            }
        }
        let addr = Self::resolve(host, port)?;
        *resolved = Some((host.to_string(), port, addr));
        Ok(addr)
    }

    fn resolve(host: &str, port: u16) -> Result<SocketAddr, TelemetryError> {
        (host, port)
            .to_socket_addrs()
            .map_err(|err| TelemetryError::UnresolvableHost(format!("{host}: {err}").into()))?
            .next()
            .ok_or_else(|| TelemetryError::UnresolvableHost(host.into()))
    }
}

impl Transport for UdpTransport {
    fn send(&self, host: &str, port: u16, payload: &[u8]) -> Result<(), TelemetryError> {
        let target = self.target(host, port)?;
        let bind = if target.is_ipv4() {
            "0.0.0.0:0"
        } else {
            "[::]:0"
        };
        let socket = UdpSocket::bind(bind)
            .map_err(|err| TelemetryError::Transport(format!("bind: {err}").into()))?;
        socket
            .set_write_timeout(Some(self.write_timeout))
            .map_err(|err| TelemetryError::Transport(format!("timeout: {err}").into()))?;
        socket
            .send_to(payload, target)
            .map_err(|err| TelemetryError::Transport(format!("{target}: {err}").into()))?;
        Ok(())
    }
}
