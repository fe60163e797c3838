//! UDP transport implementation

use crate::endpoint::DatagramEndpoint;
use crate::error::{PnioError, PnioResult};
use async_trait::async_trait;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;

/// Maximum UDP payload size
pub const MAX_UDP_PAYLOAD_SIZE: usize = 65507;

/// UDP transport layer settings
#[derive(Debug, Clone)]
pub struct UdpSettings {
    pub local_address: SocketAddr,
    /// Socket-level receive guard, independent of per-operation timeouts
    pub timeout: Option<Duration>,
}

impl UdpSettings {
    /// Create new UDP settings bound to `local_address`
    pub fn new(local_address: SocketAddr) -> Self {
        Self {
            local_address,
            timeout: None,
        }
    }

    /// Create UDP settings with timeout
    pub fn with_timeout(local_address: SocketAddr, timeout: Duration) -> Self {
        Self {
            local_address,
            timeout: Some(timeout),
        }
    }
}

impl Default for UdpSettings {
    fn default() -> Self {
        Self::new(SocketAddr::from(([0, 0, 0, 0], 0)))
    }
}

/// UDP transport layer implementation
pub struct UdpTransport {
    socket: Option<UdpSocket>,
    settings: UdpSettings,
}

impl UdpTransport {
    /// Create a new, unbound UDP transport
    pub fn new(settings: UdpSettings) -> Self {
        Self {
            socket: None,
            settings,
        }
    }

    /// Create and bind in one step
    pub async fn bind(settings: UdpSettings) -> PnioResult<Self> {
        let mut transport = Self::new(settings);
        transport.open().await?;
        Ok(transport)
    }

    /// Create UDP transport from a local address string
    pub async fn bind_address(address: &str) -> PnioResult<Self> {
        let addr: SocketAddr = address
            .parse()
            .map_err(|e| PnioError::InvalidData(format!("Invalid UDP address: {}", e)))?;
        Self::bind(UdpSettings::new(addr)).await
    }

    /// Bind the socket
    pub async fn open(&mut self) -> PnioResult<()> {
        if self.socket.is_some() {
            return Err(PnioError::Connection(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Socket has already been opened",
            )));
        }

        let socket = UdpSocket::bind(self.settings.local_address).await?;
        log::debug!("UDP endpoint bound to {}", socket.local_addr()?);
        self.socket = Some(socket);
        Ok(())
    }

    pub fn local_addr(&self) -> PnioResult<SocketAddr> {
        Ok(self.socket()?.local_addr()?)
    }

    pub fn is_closed(&self) -> bool {
        self.socket.is_none()
    }

    pub fn close(&mut self) {
        self.socket = None;
    }

    fn socket(&self) -> PnioResult<&UdpSocket> {
        self.socket.as_ref().ok_or_else(|| {
            PnioError::Connection(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "UDP socket not bound",
            ))
        })
    }
}

#[async_trait]
impl DatagramEndpoint for UdpTransport {
    async fn send_to(&mut self, buf: &[u8], target: SocketAddr) -> PnioResult<usize> {
        if buf.len() > MAX_UDP_PAYLOAD_SIZE {
            return Err(PnioError::FrameTooLarge {
                len: buf.len(),
                max: MAX_UDP_PAYLOAD_SIZE,
            });
        }
        Ok(self.socket()?.send_to(buf, target).await?)
    }

    async fn recv_from(&mut self, buf: &mut [u8]) -> PnioResult<(usize, SocketAddr)> {
        let socket = self.socket()?;
        if let Some(timeout) = self.settings.timeout {
            tokio::time::timeout(timeout, socket.recv_from(buf))
                .await
                .map_err(|_| PnioError::Timeout)?
                .map_err(PnioError::Connection)
        } else {
            socket.recv_from(buf).await.map_err(PnioError::Connection)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_udp_settings() {
        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let settings = UdpSettings::with_timeout(addr, Duration::from_secs(1));
        assert_eq!(settings.local_address, addr);
        assert_eq!(settings.timeout, Some(Duration::from_secs(1)));
        assert!(UdpSettings::default().timeout.is_none());
    }

    #[tokio::test]
    async fn test_loopback_exchange() {
        let mut a = UdpTransport::bind_address("127.0.0.1:0").await.unwrap();
        let mut b = UdpTransport::bind_address("127.0.0.1:0").await.unwrap();
        let b_addr = b.local_addr().unwrap();

        a.send_to(b"ping", b_addr).await.unwrap();
        let mut buf = [0u8; 16];
        let (len, from) = b.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..len], b"ping");
        assert_eq!(from, a.local_addr().unwrap());
    }

    #[tokio::test]
    async fn test_recv_timeout() {
        let mut a = UdpTransport::bind_address("127.0.0.1:0").await.unwrap();
        let mut buf = [0u8; 16];
        let deadline = tokio::time::Instant::now() + Duration::from_millis(20);
        let result = a.recv_from_until(&mut buf, Some(deadline)).await;
        assert!(matches!(result, Err(PnioError::Timeout)));
    }

    #[tokio::test]
    async fn test_recv_until_without_deadline() {
        let mut a = UdpTransport::bind_address("127.0.0.1:0").await.unwrap();
        let mut b = UdpTransport::bind_address("127.0.0.1:0").await.unwrap();
        a.send_to(b"pong", b.local_addr().unwrap()).await.unwrap();

        let mut buf = [0u8; 16];
        let (len, _) = b.recv_from_until(&mut buf, None).await.unwrap();
        assert_eq!(&buf[..len], b"pong");
    }

    #[tokio::test]
    async fn test_unbound_transport_fails() {
        let mut transport = UdpTransport::new(UdpSettings::default());
        assert!(transport.is_closed());
        let result = transport
            .send_to(b"x", "127.0.0.1:9".parse().unwrap())
            .await;
        assert!(matches!(result, Err(PnioError::Connection(_))));
    }
}
