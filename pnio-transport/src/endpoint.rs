//! Datagram endpoint trait for the transport layer

use crate::error::{PnioError, PnioResult};
use async_trait::async_trait;
use std::net::SocketAddr;
use tokio::time::Instant;

/// A bound datagram socket that can talk to arbitrary peers
///
/// The RPC session owns exactly one endpoint and issues at most one
/// request at a time on it, so implementations need no internal
/// request/response correlation.
#[async_trait]
pub trait DatagramEndpoint: Send + Sync {
    /// Send one datagram to `target`
    ///
    /// # Returns
    ///
    /// Number of bytes sent
    async fn send_to(&mut self, buf: &[u8], target: SocketAddr) -> PnioResult<usize>;

    /// Receive one datagram
    ///
    /// Datagrams longer than `buf` are truncated by the socket.
    ///
    /// # Returns
    ///
    /// Number of bytes received and the sender address
    async fn recv_from(&mut self, buf: &mut [u8]) -> PnioResult<(usize, SocketAddr)>;

    /// Receive one datagram, giving up at `deadline`
    ///
    /// `None` waits forever. Callers that skip unwanted datagrams keep
    /// passing the same deadline so the total wait stays bounded.
    async fn recv_from_until(
        &mut self,
        buf: &mut [u8],
        deadline: Option<Instant>,
    ) -> PnioResult<(usize, SocketAddr)> {
        match deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, self.recv_from(buf))
                .await
                .map_err(|_| PnioError::Timeout)?,
            None => self.recv_from(buf).await,
        }
    }
}
