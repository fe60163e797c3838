//! Raw Ethernet channel abstraction

use crate::error::PnioResult;
use async_trait::async_trait;

/// Layer-2 channel carrying complete Ethernet frames
///
/// Frames are passed without preamble or FCS, starting at the
/// destination MAC address. Implementations typically wrap a raw socket
/// bound to one network interface.
#[async_trait]
pub trait DcpChannel: Send {
    /// Transmit one frame
    async fn send_frame(&mut self, frame: &[u8]) -> PnioResult<()>;

    /// Wait for the next frame
    ///
    /// # Returns
    ///
    /// Number of bytes written into `buf`
    async fn recv_frame(&mut self, buf: &mut [u8]) -> PnioResult<usize>;
}
