//! Transport layer module for the PROFINET IO client
//!
//! This crate provides the datagram endpoint abstraction the RPC session
//! runs over, and its tokio UDP implementation.

pub mod endpoint;
pub mod error;
pub mod udp;

pub use endpoint::DatagramEndpoint;
pub use error::{PnioError, PnioResult};
pub use udp::{MAX_UDP_PAYLOAD_SIZE, UdpSettings, UdpTransport};
