//! DCP (Discovery and basic Configuration Protocol) identify client
//!
//! DCP runs directly on Ethernet (EtherType 0x8892). This crate builds
//! identify requests, decodes identify responses into
//! `DeviceDescription` records and drives the request/response exchange
//! over a caller-supplied [`DcpChannel`].
//!
//! Raw Ethernet access is platform specific and is left to the channel
//! implementation.

pub mod channel;
pub mod error;
pub mod frame;
pub mod lookup;

pub use channel::DcpChannel;
pub use error::{PnioError, PnioResult};
pub use frame::{DcpBlock, DcpFrame, DcpOption, ServiceType};
pub use lookup::{discover, get_station_info, send_discover, send_identify};
