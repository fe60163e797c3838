//! pnio - PROFINET IO client
//!
//! Commissioning-side access to PROFINET IO devices: find a device by
//! its station name, establish an application relationship and read or
//! write its records.
//!
//! # Architecture
//!
//! - `pnio-core`: identifiers, device description, status and error types
//! - `pnio-transport`: datagram endpoint trait and UDP transport
//! - `pnio-rpc`: RPC header, NRD wrapper and block codec
//! - `pnio-dcp`: DCP identify (device lookup by station name)
//! - `pnio-client`: session engine
//!
//! # Usage
//!
//! ```no_run
//! use pnio::client::{Connection, ConnectionConfig};
//! use pnio::dcp::get_station_info;
//! ```

// Re-export core types
pub use pnio_core::{ArUuid, DeviceDescription, MacAddress, ObjectUuid, PnioError, PnioResult, PnioStatus};

// Re-export client API
pub mod client {
    pub use pnio_client::*;
}

// Re-export device lookup
pub mod dcp {
    pub use pnio_dcp::*;
}

// Re-export frame codec
pub mod rpc {
    pub use pnio_rpc::*;
}

// Re-export transports
pub mod transport {
    pub use pnio_transport::*;
}
