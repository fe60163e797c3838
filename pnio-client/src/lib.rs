//! PROFINET IO client
//!
//! Controller-side session engine for the connection-oriented PROFINET IO
//! services: establishing and releasing an application relationship,
//! reading and writing records, and implicit reads outside of any AR.
//!
//! # Example
//!
//! ```rust,no_run
//! use pnio_client::{Connection, ConnectionConfig};
//! use pnio_core::{DeviceDescription, MacAddress};
//! use std::net::Ipv4Addr;
//!
//! # async fn run() -> pnio_core::PnioResult<()> {
//! let info = DeviceDescription::new(Ipv4Addr::new(192, 0, 2, 1), 0x01, 0x02, 0x03, 0x04);
//! let mut rng = rand::thread_rng();
//! let mut conn = Connection::bind(info, ConnectionConfig::default(), &mut rng).await?;
//!
//! conn.connect("00:0c:29:11:22:33".parse::<MacAddress>()?).await?;
//! let modules = conn.read_identification().await?;
//! println!("{} APIs", modules.len());
//! # Ok(())
//! # }
//! ```

pub mod connection;
pub mod error;

pub use connection::{Clock, Connection, ConnectionConfig, SessionState, SystemClock};
pub use error::{PnioError, PnioResult};
