//! Connection management module

pub mod clock;
pub mod config;
pub mod connection;
pub mod state;

pub use clock::{Clock, SystemClock};
pub use config::ConnectionConfig;
pub use connection::Connection;
pub use state::SessionState;
