//! Error types for the client crate

pub use pnio_core::error::{PnioError, PnioResult};
