//! Error types for DCP lookup

pub use pnio_core::error::{PnioError, PnioResult};
