pub use pnio_core::error::{PnioError, PnioResult};
