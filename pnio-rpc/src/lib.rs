//! Frame codec for PROFINET IO connection-oriented services
//!
//! A request travels as three nested layers:
//!
//! ```text
//! RPC header (80 bytes)
//!   NRD wrapper (20 bytes)
//!     application block (block header + body)
//! ```
//!
//! This crate encodes and decodes each layer and the nested
//! identification record returned by the module-identification read.
//! It does no I/O.

pub mod ar;
pub mod block;
pub mod error;
pub mod identification;
pub mod iod;
pub mod nrd;
pub mod release;
pub mod rpc;

pub use ar::{ArBlockRequest, ArBlockResponse};
pub use block::{BLOCK_HEADER_LENGTH, BlockHeader, BlockType};
pub use error::{PnioError, PnioResult};
pub use identification::{IdentificationTable, ModuleIdentification, decode_identification};
pub use iod::IodHeader;
pub use nrd::NrdData;
pub use release::IodReleaseBlock;
pub use rpc::{Operation, PacketType, RpcHeader, build_request, parse_frame, parse_response};
