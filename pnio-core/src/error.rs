use crate::status::PnioStatus;
use thiserror::Error;

/// Main error type for PROFINET IO client operations
#[derive(Error, Debug)]
pub enum PnioError {
    #[error("Connection error: {0}")]
    Connection(#[from] std::io::Error),

    /// A reply failed structural or length validation
    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    /// A record is shorter than the fields it declares
    #[error("Truncated record: {needed} bytes needed at offset {offset}, {remaining} remaining")]
    TruncatedRecord {
        offset: usize,
        needed: usize,
        remaining: usize,
    },

    /// No reply arrived within the configured timeout
    #[error("Timeout")]
    Timeout,

    #[error("Frame too large: {len} bytes exceeds the limit of {max}")]
    FrameTooLarge { len: usize, max: usize },

    /// The device answered but reported a non-zero PNIO status
    #[error("Device reported error: {0}")]
    DeviceError(PnioStatus),

    /// The RPC layer answered with a FAULT or REJECT packet
    #[error("RPC call rejected by peer (packet type 0x{packet_type:02X})")]
    RpcRejected { packet_type: u8 },

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl PnioError {
    /// Re-label a short read as a malformed frame
    ///
    /// The byte reader reports `TruncatedRecord`; inside frame decoding a
    /// short buffer means the reply is structurally invalid.
    pub fn into_malformed(self, what: &str) -> Self {
        match self {
            PnioError::TruncatedRecord {
                offset,
                needed,
                remaining,
            } => PnioError::MalformedFrame(format!(
                "{} truncated: {} bytes needed at offset {}, {} remaining",
                what, needed, offset, remaining
            )),
            other => other,
        }
    }
}

/// Result type alias for PROFINET IO operations
pub type PnioResult<T> = Result<T, PnioError>;
