//! Negotiated record data (NRD) wrapper
//!
//! Sits between the RPC header and the application block:
//!
//! ```text
//! ArgsMaximum / PNIOStatus  u32   requests: 1500, replies: status
//! ArgsLength                u32   payload length
//! MaximumCount              u32   1500
//! Offset                    u32   0
//! ActualCount               u32   payload length
//! payload
//! ```
//!
//! The four length fields follow the DREP integer order of the enclosing
//! RPC header. The status is a byte array and is never swapped.

use crate::error::{PnioError, PnioResult};
use bytes::BufMut;
use pnio_core::{ByteOrder, ByteReader, PnioStatus};

/// NRD header length
pub const NRD_HEADER_LENGTH: usize = 20;

/// Negotiated maximum sizes sent in every request
pub const NRD_MAX_SIZE: u32 = 1500;

/// NRD wrapper with its payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NrdData {
    /// Args maximum in requests, PNIO status in replies
    pub args_maximum: u32,
    pub args_length: u32,
    pub maximum_count: u32,
    pub offset: u32,
    pub actual_count: u32,
    pub payload: Vec<u8>,
}

impl NrdData {
    /// Wrap a request payload
    ///
    /// Both length fields are set to the payload length; the maximum
    /// fields are fixed regardless of it.
    pub fn request(payload: Vec<u8>) -> PnioResult<Self> {
        let length = u32::try_from(payload.len()).map_err(|_| PnioError::FrameTooLarge {
            len: payload.len(),
            max: u32::MAX as usize,
        })?;
        Ok(Self {
            args_maximum: NRD_MAX_SIZE,
            args_length: length,
            maximum_count: NRD_MAX_SIZE,
            offset: 0,
            actual_count: length,
            payload,
        })
    }

    /// Wrap a reply payload carrying `status`
    pub fn response(status: PnioStatus, payload: Vec<u8>) -> PnioResult<Self> {
        let mut nrd = Self::request(payload)?;
        nrd.args_maximum = status.to_u32();
        Ok(nrd)
    }

    /// Status field as carried in replies
    pub fn status(&self) -> PnioStatus {
        PnioStatus::from_u32(self.args_maximum)
    }

    pub fn encoded_len(&self) -> usize {
        NRD_HEADER_LENGTH + self.payload.len()
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        buf.put_u32(self.args_maximum);
        buf.put_u32(self.args_length);
        buf.put_u32(self.maximum_count);
        buf.put_u32(self.offset);
        buf.put_u32(self.actual_count);
        buf.put_slice(&self.payload);
        buf
    }

    /// Decode a big-endian wrapper and validate the declared lengths
    pub fn decode(data: &[u8]) -> PnioResult<Self> {
        Self::decode_with(data, ByteOrder::Big)
    }

    /// Decode with the length fields in `order`
    pub fn decode_with(data: &[u8], order: ByteOrder) -> PnioResult<Self> {
        let mut reader = ByteReader::new(data);
        let [args_maximum, args_length, maximum_count, offset, actual_count] =
            read_header_fields(&mut reader, order).map_err(|e| e.into_malformed("NRD header"))?;

        let payload = reader.read_rest();
        if args_length as usize != payload.len() {
            return Err(PnioError::MalformedFrame(format!(
                "NRD args length {} does not match {} payload bytes",
                args_length,
                payload.len()
            )));
        }
        if actual_count != args_length {
            return Err(PnioError::MalformedFrame(format!(
                "NRD actual count {} does not match args length {}",
                actual_count, args_length
            )));
        }

        Ok(Self {
            args_maximum,
            args_length,
            maximum_count,
            offset,
            actual_count,
            payload: payload.to_vec(),
        })
    }
}

fn read_header_fields(reader: &mut ByteReader<'_>, order: ByteOrder) -> PnioResult<[u32; 5]> {
    // status bytes stay in wire order
    let mut fields = [reader.read_u32()?, 0, 0, 0, 0];
    for field in fields[1..].iter_mut() {
        *field = reader.read_u32_with(order)?;
    }
    Ok(fields)
}
