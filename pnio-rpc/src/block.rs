//! Block header shared by every application block

use crate::error::PnioResult;
use bytes::BufMut;
use pnio_core::ByteReader;

/// Encoded size of a block header
pub const BLOCK_HEADER_LENGTH: usize = 6;

/// Block version sent in every request block
pub const BLOCK_VERSION_HIGH: u8 = 0x01;
pub const BLOCK_VERSION_LOW: u8 = 0x00;

/// Block type codes used by this client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockType {
    IodWriteReqHeader,
    IodReadReqHeader,
    ArBlockReq,
    IodReleaseReq,
    IodWriteResHeader,
    IodReadResHeader,
    ArBlockRes,
    IodReleaseRes,
    Other(u16),
}

impl BlockType {
    pub fn from_u16(value: u16) -> Self {
        match value {
            0x0008 => BlockType::IodWriteReqHeader,
            0x0009 => BlockType::IodReadReqHeader,
            0x0101 => BlockType::ArBlockReq,
            0x0114 => BlockType::IodReleaseReq,
            0x8008 => BlockType::IodWriteResHeader,
            0x8009 => BlockType::IodReadResHeader,
            0x8101 => BlockType::ArBlockRes,
            0x8114 => BlockType::IodReleaseRes,
            other => BlockType::Other(other),
        }
    }

    pub fn as_u16(&self) -> u16 {
        match self {
            BlockType::IodWriteReqHeader => 0x0008,
            BlockType::IodReadReqHeader => 0x0009,
            BlockType::ArBlockReq => 0x0101,
            BlockType::IodReleaseReq => 0x0114,
            BlockType::IodWriteResHeader => 0x8008,
            BlockType::IodReadResHeader => 0x8009,
            BlockType::ArBlockRes => 0x8101,
            BlockType::IodReleaseRes => 0x8114,
            BlockType::Other(value) => *value,
        }
    }

    /// Response blocks carry the request type with the top bit set
    pub fn is_response(&self) -> bool {
        self.as_u16() & 0x8000 != 0
    }
}

/// Block header: type, length, version
///
/// `block_length` counts the bytes after the length field itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    pub block_type: BlockType,
    pub block_length: u16,
    pub version_high: u8,
    pub version_low: u8,
}

impl BlockHeader {
    /// Create a header with the default block version 1.0
    pub fn new(block_type: BlockType, block_length: u16) -> Self {
        Self {
            block_type,
            block_length,
            version_high: BLOCK_VERSION_HIGH,
            version_low: BLOCK_VERSION_LOW,
        }
    }

    /// Append the encoded header to `buf`
    pub fn encode_into<B: BufMut>(&self, buf: &mut B) {
        buf.put_u16(self.block_type.as_u16());
        buf.put_u16(self.block_length);
        buf.put_u8(self.version_high);
        buf.put_u8(self.version_low);
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(BLOCK_HEADER_LENGTH);
        self.encode_into(&mut buf);
        buf
    }

    pub fn decode_from(reader: &mut ByteReader<'_>) -> PnioResult<Self> {
        Ok(Self {
            block_type: BlockType::from_u16(reader.read_u16()?),
            block_length: reader.read_u16()?,
            version_high: reader.read_u8()?,
            version_low: reader.read_u8()?,
        })
    }

    pub fn decode(data: &[u8]) -> PnioResult<Self> {
        Self::decode_from(&mut ByteReader::new(data))
            .map_err(|e| e.into_malformed("Block header"))
    }
}
