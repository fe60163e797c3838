//! IOD control block used to release an AR

use crate::block::{BlockHeader, BlockType};
use crate::error::PnioResult;
use bytes::BufMut;
use pnio_core::{ArUuid, ByteReader};

/// Encoded size of the release block without trailing payload
pub const IOD_RELEASE_BLOCK_SIZE: usize = 32;

/// Subtracted from the block size to form the release block length
pub const IOD_RELEASE_BLOCK_LENGTH_OFFSET: usize = 4;

/// ControlCommand: Release
pub const CONTROL_COMMAND_RELEASE: u16 = 0x0004;

/// ControlCommand: Done, set by the device in its reply
pub const CONTROL_COMMAND_DONE: u16 = 0x0008;

/// IODReleaseBlock (request 0x0114, response 0x8114)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IodReleaseBlock {
    pub block_header: BlockHeader,
    pub reserved1: u16,
    pub ar_uuid: ArUuid,
    pub session_key: u16,
    pub reserved2: u16,
    pub control_command: u16,
    pub control_block_properties: u16,
    /// Bytes following the fixed block, if any
    pub payload: Vec<u8>,
}

impl IodReleaseBlock {
    /// Release request for the given AR
    pub fn request(ar_uuid: ArUuid, session_key: u16) -> Self {
        Self::with_type(BlockType::IodReleaseReq, ar_uuid, session_key, CONTROL_COMMAND_RELEASE)
    }

    /// Reply a device sends after releasing the AR
    pub fn response(ar_uuid: ArUuid, session_key: u16) -> Self {
        Self::with_type(BlockType::IodReleaseRes, ar_uuid, session_key, CONTROL_COMMAND_DONE)
    }

    fn with_type(block_type: BlockType, ar_uuid: ArUuid, session_key: u16, control_command: u16) -> Self {
        let block_length = (IOD_RELEASE_BLOCK_SIZE - IOD_RELEASE_BLOCK_LENGTH_OFFSET) as u16;
        Self {
            block_header: BlockHeader::new(block_type, block_length),
            reserved1: 0,
            ar_uuid,
            session_key,
            reserved2: 0,
            control_command,
            control_block_properties: 0,
            payload: Vec::new(),
        }
    }

    pub fn is_done(&self) -> bool {
        self.control_command & CONTROL_COMMAND_DONE != 0
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(IOD_RELEASE_BLOCK_SIZE + self.payload.len());
        self.block_header.encode_into(&mut buf);
        buf.put_u16(self.reserved1);
        buf.put_slice(self.ar_uuid.as_bytes());
        buf.put_u16(self.session_key);
        buf.put_u16(self.reserved2);
        buf.put_u16(self.control_command);
        buf.put_u16(self.control_block_properties);
        buf.put_slice(&self.payload);
        buf
    }

    pub fn decode(data: &[u8]) -> PnioResult<Self> {
        Self::decode_fields(&mut ByteReader::new(data)).map_err(|e| e.into_malformed("IOD release block"))
    }

    fn decode_fields(reader: &mut ByteReader<'_>) -> PnioResult<Self> {
        Ok(Self {
            block_header: BlockHeader::decode_from(reader)?,
            reserved1: reader.read_u16()?,
            ar_uuid: ArUuid::from_bytes(reader.read_array()?),
            session_key: reader.read_u16()?,
            reserved2: reader.read_u16()?,
            control_command: reader.read_u16()?,
            control_block_properties: reader.read_u16()?,
            payload: reader.read_rest().to_vec(),
        })
    }
}
