//! IOD read/write request and response headers
//!
//! # Format
//! ```text
//! block header [6] | seq number u16 | AR uuid [16]
//! api u32 | slot u16 | subslot u16 | padding u16 | index u16
//! record data length u32 | reserved [16] | reserved [8]
//! record data
//! ```
//!
//! In write responses the first reserved field starts with two 16-bit
//! additional values followed by the PNIO status of the write.

use crate::block::{BlockHeader, BlockType};
use crate::error::{PnioError, PnioResult};
use bytes::BufMut;
use pnio_core::{ArUuid, ByteReader, PnioStatus};

/// Encoded size of the IOD header without record data
pub const IOD_HEADER_SIZE: usize = 64;

/// Block length of every IOD read/write header
pub const IOD_HEADER_BLOCK_LENGTH: u16 = 60;

/// Default record length requested by explicit reads
pub const DEFAULT_READ_LENGTH: u32 = 3932;

/// Record length requested by implicit reads
pub const IMPLICIT_READ_LENGTH: u32 = 4096;

/// Offset of the PNIO status inside the first reserved field of a response
const RESPONSE_STATUS_OFFSET: usize = 4;

/// IODReadReqHeader / IODWriteReqHeader and their responses
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IodHeader {
    pub block_header: BlockHeader,
    pub seq_number: u16,
    /// All zero for implicit reads
    pub ar_uuid: ArUuid,
    pub api: u32,
    pub slot: u16,
    pub subslot: u16,
    pub padding: u16,
    pub index: u16,
    pub record_data_length: u32,
    pub reserved1: [u8; 16],
    pub reserved2: [u8; 8],
    pub payload: Vec<u8>,
}

impl IodHeader {
    /// Read request for `length` bytes of record `index`
    pub fn read_request(
        ar_uuid: ArUuid,
        api: u32,
        slot: u16,
        subslot: u16,
        index: u16,
        length: u32,
    ) -> Self {
        Self::new(
            BlockType::IodReadReqHeader,
            ar_uuid,
            api,
            slot,
            subslot,
            index,
            length,
            Vec::new(),
        )
    }

    /// Read request without an AR context
    pub fn implicit_read_request(api: u32, slot: u16, subslot: u16, index: u16) -> Self {
        Self::read_request(ArUuid::NIL, api, slot, subslot, index, IMPLICIT_READ_LENGTH)
    }

    /// Write request carrying `data` as record data
    pub fn write_request(
        ar_uuid: ArUuid,
        api: u32,
        slot: u16,
        subslot: u16,
        index: u16,
        data: Vec<u8>,
    ) -> PnioResult<Self> {
        let length = u32::try_from(data.len()).map_err(|_| PnioError::FrameTooLarge {
            len: data.len(),
            max: u32::MAX as usize,
        })?;
        Ok(Self::new(
            BlockType::IodWriteReqHeader,
            ar_uuid,
            api,
            slot,
            subslot,
            index,
            length,
            data,
        ))
    }

    #[allow(clippy::too_many_arguments)]
    pub fn new(
        block_type: BlockType,
        ar_uuid: ArUuid,
        api: u32,
        slot: u16,
        subslot: u16,
        index: u16,
        record_data_length: u32,
        payload: Vec<u8>,
    ) -> Self {
        Self {
            block_header: BlockHeader::new(block_type, IOD_HEADER_BLOCK_LENGTH),
            seq_number: 0,
            ar_uuid,
            api,
            slot,
            subslot,
            padding: 0,
            index,
            record_data_length,
            reserved1: [0; 16],
            reserved2: [0; 8],
            payload,
        }
    }

    /// Status a device places in a write response
    pub fn response_status(&self) -> PnioStatus {
        let mut bytes = [0u8; PnioStatus::LENGTH];
        bytes.copy_from_slice(&self.reserved1[RESPONSE_STATUS_OFFSET..RESPONSE_STATUS_OFFSET + PnioStatus::LENGTH]);
        PnioStatus::from_bytes(bytes)
    }

    pub fn set_response_status(&mut self, status: PnioStatus) {
        self.reserved1[RESPONSE_STATUS_OFFSET..RESPONSE_STATUS_OFFSET + PnioStatus::LENGTH]
            .copy_from_slice(&status.to_bytes());
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(IOD_HEADER_SIZE + self.payload.len());
        self.block_header.encode_into(&mut buf);
        buf.put_u16(self.seq_number);
        buf.put_slice(self.ar_uuid.as_bytes());
        buf.put_u32(self.api);
        buf.put_u16(self.slot);
        buf.put_u16(self.subslot);
        buf.put_u16(self.padding);
        buf.put_u16(self.index);
        buf.put_u32(self.record_data_length);
        buf.put_slice(&self.reserved1);
        buf.put_slice(&self.reserved2);
        buf.put_slice(&self.payload);
        buf
    }

    pub fn decode(data: &[u8]) -> PnioResult<Self> {
        Self::decode_fields(&mut ByteReader::new(data)).map_err(|e| e.into_malformed("IOD header"))
    }

    fn decode_fields(reader: &mut ByteReader<'_>) -> PnioResult<Self> {
        Ok(Self {
            block_header: BlockHeader::decode_from(reader)?,
            seq_number: reader.read_u16()?,
            ar_uuid: ArUuid::from_bytes(reader.read_array()?),
            api: reader.read_u32()?,
            slot: reader.read_u16()?,
            subslot: reader.read_u16()?,
            padding: reader.read_u16()?,
            index: reader.read_u16()?,
            record_data_length: reader.read_u32()?,
            reserved1: reader.read_array()?,
            reserved2: reader.read_array()?,
            payload: reader.read_rest().to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const AR: [u8; 16] = [0x42; 16];

    #[test]
    fn test_read_request_layout() {
        let header = IodHeader::read_request(ArUuid::from_bytes(AR), 0, 1, 0x8001, 0xF840, DEFAULT_READ_LENGTH);
        let encoded = header.encode();
        assert_eq!(encoded.len(), IOD_HEADER_SIZE);
        assert_eq!(&encoded[0..6], &[0x00, 0x09, 0x00, 60, 0x01, 0x00]);
        assert_eq!(&encoded[6..8], &[0x00, 0x00]);
        assert_eq!(&encoded[8..24], &AR);
        assert_eq!(&encoded[24..28], &[0, 0, 0, 0]);
        assert_eq!(&encoded[28..30], &[0x00, 0x01]);
        assert_eq!(&encoded[30..32], &[0x80, 0x01]);
        assert_eq!(&encoded[32..34], &[0x00, 0x00]);
        assert_eq!(&encoded[34..36], &[0xF8, 0x40]);
        assert_eq!(&encoded[36..40], &3932u32.to_be_bytes());
        assert!(encoded[40..64].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_implicit_read_has_nil_ar() {
        let header = IodHeader::implicit_read_request(0, 0, 1, 0xAFF0);
        assert!(header.ar_uuid.is_nil());
        assert_eq!(header.record_data_length, 4096);
        assert_eq!(&header.encode()[8..24], &[0u8; 16]);
    }

    #[test]
    fn test_write_request_round_trip() {
        let header = IodHeader::write_request(ArUuid::from_bytes(AR), 0, 1, 1, 0x43D, vec![1, 2, 3, 4, 5]).unwrap();
        assert_eq!(header.block_header.block_type, BlockType::IodWriteReqHeader);
        assert_eq!(header.record_data_length, 5);

        let encoded = header.encode();
        assert_eq!(encoded.len(), IOD_HEADER_SIZE + 5);
        assert_eq!(IodHeader::decode(&encoded).unwrap(), header);
    }

    #[test]
    fn test_response_status_slot() {
        let mut header = IodHeader::new(BlockType::IodWriteResHeader, ArUuid::from_bytes(AR), 0, 1, 1, 0x43D, 0, Vec::new());
        assert!(header.response_status().is_ok());

        let status = PnioStatus::from_u32(0xDF80_B100);
        header.set_response_status(status);
        let encoded = header.encode();
        assert_eq!(&encoded[44..48], &[0xDF, 0x80, 0xB1, 0x00]);
        assert_eq!(IodHeader::decode(&encoded).unwrap().response_status(), status);
    }

    #[test]
    fn test_short_header_is_malformed() {
        let encoded = IodHeader::implicit_read_request(0, 0, 1, 1).encode();
        assert!(matches!(IodHeader::decode(&encoded[..63]), Err(PnioError::MalformedFrame(_))));
    }
}
