//! AR (application relationship) setup blocks

use crate::block::{BlockHeader, BlockType};
use crate::error::{PnioError, PnioResult};
use bytes::BufMut;
use pnio_core::{ArUuid, ByteReader, MacAddress, ObjectUuid};

/// Size of the AR block request without the station name bytes
pub const AR_BLOCK_REQUEST_FIXED_SIZE: usize = 58;

/// Subtracted from the fixed size to form the request block length
///
/// Differs from the release block offset because the fixed size omits the
/// two station name bytes.
pub const AR_BLOCK_REQUEST_LENGTH_OFFSET: usize = 2;

/// Encoded size of an AR block response
pub const AR_BLOCK_RESPONSE_SIZE: usize = 34;

/// Subtracted from the response size to form its block length
pub const AR_BLOCK_RESPONSE_LENGTH_OFFSET: usize = 4;

/// IO controller AR
pub const AR_TYPE_IOCAR_SINGLE: u16 = 0x0006;

/// State active, supervisor takeover not allowed, parameterization server
/// CM initiator, startup mode legacy
pub const AR_PROPERTIES_DEFAULT: u32 = 0x0000_0131;

/// Timeout factor in units of 100 ms
pub const CM_INITIATOR_ACTIVITY_TIMEOUT_FACTOR: u16 = 100;

/// UDP port announced for RT class UDP
pub const CM_INITIATOR_UDP_RT_PORT: u16 = 0x8892;

/// Station name announced by this controller
pub const CM_INITIATOR_STATION_NAME: &str = "tp";

/// ARBlockReq sent with the CONNECT operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArBlockRequest {
    pub block_header: BlockHeader,
    pub ar_type: u16,
    pub ar_uuid: ArUuid,
    pub session_key: u16,
    pub cm_initiator_mac: MacAddress,
    pub cm_initiator_object_uuid: ObjectUuid,
    pub ar_properties: u32,
    pub timeout_factor: u16,
    pub udp_rt_port: u16,
    pub station_name: String,
}

impl ArBlockRequest {
    /// Association setup block for this controller
    pub fn new(
        ar_uuid: ArUuid,
        session_key: u16,
        initiator_mac: MacAddress,
        initiator_object_uuid: ObjectUuid,
    ) -> Self {
        let block_length = (AR_BLOCK_REQUEST_FIXED_SIZE - AR_BLOCK_REQUEST_LENGTH_OFFSET) as u16;
        Self {
            block_header: BlockHeader::new(BlockType::ArBlockReq, block_length),
            ar_type: AR_TYPE_IOCAR_SINGLE,
            ar_uuid,
            session_key,
            cm_initiator_mac: initiator_mac,
            cm_initiator_object_uuid: initiator_object_uuid,
            ar_properties: AR_PROPERTIES_DEFAULT,
            timeout_factor: CM_INITIATOR_ACTIVITY_TIMEOUT_FACTOR,
            udp_rt_port: CM_INITIATOR_UDP_RT_PORT,
            station_name: CM_INITIATOR_STATION_NAME.to_string(),
        }
    }

    pub fn encode(&self) -> PnioResult<Vec<u8>> {
        let name = self.station_name.as_bytes();
        let name_length = u16::try_from(name.len())
            .map_err(|_| PnioError::InvalidData(format!("Station name too long: {} bytes", name.len())))?;

        let mut buf = Vec::with_capacity(AR_BLOCK_REQUEST_FIXED_SIZE + name.len());
        self.block_header.encode_into(&mut buf);
        buf.put_u16(self.ar_type);
        buf.put_slice(self.ar_uuid.as_bytes());
        buf.put_u16(self.session_key);
        buf.put_slice(self.cm_initiator_mac.as_bytes());
        buf.put_slice(self.cm_initiator_object_uuid.as_bytes());
        buf.put_u32(self.ar_properties);
        buf.put_u16(self.timeout_factor);
        buf.put_u16(self.udp_rt_port);
        buf.put_u16(name_length);
        buf.put_slice(name);
        Ok(buf)
    }

    pub fn decode(data: &[u8]) -> PnioResult<Self> {
        Self::decode_fields(&mut ByteReader::new(data)).map_err(|e| e.into_malformed("AR block request"))
    }

    fn decode_fields(reader: &mut ByteReader<'_>) -> PnioResult<Self> {
        let block_header = BlockHeader::decode_from(reader)?;
        let ar_type = reader.read_u16()?;
        let ar_uuid = ArUuid::from_bytes(reader.read_array()?);
        let session_key = reader.read_u16()?;
        let cm_initiator_mac = MacAddress::new(reader.read_array()?);
        let cm_initiator_object_uuid = ObjectUuid::from_bytes(reader.read_array()?);
        let ar_properties = reader.read_u32()?;
        let timeout_factor = reader.read_u16()?;
        let udp_rt_port = reader.read_u16()?;
        let name_length = reader.read_u16()? as usize;
        let station_name = String::from_utf8(reader.read_bytes(name_length)?.to_vec())
            .map_err(|_| PnioError::MalformedFrame("Station name is not valid UTF-8".to_string()))?;

        Ok(Self {
            block_header,
            ar_type,
            ar_uuid,
            session_key,
            cm_initiator_mac,
            cm_initiator_object_uuid,
            ar_properties,
            timeout_factor,
            udp_rt_port,
            station_name,
        })
    }
}

/// ARBlockRes returned by the device in a CONNECT reply
///
/// Further blocks may follow it in the reply; they are not decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArBlockResponse {
    pub block_header: BlockHeader,
    pub ar_type: u16,
    pub ar_uuid: ArUuid,
    pub session_key: u16,
    pub cm_responder_mac: MacAddress,
    pub cm_responder_udp_rt_port: u16,
}

impl ArBlockResponse {
    pub fn new(ar_uuid: ArUuid, session_key: u16, responder_mac: MacAddress) -> Self {
        Self {
            block_header: BlockHeader::new(
                BlockType::ArBlockRes,
                (AR_BLOCK_RESPONSE_SIZE - AR_BLOCK_RESPONSE_LENGTH_OFFSET) as u16,
            ),
            ar_type: AR_TYPE_IOCAR_SINGLE,
            ar_uuid,
            session_key,
            cm_responder_mac: responder_mac,
            cm_responder_udp_rt_port: CM_INITIATOR_UDP_RT_PORT,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(AR_BLOCK_RESPONSE_SIZE);
        self.block_header.encode_into(&mut buf);
        buf.put_u16(self.ar_type);
        buf.put_slice(self.ar_uuid.as_bytes());
        buf.put_u16(self.session_key);
        buf.put_slice(self.cm_responder_mac.as_bytes());
        buf.put_u16(self.cm_responder_udp_rt_port);
        buf
    }

    pub fn decode(data: &[u8]) -> PnioResult<Self> {
        Self::decode_fields(&mut ByteReader::new(data)).map_err(|e| e.into_malformed("AR block response"))
    }

    fn decode_fields(reader: &mut ByteReader<'_>) -> PnioResult<Self> {
        Ok(Self {
            block_header: BlockHeader::decode_from(reader)?,
            ar_type: reader.read_u16()?,
            ar_uuid: ArUuid::from_bytes(reader.read_array()?),
            session_key: reader.read_u16()?,
            cm_responder_mac: MacAddress::new(reader.read_array()?),
            cm_responder_udp_rt_port: reader.read_u16()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ArBlockRequest {
        ArBlockRequest::new(
            ArUuid::from_bytes([0x42; 16]),
            0x1234,
            MacAddress::new([0x00, 0x0E, 0xCF, 0x01, 0x02, 0x03]),
            ObjectUuid::local(),
        )
    }

    #[test]
    fn test_ar_block_request_layout() {
        let encoded = request().encode().unwrap();
        assert_eq!(encoded.len(), AR_BLOCK_REQUEST_FIXED_SIZE + 2);
        // block type 0x0101, length fixed size - 2
        assert_eq!(&encoded[0..6], &[0x01, 0x01, 0x00, 56, 0x01, 0x00]);
        assert_eq!(&encoded[6..8], &[0x00, 0x06]);
        assert_eq!(&encoded[8..24], &[0x42; 16]);
        assert_eq!(&encoded[24..26], &[0x12, 0x34]);
        assert_eq!(&encoded[26..32], &[0x00, 0x0E, 0xCF, 0x01, 0x02, 0x03]);
        assert_eq!(&encoded[32..48], ObjectUuid::local().as_bytes());
        assert_eq!(&encoded[48..52], &[0x00, 0x00, 0x01, 0x31]);
        assert_eq!(&encoded[52..54], &[0x00, 100]);
        assert_eq!(&encoded[54..56], &[0x88, 0x92]);
        assert_eq!(&encoded[56..58], &[0x00, 0x02]);
        assert_eq!(&encoded[58..], b"tp");
    }

    #[test]
    fn test_ar_block_request_round_trip() {
        let block = request();
        let decoded = ArBlockRequest::decode(&block.encode().unwrap()).unwrap();
        assert_eq!(decoded, block);
    }

    #[test]
    fn test_ar_block_response_round_trip() {
        let block = ArBlockResponse::new(
            ArUuid::from_bytes([0x42; 16]),
            0x1234,
            MacAddress::new([0x00, 0x0E, 0xCF, 0xAA, 0xBB, 0xCC]),
        );
        let encoded = block.encode();
        assert_eq!(encoded.len(), AR_BLOCK_RESPONSE_SIZE);
        assert_eq!(&encoded[0..4], &[0x81, 0x01, 0x00, 30]);
        assert_eq!(ArBlockResponse::decode(&encoded).unwrap(), block);
    }

    #[test]
    fn test_truncated_station_name_is_malformed() {
        let encoded = request().encode().unwrap();
        assert!(matches!(
            ArBlockRequest::decode(&encoded[..encoded.len() - 1]),
            Err(PnioError::MalformedFrame(_))
        ));
    }
}
