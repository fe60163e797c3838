//! Connectionless DCE/RPC header
//!
//! # Format
//! ```text
//! version u8 | packet type u8 | flags1 u8 | flags2 u8 | drep [u8; 3] | serial high u8
//! object uuid [16] | interface uuid [16] | activity uuid [16]
//! server boot time u32 | interface version u32 | sequence number u32
//! operation u16 | interface hint u16 | activity hint u16
//! length of body u16 | fragment number u16 | auth protocol u8 | serial low u8
//! body
//! ```
//!
//! Requests are always encoded big-endian (DREP `00 00 00`). Replies are
//! decoded in whatever integer representation their DREP announces. In a
//! little-endian reply the first three fields of each UUID are swapped back
//! into network order, as are the NRD length fields of the body.

use crate::error::{PnioError, PnioResult};
use crate::nrd::NrdData;
use bytes::BufMut;
use pnio_core::identifiers::IFACE_UUID_DEVICE;
use pnio_core::{ArUuid, ByteOrder, ByteReader, ObjectUuid};

/// Encoded size of the RPC header
pub const RPC_HEADER_LENGTH: usize = 80;

/// Connectionless RPC protocol version
pub const RPC_VERSION: u8 = 0x04;

/// Interface version of the PNIO device interface
pub const RPC_INTERFACE_VERSION: u32 = 1;

/// Largest body the 16-bit length field can describe
pub const RPC_MAX_BODY_LENGTH: usize = u16::MAX as usize;

pub const FLAGS1_LAST_FRAGMENT: u8 = 0x02;
pub const FLAGS1_FRAGMENT: u8 = 0x04;
pub const FLAGS1_NO_FACK: u8 = 0x08;
pub const FLAGS1_MAYBE: u8 = 0x10;
pub const FLAGS1_IDEMPOTENT: u8 = 0x20;
pub const FLAGS1_BROADCAST: u8 = 0x40;

/// Interface and activity hint value meaning "no hint"
pub const NO_HINT: u16 = 0xFFFF;

/// RPC packet types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PacketType {
    Request = 0,
    Ping = 1,
    Response = 2,
    Fault = 3,
    Working = 4,
    Nocall = 5,
    Reject = 6,
    Ack = 7,
    ClCancel = 8,
    Fack = 9,
    CancelAck = 10,
}

impl PacketType {
    pub fn from_u8(value: u8) -> PnioResult<Self> {
        Ok(match value {
            0 => PacketType::Request,
            1 => PacketType::Ping,
            2 => PacketType::Response,
            3 => PacketType::Fault,
            4 => PacketType::Working,
            5 => PacketType::Nocall,
            6 => PacketType::Reject,
            7 => PacketType::Ack,
            8 => PacketType::ClCancel,
            9 => PacketType::Fack,
            10 => PacketType::CancelAck,
            other => {
                return Err(PnioError::MalformedFrame(format!(
                    "Unknown RPC packet type 0x{:02X}",
                    other
                )));
            }
        })
    }

    pub fn as_u8(&self) -> u8 {
        *self as u8
    }
}

/// PNIO operation numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum Operation {
    Connect = 0,
    Release = 1,
    Read = 2,
    Write = 3,
    Control = 4,
    ReadImplicit = 5,
}

impl Operation {
    pub fn from_u16(value: u16) -> PnioResult<Self> {
        Ok(match value {
            0 => Operation::Connect,
            1 => Operation::Release,
            2 => Operation::Read,
            3 => Operation::Write,
            4 => Operation::Control,
            5 => Operation::ReadImplicit,
            other => {
                return Err(PnioError::MalformedFrame(format!(
                    "Unknown RPC operation number {}",
                    other
                )));
            }
        })
    }

    pub fn as_u16(&self) -> u16 {
        *self as u16
    }
}

/// Connectionless RPC header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcHeader {
    pub version: u8,
    pub packet_type: PacketType,
    pub flags1: u8,
    pub flags2: u8,
    pub drep: [u8; 3],
    pub serial_high: u8,
    pub object_uuid: ObjectUuid,
    pub interface_uuid: [u8; 16],
    pub activity_uuid: ArUuid,
    pub server_boot_time: u32,
    pub interface_version: u32,
    pub sequence_number: u32,
    pub operation: Operation,
    pub interface_hint: u16,
    pub activity_hint: u16,
    pub body_length: u16,
    pub fragment_number: u16,
    pub auth_protocol: u8,
    pub serial_low: u8,
}

impl RpcHeader {
    /// Header for a single-fragment, big-endian request
    pub fn request(
        operation: Operation,
        object_uuid: ObjectUuid,
        activity_uuid: ArUuid,
        body_length: u16,
    ) -> Self {
        Self {
            version: RPC_VERSION,
            packet_type: PacketType::Request,
            flags1: FLAGS1_IDEMPOTENT,
            flags2: 0x00,
            drep: [0x00, 0x00, 0x00],
            serial_high: 0,
            object_uuid,
            interface_uuid: IFACE_UUID_DEVICE,
            activity_uuid,
            server_boot_time: 0,
            interface_version: RPC_INTERFACE_VERSION,
            sequence_number: 0,
            operation,
            interface_hint: NO_HINT,
            activity_hint: NO_HINT,
            body_length,
            fragment_number: 0,
            auth_protocol: 0,
            serial_low: 0,
        }
    }

    /// Integer representation announced by the DREP field
    pub fn byte_order(&self) -> PnioResult<ByteOrder> {
        integer_order(self.drep)
    }

    /// Encode the header (big-endian) followed by `body`
    pub fn encode(&self, body: &[u8]) -> Vec<u8> {
        let mut buf = Vec::with_capacity(RPC_HEADER_LENGTH + body.len());
        buf.put_u8(self.version);
        buf.put_u8(self.packet_type.as_u8());
        buf.put_u8(self.flags1);
        buf.put_u8(self.flags2);
        buf.put_slice(&self.drep);
        buf.put_u8(self.serial_high);
        buf.put_slice(self.object_uuid.as_bytes());
        buf.put_slice(&self.interface_uuid);
        buf.put_slice(self.activity_uuid.as_bytes());
        buf.put_u32(self.server_boot_time);
        buf.put_u32(self.interface_version);
        buf.put_u32(self.sequence_number);
        buf.put_u16(self.operation.as_u16());
        buf.put_u16(self.interface_hint);
        buf.put_u16(self.activity_hint);
        buf.put_u16(self.body_length);
        buf.put_u16(self.fragment_number);
        buf.put_u8(self.auth_protocol);
        buf.put_u8(self.serial_low);
        buf.put_slice(body);
        buf
    }

    /// Decode a header and return it with the body bytes
    ///
    /// # Errors
    /// `MalformedFrame` when the buffer is shorter than a header, the
    /// version or packet type is unknown, the reply is fragmented, or the
    /// declared body length disagrees with the bytes present.
    pub fn decode(data: &[u8]) -> PnioResult<(Self, &[u8])> {
        let mut reader = ByteReader::new(data);
        let header = Self::decode_fields(&mut reader).map_err(|e| e.into_malformed("RPC header"))?;

        if header.version != RPC_VERSION {
            return Err(PnioError::MalformedFrame(format!(
                "Unsupported RPC version {}",
                header.version
            )));
        }
        if header.flags1 & FLAGS1_FRAGMENT != 0
            && (header.fragment_number != 0 || header.flags1 & FLAGS1_LAST_FRAGMENT == 0)
        {
            return Err(PnioError::MalformedFrame(format!(
                "Fragmented RPC packets are not supported (fragment {})",
                header.fragment_number
            )));
        }

        let body = reader.read_rest();
        if header.body_length as usize != body.len() {
            return Err(PnioError::MalformedFrame(format!(
                "RPC body length {} does not match {} received bytes",
                header.body_length,
                body.len()
            )));
        }

        Ok((header, body))
    }

    fn decode_fields(reader: &mut ByteReader<'_>) -> PnioResult<Self> {
        let version = reader.read_u8()?;
        let packet_type = reader.read_u8()?;
        let flags1 = reader.read_u8()?;
        let flags2 = reader.read_u8()?;
        let drep = reader.read_array::<3>()?;
        let serial_high = reader.read_u8()?;
        let order = integer_order(drep)?;

        let object_uuid = ObjectUuid::from_bytes(read_uuid(reader, order)?);
        let interface_uuid = read_uuid(reader, order)?;
        let activity_uuid = ArUuid::from_bytes(read_uuid(reader, order)?);

        let server_boot_time = reader.read_u32_with(order)?;
        let interface_version = reader.read_u32_with(order)?;
        let sequence_number = reader.read_u32_with(order)?;
        let operation = reader.read_u16_with(order)?;
        let interface_hint = reader.read_u16_with(order)?;
        let activity_hint = reader.read_u16_with(order)?;
        let body_length = reader.read_u16_with(order)?;
        let fragment_number = reader.read_u16_with(order)?;
        let auth_protocol = reader.read_u8()?;
        let serial_low = reader.read_u8()?;

        Ok(Self {
            version,
            packet_type: PacketType::from_u8(packet_type)?,
            flags1,
            flags2,
            drep,
            serial_high,
            object_uuid,
            interface_uuid,
            activity_uuid,
            server_boot_time,
            interface_version,
            sequence_number,
            operation: Operation::from_u16(operation)?,
            interface_hint,
            activity_hint,
            body_length,
            fragment_number,
            auth_protocol,
            serial_low,
        })
    }
}

fn integer_order(drep: [u8; 3]) -> PnioResult<ByteOrder> {
    match drep[0] >> 4 {
        0 => Ok(ByteOrder::Big),
        1 => Ok(ByteOrder::Little),
        other => Err(PnioError::MalformedFrame(format!(
            "Unknown RPC integer representation {}",
            other
        ))),
    }
}

/// Read a UUID, normalising its time fields to network order
fn read_uuid(reader: &mut ByteReader<'_>, order: ByteOrder) -> PnioResult<[u8; 16]> {
    let mut uuid = reader.read_array::<16>()?;
    if order == ByteOrder::Little {
        uuid[0..4].reverse();
        uuid[4..6].reverse();
        uuid[6..8].reverse();
    }
    Ok(uuid)
}

/// Wrap an application block into a complete request datagram
///
/// The block goes into an NRD wrapper, which becomes the body of a
/// request RPC header.
///
/// # Errors
/// `FrameTooLarge` when the wrapped body does not fit the 16-bit RPC
/// length field. Nothing is truncated.
pub fn build_request(
    operation: Operation,
    object_uuid: ObjectUuid,
    activity_uuid: ArUuid,
    application_block: &[u8],
) -> PnioResult<Vec<u8>> {
    let body = NrdData::request(application_block.to_vec())?.encode();
    let body_length = u16::try_from(body.len()).map_err(|_| PnioError::FrameTooLarge {
        len: body.len(),
        max: RPC_MAX_BODY_LENGTH,
    })?;

    let header = RpcHeader::request(operation, object_uuid, activity_uuid, body_length);
    Ok(header.encode(&body))
}

/// Decode any RPC frame carrying an NRD body
///
/// FAULT and REJECT packets are reported as `RpcRejected`, since their
/// body is a bare status rather than an NRD wrapper.
pub fn parse_frame(data: &[u8]) -> PnioResult<(RpcHeader, NrdData)> {
    let (header, body) = RpcHeader::decode(data)?;
    if matches!(header.packet_type, PacketType::Fault | PacketType::Reject) {
        return Err(PnioError::RpcRejected {
            packet_type: header.packet_type.as_u8(),
        });
    }
    let nrd = NrdData::decode_with(body, header.byte_order()?)?;
    Ok((header, nrd))
}

/// Decode a reply datagram into its RPC header and NRD wrapper
pub fn parse_response(data: &[u8]) -> PnioResult<(RpcHeader, NrdData)> {
    let (header, nrd) = parse_frame(data)?;
    if header.packet_type != PacketType::Response {
        return Err(PnioError::MalformedFrame(format!(
            "Expected an RPC response, got {:?}",
            header.packet_type
        )));
    }
    Ok((header, nrd))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nrd::NRD_HEADER_LENGTH;

    fn activity() -> ArUuid {
        ArUuid::from_bytes([0x11; 16])
    }

    fn remote() -> ObjectUuid {
        ObjectUuid::remote(0x01, 0x02, 0x03, 0x04)
    }

    fn response_from(request: &[u8]) -> Vec<u8> {
        let mut reply = request.to_vec();
        reply[1] = PacketType::Response.as_u8();
        reply
    }

    #[test]
    fn test_request_header_layout() {
        let frame = build_request(Operation::Read, remote(), activity(), &[0xAB; 4]).unwrap();
        assert_eq!(frame.len(), RPC_HEADER_LENGTH + NRD_HEADER_LENGTH + 4);

        assert_eq!(frame[0], 0x04);
        assert_eq!(frame[1], 0x00);
        assert_eq!(frame[2], 0x20);
        assert_eq!(frame[3], 0x00);
        assert_eq!(&frame[4..7], &[0, 0, 0]);
        assert_eq!(&frame[8..24], remote().as_bytes());
        assert_eq!(&frame[24..40], &IFACE_UUID_DEVICE);
        assert_eq!(&frame[40..56], activity().as_bytes());
        assert_eq!(&frame[56..60], &[0, 0, 0, 0]);
        assert_eq!(&frame[60..64], &[0, 0, 0, 1]);
        assert_eq!(&frame[64..68], &[0, 0, 0, 0]);
        assert_eq!(&frame[68..70], &[0x00, 0x02]);
        assert_eq!(&frame[70..74], &[0xFF, 0xFF, 0xFF, 0xFF]);
        assert_eq!(&frame[74..76], &[0x00, 24]);
        assert_eq!(&frame[76..80], &[0, 0, 0, 0]);
    }

    #[test]
    fn test_operation_numbers() {
        assert_eq!(Operation::Connect.as_u16(), 0);
        assert_eq!(Operation::Release.as_u16(), 1);
        assert_eq!(Operation::Read.as_u16(), 2);
        assert_eq!(Operation::Write.as_u16(), 3);
        assert_eq!(Operation::ReadImplicit.as_u16(), 5);
    }

    #[test]
    fn test_frame_round_trip_for_every_operation() {
        for operation in [
            Operation::Connect,
            Operation::Release,
            Operation::Read,
            Operation::Write,
            Operation::ReadImplicit,
        ] {
            let frame = build_request(operation, remote(), activity(), b"block").unwrap();
            let (header, nrd) = parse_frame(&frame).unwrap();
            assert_eq!(header.operation, operation);
            assert_eq!(header.packet_type, PacketType::Request);
            assert_eq!(header.object_uuid, remote());
            assert_eq!(header.activity_uuid, activity());
            assert_eq!(nrd.payload, b"block");
        }
    }

    #[test]
    fn test_oversized_body_is_rejected() {
        let block = vec![0u8; RPC_MAX_BODY_LENGTH - NRD_HEADER_LENGTH + 1];
        match build_request(Operation::Write, remote(), activity(), &block) {
            Err(PnioError::FrameTooLarge { len, max }) => {
                assert_eq!(len, RPC_MAX_BODY_LENGTH + 1);
                assert_eq!(max, RPC_MAX_BODY_LENGTH);
            }
            other => panic!("unexpected result: {:?}", other),
        }

        let block = vec![0u8; RPC_MAX_BODY_LENGTH - NRD_HEADER_LENGTH];
        assert!(build_request(Operation::Write, remote(), activity(), &block).is_ok());
    }

    #[test]
    fn test_parse_response_accepts_response() {
        let request = build_request(Operation::Connect, remote(), activity(), &[1, 2]).unwrap();
        let (header, nrd) = parse_response(&response_from(&request)).unwrap();
        assert_eq!(header.packet_type, PacketType::Response);
        assert_eq!(nrd.payload, vec![1, 2]);
    }

    #[test]
    fn test_parse_response_rejects_request() {
        let request = build_request(Operation::Connect, remote(), activity(), &[]).unwrap();
        assert!(matches!(parse_response(&request), Err(PnioError::MalformedFrame(_))));
    }

    #[test]
    fn test_bad_version_and_packet_type() {
        let request = build_request(Operation::Read, remote(), activity(), &[]).unwrap();

        let mut frame = response_from(&request);
        frame[0] = 0x05;
        assert!(matches!(parse_response(&frame), Err(PnioError::MalformedFrame(_))));

        let mut frame = response_from(&request);
        frame[1] = 0x42;
        assert!(matches!(parse_response(&frame), Err(PnioError::MalformedFrame(_))));
    }

    #[test]
    fn test_fault_is_reported_as_rejection() {
        let request = build_request(Operation::Read, remote(), activity(), &[]).unwrap();
        let mut frame = request[..RPC_HEADER_LENGTH].to_vec();
        frame[1] = PacketType::Fault.as_u8();
        frame[74] = 0;
        frame[75] = 4;
        frame.extend_from_slice(&[0x1C, 0x00, 0x00, 0x03]);
        assert!(matches!(
            parse_response(&frame),
            Err(PnioError::RpcRejected { packet_type: 3 })
        ));
    }

    #[test]
    fn test_body_length_mismatch_is_malformed() {
        let request = build_request(Operation::Read, remote(), activity(), &[1, 2, 3]).unwrap();
        let mut frame = response_from(&request);
        frame.pop();
        assert!(matches!(parse_response(&frame), Err(PnioError::MalformedFrame(_))));

        let short = &request[..40];
        assert!(matches!(parse_response(short), Err(PnioError::MalformedFrame(_))));
    }

    #[test]
    fn test_fragmented_reply_is_malformed() {
        let request = build_request(Operation::Read, remote(), activity(), &[]).unwrap();
        let mut frame = response_from(&request);
        frame[2] = FLAGS1_FRAGMENT;
        assert!(matches!(parse_response(&frame), Err(PnioError::MalformedFrame(_))));

        frame[2] = FLAGS1_FRAGMENT | FLAGS1_LAST_FRAGMENT;
        assert!(parse_response(&frame).is_ok());
    }

    #[test]
    fn test_little_endian_reply() {
        let activity = ArUuid::from_bytes(std::array::from_fn(|i| i as u8 + 0x40));
        let request = build_request(Operation::Read, remote(), activity, &[9, 9]).unwrap();
        let mut frame = response_from(&request);
        frame[4] = 0x10;
        // time fields of the three UUIDs
        for uuid in [8, 24, 40] {
            frame[uuid..uuid + 4].reverse();
            frame[uuid + 4..uuid + 6].reverse();
            frame[uuid + 6..uuid + 8].reverse();
        }
        // header integers
        for offset in [56, 60, 64] {
            frame[offset..offset + 4].reverse();
        }
        for offset in (68..78).step_by(2) {
            frame[offset..offset + 2].reverse();
        }
        // NRD lengths; the status word stays as sent
        for offset in [84, 88, 92, 96] {
            frame[offset..offset + 4].reverse();
        }

        let (header, nrd) = parse_response(&frame).unwrap();
        assert_eq!(header.byte_order().unwrap(), ByteOrder::Little);
        assert_eq!(header.activity_uuid, activity);
        assert_eq!(header.object_uuid, remote());
        assert_eq!(header.interface_uuid, IFACE_UUID_DEVICE);
        assert_eq!(header.interface_version, 1);
        assert_eq!(header.operation, Operation::Read);
        assert_eq!(header.body_length as usize, NRD_HEADER_LENGTH + 2);
        assert_eq!(nrd.args_length, 2);
        assert_eq!(nrd.actual_count, 2);
        assert_eq!(nrd.maximum_count, 1500);
        assert_eq!(nrd.payload, vec![9, 9]);
    }
}
