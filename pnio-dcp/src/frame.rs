//! DCP identify frame codec
//!
//! # Frame layout
//! ```text
//! dst MAC [6] | src MAC [6] | EtherType 0x8892 u16
//! frame id u16 | service id u8 | service type u8 | xid u32
//! response delay u16 | data length u16 | blocks
//! ```
//!
//! Request blocks carry `option | suboption | length | data`; response
//! blocks insert a 16-bit block info field before the data, counted in
//! the length. Blocks are padded to an even length.

use crate::error::{PnioError, PnioResult};
use bytes::BufMut;
use pnio_core::{ByteReader, DeviceDescription, MacAddress};
use std::net::Ipv4Addr;

/// EtherType of PROFINET real-time frames
pub const ETHERTYPE_PROFINET: u16 = 0x8892;

/// Frame id of an identify request
pub const FRAME_ID_IDENTIFY_REQUEST: u16 = 0xFEFE;

/// Frame id of an identify response
pub const FRAME_ID_IDENTIFY_RESPONSE: u16 = 0xFEFF;

/// Service id of the identify service
pub const SERVICE_ID_IDENTIFY: u8 = 0x05;

/// Multicast address every PROFINET device listens on for identify
pub const DCP_MULTICAST_MAC: MacAddress = MacAddress::new([0x01, 0x0E, 0xCF, 0x00, 0x00, 0x00]);

/// Response delay factor announced in identify requests
pub const DEFAULT_RESPONSE_DELAY: u16 = 0x0080;

const ETHERNET_HEADER_LENGTH: usize = 14;
const DCP_HEADER_LENGTH: usize = 10;
const BLOCK_INFO_LENGTH: usize = 2;

/// Service type octet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceType {
    Request,
    Response,
    /// The device could not handle the request
    ResponseUnsupported,
}

impl ServiceType {
    pub fn from_u8(value: u8) -> PnioResult<Self> {
        match value {
            0x00 => Ok(ServiceType::Request),
            0x01 => Ok(ServiceType::Response),
            0x05 => Ok(ServiceType::ResponseUnsupported),
            _ => Err(PnioError::MalformedFrame(format!(
                "Unknown DCP service type 0x{:02X}",
                value
            ))),
        }
    }

    pub fn as_u8(&self) -> u8 {
        match self {
            ServiceType::Request => 0x00,
            ServiceType::Response => 0x01,
            ServiceType::ResponseUnsupported => 0x05,
        }
    }
}

/// Option/suboption pair naming a block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DcpOption {
    /// IP address, netmask and gateway
    IpParameter,
    NameOfStation,
    /// Vendor and device id
    DeviceId,
    /// Matches every device in identify requests
    All,
    Other(u8, u8),
}

impl DcpOption {
    pub fn from_pair(option: u8, suboption: u8) -> Self {
        match (option, suboption) {
            (0x01, 0x02) => DcpOption::IpParameter,
            (0x02, 0x02) => DcpOption::NameOfStation,
            (0x02, 0x03) => DcpOption::DeviceId,
            (0xFF, 0xFF) => DcpOption::All,
            (o, s) => DcpOption::Other(o, s),
        }
    }

    pub fn as_pair(&self) -> (u8, u8) {
        match self {
            DcpOption::IpParameter => (0x01, 0x02),
            DcpOption::NameOfStation => (0x02, 0x02),
            DcpOption::DeviceId => (0x02, 0x03),
            DcpOption::All => (0xFF, 0xFF),
            DcpOption::Other(o, s) => (*o, *s),
        }
    }
}

/// One TLV block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DcpBlock {
    pub option: DcpOption,
    /// Present in responses only
    pub block_info: Option<u16>,
    pub data: Vec<u8>,
}

impl DcpBlock {
    pub fn request(option: DcpOption, data: Vec<u8>) -> Self {
        Self {
            option,
            block_info: None,
            data,
        }
    }

    pub fn response(option: DcpOption, block_info: u16, data: Vec<u8>) -> Self {
        Self {
            option,
            block_info: Some(block_info),
            data,
        }
    }

    fn length_field(&self) -> usize {
        self.data.len() + self.block_info.map_or(0, |_| BLOCK_INFO_LENGTH)
    }

    fn encoded_len(&self) -> usize {
        let len = 4 + self.length_field();
        len + len % 2
    }

    fn encode_into<B: BufMut>(&self, buf: &mut B) -> PnioResult<()> {
        let length = u16::try_from(self.length_field()).map_err(|_| PnioError::FrameTooLarge {
            len: self.length_field(),
            max: u16::MAX as usize,
        })?;
        let (option, suboption) = self.option.as_pair();
        buf.put_u8(option);
        buf.put_u8(suboption);
        buf.put_u16(length);
        if let Some(info) = self.block_info {
            buf.put_u16(info);
        }
        buf.put_slice(&self.data);
        if length % 2 == 1 {
            buf.put_u8(0);
        }
        Ok(())
    }

    fn decode_from(reader: &mut ByteReader<'_>, with_info: bool) -> PnioResult<Self> {
        let option = reader.read_u8()?;
        let suboption = reader.read_u8()?;
        let length = reader.read_u16()? as usize;
        let mut body = ByteReader::new(reader.read_bytes(length)?);
        if length % 2 == 1 && !reader.is_empty() {
            reader.skip(1)?;
        }

        let block_info = if with_info {
            Some(body.read_u16()?)
        } else {
            None
        };
        Ok(Self {
            option: DcpOption::from_pair(option, suboption),
            block_info,
            data: body.read_rest().to_vec(),
        })
    }
}

/// A complete DCP identify frame including its Ethernet header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DcpFrame {
    pub destination: MacAddress,
    pub source: MacAddress,
    pub frame_id: u16,
    pub service_id: u8,
    pub service_type: ServiceType,
    pub xid: u32,
    /// Response delay in requests, reserved in responses
    pub response_delay: u16,
    pub blocks: Vec<DcpBlock>,
}

impl DcpFrame {
    /// Identify request for `filter`
    pub fn identify_request(source: MacAddress, xid: u32, filter: DcpBlock) -> Self {
        Self {
            destination: DCP_MULTICAST_MAC,
            source,
            frame_id: FRAME_ID_IDENTIFY_REQUEST,
            service_id: SERVICE_ID_IDENTIFY,
            service_type: ServiceType::Request,
            xid,
            response_delay: DEFAULT_RESPONSE_DELAY,
            blocks: vec![filter],
        }
    }

    /// Identify request matching one station name
    pub fn identify_by_name(source: MacAddress, xid: u32, station_name: &str) -> Self {
        let filter = DcpBlock::request(DcpOption::NameOfStation, station_name.as_bytes().to_vec());
        Self::identify_request(source, xid, filter)
    }

    /// Identify request every device answers
    pub fn identify_all(source: MacAddress, xid: u32) -> Self {
        Self::identify_request(source, xid, DcpBlock::request(DcpOption::All, Vec::new()))
    }

    pub fn is_identify_response(&self) -> bool {
        self.frame_id == FRAME_ID_IDENTIFY_RESPONSE
            && self.service_id == SERVICE_ID_IDENTIFY
            && self.service_type == ServiceType::Response
    }

    pub fn block(&self, option: DcpOption) -> Option<&DcpBlock> {
        self.blocks.iter().find(|b| b.option == option)
    }

    pub fn encode(&self) -> PnioResult<Vec<u8>> {
        let data_length: usize = self.blocks.iter().map(DcpBlock::encoded_len).sum();
        let data_length_field = u16::try_from(data_length).map_err(|_| PnioError::FrameTooLarge {
            len: data_length,
            max: u16::MAX as usize,
        })?;

        let mut buf = Vec::with_capacity(ETHERNET_HEADER_LENGTH + DCP_HEADER_LENGTH + data_length);
        buf.put_slice(self.destination.as_bytes());
        buf.put_slice(self.source.as_bytes());
        buf.put_u16(ETHERTYPE_PROFINET);
        buf.put_u16(self.frame_id);
        buf.put_u8(self.service_id);
        buf.put_u8(self.service_type.as_u8());
        buf.put_u32(self.xid);
        buf.put_u16(self.response_delay);
        buf.put_u16(data_length_field);
        for block in &self.blocks {
            block.encode_into(&mut buf)?;
        }
        Ok(buf)
    }

    /// Decode a received Ethernet frame
    ///
    /// # Errors
    /// `MalformedFrame` when the frame is not a PROFINET frame or any field
    /// extends past the end of the buffer.
    pub fn decode(data: &[u8]) -> PnioResult<Self> {
        Self::decode_fields(&mut ByteReader::new(data)).map_err(|e| e.into_malformed("DCP frame"))
    }

    fn decode_fields(reader: &mut ByteReader<'_>) -> PnioResult<Self> {
        let destination = MacAddress::new(reader.read_array()?);
        let source = MacAddress::new(reader.read_array()?);
        let ethertype = reader.read_u16()?;
        if ethertype != ETHERTYPE_PROFINET {
            return Err(PnioError::MalformedFrame(format!(
                "Unexpected EtherType 0x{:04X}",
                ethertype
            )));
        }

        let frame_id = reader.read_u16()?;
        let service_id = reader.read_u8()?;
        let service_type = ServiceType::from_u8(reader.read_u8()?)?;
        let xid = reader.read_u32()?;
        let response_delay = reader.read_u16()?;
        let data_length = reader.read_u16()? as usize;

        let with_info = service_type != ServiceType::Request;
        let mut data = ByteReader::new(reader.read_bytes(data_length)?);
        let mut blocks = Vec::new();
        while !data.is_empty() {
            blocks.push(DcpBlock::decode_from(&mut data, with_info)?);
        }

        Ok(Self {
            destination,
            source,
            frame_id,
            service_id,
            service_type,
            xid,
            response_delay,
            blocks,
        })
    }

    /// Build a device description from an identify response
    ///
    /// Only the source MAC is mandatory; missing blocks leave the
    /// corresponding fields empty or zero.
    pub fn to_device_description(&self) -> PnioResult<DeviceDescription> {
        let mut device = DeviceDescription::new(Ipv4Addr::UNSPECIFIED, 0, 0, 0, 0);
        device.mac = self.source;

        if let Some(block) = self.block(DcpOption::NameOfStation) {
            device.name_of_station = String::from_utf8(block.data.clone())
                .map_err(|_| PnioError::MalformedFrame("Station name is not valid UTF-8".to_string()))?;
        }

        if let Some(block) = self.block(DcpOption::IpParameter) {
            let mut reader = ByteReader::new(&block.data);
            let mut read_ip = || -> PnioResult<Ipv4Addr> { Ok(Ipv4Addr::from(reader.read_array::<4>()?)) };
            device.ip = read_ip().map_err(|e| e.into_malformed("IP parameter block"))?;
            device.netmask = read_ip().map_err(|e| e.into_malformed("IP parameter block"))?;
            device.gateway = read_ip().map_err(|e| e.into_malformed("IP parameter block"))?;
        }

        if let Some(block) = self.block(DcpOption::DeviceId) {
            let mut reader = ByteReader::new(&block.data);
            let [vendor_high, vendor_low, dev_high, dev_low] = reader
                .read_array::<4>()
                .map_err(|e| e.into_malformed("Device id block"))?;
            device.vendor_high = vendor_high;
            device.vendor_low = vendor_low;
            device.dev_high = dev_high;
            device.dev_low = dev_low;
        }

        Ok(device)
    }
}
