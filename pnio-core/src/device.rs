//! Device identity as learned from discovery

use crate::error::{PnioError, PnioResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

/// IEEE 802 MAC address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    pub const LENGTH: usize = 6;

    pub const fn new(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }

    pub fn is_multicast(&self) -> bool {
        self.0[0] & 0x01 != 0
    }
}

impl From<[u8; 6]> for MacAddress {
    fn from(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}

impl FromStr for MacAddress {
    type Err = PnioError;

    /// Parse `aa:bb:cc:dd:ee:ff` or `aa-bb-cc-dd-ee-ff`
    fn from_str(s: &str) -> PnioResult<Self> {
        let parts: Vec<&str> = s.split([':', '-']).collect();
        if parts.len() != 6 {
            return Err(PnioError::InvalidData(format!("Invalid MAC address: {}", s)));
        }

        let mut bytes = [0u8; 6];
        for (i, part) in parts.iter().enumerate() {
            bytes[i] = u8::from_str_radix(part, 16)
                .map_err(|_| PnioError::InvalidData(format!("Invalid MAC address byte: {}", part)))?;
        }
        Ok(Self(bytes))
    }
}

/// Identity of a discovered IO device
///
/// Created by device lookup and consumed once to build a connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDescription {
    pub name_of_station: String,
    pub mac: MacAddress,
    pub ip: Ipv4Addr,
    pub netmask: Ipv4Addr,
    pub gateway: Ipv4Addr,
    pub vendor_high: u8,
    pub vendor_low: u8,
    pub dev_high: u8,
    pub dev_low: u8,
}

impl DeviceDescription {
    /// Minimal description with only the fields a connection needs
    pub fn new(ip: Ipv4Addr, dev_high: u8, dev_low: u8, vendor_high: u8, vendor_low: u8) -> Self {
        Self {
            name_of_station: String::new(),
            mac: MacAddress::default(),
            ip,
            netmask: Ipv4Addr::UNSPECIFIED,
            gateway: Ipv4Addr::UNSPECIFIED,
            vendor_high,
            vendor_low,
            dev_high,
            dev_low,
        }
    }

    pub fn vendor_id(&self) -> u16 {
        u16::from_be_bytes([self.vendor_high, self.vendor_low])
    }

    pub fn device_id(&self) -> u16 {
        u16::from_be_bytes([self.dev_high, self.dev_low])
    }
}
