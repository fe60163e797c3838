//! PNIO status (ErrorCode, ErrorDecode, ErrorCode1, ErrorCode2)

use std::fmt;

/// Four-byte status carried in NRD replies and IOD response headers
///
/// All-zero means success. Any other value is a device-reported error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PnioStatus {
    pub error_code: u8,
    pub error_decode: u8,
    pub error_code1: u8,
    pub error_code2: u8,
}

impl PnioStatus {
    /// Length of the encoded status
    pub const LENGTH: usize = 4;

    pub const OK: PnioStatus = PnioStatus {
        error_code: 0,
        error_decode: 0,
        error_code1: 0,
        error_code2: 0,
    };

    pub fn from_bytes(bytes: [u8; 4]) -> Self {
        Self {
            error_code: bytes[0],
            error_decode: bytes[1],
            error_code1: bytes[2],
            error_code2: bytes[3],
        }
    }

    pub fn from_u32(value: u32) -> Self {
        Self::from_bytes(value.to_be_bytes())
    }

    pub fn to_bytes(&self) -> [u8; 4] {
        [
            self.error_code,
            self.error_decode,
            self.error_code1,
            self.error_code2,
        ]
    }

    pub fn to_u32(&self) -> u32 {
        u32::from_be_bytes(self.to_bytes())
    }

    pub fn is_ok(&self) -> bool {
        *self == Self::OK
    }
}

impl fmt::Display for PnioStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}",
            self.error_code, self.error_decode, self.error_code1, self.error_code2
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_u32_round_trip() {
        let status = PnioStatus::from_u32(0xDE80_B000);
        assert_eq!(status.error_code, 0xDE);
        assert_eq!(status.error_decode, 0x80);
        assert_eq!(status.error_code1, 0xB0);
        assert_eq!(status.error_code2, 0x00);
        assert_eq!(status.to_u32(), 0xDE80_B000);
        assert!(!status.is_ok());
        assert_eq!(status.to_string(), "DE:80:B0:00");
    }

    #[test]
    fn test_zero_is_ok() {
        assert!(PnioStatus::from_u32(0).is_ok());
    }
}
