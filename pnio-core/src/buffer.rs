//! Bounds-checked reader over a received byte buffer

use crate::error::{PnioError, PnioResult};

/// Integer representation of a field group
///
/// PNIO blocks are always big-endian. Only the RPC header and the NRD
/// lengths may arrive little-endian, as announced by the data
/// representation field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ByteOrder {
    #[default]
    Big,
    Little,
}

/// Sequential reader that never reads past the end of its buffer
///
/// Every accessor checks the remaining length first and fails with
/// `PnioError::TruncatedRecord` instead of panicking.
pub struct ByteReader<'a> {
    buffer: &'a [u8],
    position: usize,
}

impl<'a> ByteReader<'a> {
    /// Create a new reader
    pub fn new(buffer: &'a [u8]) -> Self {
        Self {
            buffer,
            position: 0,
        }
    }

    /// Current offset from the start of the buffer
    pub fn position(&self) -> usize {
        self.position
    }

    /// Number of unread bytes
    pub fn remaining(&self) -> usize {
        self.buffer.len() - self.position
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Skip `count` bytes
    pub fn skip(&mut self, count: usize) -> PnioResult<()> {
        self.read_bytes(count).map(|_| ())
    }

    /// Read `count` bytes
    pub fn read_bytes(&mut self, count: usize) -> PnioResult<&'a [u8]> {
        if self.remaining() < count {
            return Err(PnioError::TruncatedRecord {
                offset: self.position,
                needed: count,
                remaining: self.remaining(),
            });
        }
        let bytes = &self.buffer[self.position..self.position + count];
        self.position += count;
        Ok(bytes)
    }

    /// Read a fixed-size array
    pub fn read_array<const N: usize>(&mut self) -> PnioResult<[u8; N]> {
        let bytes = self.read_bytes(N)?;
        let mut array = [0u8; N];
        array.copy_from_slice(bytes);
        Ok(array)
    }

    /// Consume and return everything that is left
    pub fn read_rest(&mut self) -> &'a [u8] {
        let rest = &self.buffer[self.position..];
        self.position = self.buffer.len();
        rest
    }

    pub fn read_u8(&mut self) -> PnioResult<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    /// Read a u16 (big-endian)
    pub fn read_u16(&mut self) -> PnioResult<u16> {
        self.read_u16_with(ByteOrder::Big)
    }

    /// Read a u32 (big-endian)
    pub fn read_u32(&mut self) -> PnioResult<u32> {
        self.read_u32_with(ByteOrder::Big)
    }

    pub fn read_u16_with(&mut self, order: ByteOrder) -> PnioResult<u16> {
        let bytes = self.read_array::<2>()?;
        Ok(match order {
            ByteOrder::Big => u16::from_be_bytes(bytes),
            ByteOrder::Little => u16::from_le_bytes(bytes),
        })
    }

    pub fn read_u32_with(&mut self, order: ByteOrder) -> PnioResult<u32> {
        let bytes = self.read_array::<4>()?;
        Ok(match order {
            ByteOrder::Big => u32::from_be_bytes(bytes),
            ByteOrder::Little => u32::from_le_bytes(bytes),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_big_endian_fields() {
        let data = [0x12, 0x34, 0x00, 0x00, 0x01, 0x02, 0xAA];
        let mut reader = ByteReader::new(&data);
        assert_eq!(reader.read_u16().unwrap(), 0x1234);
        assert_eq!(reader.read_u32().unwrap(), 0x0000_0102);
        assert_eq!(reader.read_u8().unwrap(), 0xAA);
        assert!(reader.is_empty());
    }

    #[test]
    fn test_reads_little_endian_fields() {
        let data = [0x34, 0x12, 0x04, 0x03, 0x02, 0x01];
        let mut reader = ByteReader::new(&data);
        assert_eq!(reader.read_u16_with(ByteOrder::Little).unwrap(), 0x1234);
        assert_eq!(reader.read_u32_with(ByteOrder::Little).unwrap(), 0x0102_0304);
    }

    #[test]
    fn test_short_read_reports_truncation_without_consuming() {
        let data = [0x00, 0x01, 0x02];
        let mut reader = ByteReader::new(&data);
        reader.skip(2).unwrap();
        match reader.read_u16() {
            Err(PnioError::TruncatedRecord {
                offset,
                needed,
                remaining,
            }) => {
                assert_eq!(offset, 2);
                assert_eq!(needed, 2);
                assert_eq!(remaining, 1);
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(reader.position(), 2);
        assert_eq!(reader.read_rest(), &[0x02]);
    }
}
