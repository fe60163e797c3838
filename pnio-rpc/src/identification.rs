//! Module/submodule identification record (record index 0xF840)
//!
//! # Format
//! ```text
//! block header [6]
//! number of APIs u16
//!   api u32 | number of modules u16
//!     slot u16 | module ident u32 | number of submodules u16
//!       subslot u16 | submodule ident u32
//! ```

use crate::block::BLOCK_HEADER_LENGTH;
use crate::error::PnioResult;
use pnio_core::ByteReader;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Record index of the real identification data
pub const IDENTIFICATION_RECORD_INDEX: u16 = 0xF840;

/// A plugged module and its submodules
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ModuleIdentification {
    pub module_ident: u32,
    /// Subslot number to submodule ident number
    pub submodules: BTreeMap<u16, u32>,
}

/// API number to (slot number to module)
pub type IdentificationTable = BTreeMap<u32, BTreeMap<u16, ModuleIdentification>>;

/// Decode an identification record
///
/// # Errors
/// `TruncatedRecord` as soon as a field would extend past the end of
/// `payload`.
pub fn decode_identification(payload: &[u8]) -> PnioResult<IdentificationTable> {
    let mut reader = ByteReader::new(payload);
    reader.skip(BLOCK_HEADER_LENGTH)?;

    let mut table = IdentificationTable::new();
    let api_count = reader.read_u16()?;
    for _ in 0..api_count {
        let api = reader.read_u32()?;
        let module_count = reader.read_u16()?;
        let slots = table.entry(api).or_default();

        for _ in 0..module_count {
            let slot = reader.read_u16()?;
            let module_ident = reader.read_u32()?;
            let submodule_count = reader.read_u16()?;

            let mut module = ModuleIdentification {
                module_ident,
                submodules: BTreeMap::new(),
            };
            for _ in 0..submodule_count {
                let subslot = reader.read_u16()?;
                let submodule_ident = reader.read_u32()?;
                module.submodules.insert(subslot, submodule_ident);
            }
            slots.insert(slot, module);
        }
    }

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PnioError;

    fn sample_record() -> Vec<u8> {
        let mut data = vec![0xF0, 0x00, 0x00, 0x20, 0x01, 0x00];
        data.extend_from_slice(&2u16.to_be_bytes());
        // API 0: one module with one submodule
        data.extend_from_slice(&0u32.to_be_bytes());
        data.extend_from_slice(&1u16.to_be_bytes());
        data.extend_from_slice(&1u16.to_be_bytes());
        data.extend_from_slice(&0x0000_0032u32.to_be_bytes());
        data.extend_from_slice(&1u16.to_be_bytes());
        data.extend_from_slice(&0x0001u16.to_be_bytes());
        data.extend_from_slice(&0x0000_0001u32.to_be_bytes());
        // API 0x4000: no modules
        data.extend_from_slice(&0x4000u32.to_be_bytes());
        data.extend_from_slice(&0u16.to_be_bytes());
        data
    }

    #[test]
    fn test_decode_two_apis() {
        let table = decode_identification(&sample_record()).unwrap();
        assert_eq!(table.len(), 2);

        let slots = &table[&0];
        assert_eq!(slots.len(), 1);
        let module = &slots[&1];
        assert_eq!(module.module_ident, 0x32);
        assert_eq!(module.submodules.len(), 1);
        assert_eq!(module.submodules[&1], 1);

        assert!(table[&0x4000].is_empty());
    }

    #[test]
    fn test_truncated_record_at_every_length() {
        let record = sample_record();
        for len in 0..record.len() {
            assert!(
                matches!(
                    decode_identification(&record[..len]),
                    Err(PnioError::TruncatedRecord { .. })
                ),
                "length {} should be truncated",
                len
            );
        }
    }

    #[test]
    fn test_truncated_mid_field_reports_offset() {
        let record = sample_record();
        // cut inside the first module ident
        match decode_identification(&record[..18]) {
            Err(PnioError::TruncatedRecord {
                offset,
                needed,
                remaining,
            }) => {
                assert_eq!(offset, 16);
                assert_eq!(needed, 4);
                assert_eq!(remaining, 2);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_empty_record() {
        let mut data = vec![0u8; 6];
        data.extend_from_slice(&0u16.to_be_bytes());
        assert!(decode_identification(&data).unwrap().is_empty());
    }
}
