//! Object, interface and association identifiers
//!
//! All identifiers travel as raw 16-byte values on the wire.

use rand::RngCore;
use std::fmt;
use uuid::Uuid;

/// Fixed prefix of every PNIO object UUID (`DEA00000-6C97-11D1-8271`)
pub const OBJECT_UUID_PREFIX: [u8; 10] = [0xDE, 0xA0, 0x00, 0x00, 0x6C, 0x97, 0x11, 0xD1, 0x82, 0x71];

/// PNIO device interface UUID (`DEA00001-6C97-11D1-8271-00A02442DF7D`)
pub const IFACE_UUID_DEVICE: [u8; 16] = [
    0xDE, 0xA0, 0x00, 0x01, 0x6C, 0x97, 0x11, 0xD1, 0x82, 0x71, 0x00, 0xA0, 0x24, 0x42, 0xDF, 0x7D,
];

/// Instance field placed before the identity bytes of an object UUID
const OBJECT_INSTANCE: [u8; 2] = [0x00, 0x01];

/// Identity bytes of the local (controller) object UUID
const LOCAL_OBJECT_IDENTITY: [u8; 4] = [0x76, 0x54, 0x32, 0x10];

/// PNIO object UUID: fixed prefix plus a 6-byte suffix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectUuid([u8; 16]);

impl ObjectUuid {
    pub const LENGTH: usize = 16;

    pub fn from_suffix(suffix: [u8; 6]) -> Self {
        let mut bytes = [0u8; 16];
        bytes[..10].copy_from_slice(&OBJECT_UUID_PREFIX);
        bytes[10..].copy_from_slice(&suffix);
        Self(bytes)
    }

    /// Object UUID announced for this controller
    pub fn local() -> Self {
        let [a, b, c, d] = LOCAL_OBJECT_IDENTITY;
        Self::from_suffix([OBJECT_INSTANCE[0], OBJECT_INSTANCE[1], a, b, c, d])
    }

    /// Object UUID addressing a device, derived from its identity halves
    pub fn remote(dev_high: u8, dev_low: u8, vendor_high: u8, vendor_low: u8) -> Self {
        Self::from_suffix([
            OBJECT_INSTANCE[0],
            OBJECT_INSTANCE[1],
            dev_high,
            dev_low,
            vendor_high,
            vendor_low,
        ])
    }

    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl fmt::Display for ObjectUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&Uuid::from_bytes(self.0), f)
    }
}

/// Association (AR) UUID, also used as the RPC activity UUID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArUuid(Uuid);

impl ArUuid {
    pub const NIL: ArUuid = ArUuid(Uuid::nil());

    /// Draw a version-4 UUID from the supplied random source
    pub fn generate<R: RngCore + ?Sized>(rng: &mut R) -> Self {
        let mut bytes = [0u8; 16];
        rng.fill_bytes(&mut bytes);
        Self(uuid::Builder::from_random_bytes(bytes).into_uuid())
    }

    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }

    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }
}

impl fmt::Display for ArUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}
