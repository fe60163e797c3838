//! Core types and utilities for the PROFINET IO client
//!
//! This crate provides the error taxonomy, status codes, identifiers and
//! the byte reader shared by the codec, discovery and client crates.

pub mod buffer;
pub mod device;
pub mod error;
pub mod identifiers;
pub mod status;

pub use buffer::{ByteOrder, ByteReader};
pub use device::{DeviceDescription, MacAddress};
pub use error::{PnioError, PnioResult};
pub use identifiers::{ArUuid, ObjectUuid};
pub use status::PnioStatus;
