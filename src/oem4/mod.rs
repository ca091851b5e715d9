//! # OEM4 Protocol Module
//!
//! Implementation of the NovAtel OEM4 binary message format.
//!
//! This module handles:
//! - Frame layout: sync pattern, fixed header, variable payload, checksum
//! - LOG/UNLOG command encoding
//! - Position/velocity/time report decoding (BESTXYZ, RTKXYZ)
//! - Legacy CRC-32 checksum calculation

pub mod protocol;
pub mod commands;
pub mod decoder;
pub mod frame;
pub mod crc;
