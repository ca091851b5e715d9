//! # NovAtel Link Library
//!
//! Driver for NovAtel OEM4-family GPS receivers speaking the binary
//! telemetry protocol over a serial line.
//!
//! This library provides frame synchronization and validation, decoding of
//! position/velocity/time reports into typed navigation data, LOG/UNLOG
//! command encoding, and the watchdog-supervised receive worker that ties
//! them together for a flight-control application.

pub mod config;
pub mod error;
pub mod geo;
pub mod oem4;
pub mod receiver;
pub mod serial;
pub mod sink;
pub mod telemetry;
