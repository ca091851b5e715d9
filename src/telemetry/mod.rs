//! # Telemetry Module
//!
//! Durable logging of accepted navigation samples to JSONL files with
//! rotation.
//!
//! This module handles:
//! - Appending every accepted sample as one JSON line
//! - Writing to rotating log files (max N records per file)
//! - Retaining only the last M files

pub mod logger;

pub use logger::SampleLogger;
