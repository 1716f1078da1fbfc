//! # CRSF Protocol Module
//!
//! Implementation of the Crossfire (CRSF) protocol as spoken by ExpressLRS
//! receivers.
//!
//! This module handles:
//! - CRC8-DVB-S2 checksum calculation
//! - Frame synchronization and validation on the receiver byte stream
//! - RC channels unpacking (16 channels, 11-bit resolution)
//! - RC channels encoding for loopback and simulation

pub mod bits;
pub mod crc;
pub mod decoder;
pub mod encoder;
pub mod protocol;
