//! # CRSF Protocol Constants and Types
//!
//! Core protocol definitions for CRSF (Crossfire) frames received from an
//! ExpressLRS receiver.

/// CRSF frame sync byte (always 0xC8)
pub const CRSF_SYNC_BYTE: u8 = 0xC8;

/// RC Channels packet type
pub const CRSF_FRAMETYPE_RC_CHANNELS_PACKED: u8 = 0x16;

/// Link Statistics packet type (skipped by the decoder)
pub const CRSF_FRAMETYPE_LINK_STATISTICS: u8 = 0x14;

/// Maximum CRSF payload size
/// Frame structure: sync(1) + length(1) + type(1) + payload(N) + crc(1)
/// Maximum frame size is 64 bytes, so max payload = 64 - 4 = 60 bytes
pub const CRSF_MAX_PAYLOAD_SIZE: usize = 60;

/// RC channels payload size (22 bytes for 16 channels × 11 bits)
pub const CRSF_RC_CHANNELS_PAYLOAD_SIZE: usize = 22;

/// RC channels frame length (type + payload + crc)
pub const CRSF_RC_CHANNELS_FRAME_LENGTH: u8 = 0x18; // 24 bytes

/// Bytes following the type byte in an RC channels frame (payload + crc)
pub const CRSF_RC_CHANNELS_BODY_REMAINDER: usize = CRSF_RC_CHANNELS_FRAME_LENGTH as usize - 1;

/// Number of RC channels
pub const CRSF_NUM_CHANNELS: usize = 16;

/// Bits per packed channel value
pub const CRSF_CHANNEL_BITS: u32 = 11;

/// Channel value range (11-bit: 0-2047)
pub const CRSF_CHANNEL_VALUE_MIN: u16 = 0;
pub const CRSF_CHANNEL_VALUE_MAX: u16 = 2047;

/// Stick range reported by ELRS receivers (988us..2012us)
pub const CRSF_CHANNEL_VALUE_1000: u16 = 172;
pub const CRSF_CHANNEL_VALUE_MID: u16 = 992;
pub const CRSF_CHANNEL_VALUE_2000: u16 = 1811;

/// RC channels array type (16 channels, 11-bit values)
pub type RcChannels = [u16; CRSF_NUM_CHANNELS];

/// Packed RC channels payload
pub type RcChannelsPayload = [u8; CRSF_RC_CHANNELS_PAYLOAD_SIZE];
