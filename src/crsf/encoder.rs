//! # CRSF Packet Encoder
//!
//! Encodes RC channels into CRSF protocol packets. The rover only consumes
//! frames; the encoder exists to build loopback streams for testing and
//! bench simulation of a receiver.

use super::bits::BitWriter;
use super::crc::crc8_dvb_s2;
use super::protocol::*;
use crate::error::{Result, RoverError};

/// Encode RC channels into a complete CRSF frame
///
/// # Arguments
///
/// * `channels` - Array of 16 channel values (11-bit: 0-2047)
///
/// # Returns
///
/// * `Vec<u8>` - Complete CRSF frame (26 bytes: sync + length + type + 22-byte payload + crc)
///
/// # Examples
///
/// ```
/// use elrs_rover::crsf::encoder::encode_rc_channels_frame;
///
/// let channels = [992u16; 16]; // All channels at center
/// let frame = encode_rc_channels_frame(&channels);
/// assert_eq!(frame.len(), 26);
/// assert_eq!(frame[25], 0xAD);
/// ```
pub fn encode_rc_channels_frame(channels: &RcChannels) -> Vec<u8> {
    let payload = encode_rc_channels_payload(channels);

    let mut frame = Vec::with_capacity(2 + CRSF_RC_CHANNELS_FRAME_LENGTH as usize);
    frame.push(CRSF_SYNC_BYTE);
    frame.push(CRSF_RC_CHANNELS_FRAME_LENGTH);
    frame.push(CRSF_FRAMETYPE_RC_CHANNELS_PACKED);
    frame.extend_from_slice(&payload);

    // CRC covers Type + Payload
    let crc = crc8_dvb_s2(&frame[2..]);
    frame.push(crc);

    frame
}

/// Encode an arbitrary frame type with the given payload.
///
/// Used to build non-RC frames (link statistics, battery, ...) that the
/// decoder must skip.
///
/// # Errors
///
/// Returns error if payload exceeds CRSF_MAX_PAYLOAD_SIZE (60 bytes)
pub fn encode_frame(frame_type: u8, payload: &[u8]) -> Result<Vec<u8>> {
    if payload.len() > CRSF_MAX_PAYLOAD_SIZE {
        return Err(RoverError::CrsfProtocol(format!(
            "Payload size {} exceeds maximum {}",
            payload.len(),
            CRSF_MAX_PAYLOAD_SIZE
        )));
    }

    // type + payload + crc, bounded by the check above
    let length = (payload.len() + 2) as u8;

    let mut frame = Vec::with_capacity(payload.len() + 4);
    frame.push(CRSF_SYNC_BYTE);
    frame.push(length);
    frame.push(frame_type);
    frame.extend_from_slice(payload);

    let crc = crc8_dvb_s2(&frame[2..]);
    frame.push(crc);

    Ok(frame)
}

/// Encode RC channels into payload (22 bytes)
///
/// Packs 16 channels (11 bits each) into 22 bytes as a continuous
/// LSB-first bitstream:
///
/// ```text
/// Byte 0: Ch1[0:7]
/// Byte 1: Ch1[8:10] | Ch2[0:4]
/// Byte 2: Ch2[5:10] | Ch3[0:1]
/// ...
/// ```
///
/// Values above 2047 are clamped.
pub fn encode_rc_channels_payload(channels: &RcChannels) -> RcChannelsPayload {
    let mut payload = [0u8; CRSF_RC_CHANNELS_PAYLOAD_SIZE];
    let mut writer = BitWriter::new(&mut payload);

    for &channel in channels.iter() {
        // 16 × 11 bits fill the payload exactly
        let written = writer.write_bits(clamp_channel_value(channel), CRSF_CHANNEL_BITS);
        debug_assert!(written);
    }

    payload
}

/// Clamp a channel value to valid CRSF range (0-2047)
pub fn clamp_channel_value(value: u16) -> u16 {
    value.min(CRSF_CHANNEL_VALUE_MAX)
}
