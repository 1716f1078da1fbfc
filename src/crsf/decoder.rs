//! # CRSF Frame Decoder
//!
//! Pulls CRSF frames out of the receiver byte stream and recovers the 16 RC
//! channel values.
//!
//! Every call to [`FrameReader::try_read_frame`] is one linear pass with
//! early exits: find the sync byte, read the header, then either skip the
//! frame or read and validate an RC channels frame. Nothing is buffered
//! between calls; a failed attempt leaves the stream wherever the last read
//! stopped and the next call resumes the sync search from there.
//!
//! All reads of one attempt share a single deadline, so an attempt never
//! takes longer than the configured timeout however many reads it needs.

use std::time::Duration;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, trace};

use super::bits::BitReader;
use super::crc::crc8_dvb_s2;
use super::protocol::*;
use crate::error::{Result, RoverError};
use crate::serial::port_trait::SerialPortIO;

/// Why a decode attempt produced no frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameRejection {
    /// Nothing arrived, or the byte read was not the sync marker
    NoSync,
    /// The stream ended (timeout) partway through a frame
    ShortRead,
    /// A frame of another type was consumed and discarded
    SkippedType(u8),
    /// RC channels frame with a length byte other than 24
    BadLength(u8),
    /// Checksum over type + payload did not match the trailer
    BadCrc { expected: u8, received: u8 },
}

/// Running counters for decode outcomes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecoderStats {
    pub frames: u64,
    pub stray_bytes: u64,
    pub short_reads: u64,
    pub skipped_frames: u64,
    pub length_errors: u64,
    pub crc_errors: u64,
}

impl DecoderStats {
    fn record(&mut self, rejection: FrameRejection) {
        match rejection {
            FrameRejection::NoSync => self.stray_bytes += 1,
            FrameRejection::ShortRead => self.short_reads += 1,
            FrameRejection::SkippedType(_) => self.skipped_frames += 1,
            FrameRejection::BadLength(_) => self.length_errors += 1,
            FrameRejection::BadCrc { .. } => self.crc_errors += 1,
        }
    }
}

/// Unpack a 22-byte RC channels payload into 16 channel values
///
/// Channel `i` is taken from bits `[11 * i, 11 * i + 10]` of the payload read
/// as an LSB-first bitstream.
///
/// # Examples
///
/// ```
/// use elrs_rover::crsf::decoder::decode_rc_channels_payload;
///
/// let mut payload = [0u8; 22];
/// payload[0] = 0xFF;
/// payload[1] = 0x07;
/// let channels = decode_rc_channels_payload(&payload);
/// assert_eq!(channels[0], 2047);
/// assert_eq!(channels[1], 0);
/// ```
pub fn decode_rc_channels_payload(payload: &RcChannelsPayload) -> RcChannels {
    let mut reader = BitReader::new(payload);
    let mut channels = [0u16; CRSF_NUM_CHANNELS];

    for channel in channels.iter_mut() {
        // 22 bytes hold exactly 16 × 11 bits
        *channel = reader.read_bits(CRSF_CHANNEL_BITS).unwrap_or_default();
    }

    channels
}

/// Validate an RC channels frame body and unpack its channels
///
/// # Arguments
///
/// * `body` - `Type + Payload + CRC` (24 bytes), i.e. the frame without
///   sync and length bytes
///
/// # Errors
///
/// Returns the rejection reason if the body has the wrong size or type, or
/// fails the checksum.
pub fn validate_rc_channels_body(body: &[u8]) -> std::result::Result<RcChannels, FrameRejection> {
    if body.len() != CRSF_RC_CHANNELS_FRAME_LENGTH as usize {
        return Err(FrameRejection::BadLength(
            u8::try_from(body.len()).unwrap_or(u8::MAX),
        ));
    }

    let (data, trailer) = body.split_at(body.len() - 1);
    if data[0] != CRSF_FRAMETYPE_RC_CHANNELS_PACKED {
        return Err(FrameRejection::SkippedType(data[0]));
    }

    let expected = crc8_dvb_s2(data);
    let received = trailer[0];
    if expected != received {
        return Err(FrameRejection::BadCrc { expected, received });
    }

    let mut payload = [0u8; CRSF_RC_CHANNELS_PAYLOAD_SIZE];
    payload.copy_from_slice(&data[1..]);

    Ok(decode_rc_channels_payload(&payload))
}

/// Reads RC channels frames from a serial byte source
///
/// Owns the most recent valid channel set; it is overwritten in place on
/// every validated frame.
pub struct FrameReader<P: SerialPortIO> {
    port: P,
    timeout: Duration,
    channels: RcChannels,
    stats: DecoderStats,
}

impl<P: SerialPortIO> FrameReader<P> {
    /// Create a reader over `port`; each decode attempt is bounded by `timeout`
    pub fn new(port: P, timeout: Duration) -> Self {
        Self {
            port,
            timeout,
            channels: [0u16; CRSF_NUM_CHANNELS],
            stats: DecoderStats::default(),
        }
    }

    /// Last successfully decoded channel set (all zero before the first frame)
    pub fn channels(&self) -> &RcChannels {
        &self.channels
    }

    /// Decode outcome counters since creation
    pub fn stats(&self) -> DecoderStats {
        self.stats
    }

    /// Attempt to read one RC channels frame
    ///
    /// # Returns
    ///
    /// * `Ok(Some(channels))` - a valid frame was decoded
    /// * `Ok(None)` - no frame this time (no sync, timeout, skipped or
    ///   invalid frame); try again next cycle
    ///
    /// # Errors
    ///
    /// Returns error only if the serial port itself fails
    pub async fn try_read_frame(&mut self) -> Result<Option<RcChannels>> {
        self.try_read_frame_until(Instant::now() + self.timeout).await
    }

    /// Attempt to read one RC channels frame, giving up at `deadline`
    ///
    /// The attempt never runs past the reader's own timeout either, so an
    /// earlier deadline only shortens it.
    ///
    /// # Errors
    ///
    /// Returns error only if the serial port itself fails
    pub async fn try_read_frame_until(&mut self, deadline: Instant) -> Result<Option<RcChannels>> {
        let deadline = deadline.min(Instant::now() + self.timeout);

        match self.read_frame(deadline).await? {
            Ok(channels) => {
                self.channels = channels;
                self.stats.frames += 1;
                Ok(Some(channels))
            }
            Err(rejection) => {
                match rejection {
                    FrameRejection::NoSync | FrameRejection::ShortRead => {
                        trace!("No frame: {:?}", rejection);
                    }
                    _ => debug!("Dropped CRSF frame: {:?}", rejection),
                }
                self.stats.record(rejection);
                Ok(None)
            }
        }
    }

    async fn read_frame(
        &mut self,
        deadline: Instant,
    ) -> Result<std::result::Result<RcChannels, FrameRejection>> {
        // Sync byte
        let mut sync = [0u8; 1];
        if self.read(&mut sync, deadline).await? < 1 || sync[0] != CRSF_SYNC_BYTE {
            return Ok(Err(FrameRejection::NoSync));
        }

        // Length + Type
        let mut header = [0u8; 2];
        if self.read(&mut header, deadline).await? < header.len() {
            return Ok(Err(FrameRejection::ShortRead));
        }
        let [length, frame_type] = header;

        if frame_type != CRSF_FRAMETYPE_RC_CHANNELS_PACKED {
            // Skip the rest of the frame (payload + crc)
            let mut skip = vec![0u8; (length as usize).saturating_sub(1)];
            if self.read(&mut skip, deadline).await? < skip.len() {
                return Ok(Err(FrameRejection::ShortRead));
            }
            return Ok(Err(FrameRejection::SkippedType(frame_type)));
        }

        // Leave the stream untouched so the next call can resync
        if length != CRSF_RC_CHANNELS_FRAME_LENGTH {
            return Ok(Err(FrameRejection::BadLength(length)));
        }

        let mut body = [0u8; CRSF_RC_CHANNELS_FRAME_LENGTH as usize];
        body[0] = frame_type;
        if self.read(&mut body[1..], deadline).await? < CRSF_RC_CHANNELS_BODY_REMAINDER {
            return Ok(Err(FrameRejection::ShortRead));
        }

        Ok(validate_rc_channels_body(&body))
    }

    async fn read(&mut self, buf: &mut [u8], deadline: Instant) -> Result<usize> {
        let remaining = deadline.saturating_duration_since(Instant::now());

        match timeout_at(deadline, self.port.read_timeout(buf, remaining)).await {
            Ok(read) => {
                read.map_err(|e| RoverError::Serial(format!("Failed to read receiver: {}", e)))
            }
            // Port overran its timeout; bytes it took are dropped with the attempt
            Err(_elapsed) => Ok(0),
        }
    }
}
