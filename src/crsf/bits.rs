//! # Bit Cursors
//!
//! LSB-first bit cursors over byte buffers, used to pack and unpack the
//! 11-bit RC channel fields.
//!
//! The bitstream is the payload bytes concatenated least significant bit
//! first, so bit `n` of the stream lives in byte `n / 8` at position `n % 8`.
//! Channel `i` therefore occupies stream bits `[11 * i, 11 * i + 10]`.

/// Reads fixed-width little-endian fields from a byte slice.
///
/// # Examples
///
/// ```
/// use elrs_rover::crsf::bits::BitReader;
///
/// let mut reader = BitReader::new(&[0xFF, 0x07]);
/// assert_eq!(reader.read_bits(11), Some(0x7FF));
/// assert_eq!(reader.read_bits(5), Some(0));
/// assert_eq!(reader.read_bits(1), None);
/// ```
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    data: &'a [u8],
    bit_pos: usize,
}

impl<'a> BitReader<'a> {
    /// Creates a cursor positioned at bit 0 of `data`.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, bit_pos: 0 }
    }

    #[cfg(test)]
    fn position(&self) -> usize {
        self.bit_pos
    }

    /// Bits left before the end of the buffer.
    fn remaining(&self) -> usize {
        self.data.len() * 8 - self.bit_pos
    }

    /// Reads `count` bits (1..=16) and advances the cursor.
    ///
    /// Returns `None` without moving the cursor if fewer than `count` bits
    /// remain.
    pub fn read_bits(&mut self, count: u32) -> Option<u16> {
        debug_assert!((1..=16).contains(&count));

        if self.remaining() < count as usize {
            return None;
        }

        let mut value: u32 = 0;
        let mut filled: u32 = 0;

        while filled < count {
            let byte = self.data[self.bit_pos / 8] as u32;
            let offset = (self.bit_pos % 8) as u32;
            let take = (8 - offset).min(count - filled);
            let bits = (byte >> offset) & ((1 << take) - 1);

            value |= bits << filled;
            filled += take;
            self.bit_pos += take as usize;
        }

        Some(value as u16)
    }
}

/// Writes fixed-width little-endian fields into a byte slice.
///
/// The target buffer must start zeroed; fields are OR-ed in.
#[derive(Debug)]
pub struct BitWriter<'a> {
    data: &'a mut [u8],
    bit_pos: usize,
}

impl<'a> BitWriter<'a> {
    /// Creates a cursor positioned at bit 0 of `data`.
    pub fn new(data: &'a mut [u8]) -> Self {
        Self { data, bit_pos: 0 }
    }

    #[cfg(test)]
    fn position(&self) -> usize {
        self.bit_pos
    }

    fn remaining(&self) -> usize {
        self.data.len() * 8 - self.bit_pos
    }

    /// Writes the low `count` bits (1..=16) of `value` and advances the
    /// cursor. Higher bits of `value` are ignored.
    ///
    /// Returns `false` without writing if fewer than `count` bits remain.
    pub fn write_bits(&mut self, value: u16, count: u32) -> bool {
        debug_assert!((1..=16).contains(&count));

        if self.remaining() < count as usize {
            return false;
        }

        let mut value = value as u32 & ((1 << count) - 1);
        let mut left = count;

        while left > 0 {
            let offset = (self.bit_pos % 8) as u32;
            let take = (8 - offset).min(left);

            self.data[self.bit_pos / 8] |= ((value & ((1 << take) - 1)) << offset) as u8;
            value >>= take;
            left -= take;
            self.bit_pos += take as usize;
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_single_byte_fields() {
        let mut reader = BitReader::new(&[0b1010_0101]);
        assert_eq!(reader.read_bits(4), Some(0b0101));
        assert_eq!(reader.read_bits(4), Some(0b1010));
        assert_eq!(reader.read_bits(1), None);
    }

    #[test]
    fn test_read_across_byte_boundary() {
        // ch0 = 0x7FF fills byte 0 and the low 3 bits of byte 1
        // ch1 = 0b10101 sits in the high 5 bits of byte 1
        let data = [0xFF, 0b1010_1111];
        let mut reader = BitReader::new(&data);
        assert_eq!(reader.read_bits(11), Some(0x7FF));
        assert_eq!(reader.position(), 11);
        assert_eq!(reader.read_bits(5), Some(0b10101));
    }

    #[test]
    fn test_read_spanning_three_bytes() {
        // Third channel in CRSF starts at bit 22: bits 6-7 of byte 2,
        // all of byte 3, bit 0 of byte 4
        let data = [0x00, 0x00, 0b1100_0000, 0xFF, 0x01];
        let mut reader = BitReader::new(&data);
        assert_eq!(reader.read_bits(11), Some(0));
        assert_eq!(reader.read_bits(11), Some(0));
        assert_eq!(reader.read_bits(11), Some(0x7FF));
    }

    #[test]
    fn test_read_insufficient_bits_keeps_cursor() {
        let mut reader = BitReader::new(&[0xAB]);
        assert_eq!(reader.read_bits(3), Some(0b011));
        assert_eq!(reader.read_bits(11), None);
        assert_eq!(reader.position(), 3);
        assert_eq!(reader.remaining(), 5);
    }

    #[test]
    fn test_write_across_byte_boundary() {
        let mut data = [0u8; 2];
        let mut writer = BitWriter::new(&mut data);
        assert!(writer.write_bits(0x7FF, 11));
        assert!(writer.write_bits(0b10101, 5));
        assert_eq!(writer.position(), 16);
        assert_eq!(data, [0xFF, 0b1010_1111]);
    }

    #[test]
    fn test_write_masks_high_bits() {
        let mut data = [0u8; 2];
        let mut writer = BitWriter::new(&mut data);
        assert!(writer.write_bits(0xFFFF, 11));
        assert_eq!(data, [0xFF, 0x07]);
    }

    #[test]
    fn test_write_overflow_rejected() {
        let mut data = [0u8; 1];
        let mut writer = BitWriter::new(&mut data);
        assert!(writer.write_bits(0x3F, 6));
        assert!(!writer.write_bits(0x7, 3));
        assert_eq!(writer.position(), 6);
        assert_eq!(data, [0x3F]);
    }

    #[test]
    fn test_writer_then_reader_agree() {
        let fields = [(5u16, 3u32), (1000, 11), (0, 1), (0x1234, 13), (0x3FF, 10)];
        let mut data = [0u8; 5];
        {
            let mut writer = BitWriter::new(&mut data);
            for &(value, width) in &fields {
                assert!(writer.write_bits(value, width));
            }
        }

        let mut reader = BitReader::new(&data);
        for &(value, width) in &fields {
            assert_eq!(reader.read_bits(width), Some(value));
        }
    }
}
