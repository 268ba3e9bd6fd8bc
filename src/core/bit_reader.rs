//! # Bit Reader
//!
//! Mirror of [`crate::core::bit_writer::BitWriter`]: unpacks 0–32 bit fields
//! from a borrowed byte buffer.
//!
//! Words are loaded little-endian into a 64-bit scratch register on demand. A
//! trailing partial word is zero-extended, so any byte length is accepted. The
//! reader only ever fails with an error; malformed input cannot make it panic.

use crate::core::bits::low_mask;
use crate::error::{Result, WireError};

/// Bit-level reader over a borrowed byte buffer.
#[derive(Debug)]
pub struct BitReader<'a> {
    buffer: &'a [u8],
    num_bits: usize,
    num_words: usize,
    bits_read: usize,
    scratch: u64,
    scratch_bits: u32,
    word_index: usize,
}

impl<'a> BitReader<'a> {
    /// Create a reader over `8 * buffer.len()` bits.
    pub fn new(buffer: &'a [u8]) -> Self {
        Self {
            buffer,
            num_bits: buffer.len() * 8,
            num_words: buffer.len().div_ceil(4),
            bits_read: 0,
            scratch: 0,
            scratch_bits: 0,
            word_index: 0,
        }
    }

    /// True if reading `bits` more bits would pass the end of the buffer.
    #[inline]
    pub fn would_read_past_end(&self, bits: usize) -> bool {
        self.bits_read + bits > self.num_bits
    }

    /// Read a `bits`-wide field. Zero-width reads return 0.
    pub fn read_bits(&mut self, bits: u32) -> Result<u32> {
        if bits > 32 {
            return Err(WireError::InvalidBitCount { bits, min: 0 });
        }
        if self.would_read_past_end(bits as usize) {
            return Err(WireError::Overflow {
                requested: bits as usize,
                available: self.bits_remaining(),
            });
        }

        assert!(
            self.scratch_bits <= 64,
            "scratch bits should be between 0 and 64, got {}",
            self.scratch_bits
        );

        if self.scratch_bits < bits {
            if self.word_index >= self.num_words {
                return Err(WireError::Overflow {
                    requested: bits as usize,
                    available: self.bits_remaining(),
                });
            }
            self.scratch |= u64::from(self.load_word(self.word_index)) << self.scratch_bits;
            self.scratch_bits += 32;
            self.word_index += 1;
        }

        assert!(
            self.scratch_bits >= bits,
            "should have at least {bits} scratch bits"
        );

        let output = self.scratch & low_mask(bits);
        self.scratch >>= bits;
        self.scratch_bits -= bits;
        self.bits_read += bits as usize;

        Ok(output as u32)
    }

    /// Skip to the next byte boundary, requiring the skipped bits to be zero.
    pub fn read_align(&mut self) -> Result<()> {
        let remainder = (self.bits_read % 8) as u32;
        if remainder != 0 {
            let value = self.read_bits(8 - remainder)?;
            assert_eq!(self.bits_read % 8, 0, "reader should be aligned");
            if value != 0 {
                return Err(WireError::NonZeroPadding);
            }
        }
        Ok(())
    }

    /// Fill `out` with raw bytes. The reader must be byte aligned.
    pub fn read_bytes(&mut self, out: &mut [u8]) -> Result<()> {
        if self.align_bits() != 0 {
            return Err(WireError::Misaligned);
        }
        if self.would_read_past_end(out.len() * 8) {
            return Err(WireError::Overflow {
                requested: out.len() * 8,
                available: self.bits_remaining(),
            });
        }

        let head_bytes = ((4 - (self.bits_read % 32) / 8) % 4).min(out.len());
        for byte in &mut out[..head_bytes] {
            *byte = self.read_bits(8)? as u8;
        }
        if head_bytes == out.len() {
            return Ok(());
        }

        assert_eq!(self.bits_read % 32, 0, "reader should be word aligned");
        debug_assert_eq!(self.scratch_bits, 0);

        let num_words = (out.len() - head_bytes) / 4;
        if num_words > 0 {
            let start = self.word_index * 4;
            let len = num_words * 4;
            out[head_bytes..head_bytes + len].copy_from_slice(&self.buffer[start..start + len]);
            self.bits_read += num_words * 32;
            self.word_index += num_words;
            self.scratch = 0;
            self.scratch_bits = 0;
        }

        let tail_start = head_bytes + num_words * 4;
        assert!(out.len() - tail_start < 4, "tail bytes out of range");
        for byte in &mut out[tail_start..] {
            *byte = self.read_bits(8)? as u8;
        }

        assert_eq!(self.align_bits(), 0, "reader should be aligned");
        Ok(())
    }

    /// Bits to skip to reach the next byte boundary.
    #[inline]
    pub fn align_bits(&self) -> usize {
        (8 - self.bits_read % 8) % 8
    }

    /// Total bits consumed so far.
    #[inline]
    pub fn bits_read(&self) -> usize {
        self.bits_read
    }

    /// Bits left before the end of the buffer.
    #[inline]
    pub fn bits_remaining(&self) -> usize {
        self.num_bits - self.bits_read
    }

    fn load_word(&self, word_index: usize) -> u32 {
        let start = word_index * 4;
        let end = (start + 4).min(self.buffer.len());
        let mut word = [0u8; 4];
        word[..end - start].copy_from_slice(&self.buffer[start..end]);
        u32::from_le_bytes(word)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::bit_writer::BitWriter;

    #[test]
    fn test_read_bits_from_words() {
        let data = [0xEF, 0xBE, 0xAD, 0xDE, 0x01];
        let mut reader = BitReader::new(&data);
        assert_eq!(reader.read_bits(32).unwrap(), 0xDEAD_BEEF);
        assert_eq!(reader.read_bits(1).unwrap(), 1);
        assert_eq!(reader.read_bits(7).unwrap(), 0);
        assert_eq!(reader.bits_remaining(), 0);
    }

    #[test]
    fn test_zero_width_read() {
        let data = [0xFF];
        let mut reader = BitReader::new(&data);
        assert_eq!(reader.read_bits(0).unwrap(), 0);
        assert_eq!(reader.bits_read(), 0);
    }

    #[test]
    fn test_read_past_end() {
        let data = [0xFF, 0xFF];
        let mut reader = BitReader::new(&data);
        assert!(reader.would_read_past_end(17));
        assert!(!reader.would_read_past_end(16));
        reader.read_bits(10).unwrap();
        assert_eq!(
            reader.read_bits(7),
            Err(WireError::Overflow {
                requested: 7,
                available: 6
            })
        );
        assert_eq!(reader.bits_read(), 10);
        assert_eq!(reader.read_bits(6).unwrap(), 0x3F);
    }

    #[test]
    fn test_read_align_rejects_garbage_padding() {
        let data = [0b0000_0011];
        let mut reader = BitReader::new(&data);
        assert_eq!(reader.read_bits(1).unwrap(), 1);
        assert_eq!(reader.read_align(), Err(WireError::NonZeroPadding));
    }

    #[test]
    fn test_read_align_idempotent() {
        let data = [0b0000_0001, 0xAA];
        let mut reader = BitReader::new(&data);
        reader.read_bits(1).unwrap();
        reader.read_align().unwrap();
        assert_eq!(reader.bits_read(), 8);
        reader.read_align().unwrap();
        assert_eq!(reader.bits_read(), 8);
        assert_eq!(reader.read_bits(8).unwrap(), 0xAA);
    }

    #[test]
    fn test_read_bytes_requires_alignment() {
        let data = [0u8; 8];
        let mut reader = BitReader::new(&data);
        reader.read_bits(3).unwrap();
        let mut out = [0u8; 2];
        assert_eq!(reader.read_bytes(&mut out), Err(WireError::Misaligned));
    }

    #[test]
    fn test_read_bytes_matches_writer() {
        let payload: Vec<u8> = (0u8..=22).map(|b| b.wrapping_mul(37)).collect();
        let mut buffer = [0u8; 32];
        let mut writer = BitWriter::new(&mut buffer);
        writer.write_bits(0xA5, 8).unwrap();
        writer.write_bits(0x3, 2).unwrap();
        writer.write_align().unwrap();
        writer.write_bytes(&payload).unwrap();
        writer.write_bits(0x1234, 16).unwrap();
        writer.flush().unwrap();
        let written = writer.bytes_written();

        let mut reader = BitReader::new(&buffer[..written]);
        assert_eq!(reader.read_bits(8).unwrap(), 0xA5);
        assert_eq!(reader.read_bits(2).unwrap(), 0x3);
        reader.read_align().unwrap();
        let mut out = vec![0u8; payload.len()];
        reader.read_bytes(&mut out).unwrap();
        assert_eq!(out, payload);
        assert_eq!(reader.read_bits(16).unwrap(), 0x1234);
    }

    #[test]
    fn test_read_bytes_overflow() {
        let data = [1u8, 2, 3];
        let mut reader = BitReader::new(&data);
        let mut out = [0u8; 4];
        assert!(matches!(
            reader.read_bytes(&mut out),
            Err(WireError::Overflow { .. })
        ));
        assert_eq!(reader.bits_read(), 0);
    }
}
