//! # Bit Writer
//!
//! Packs 1–32 bit unsigned fields into a caller-supplied byte buffer.
//!
//! ## Layout
//! Bits accumulate in a 64-bit scratch register, lowest bit first. Every time
//! 32 bits are available the low word is stored little-endian at the current
//! word index. A buffer of `N` bytes holds exactly `8N` bits; the writer never
//! grows it and never touches bytes past its end, even when `N` is not a
//! multiple of four.
//!
//! ## Usage
//! ```rust
//! use overlay_wire::core::bit_writer::BitWriter;
//!
//! let mut buffer = [0u8; 16];
//! let mut writer = BitWriter::new(&mut buffer);
//! writer.write_bits(5, 3).unwrap();
//! writer.write_bits(1000, 10).unwrap();
//! writer.flush().unwrap();
//! assert_eq!(writer.bytes_written(), 2);
//! ```

use crate::core::bits::low_mask;
use crate::error::{Result, WireError};

/// Bit-level writer over a borrowed byte buffer.
#[derive(Debug)]
pub struct BitWriter<'a> {
    buffer: &'a mut [u8],
    num_bits: usize,
    bits_written: usize,
    scratch: u64,
    scratch_bits: u32,
    word_index: usize,
}

impl<'a> BitWriter<'a> {
    /// Create a writer with `8 * buffer.len()` bits of capacity.
    pub fn new(buffer: &'a mut [u8]) -> Self {
        let num_bits = buffer.len() * 8;
        Self {
            buffer,
            num_bits,
            bits_written: 0,
            scratch: 0,
            scratch_bits: 0,
            word_index: 0,
        }
    }

    /// Append the low `bits` bits of `value`.
    ///
    /// Fails if `bits` is outside `1..=32`, if `value` does not fit in `bits`,
    /// or if the buffer has fewer than `bits` bits left.
    pub fn write_bits(&mut self, value: u32, bits: u32) -> Result<()> {
        if bits == 0 || bits > 32 {
            return Err(WireError::InvalidBitCount { bits, min: 1 });
        }
        if self.bits_written + bits as usize > self.num_bits {
            return Err(WireError::Overflow {
                requested: bits as usize,
                available: self.bits_available(),
            });
        }
        if u64::from(value) > low_mask(bits) {
            return Err(WireError::ValueNotRepresentable { value, bits });
        }

        self.scratch |= u64::from(value) << self.scratch_bits;
        self.scratch_bits += bits;

        if self.scratch_bits >= 32 {
            self.store_word(self.word_index, (self.scratch & 0xFFFF_FFFF) as u32);
            self.scratch >>= 32;
            self.scratch_bits -= 32;
            self.word_index += 1;
        }

        self.bits_written += bits as usize;
        Ok(())
    }

    /// Pad with zero bits up to the next byte boundary.
    pub fn write_align(&mut self) -> Result<()> {
        let remainder = (self.bits_written % 8) as u32;
        if remainder != 0 {
            self.write_bits(0, 8 - remainder)?;
            assert_eq!(self.bits_written % 8, 0, "write_align failed to align");
        }
        Ok(())
    }

    /// Append a block of raw bytes.
    ///
    /// The writer must already be byte aligned. Bytes up to the next word
    /// boundary go through the scratch register, whole words are copied
    /// directly into the buffer, and the remaining 0–3 bytes go through the
    /// scratch register again.
    ///
    /// # Panics
    /// Panics if the writer is not byte aligned.
    pub fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        assert_eq!(
            self.align_bits(),
            0,
            "writer must be aligned before calling write_bytes"
        );

        let requested = data.len() * 8;
        if self.bits_written + requested > self.num_bits {
            return Err(WireError::Overflow {
                requested,
                available: self.bits_available(),
            });
        }

        let head_bytes = ((4 - (self.bits_written % 32) / 8) % 4).min(data.len());
        for &byte in &data[..head_bytes] {
            self.write_bits(u32::from(byte), 8)?;
        }
        if head_bytes == data.len() {
            return Ok(());
        }

        assert_eq!(self.bits_written % 32, 0, "writer should be word aligned");
        debug_assert_eq!(self.scratch_bits, 0);

        let num_words = (data.len() - head_bytes) / 4;
        if num_words > 0 {
            let start = self.word_index * 4;
            let len = num_words * 4;
            self.buffer[start..start + len].copy_from_slice(&data[head_bytes..head_bytes + len]);
            self.bits_written += num_words * 32;
            self.word_index += num_words;
            self.scratch = 0;
        }

        let tail_start = head_bytes + num_words * 4;
        let tail_bytes = data.len() - tail_start;
        assert!(tail_bytes < 4, "tail bytes out of range: {tail_bytes}");
        for &byte in &data[tail_start..] {
            self.write_bits(u32::from(byte), 8)?;
        }

        assert_eq!(self.align_bits(), 0, "writer should be aligned");
        Ok(())
    }

    /// Store any bits still held in the scratch register.
    ///
    /// Call once, after the last write and before reading [`Self::data`].
    pub fn flush(&mut self) -> Result<()> {
        if self.scratch_bits != 0 {
            assert!(
                self.scratch_bits <= 32,
                "scratch bits should be 32 or less, got {}",
                self.scratch_bits
            );
            if self.word_index * 4 >= self.buffer.len() {
                return Err(WireError::Overflow {
                    requested: self.scratch_bits as usize,
                    available: 0,
                });
            }
            self.store_word(self.word_index, (self.scratch & 0xFFFF_FFFF) as u32);
            self.scratch = 0;
            self.scratch_bits = 0;
            self.word_index += 1;
        }
        Ok(())
    }

    /// Zero bits needed to reach the next byte boundary.
    #[inline]
    pub fn align_bits(&self) -> usize {
        (8 - self.bits_written % 8) % 8
    }

    /// Total bits written so far.
    #[inline]
    pub fn bits_written(&self) -> usize {
        self.bits_written
    }

    /// Bytes written so far, rounded up.
    #[inline]
    pub fn bytes_written(&self) -> usize {
        self.bits_written.div_ceil(8)
    }

    /// Bits of capacity left.
    #[inline]
    pub fn bits_available(&self) -> usize {
        self.num_bits - self.bits_written
    }

    /// Total bit capacity of the buffer.
    #[inline]
    pub fn capacity_bits(&self) -> usize {
        self.num_bits
    }

    /// The written bytes. Only complete after [`Self::flush`].
    pub fn data(&self) -> &[u8] {
        &self.buffer[..self.bytes_written()]
    }

    // Trailing words that straddle the end of the buffer keep only the bytes that fit.
    fn store_word(&mut self, word_index: usize, word: u32) {
        let start = word_index * 4;
        debug_assert!(start < self.buffer.len());
        let end = (start + 4).min(self.buffer.len());
        self.buffer[start..end].copy_from_slice(&word.to_le_bytes()[..end - start]);
    }
}
