//! # Serialization Streams
//!
//! Typed serialization on top of the bit packer.
//!
//! [`Stream`] is implemented by [`WriteStream`] and [`ReadStream`] with an
//! identical method set, so a message type writes a single
//! `serialize<S: Stream>` routine and runs it in both directions. Values are
//! passed by `&mut`: a write stream reads them, a read stream overwrites them.
//!
//! ## Sticky errors
//! Each stream holds at most one error. The first constraint violation,
//! overflow or validation failure is recorded, and every later call returns
//! immediately without touching the buffer. A whole field list can therefore
//! be serialized without branching and checked once at the end with
//! [`Stream::result`].
//!
//! ## Wire shapes
//! ```text
//! integer(min,max)  bits_required(min,max) bits holding value - min
//! bool              1 bit
//! uint64 / float64  low 32 bits, then high 32 bits
//! bytes             zero padding to a byte boundary, then raw bytes
//! string(max_len)   integer(0,max_len) length, then bytes when length > 0
//! address           2-bit tag: 0 none | 1 ipv4 (4 bytes, port:16)
//!                                      | 2 ipv6 (8 x 16-bit groups, port:16)
//! ```
//!
//! ## Example
//! ```rust
//! use overlay_wire::core::stream::{ReadStream, Stream, WriteStream};
//!
//! fn serialize<S: Stream>(stream: &mut S, rtt: &mut i32, next: &mut bool) {
//!     stream.serialize_integer(rtt, 0, 1023);
//!     stream.serialize_bool(next);
//! }
//!
//! let mut buffer = [0u8; 8];
//! let mut writer = WriteStream::new(&mut buffer);
//! let (mut rtt, mut next) = (42, true);
//! serialize(&mut writer, &mut rtt, &mut next);
//! let len = writer.finish().unwrap();
//!
//! let mut reader = ReadStream::new(&buffer[..len]);
//! let (mut rtt_in, mut next_in) = (0, false);
//! serialize(&mut reader, &mut rtt_in, &mut next_in);
//! assert!(reader.result().is_ok());
//! assert_eq!((rtt_in, next_in), (42, true));
//! ```

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4, SocketAddrV6};

use crate::core::bit_reader::BitReader;
use crate::core::bit_writer::BitWriter;
use crate::core::bits::bits_required_signed;
use crate::error::{Result, WireError};

/// Address tag: no address.
pub const ADDRESS_NONE: u32 = 0;
/// Address tag: IPv4 address and port.
pub const ADDRESS_IPV4: u32 = 1;
/// Address tag: IPv6 address and port.
pub const ADDRESS_IPV6: u32 = 2;

/// Buckets for relative integers after the single-bit `difference == 1` case.
/// Anything above the last bucket is sent as a raw 32-bit value.
const RELATIVE_BUCKETS: [(i32, i32); 5] = [
    (2, 6),
    (7, 23),
    (24, 280),
    (281, 4377),
    (4378, 69914),
];

/// Largest ack distance sent in compact form.
const ACK_RELATIVE_MAX: i32 = 64;

/// Serialization capability shared by the write and read directions.
pub trait Stream {
    /// True for [`WriteStream`].
    fn is_writing(&self) -> bool;

    /// True for [`ReadStream`].
    fn is_reading(&self) -> bool {
        !self.is_writing()
    }

    /// Integer known to lie in `[min, max]`, sent in `bits_required(min, max)` bits.
    fn serialize_integer(&mut self, value: &mut i32, min: i32, max: i32);

    /// Raw bit field of `0..=32` bits.
    fn serialize_bits(&mut self, value: &mut u32, bits: u32);

    /// Single bit.
    fn serialize_bool(&mut self, value: &mut bool);

    /// Byte block of at least one byte, preceded by alignment padding.
    fn serialize_bytes(&mut self, data: &mut [u8]);

    /// Length-prefixed string of at most `max_len` bytes.
    fn serialize_string(&mut self, value: &mut String, max_len: usize);

    /// Optional socket address, tagged none / IPv4 / IPv6.
    fn serialize_address(&mut self, addr: &mut Option<SocketAddr>);

    /// `current`, known to be greater than `previous`, sent as a difference.
    fn serialize_int_relative(&mut self, previous: i32, current: &mut i32);

    /// 16-bit sequence number newer than `sequence1`, with wrap-around.
    fn serialize_sequence_relative(&mut self, sequence1: u16, sequence2: &mut u16);

    /// Ack for a 16-bit sequence; compact when within 64 behind `sequence`.
    fn serialize_ack_relative(&mut self, sequence: u16, ack: &mut u16);

    /// Pad (write) or validate-and-skip (read) up to the next byte boundary.
    fn serialize_align(&mut self);

    /// Store buffered bits. No-op for read streams.
    fn flush(&mut self);

    /// Bits needed to reach the next byte boundary.
    fn align_bits(&self) -> usize;

    /// Bits written or read so far.
    fn bits_processed(&self) -> usize;

    /// Bytes written or read so far, rounded up.
    fn bytes_processed(&self) -> usize {
        self.bits_processed().div_ceil(8)
    }

    /// Bits left before the end of the buffer.
    fn bits_remaining(&self) -> usize;

    /// The recorded error, if any.
    fn error(&self) -> Option<&WireError>;

    /// Record `err` unless an error is already recorded.
    fn set_error(&mut self, err: WireError);

    /// True while no error has been recorded.
    fn is_ok(&self) -> bool {
        self.error().is_none()
    }

    /// `Ok(())` or a copy of the recorded error.
    fn result(&self) -> Result<()> {
        match self.error() {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    /// 32-bit unsigned value.
    fn serialize_uint32(&mut self, value: &mut u32) {
        self.serialize_bits(value, 32);
    }

    /// 8-bit unsigned value.
    fn serialize_uint8(&mut self, value: &mut u8) {
        let mut bits = u32::from(*value);
        self.serialize_bits(&mut bits, 8);
        if self.is_ok() {
            *value = bits as u8;
        }
    }

    /// 16-bit unsigned value.
    fn serialize_uint16(&mut self, value: &mut u16) {
        let mut bits = u32::from(*value);
        self.serialize_bits(&mut bits, 16);
        if self.is_ok() {
            *value = bits as u16;
        }
    }

    /// 64-bit unsigned value, low word first.
    fn serialize_uint64(&mut self, value: &mut u64) {
        if !self.is_ok() {
            return;
        }
        let available = self.bits_remaining();
        if available < 64 {
            self.set_error(WireError::Overflow {
                requested: 64,
                available,
            });
            return;
        }
        let mut lo = (*value & 0xFFFF_FFFF) as u32;
        let mut hi = (*value >> 32) as u32;
        self.serialize_bits(&mut lo, 32);
        self.serialize_bits(&mut hi, 32);
        if self.is_ok() {
            *value = (u64::from(hi) << 32) | u64::from(lo);
        }
    }

    /// IEEE-754 single, sent as its bit pattern.
    fn serialize_float32(&mut self, value: &mut f32) {
        let mut bits = value.to_bits();
        self.serialize_bits(&mut bits, 32);
        if self.is_ok() {
            *value = f32::from_bits(bits);
        }
    }

    /// IEEE-754 double, sent as its bit pattern, low word first.
    fn serialize_float64(&mut self, value: &mut f64) {
        let mut bits = value.to_bits();
        self.serialize_uint64(&mut bits);
        if self.is_ok() {
            *value = f64::from_bits(bits);
        }
    }
}

fn check_string_limit(max_len: usize) -> Result<i32> {
    if max_len == 0 || max_len > i32::MAX as usize {
        return Err(WireError::InvalidStringLimit(max_len));
    }
    Ok(max_len as i32)
}

// ---------------------------------------------------------------------------

/// Stream that serializes values into a caller-supplied buffer.
#[derive(Debug)]
pub struct WriteStream<'a> {
    writer: BitWriter<'a>,
    error: Option<WireError>,
}

impl<'a> WriteStream<'a> {
    /// Create a write stream over `buffer`.
    pub fn new(buffer: &'a mut [u8]) -> Self {
        Self {
            writer: BitWriter::new(buffer),
            error: None,
        }
    }

    /// Flush and return the number of bytes written.
    pub fn finish(&mut self) -> Result<usize> {
        self.flush();
        self.result()?;
        Ok(self.writer.bytes_written())
    }

    /// The written bytes. Complete after [`Stream::flush`] or [`Self::finish`].
    pub fn data(&self) -> &[u8] {
        self.writer.data()
    }

    fn record(&mut self, result: Result<()>) {
        if let Err(err) = result {
            self.set_error(err);
        }
    }

    fn write_block(&mut self, data: &[u8]) {
        if self.error.is_some() {
            return;
        }
        if data.is_empty() {
            self.set_error(WireError::EmptyBlock);
            return;
        }
        self.serialize_align();
        if self.error.is_some() {
            return;
        }
        let result = self.writer.write_bytes(data);
        self.record(result);
    }
}

impl Stream for WriteStream<'_> {
    fn is_writing(&self) -> bool {
        true
    }

    fn serialize_integer(&mut self, value: &mut i32, min: i32, max: i32) {
        if self.error.is_some() {
            return;
        }
        if min >= max {
            self.set_error(WireError::InvalidRange {
                min: i64::from(min),
                max: i64::from(max),
            });
            return;
        }
        if *value < min || *value > max {
            self.set_error(WireError::ValueOutOfRange {
                value: i64::from(*value),
                min: i64::from(min),
                max: i64::from(max),
            });
            return;
        }
        let bits = bits_required_signed(min, max);
        let unsigned = value.wrapping_sub(min) as u32;
        let result = self.writer.write_bits(unsigned, bits);
        self.record(result);
    }

    fn serialize_bits(&mut self, value: &mut u32, bits: u32) {
        if self.error.is_some() {
            return;
        }
        if bits > 32 {
            self.set_error(WireError::InvalidBitCount { bits, min: 0 });
            return;
        }
        if bits == 0 {
            if *value != 0 {
                self.set_error(WireError::ValueNotRepresentable { value: *value, bits });
            }
            return;
        }
        let result = self.writer.write_bits(*value, bits);
        self.record(result);
    }

    fn serialize_bool(&mut self, value: &mut bool) {
        if self.error.is_some() {
            return;
        }
        let result = self.writer.write_bits(u32::from(*value), 1);
        self.record(result);
    }

    fn serialize_bytes(&mut self, data: &mut [u8]) {
        self.write_block(data);
    }

    fn serialize_string(&mut self, value: &mut String, max_len: usize) {
        if self.error.is_some() {
            return;
        }
        let max = match check_string_limit(max_len) {
            Ok(max) => max,
            Err(err) => return self.set_error(err),
        };
        if value.len() > max_len {
            self.set_error(WireError::StringTooLong {
                len: value.len(),
                max: max_len,
            });
            return;
        }
        let mut length = value.len() as i32;
        self.serialize_integer(&mut length, 0, max);
        if length > 0 {
            self.write_block(value.as_bytes());
        }
    }

    fn serialize_address(&mut self, addr: &mut Option<SocketAddr>) {
        if self.error.is_some() {
            return;
        }
        match addr {
            None => {
                let mut tag = ADDRESS_NONE;
                self.serialize_bits(&mut tag, 2);
            }
            Some(SocketAddr::V4(v4)) => {
                let mut tag = ADDRESS_IPV4;
                self.serialize_bits(&mut tag, 2);
                self.write_block(&v4.ip().octets());
                let mut port = u32::from(v4.port());
                self.serialize_bits(&mut port, 16);
            }
            Some(SocketAddr::V6(v6)) => {
                let mut tag = ADDRESS_IPV6;
                self.serialize_bits(&mut tag, 2);
                for segment in v6.ip().segments() {
                    let mut group = u32::from(segment);
                    self.serialize_bits(&mut group, 16);
                }
                let mut port = u32::from(v6.port());
                self.serialize_bits(&mut port, 16);
            }
        }
    }

    fn serialize_int_relative(&mut self, previous: i32, current: &mut i32) {
        if self.error.is_some() {
            return;
        }
        if previous >= *current {
            self.set_error(WireError::NotIncreasing {
                previous: i64::from(previous),
                current: i64::from(*current),
            });
            return;
        }

        let difference = i64::from(*current) - i64::from(previous);

        let mut one = difference == 1;
        self.serialize_bool(&mut one);
        if one {
            return;
        }

        for (min, max) in RELATIVE_BUCKETS {
            let mut fits = difference <= i64::from(max);
            self.serialize_bool(&mut fits);
            if fits {
                let mut delta = difference as i32;
                self.serialize_integer(&mut delta, min, max);
                return;
            }
        }

        let mut raw = *current as u32;
        self.serialize_uint32(&mut raw);
    }

    fn serialize_sequence_relative(&mut self, sequence1: u16, sequence2: &mut u16) {
        if self.error.is_some() {
            return;
        }
        let previous = i32::from(sequence1);
        let mut current = i32::from(*sequence2);
        if sequence1 > *sequence2 {
            current += 65536;
        }
        self.serialize_int_relative(previous, &mut current);
    }

    fn serialize_ack_relative(&mut self, sequence: u16, ack: &mut u16) {
        if self.error.is_some() {
            return;
        }
        let distance = i32::from(sequence.wrapping_sub(*ack));
        let mut in_range = distance != 0 && distance <= ACK_RELATIVE_MAX;
        self.serialize_bool(&mut in_range);
        if in_range {
            let mut delta = distance;
            self.serialize_integer(&mut delta, 1, ACK_RELATIVE_MAX);
        } else {
            let mut raw = u32::from(*ack);
            self.serialize_bits(&mut raw, 16);
        }
    }

    fn serialize_align(&mut self) {
        if self.error.is_some() {
            return;
        }
        let result = self.writer.write_align();
        self.record(result);
    }

    fn flush(&mut self) {
        if self.error.is_some() {
            return;
        }
        let result = self.writer.flush();
        self.record(result);
    }

    fn align_bits(&self) -> usize {
        self.writer.align_bits()
    }

    fn bits_processed(&self) -> usize {
        self.writer.bits_written()
    }

    fn bytes_processed(&self) -> usize {
        self.writer.bytes_written()
    }

    fn bits_remaining(&self) -> usize {
        self.writer.bits_available()
    }

    fn error(&self) -> Option<&WireError> {
        self.error.as_ref()
    }

    fn set_error(&mut self, err: WireError) {
        if self.error.is_none() {
            self.error = Some(err);
        }
    }
}

// ---------------------------------------------------------------------------

/// Stream that deserializes values from a borrowed buffer.
#[derive(Debug)]
pub struct ReadStream<'a> {
    reader: BitReader<'a>,
    error: Option<WireError>,
}

impl<'a> ReadStream<'a> {
    /// Create a read stream over `buffer`.
    pub fn new(buffer: &'a [u8]) -> Self {
        Self {
            reader: BitReader::new(buffer),
            error: None,
        }
    }

    fn read(&mut self, bits: u32) -> Option<u32> {
        if self.error.is_some() {
            return None;
        }
        match self.reader.read_bits(bits) {
            Ok(value) => Some(value),
            Err(err) => {
                self.set_error(err);
                None
            }
        }
    }

    fn read_block(&mut self, out: &mut [u8]) {
        if self.error.is_some() {
            return;
        }
        if out.is_empty() {
            self.set_error(WireError::EmptyBlock);
            return;
        }
        self.serialize_align();
        if self.error.is_some() {
            return;
        }
        if let Err(err) = self.reader.read_bytes(out) {
            self.set_error(err);
        }
    }
}

impl Stream for ReadStream<'_> {
    fn is_writing(&self) -> bool {
        false
    }

    fn serialize_integer(&mut self, value: &mut i32, min: i32, max: i32) {
        if self.error.is_some() {
            return;
        }
        if min >= max {
            self.set_error(WireError::InvalidRange {
                min: i64::from(min),
                max: i64::from(max),
            });
            return;
        }
        let bits = bits_required_signed(min, max);
        let Some(unsigned) = self.read(bits) else {
            return;
        };
        let candidate = i64::from(min) + i64::from(unsigned);
        if candidate > i64::from(max) {
            self.set_error(WireError::ValueOutOfRange {
                value: candidate,
                min: i64::from(min),
                max: i64::from(max),
            });
            return;
        }
        *value = candidate as i32;
    }

    fn serialize_bits(&mut self, value: &mut u32, bits: u32) {
        if self.error.is_some() {
            return;
        }
        if bits > 32 {
            self.set_error(WireError::InvalidBitCount { bits, min: 0 });
            return;
        }
        if let Some(read) = self.read(bits) {
            *value = read;
        }
    }

    fn serialize_bool(&mut self, value: &mut bool) {
        if let Some(read) = self.read(1) {
            *value = read != 0;
        }
    }

    fn serialize_bytes(&mut self, data: &mut [u8]) {
        self.read_block(data);
    }

    fn serialize_string(&mut self, value: &mut String, max_len: usize) {
        if self.error.is_some() {
            return;
        }
        let max = match check_string_limit(max_len) {
            Ok(max) => max,
            Err(err) => return self.set_error(err),
        };
        let mut length = 0;
        self.serialize_integer(&mut length, 0, max);
        if self.error.is_some() {
            return;
        }
        if length == 0 {
            value.clear();
            return;
        }
        let length = length as usize;
        if length * 8 + self.align_bits() > self.reader.bits_remaining() {
            self.set_error(WireError::Overflow {
                requested: length * 8,
                available: self.reader.bits_remaining(),
            });
            return;
        }
        let mut bytes = vec![0u8; length];
        self.read_block(&mut bytes);
        if self.error.is_some() {
            return;
        }
        match String::from_utf8(bytes) {
            Ok(text) => *value = text,
            Err(_) => self.set_error(WireError::InvalidUtf8),
        }
    }

    fn serialize_address(&mut self, addr: &mut Option<SocketAddr>) {
        let Some(tag) = self.read(2) else {
            return;
        };
        match tag {
            ADDRESS_NONE => *addr = None,
            ADDRESS_IPV4 => {
                let mut octets = [0u8; 4];
                self.read_block(&mut octets);
                let Some(port) = self.read(16) else {
                    return;
                };
                *addr = Some(SocketAddr::V4(SocketAddrV4::new(
                    Ipv4Addr::from(octets),
                    port as u16,
                )));
            }
            ADDRESS_IPV6 => {
                let mut segments = [0u16; 8];
                for segment in &mut segments {
                    let Some(group) = self.read(16) else {
                        return;
                    };
                    *segment = group as u16;
                }
                let Some(port) = self.read(16) else {
                    return;
                };
                *addr = Some(SocketAddr::V6(SocketAddrV6::new(
                    Ipv6Addr::from(segments),
                    port as u16,
                    0,
                    0,
                )));
            }
            other => self.set_error(WireError::InvalidAddressTag(other)),
        }
    }

    fn serialize_int_relative(&mut self, previous: i32, current: &mut i32) {
        let Some(one) = self.read(1) else {
            return;
        };
        let difference = if one == 1 {
            1
        } else {
            let mut bucket = None;
            for (min, max) in RELATIVE_BUCKETS {
                let Some(fits) = self.read(1) else {
                    return;
                };
                if fits == 1 {
                    bucket = Some((min, max));
                    break;
                }
            }
            match bucket {
                Some((min, max)) => {
                    let mut delta = 0;
                    self.serialize_integer(&mut delta, min, max);
                    if self.error.is_some() {
                        return;
                    }
                    delta
                }
                None => {
                    let Some(raw) = self.read(32) else {
                        return;
                    };
                    let raw = raw as i32;
                    if raw <= previous {
                        self.set_error(WireError::NotIncreasing {
                            previous: i64::from(previous),
                            current: i64::from(raw),
                        });
                        return;
                    }
                    *current = raw;
                    return;
                }
            }
        };

        match previous.checked_add(difference) {
            Some(value) => *current = value,
            None => self.set_error(WireError::ValueOutOfRange {
                value: i64::from(previous) + i64::from(difference),
                min: i64::from(i32::MIN),
                max: i64::from(i32::MAX),
            }),
        }
    }

    fn serialize_sequence_relative(&mut self, sequence1: u16, sequence2: &mut u16) {
        if self.error.is_some() {
            return;
        }
        let previous = i32::from(sequence1);
        let mut current = 0;
        self.serialize_int_relative(previous, &mut current);
        if self.error.is_some() {
            return;
        }
        let distance = current - previous;
        if !(1..=65535).contains(&distance) {
            self.set_error(WireError::ValueOutOfRange {
                value: i64::from(distance),
                min: 1,
                max: 65535,
            });
            return;
        }
        *sequence2 = sequence1.wrapping_add(distance as u16);
    }

    fn serialize_ack_relative(&mut self, sequence: u16, ack: &mut u16) {
        let Some(in_range) = self.read(1) else {
            return;
        };
        if in_range == 1 {
            let mut delta = 0;
            self.serialize_integer(&mut delta, 1, ACK_RELATIVE_MAX);
            if self.error.is_none() {
                *ack = sequence.wrapping_sub(delta as u16);
            }
        } else if let Some(raw) = self.read(16) {
            *ack = raw as u16;
        }
    }

    fn serialize_align(&mut self) {
        if self.error.is_some() {
            return;
        }
        let align = self.reader.align_bits();
        if self.reader.would_read_past_end(align) {
            self.set_error(WireError::Overflow {
                requested: align,
                available: self.reader.bits_remaining(),
            });
            return;
        }
        if let Err(err) = self.reader.read_align() {
            self.set_error(err);
        }
    }

    fn flush(&mut self) {}

    fn align_bits(&self) -> usize {
        self.reader.align_bits()
    }

    fn bits_processed(&self) -> usize {
        self.reader.bits_read()
    }

    fn bits_remaining(&self) -> usize {
        self.reader.bits_remaining()
    }

    fn error(&self) -> Option<&WireError> {
        self.error.as_ref()
    }

    fn set_error(&mut self, err: WireError) {
        if self.error.is_none() {
            self.error = Some(err);
        }
    }
}
