//! # Bit Arithmetic
//!
//! Width calculations shared by the encoder and decoder, plus the sequence
//! number and zig-zag helpers used by relative encodings.
//!
//! `bits_required` decides the width of every ranged integer on the wire, so
//! both directions must call the same function with the same bounds.

/// Floor of log2 for non-zero `x`; `log2(0) == 0`.
#[inline]
pub fn log2(x: u32) -> u32 {
    if x == 0 {
        0
    } else {
        31 - x.leading_zeros()
    }
}

/// Number of bits needed to distinguish every integer in `[min, max]`.
///
/// Returns 0 when `min == max`. Callers pass `min <= max`.
#[inline]
pub fn bits_required(min: u32, max: u32) -> u32 {
    if min == max {
        0
    } else {
        log2(max.wrapping_sub(min)) + 1
    }
}

/// Signed variant of [`bits_required`]; the span is reinterpreted as unsigned.
#[inline]
pub fn bits_required_signed(min: i32, max: i32) -> u32 {
    if min == max {
        0
    } else {
        log2(max.wrapping_sub(min) as u32) + 1
    }
}

/// True if `s1` is newer than `s2`, accounting for 16-bit wrap-around.
#[inline]
pub fn sequence_greater_than(s1: u16, s2: u16) -> bool {
    ((s1 > s2) && (s1 - s2 <= 32768)) || ((s1 < s2) && (s2 - s1 > 32768))
}

/// True if `s1` is older than `s2`, accounting for 16-bit wrap-around.
#[inline]
pub fn sequence_less_than(s1: u16, s2: u16) -> bool {
    sequence_greater_than(s2, s1)
}

/// Zig-zag encode so small magnitudes of either sign stay small.
#[inline]
pub fn signed_to_unsigned(n: i32) -> u32 {
    ((n << 1) ^ (n >> 31)) as u32
}

/// Inverse of [`signed_to_unsigned`].
#[inline]
pub fn unsigned_to_signed(n: u32) -> i32 {
    ((n >> 1) as i32) ^ -((n & 1) as i32)
}

/// Mask covering the low `bits` bits (`bits <= 32`).
#[inline]
pub(crate) fn low_mask(bits: u32) -> u64 {
    (1u64 << bits) - 1
}
