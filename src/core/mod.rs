//! # Core Serialization Engine
//!
//! Bit packing, typed streams and the packet codec.
//!
//! ## Components
//! - **bits**: width and sequence arithmetic
//! - **BitWriter / BitReader**: 0-32 bit fields over a borrowed byte buffer
//! - **Stream**: typed fields with a sticky error, one trait for both directions
//! - **Codec**: messages to packets with size limits, pooling and metrics
//!
//! ## Wire Format
//! ```text
//! word 0 (LE)          word 1 (LE)          ...
//! [b0 b1 ... b31]      [b32 ... b63]
//! fields packed lowest bit first, no per-field framing
//! ```
//!
//! ## Safety
//! - An N-byte buffer holds exactly 8N bits; nothing is written past it
//! - Malformed input produces an error, never a panic
//! - Decoded integers are range checked before they are stored

pub mod bit_reader;
pub mod bit_writer;
pub mod bits;
pub mod codec;
pub mod stream;
