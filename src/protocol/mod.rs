//! # Protocol Messages
//!
//! Versioned messages built on [`Stream`].
//!
//! A message implements [`Message`] with a single `serialize` routine that
//! runs unchanged for encoding and decoding, so field order and conditional
//! gates are identical in both directions.
//!
//! ## Versioning
//! The first field of every message is a version byte. Writes with a
//! version outside `[VERSION_MIN, VERSION_MAX]` fail, and reads reject an
//! unknown version before looking at any other field. Fields added in later
//! versions are gated on `version >= n`, so an old payload decodes with the
//! newer fields left at their defaults.
//!
//! ## Messages
//! - [`SessionData`]: session state the backend hands back to the server
//! - [`SessionUpdateMessage`]: per-slice session telemetry
//! - [`RelayUpdateMessage`]: periodic relay status report

pub mod relay;
pub mod session;


pub use relay::{RelayPingSample, RelayUpdateMessage};
pub use session::{NearRelayStats, RouteState, SessionData, SessionUpdateMessage};

use crate::core::stream::{ReadStream, Stream, WriteStream};
use crate::error::{Result, WireError};

/// A versioned wire message.
pub trait Message: Default {
    /// Name used in errors and logs.
    const NAME: &'static str;
    /// Oldest version this build reads.
    const VERSION_MIN: u8;
    /// Newest version this build reads and writes.
    const VERSION_MAX: u8;
    /// Upper bound on the encoded size of any valid instance.
    const MAX_BYTES: usize;

    /// Version this instance encodes as.
    fn version(&self) -> u8;

    /// Serialize every field through `stream`, in either direction.
    fn serialize<S: Stream + ?Sized>(&mut self, stream: &mut S);

    /// Encode into `buffer`, returning the bytes written.
    fn write(&mut self, buffer: &mut [u8]) -> Result<usize> {
        write_message(self, buffer)
    }

    /// Decode a complete message from `buffer`.
    fn read(buffer: &[u8]) -> Result<Self> {
        read_message(buffer)
    }
}

/// Serialize the leading version byte of `M` and enforce its range.
pub fn serialize_version<M, S>(stream: &mut S, version: &mut u8)
where
    M: Message,
    S: Stream + ?Sized,
{
    stream.serialize_uint8(version);
    if stream.is_ok() && !(M::VERSION_MIN..=M::VERSION_MAX).contains(version) {
        stream.set_error(WireError::UnsupportedVersion {
            message: M::NAME,
            version: *version,
            min: M::VERSION_MIN,
            max: M::VERSION_MAX,
        });
    }
}

/// Serialize the length of `items` as an integer in `[min, max]`.
///
/// On read the vector is resized to the decoded length with default
/// elements, ready for the caller to serialize each one.
pub fn serialize_len<S, T>(stream: &mut S, items: &mut Vec<T>, min: i32, max: i32)
where
    S: Stream + ?Sized,
    T: Default,
{
    let mut count = i32::try_from(items.len()).unwrap_or(i32::MAX);
    stream.serialize_integer(&mut count, min, max);
    if stream.is_reading() && stream.is_ok() {
        items.clear();
        items.resize_with(count as usize, T::default);
    }
}

/// Record a semantic validation failure for `M` on `stream`.
pub fn invalid_field<M, S>(stream: &mut S, field: &'static str, reason: String)
where
    M: Message,
    S: Stream + ?Sized,
{
    stream.set_error(WireError::InvalidField {
        message: M::NAME,
        field,
        reason,
    });
}

/// Encode `message` into `buffer`, returning the number of bytes written.
pub fn write_message<M: Message>(message: &mut M, buffer: &mut [u8]) -> Result<usize> {
    let mut stream = WriteStream::new(buffer);
    message.serialize(&mut stream);
    stream.finish()
}

/// Decode a message of type `M` from `buffer`.
///
/// Any failure discards the partially decoded message.
pub fn read_message<M: Message>(buffer: &[u8]) -> Result<M> {
    let mut message = M::default();
    let mut stream = ReadStream::new(buffer);
    message.serialize(&mut stream);
    stream.result()?;
    Ok(message)
}
