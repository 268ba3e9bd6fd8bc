//! # Error Types
//!
//! Error handling for the wire serialization engine.
//!
//! Every failure a caller can trigger with bad arguments or bad input is a
//! [`WireError`]. Bookkeeping violations inside the bit packer are not errors;
//! they panic, because they mean the engine itself is broken.
//!
//! ## Error Categories
//! - **Constraint**: invalid arguments to a serialize call (`min >= max`,
//!   value outside its range, bit width outside `0..=32`)
//! - **Capacity**: a write or read would run past the end of the buffer
//! - **Validation**: decoded data is malformed (out-of-range integer,
//!   non-zero padding, unknown version or address tag)
//! - **Configuration**: a [`crate::config::WireConfig`] failed to load or validate
//!
//! ## Example Usage
//! ```rust
//! use overlay_wire::core::stream::{Stream, WriteStream};
//! use overlay_wire::error::{ErrorKind, WireError};
//!
//! let mut buffer = [0u8; 4];
//! let mut stream = WriteStream::new(&mut buffer);
//! let mut value = 7;
//! stream.serialize_integer(&mut value, 0, 5);
//!
//! let err = stream.error().cloned().unwrap_or(WireError::Misaligned);
//! assert_eq!(err.kind(), ErrorKind::Constraint);
//! ```

use thiserror::Error;

/// Broad classification of a [`WireError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Invalid arguments supplied by the caller.
    Constraint,
    /// The buffer is too small for the requested operation.
    Capacity,
    /// Decoded data failed validation.
    Validation,
    /// Configuration could not be loaded or is invalid.
    Configuration,
}

// WireError is the error type for every serialize, message and codec operation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    #[error("expected between {min} and 32 bits, got {bits}")]
    InvalidBitCount { bits: u32, min: u32 },

    #[error("{value} is not representable in {bits} bits")]
    ValueNotRepresentable { value: u32, bits: u32 },

    #[error("min ({min}) should be less than max ({max})")]
    InvalidRange { min: i64, max: i64 },

    #[error("value ({value}) outside range [{min}, {max}]")]
    ValueOutOfRange { value: i64, min: i64, max: i64 },

    #[error("buffer overflow: {requested} bits requested, {available} available")]
    Overflow { requested: usize, available: usize },

    #[error("byte block must contain at least one byte")]
    EmptyBlock,

    #[error("stream is not byte aligned")]
    Misaligned,

    #[error("alignment padding contains non-zero bits")]
    NonZeroPadding,

    #[error("string length {len} exceeds max {max}")]
    StringTooLong { len: usize, max: usize },

    #[error("invalid string max length {0}")]
    InvalidStringLimit(usize),

    #[error("string is not valid UTF-8")]
    InvalidUtf8,

    #[error("invalid address tag {0}")]
    InvalidAddressTag(u32),

    #[error("previous value ({previous}) should be less than current value ({current})")]
    NotIncreasing { previous: i64, current: i64 },

    #[error("unsupported {message} version {version} (supported {min}..={max})")]
    UnsupportedVersion {
        message: &'static str,
        version: u8,
        min: u8,
        max: u8,
    },

    #[error("{message} field {field} invalid: {reason}")]
    InvalidField {
        message: &'static str,
        field: &'static str,
        reason: String,
    },

    #[error("packet too large: {size} bytes (max {max})")]
    OversizedPacket { size: usize, max: usize },

    #[error("configuration error: {0}")]
    ConfigError(String),
}

impl WireError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            WireError::InvalidBitCount { .. }
            | WireError::ValueNotRepresentable { .. }
            | WireError::InvalidRange { .. }
            | WireError::EmptyBlock
            | WireError::Misaligned
            | WireError::StringTooLong { .. }
            | WireError::InvalidStringLimit(_)
            | WireError::NotIncreasing { .. } => ErrorKind::Constraint,

            WireError::Overflow { .. } | WireError::OversizedPacket { .. } => ErrorKind::Capacity,

            WireError::ValueOutOfRange { .. }
            | WireError::NonZeroPadding
            | WireError::InvalidUtf8
            | WireError::InvalidAddressTag(_)
            | WireError::UnsupportedVersion { .. }
            | WireError::InvalidField { .. } => ErrorKind::Validation,

            WireError::ConfigError(_) => ErrorKind::Configuration,
        }
    }

    /// True for buffer capacity failures.
    pub fn is_capacity(&self) -> bool {
        self.kind() == ErrorKind::Capacity
    }
}

/// Type alias for Results using WireError
pub type Result<T> = std::result::Result<T, WireError>;
