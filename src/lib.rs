//! # overlay-wire
//!
//! Bit-packed binary serialization for overlay network control messages.
//!
//! Messages are written field by field into a caller-supplied buffer at bit
//! granularity: ranged integers use exactly as many bits as their range
//! needs, booleans take one bit, and byte blocks are aligned. The same
//! `serialize` routine drives both encoding and decoding, so the two
//! directions cannot drift apart.
//!
//! ## Layout
//! - [`core`]: bit packer, streams and the packet codec
//! - [`protocol`]: the [`protocol::Message`] trait and message types
//! - [`config`]: codec configuration
//! - [`error`]: [`WireError`] and the crate `Result`
//! - [`utils`]: buffer pool and metrics
//!
//! ## Quick Start
//! ```rust
//! use overlay_wire::core::stream::{ReadStream, Stream, WriteStream};
//!
//! let mut buffer = [0u8; 32];
//! let mut writer = WriteStream::new(&mut buffer);
//! let mut rtt = 37;
//! let mut host = String::from("relay-7");
//! writer.serialize_integer(&mut rtt, 0, 1023);
//! writer.serialize_string(&mut host, 64);
//! let len = writer.finish()?;
//!
//! let mut reader = ReadStream::new(&buffer[..len]);
//! let (mut rtt_in, mut host_in) = (0, String::new());
//! reader.serialize_integer(&mut rtt_in, 0, 1023);
//! reader.serialize_string(&mut host_in, 64);
//! reader.result()?;
//! assert_eq!((rtt_in, host_in.as_str()), (37, "relay-7"));
//! # Ok::<(), overlay_wire::WireError>(())
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod protocol;
pub mod utils;

pub use crate::config::WireConfig;
pub use crate::core::codec::MessageCodec;
pub use crate::core::stream::{ReadStream, Stream, WriteStream};
pub use crate::error::{ErrorKind, Result, WireError};
pub use crate::protocol::Message;
