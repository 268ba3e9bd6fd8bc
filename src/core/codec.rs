//! # Message Codec
//!
//! Packet-level entry point: turns [`Message`] values into packets and back,
//! with size limits from [`CodecConfig`], pooled scratch buffers, metrics and
//! logging.
//!
//! ## Packet layout
//! ```text
//! [prefix: packet_prefix_bytes] [message payload]
//! ```
//! The prefix is zero-filled on encode and skipped on decode. It is reserved
//! for an outer layer that hashes or signs the payload.
//!
//! ## Usage
//! ```rust
//! use overlay_wire::config::WireConfig;
//! use overlay_wire::core::codec::MessageCodec;
//! use overlay_wire::protocol::SessionData;
//!
//! let config = WireConfig::default_with_overrides(|c| c.codec.packet_prefix_bytes = 8);
//! let codec = MessageCodec::new(&config).unwrap();
//!
//! let mut data = SessionData { session_id: 7, ..SessionData::default() };
//! let packet = codec.encode(&mut data).unwrap();
//! let decoded: SessionData = codec.decode(&packet).unwrap();
//! assert_eq!(decoded.session_id, 7);
//! ```

use std::fmt::Write as _;
use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, error, info, trace, warn, Level};

use crate::config::{CodecConfig, LoggingConfig, WireConfig};
use crate::error::{Result, WireError};
use crate::protocol::{read_message, write_message, Message};
use crate::utils::buffer_pool::BufferPool;
use crate::utils::metrics::{Metrics, Timer};

/// Encodes and decodes messages as packets.
///
/// Cheap to share behind an `Arc`; every call works on its own buffer.
#[derive(Debug)]
pub struct MessageCodec {
    config: CodecConfig,
    logging: LoggingConfig,
    pool: BufferPool,
    metrics: Arc<Metrics>,
}

impl MessageCodec {
    /// Create a codec from a validated configuration.
    pub fn new(config: &WireConfig) -> Result<Self> {
        Self::with_metrics(config, Arc::new(Metrics::new()))
    }

    /// Create a codec that records into an existing metrics collector.
    pub fn with_metrics(config: &WireConfig, metrics: Arc<Metrics>) -> Result<Self> {
        config.validate_strict()?;

        debug!(
            app = %config.logging.app_name,
            max_packet_bytes = config.codec.max_packet_bytes,
            packet_prefix_bytes = config.codec.packet_prefix_bytes,
            buffer_pool_size = config.codec.buffer_pool_size,
            "Message codec created"
        );

        Ok(Self {
            pool: BufferPool::new(config.codec.buffer_pool_size, config.codec.max_packet_bytes),
            config: config.codec.clone(),
            logging: config.logging.clone(),
            metrics,
        })
    }

    /// Metrics collected by this codec.
    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Codec settings in use.
    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Encode `message` into a new packet, prefix included.
    pub fn encode<M: Message>(&self, message: &mut M) -> Result<Bytes> {
        let mut buffer = self.pool.acquire();
        let len = self.encode_into(message, &mut buffer)?;
        Ok(Bytes::copy_from_slice(&buffer[..len]))
    }

    /// Encode `message` into `packet` after the configured prefix.
    ///
    /// Returns the packet length, prefix included. The payload is limited by
    /// the smaller of `M::MAX_BYTES`, the configured packet size and `packet`.
    pub fn encode_into<M: Message>(&self, message: &mut M, packet: &mut [u8]) -> Result<usize> {
        let _timer = Timer::start("encode");
        let prefix = self.config.packet_prefix_bytes;

        if packet.len() <= prefix {
            let err = WireError::Overflow {
                requested: (prefix + 1) * 8,
                available: packet.len() * 8,
            };
            self.encode_failed::<M>(&err);
            return Err(err);
        }

        let end = packet
            .len()
            .min(self.config.max_packet_bytes)
            .min(prefix + M::MAX_BYTES);
        packet[..prefix].fill(0);

        match write_message(message, &mut packet[prefix..end]) {
            Ok(payload_len) => {
                let total = prefix + payload_len;
                self.metrics.message_encoded(total as u64);
                debug!(
                    message_type = M::NAME,
                    version = message.version(),
                    payload_bytes = payload_len,
                    packet_bytes = total,
                    "Encoded message"
                );
                if self.logging.log_payloads {
                    trace!(
                        message_type = M::NAME,
                        payload = %hex_dump(&packet[prefix..total]),
                        "Encoded payload"
                    );
                }
                Ok(total)
            }
            Err(err) => {
                self.encode_failed::<M>(&err);
                Err(err)
            }
        }
    }

    /// Decode a packet produced by [`Self::encode`].
    ///
    /// Packets larger than the configured maximum are rejected before any
    /// field is read.
    pub fn decode<M: Message>(&self, packet: &[u8]) -> Result<M> {
        let _timer = Timer::start("decode");
        let prefix = self.config.packet_prefix_bytes;

        if packet.len() > self.config.max_packet_bytes {
            return Err(self.decode_failed::<M>(
                WireError::OversizedPacket {
                    size: packet.len(),
                    max: self.config.max_packet_bytes,
                },
                packet,
            ));
        }

        let Some(payload) = packet.get(prefix..) else {
            return Err(self.decode_failed::<M>(
                WireError::Overflow {
                    requested: prefix * 8,
                    available: packet.len() * 8,
                },
                packet,
            ));
        };

        if payload.len() > M::MAX_BYTES {
            return Err(self.decode_failed::<M>(
                WireError::OversizedPacket {
                    size: payload.len(),
                    max: M::MAX_BYTES,
                },
                packet,
            ));
        }

        match read_message::<M>(payload) {
            Ok(message) => {
                self.metrics.message_decoded(packet.len() as u64);
                debug!(
                    message_type = M::NAME,
                    version = message.version(),
                    packet_bytes = packet.len(),
                    "Decoded message"
                );
                Ok(message)
            }
            Err(err) => Err(self.decode_failed::<M>(err, packet)),
        }
    }

    fn encode_failed<M: Message>(&self, err: &WireError) {
        self.metrics.encode_failed(err);
        warn!(
            app = %self.logging.app_name,
            message_type = M::NAME,
            error = %err,
            "Failed to encode message"
        );
    }

    fn decode_failed<M: Message>(&self, err: WireError, packet: &[u8]) -> WireError {
        self.metrics.decode_failed(&err);

        let app = self.logging.app_name.as_str();
        let size = packet.len();
        match self.logging.log_level {
            Level::ERROR => error!(app, message_type = M::NAME, size, error = %err, "Rejected packet"),
            Level::WARN => warn!(app, message_type = M::NAME, size, error = %err, "Rejected packet"),
            Level::INFO => info!(app, message_type = M::NAME, size, error = %err, "Rejected packet"),
            Level::DEBUG => debug!(app, message_type = M::NAME, size, error = %err, "Rejected packet"),
            _ => trace!(app, message_type = M::NAME, size, error = %err, "Rejected packet"),
        }

        if self.logging.log_payloads {
            trace!(message_type = M::NAME, payload = %hex_dump(packet), "Rejected payload");
        }

        err
    }
}

fn hex_dump(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 2);
    for byte in data {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{RelayUpdateMessage, SessionData};

    fn codec_with_prefix(prefix: usize) -> MessageCodec {
        let config = WireConfig::default_with_overrides(|c| {
            c.codec.packet_prefix_bytes = prefix;
            c.codec.buffer_pool_size = 2;
        });
        MessageCodec::new(&config).unwrap()
    }

    #[test]
    fn test_encode_reserves_zeroed_prefix() {
        let codec = codec_with_prefix(18);
        let mut data = SessionData {
            session_id: 5,
            ..SessionData::default()
        };
        let packet = codec.encode(&mut data).unwrap();
        assert!(packet[..18].iter().all(|&b| b == 0));
        assert_eq!(packet[18], SessionData::VERSION_MAX);

        let decoded: SessionData = codec.decode(&packet).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn test_encode_into_caller_buffer() {
        let codec = codec_with_prefix(4);
        let mut packet = [0xAAu8; 300];
        let mut data = SessionData::default();
        let len = codec.encode_into(&mut data, &mut packet).unwrap();
        assert_eq!(&packet[..4], &[0, 0, 0, 0]);
        let decoded: SessionData = codec.decode(&packet[..len]).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn test_encode_into_tiny_buffer() {
        let codec = codec_with_prefix(8);
        let mut packet = [0u8; 8];
        let err = codec
            .encode_into(&mut SessionData::default(), &mut packet)
            .unwrap_err();
        assert!(err.is_capacity());
        assert_eq!(codec.metrics().snapshot().encode_failures, 1);
    }

    #[test]
    fn test_decode_rejects_oversized_packet() {
        let codec = codec_with_prefix(0);
        let packet = vec![1u8; codec.config().max_packet_bytes + 1];
        let err = codec.decode::<SessionData>(&packet).unwrap_err();
        assert!(matches!(err, WireError::OversizedPacket { .. }));

        let payload = vec![1u8; SessionData::MAX_BYTES + 1];
        let err = codec.decode::<SessionData>(&payload).unwrap_err();
        assert_eq!(
            err,
            WireError::OversizedPacket {
                size: SessionData::MAX_BYTES + 1,
                max: SessionData::MAX_BYTES
            }
        );
    }

    #[test]
    fn test_decode_shorter_than_prefix() {
        let codec = codec_with_prefix(16);
        let err = codec.decode::<RelayUpdateMessage>(&[0u8; 10]).unwrap_err();
        assert!(err.is_capacity());
    }

    #[test]
    fn test_metrics_track_activity() {
        let codec = codec_with_prefix(0);
        let mut data = SessionData::default();
        let packet = codec.encode(&mut data).unwrap();
        let _: SessionData = codec.decode(&packet).unwrap();
        let _ = codec.decode::<SessionData>(&[0xFF]);

        let snapshot = codec.metrics().snapshot();
        assert_eq!(snapshot.messages_encoded, 1);
        assert_eq!(snapshot.bytes_encoded, packet.len() as u64);
        assert_eq!(snapshot.messages_decoded, 1);
        assert_eq!(snapshot.decode_failures, 1);
        assert_eq!(snapshot.validation_errors, 1);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = WireConfig::default_with_overrides(|c| c.codec.max_packet_bytes = 0);
        assert!(matches!(
            MessageCodec::new(&config),
            Err(WireError::ConfigError(_))
        ));
    }

    #[test]
    fn test_hex_dump() {
        assert_eq!(hex_dump(&[0x00, 0xAB, 0x10]), "00ab10");
    }
}
