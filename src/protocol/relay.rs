//! Relay status report sent to the backend on a fixed interval.

use std::net::SocketAddr;

use crate::core::stream::Stream;
use crate::protocol::{invalid_field, serialize_len, serialize_version, Message};

/// Ping samples in one update.
pub const MAX_PING_SAMPLES: i32 = 256;

/// Relay indices are below this value.
pub const MAX_RELAYS: i32 = 1024;

/// Counters reported in one update.
pub const MAX_RELAY_COUNTERS: i32 = 64;

pub const MAX_RELAY_VERSION_LENGTH: usize = 32;

/// Ping measurement from this relay to another.
///
/// Samples are sent in increasing `relay_index` order; each index is
/// encoded relative to the one before it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelayPingSample {
    pub relay_index: i32,
    pub rtt: u8,
    pub jitter: u8,
    pub packet_loss: u16,
}

/// Periodic relay status report.
#[derive(Debug, Clone, PartialEq)]
pub struct RelayUpdateMessage {
    pub version: u8,
    /// Public address the relay listens on; required
    pub address: Option<SocketAddr>,
    /// Sequence number of this update
    pub sequence: u16,
    /// Last backend response sequence the relay saw
    pub ack: u16,
    pub current_time: u64,
    pub start_time: u64,
    pub samples: Vec<RelayPingSample>,
    pub session_count: u32,
    pub envelope_bandwidth_up_kbps: u32,
    pub envelope_bandwidth_down_kbps: u32,
    pub packets_sent_per_second: f32,
    pub packets_received_per_second: f32,
    pub bandwidth_sent_kbps: f32,
    pub bandwidth_received_kbps: f32,
    pub relay_flags: u64,
    pub shutting_down: bool,
    pub relay_version: String,
    pub counters: Vec<u64>,
}

impl Default for RelayUpdateMessage {
    fn default() -> Self {
        Self {
            version: Self::VERSION_MAX,
            address: None,
            sequence: 0,
            ack: 0,
            current_time: 0,
            start_time: 0,
            samples: Vec::new(),
            session_count: 0,
            envelope_bandwidth_up_kbps: 0,
            envelope_bandwidth_down_kbps: 0,
            packets_sent_per_second: 0.0,
            packets_received_per_second: 0.0,
            bandwidth_sent_kbps: 0.0,
            bandwidth_received_kbps: 0.0,
            relay_flags: 0,
            shutting_down: false,
            relay_version: String::new(),
            counters: Vec::new(),
        }
    }
}

impl RelayUpdateMessage {
    fn serialize_samples<S: Stream + ?Sized>(&mut self, stream: &mut S) {
        serialize_len(stream, &mut self.samples, 0, MAX_PING_SAMPLES);

        let mut previous = -1;
        for sample in &mut self.samples {
            stream.serialize_int_relative(previous, &mut sample.relay_index);
            if !stream.is_ok() {
                return;
            }
            if sample.relay_index >= MAX_RELAYS {
                invalid_field::<Self, S>(
                    stream,
                    "samples",
                    format!("relay index {} exceeds {}", sample.relay_index, MAX_RELAYS - 1),
                );
                return;
            }
            previous = sample.relay_index;

            stream.serialize_uint8(&mut sample.rtt);
            stream.serialize_uint8(&mut sample.jitter);
            stream.serialize_uint16(&mut sample.packet_loss);
        }
    }
}

impl Message for RelayUpdateMessage {
    const NAME: &'static str = "relay update";
    const VERSION_MIN: u8 = 1;
    const VERSION_MAX: u8 = 1;
    const MAX_BYTES: usize = 4096;

    fn version(&self) -> u8 {
        self.version
    }

    fn serialize<S: Stream + ?Sized>(&mut self, stream: &mut S) {
        serialize_version::<Self, S>(stream, &mut self.version);
        if !stream.is_ok() {
            return;
        }

        stream.serialize_address(&mut self.address);
        if stream.is_ok() && self.address.is_none() {
            invalid_field::<Self, S>(stream, "address", "relay address is required".to_string());
            return;
        }

        stream.serialize_uint16(&mut self.sequence);
        stream.serialize_ack_relative(self.sequence, &mut self.ack);
        stream.serialize_uint64(&mut self.current_time);
        stream.serialize_uint64(&mut self.start_time);

        self.serialize_samples(stream);

        stream.serialize_uint32(&mut self.session_count);
        stream.serialize_uint32(&mut self.envelope_bandwidth_up_kbps);
        stream.serialize_uint32(&mut self.envelope_bandwidth_down_kbps);
        stream.serialize_float32(&mut self.packets_sent_per_second);
        stream.serialize_float32(&mut self.packets_received_per_second);
        stream.serialize_float32(&mut self.bandwidth_sent_kbps);
        stream.serialize_float32(&mut self.bandwidth_received_kbps);

        stream.serialize_uint64(&mut self.relay_flags);
        stream.serialize_bool(&mut self.shutting_down);
        stream.serialize_string(&mut self.relay_version, MAX_RELAY_VERSION_LENGTH);

        serialize_len(stream, &mut self.counters, 0, MAX_RELAY_COUNTERS);
        for counter in &mut self.counters {
            stream.serialize_uint64(counter);
        }
    }
}
