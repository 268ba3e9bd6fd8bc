//! Session messages: the opaque state a game server carries between slices
//! and the per-slice telemetry the backend records.

use std::net::SocketAddr;

use crate::core::stream::Stream;
use crate::protocol::{serialize_len, serialize_version, Message};

/// Route cost that marks "no usable route".
pub const ROUTE_COST_INVALID: i32 = 10_000;

/// Relays on a single overlay route.
pub const MAX_RELAYS_PER_ROUTE: i32 = 5;

/// Near relays reported in a summary slice.
pub const MAX_NEAR_RELAYS: i32 = 32;

/// Tags attached to a session.
pub const MAX_TAGS: i32 = 8;

pub const MAX_RTT: i32 = 1023;
pub const MAX_JITTER: i32 = 255;
pub const MAX_PACKET_LOSS: i32 = 100;
pub const MAX_NEAR_RELAY_RTT: i32 = 255;
pub const MAX_ROUTE_DIVERSITY: i32 = 31;
pub const MAX_CONNECTION_TYPE: i32 = 3;
pub const MAX_PLATFORM_TYPE: i32 = 10;

pub const MAX_ISP_LENGTH: usize = 64;
pub const MAX_DEBUG_LENGTH: usize = 2048;

/// Slice numbers below this are sent in 10 bits.
const SMALL_SLICE_LIMIT: u32 = 1024;

/// Routing decision flags carried in [`SessionData`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteState {
    pub next: bool,
    pub veto: bool,
    pub disabled: bool,
    pub not_selected: bool,
    pub forced_next: bool,
    pub reduce_latency: bool,
    pub reduce_packet_loss: bool,
    pub multipath: bool,
    pub latency_worse: bool,
    pub no_route: bool,
    pub mispredict: bool,
    pub route_lost: bool,
    pub location_veto: bool,
    /// Saturating 2-bit counters
    pub mispredict_counter: u32,
    pub latency_worse_counter: u32,
    pub packet_loss_sustained_counter: u32,
}

impl RouteState {
    pub fn serialize<S: Stream + ?Sized>(&mut self, stream: &mut S) {
        stream.serialize_bool(&mut self.next);
        stream.serialize_bool(&mut self.veto);
        stream.serialize_bool(&mut self.disabled);
        stream.serialize_bool(&mut self.not_selected);
        stream.serialize_bool(&mut self.forced_next);
        stream.serialize_bool(&mut self.reduce_latency);
        stream.serialize_bool(&mut self.reduce_packet_loss);
        stream.serialize_bool(&mut self.multipath);
        stream.serialize_bool(&mut self.latency_worse);
        stream.serialize_bool(&mut self.no_route);
        stream.serialize_bool(&mut self.mispredict);
        stream.serialize_bool(&mut self.route_lost);
        stream.serialize_bool(&mut self.location_veto);
        stream.serialize_bits(&mut self.mispredict_counter, 2);
        stream.serialize_bits(&mut self.latency_worse_counter, 2);
        stream.serialize_bits(&mut self.packet_loss_sustained_counter, 2);
    }
}

/// Session state returned to the game server and echoed back on the next slice.
///
/// Version 2 adds `duration_on_next`, `session_duration` and `start_timestamp`.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionData {
    pub version: u8,
    pub session_id: u64,
    pub session_version: u8,
    pub slice_number: u32,
    pub expire_timestamp: u64,
    pub latitude: f32,
    pub longitude: f32,
    pub route_changed: bool,
    pub route_cost: i32,
    /// Relay ids of the active route; empty when on the direct path
    pub route_relays: Vec<u64>,
    pub route_state: RouteState,
    pub fallback_to_direct: bool,
    pub prev_packets_sent_client_to_server: u64,
    pub prev_packets_sent_server_to_client: u64,
    pub prev_packets_lost_client_to_server: u64,
    pub prev_packets_lost_server_to_client: u64,
    pub write_summary: bool,
    pub wrote_summary: bool,
    pub next_envelope_bytes_up_sum: u64,
    pub next_envelope_bytes_down_sum: u64,
    pub duration_on_next: u32,
    pub session_duration: u32,
    pub start_timestamp: u64,
}

impl Default for SessionData {
    fn default() -> Self {
        Self {
            version: Self::VERSION_MAX,
            session_id: 0,
            session_version: 0,
            slice_number: 0,
            expire_timestamp: 0,
            latitude: 0.0,
            longitude: 0.0,
            route_changed: false,
            route_cost: 0,
            route_relays: Vec::new(),
            route_state: RouteState::default(),
            fallback_to_direct: false,
            prev_packets_sent_client_to_server: 0,
            prev_packets_sent_server_to_client: 0,
            prev_packets_lost_client_to_server: 0,
            prev_packets_lost_server_to_client: 0,
            write_summary: false,
            wrote_summary: false,
            next_envelope_bytes_up_sum: 0,
            next_envelope_bytes_down_sum: 0,
            duration_on_next: 0,
            session_duration: 0,
            start_timestamp: 0,
        }
    }
}

impl Message for SessionData {
    const NAME: &'static str = "session data";
    const VERSION_MIN: u8 = 1;
    const VERSION_MAX: u8 = 2;
    const MAX_BYTES: usize = 256;

    fn version(&self) -> u8 {
        self.version
    }

    fn serialize<S: Stream + ?Sized>(&mut self, stream: &mut S) {
        serialize_version::<Self, S>(stream, &mut self.version);
        if !stream.is_ok() {
            return;
        }

        stream.serialize_uint64(&mut self.session_id);
        stream.serialize_uint8(&mut self.session_version);
        stream.serialize_uint32(&mut self.slice_number);
        stream.serialize_uint64(&mut self.expire_timestamp);
        stream.serialize_float32(&mut self.latitude);
        stream.serialize_float32(&mut self.longitude);
        stream.serialize_bool(&mut self.route_changed);
        stream.serialize_integer(&mut self.route_cost, 0, ROUTE_COST_INVALID);

        let mut has_route = !self.route_relays.is_empty();
        stream.serialize_bool(&mut has_route);
        if has_route {
            serialize_len(stream, &mut self.route_relays, 1, MAX_RELAYS_PER_ROUTE);
            for relay_id in &mut self.route_relays {
                stream.serialize_uint64(relay_id);
            }
        }

        self.route_state.serialize(stream);
        stream.serialize_bool(&mut self.fallback_to_direct);

        stream.serialize_uint64(&mut self.prev_packets_sent_client_to_server);
        stream.serialize_uint64(&mut self.prev_packets_sent_server_to_client);
        stream.serialize_uint64(&mut self.prev_packets_lost_client_to_server);
        stream.serialize_uint64(&mut self.prev_packets_lost_server_to_client);
        stream.serialize_bool(&mut self.write_summary);
        stream.serialize_bool(&mut self.wrote_summary);
        stream.serialize_uint64(&mut self.next_envelope_bytes_up_sum);
        stream.serialize_uint64(&mut self.next_envelope_bytes_down_sum);

        if self.version >= 2 {
            stream.serialize_uint32(&mut self.duration_on_next);
            stream.serialize_uint32(&mut self.session_duration);
            stream.serialize_uint64(&mut self.start_timestamp);
        }
    }
}

/// Latency measurements to one nearby relay.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NearRelayStats {
    pub relay_id: u64,
    pub rtt: i32,
    pub jitter: i32,
    pub packet_loss: i32,
}

/// Telemetry for one slice of a session.
///
/// Field groups are conditional:
/// - identity and client details only on slice 0 and the summary slice
/// - totals and near relay stats only on the summary slice
/// - overlay route details only while the slice is on the overlay (`next`)
/// - error flags only when at least one is set
///
/// Version 2 adds the measured packet loss and jitter. Version 3 adds
/// `user_flags`.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionUpdateMessage {
    pub version: u8,
    pub timestamp: u64,
    pub session_id: u64,
    pub slice_number: u32,

    pub direct_min_rtt: i32,
    pub direct_max_rtt: i32,
    pub direct_prime_rtt: i32,
    pub direct_jitter: i32,
    pub direct_packet_loss: i32,

    pub real_packet_loss: i32,
    pub real_jitter: u32,

    pub next: bool,
    pub flagged: bool,
    pub summary: bool,
    pub debug: Option<String>,
    pub route_diversity: i32,
    pub user_flags: u64,

    // first and summary slice
    pub datacenter_id: u64,
    pub buyer_id: u64,
    pub user_hash: u64,
    pub latitude: f32,
    pub longitude: f32,
    pub isp: String,
    pub connection_type: i32,
    pub platform_type: i32,
    pub sdk_version: [u8; 3],
    pub tags: Vec<u64>,
    pub client_address: Option<SocketAddr>,
    pub server_address: Option<SocketAddr>,

    // summary slice
    pub packets_sent_client_to_server: u64,
    pub packets_sent_server_to_client: u64,
    pub packets_lost_client_to_server: u64,
    pub packets_lost_server_to_client: u64,
    pub near_relays: Vec<NearRelayStats>,
    pub start_timestamp: u64,
    pub session_duration: u32,
    pub ever_on_next: bool,
    pub envelope_bytes_up_sum: u64,
    pub envelope_bytes_down_sum: u64,
    pub duration_on_next: u32,

    // overlay only
    pub next_rtt: i32,
    pub next_jitter: i32,
    pub next_packet_loss: i32,
    pub predicted_next_rtt: i32,
    pub next_relays: Vec<u64>,
    pub route_changed: bool,
    pub multipath: bool,
    pub next_bytes_up: u64,
    pub next_bytes_down: u64,

    // error state
    pub fallback_to_direct: bool,
    pub vetoed: bool,
    pub mispredicted: bool,
    pub latency_worse: bool,
    pub no_route: bool,
}

impl Default for SessionUpdateMessage {
    fn default() -> Self {
        Self {
            version: Self::VERSION_MAX,
            timestamp: 0,
            session_id: 0,
            slice_number: 0,
            direct_min_rtt: 0,
            direct_max_rtt: 0,
            direct_prime_rtt: 0,
            direct_jitter: 0,
            direct_packet_loss: 0,
            real_packet_loss: 0,
            real_jitter: 0,
            next: false,
            flagged: false,
            summary: false,
            debug: None,
            route_diversity: 0,
            user_flags: 0,
            datacenter_id: 0,
            buyer_id: 0,
            user_hash: 0,
            latitude: 0.0,
            longitude: 0.0,
            isp: String::new(),
            connection_type: 0,
            platform_type: 0,
            sdk_version: [0; 3],
            tags: Vec::new(),
            client_address: None,
            server_address: None,
            packets_sent_client_to_server: 0,
            packets_sent_server_to_client: 0,
            packets_lost_client_to_server: 0,
            packets_lost_server_to_client: 0,
            near_relays: Vec::new(),
            start_timestamp: 0,
            session_duration: 0,
            ever_on_next: false,
            envelope_bytes_up_sum: 0,
            envelope_bytes_down_sum: 0,
            duration_on_next: 0,
            next_rtt: 0,
            next_jitter: 0,
            next_packet_loss: 0,
            predicted_next_rtt: 0,
            next_relays: Vec::new(),
            route_changed: false,
            multipath: false,
            next_bytes_up: 0,
            next_bytes_down: 0,
            fallback_to_direct: false,
            vetoed: false,
            mispredicted: false,
            latency_worse: false,
            no_route: false,
        }
    }
}

impl SessionUpdateMessage {
    /// True if this slice carries the identity block.
    pub fn has_session_details(&self) -> bool {
        self.slice_number == 0 || self.summary
    }

    fn in_error_state(&self) -> bool {
        self.fallback_to_direct
            || self.vetoed
            || self.mispredicted
            || self.latency_worse
            || self.no_route
    }

    fn serialize_session_details<S: Stream + ?Sized>(&mut self, stream: &mut S) {
        stream.serialize_uint64(&mut self.datacenter_id);
        stream.serialize_uint64(&mut self.buyer_id);
        stream.serialize_uint64(&mut self.user_hash);
        stream.serialize_float32(&mut self.latitude);
        stream.serialize_float32(&mut self.longitude);
        stream.serialize_string(&mut self.isp, MAX_ISP_LENGTH);
        stream.serialize_integer(&mut self.connection_type, 0, MAX_CONNECTION_TYPE);
        stream.serialize_integer(&mut self.platform_type, 0, MAX_PLATFORM_TYPE);
        for part in &mut self.sdk_version {
            stream.serialize_uint8(part);
        }
        serialize_len(stream, &mut self.tags, 0, MAX_TAGS);
        for tag in &mut self.tags {
            stream.serialize_uint64(tag);
        }
        stream.serialize_address(&mut self.client_address);
        stream.serialize_address(&mut self.server_address);
    }

    fn serialize_summary<S: Stream + ?Sized>(&mut self, stream: &mut S) {
        stream.serialize_uint64(&mut self.packets_sent_client_to_server);
        stream.serialize_uint64(&mut self.packets_sent_server_to_client);
        stream.serialize_uint64(&mut self.packets_lost_client_to_server);
        stream.serialize_uint64(&mut self.packets_lost_server_to_client);

        serialize_len(stream, &mut self.near_relays, 0, MAX_NEAR_RELAYS);
        for relay in &mut self.near_relays {
            stream.serialize_uint64(&mut relay.relay_id);
            stream.serialize_integer(&mut relay.rtt, 0, MAX_NEAR_RELAY_RTT);
            stream.serialize_integer(&mut relay.jitter, 0, MAX_JITTER);
            stream.serialize_integer(&mut relay.packet_loss, 0, MAX_PACKET_LOSS);
        }

        stream.serialize_uint64(&mut self.start_timestamp);
        stream.serialize_uint32(&mut self.session_duration);

        stream.serialize_bool(&mut self.ever_on_next);
        if self.ever_on_next {
            stream.serialize_uint64(&mut self.envelope_bytes_up_sum);
            stream.serialize_uint64(&mut self.envelope_bytes_down_sum);
            stream.serialize_uint32(&mut self.duration_on_next);
        }
    }

    fn serialize_next<S: Stream + ?Sized>(&mut self, stream: &mut S) {
        stream.serialize_integer(&mut self.next_rtt, 0, MAX_RTT);
        stream.serialize_integer(&mut self.next_jitter, 0, MAX_JITTER);
        stream.serialize_integer(&mut self.next_packet_loss, 0, MAX_PACKET_LOSS);
        stream.serialize_integer(&mut self.predicted_next_rtt, 0, MAX_RTT);

        serialize_len(stream, &mut self.next_relays, 0, MAX_RELAYS_PER_ROUTE);
        for relay_id in &mut self.next_relays {
            stream.serialize_uint64(relay_id);
        }

        stream.serialize_bool(&mut self.route_changed);
        stream.serialize_bool(&mut self.multipath);
        stream.serialize_uint64(&mut self.next_bytes_up);
        stream.serialize_uint64(&mut self.next_bytes_down);
    }
}

impl Message for SessionUpdateMessage {
    const NAME: &'static str = "session update";
    const VERSION_MIN: u8 = 1;
    const VERSION_MAX: u8 = 3;
    const MAX_BYTES: usize = 4096;

    fn version(&self) -> u8 {
        self.version
    }

    fn serialize<S: Stream + ?Sized>(&mut self, stream: &mut S) {
        serialize_version::<Self, S>(stream, &mut self.version);
        if !stream.is_ok() {
            return;
        }

        stream.serialize_uint64(&mut self.timestamp);
        stream.serialize_uint64(&mut self.session_id);

        let mut small = self.slice_number < SMALL_SLICE_LIMIT;
        stream.serialize_bool(&mut small);
        stream.serialize_bits(&mut self.slice_number, if small { 10 } else { 32 });

        stream.serialize_integer(&mut self.direct_min_rtt, 0, MAX_RTT);
        stream.serialize_integer(&mut self.direct_max_rtt, 0, MAX_RTT);
        stream.serialize_integer(&mut self.direct_prime_rtt, 0, MAX_RTT);
        stream.serialize_integer(&mut self.direct_jitter, 0, MAX_JITTER);
        stream.serialize_integer(&mut self.direct_packet_loss, 0, MAX_PACKET_LOSS);

        if self.version >= 2 {
            stream.serialize_integer(&mut self.real_packet_loss, 0, MAX_PACKET_LOSS);
            stream.serialize_uint32(&mut self.real_jitter);
        }

        stream.serialize_bool(&mut self.next);
        stream.serialize_bool(&mut self.flagged);
        stream.serialize_bool(&mut self.summary);

        let mut has_debug = self.debug.is_some();
        stream.serialize_bool(&mut has_debug);
        if has_debug {
            let debug = self.debug.get_or_insert_with(String::new);
            stream.serialize_string(debug, MAX_DEBUG_LENGTH);
        }

        stream.serialize_integer(&mut self.route_diversity, 0, MAX_ROUTE_DIVERSITY);

        if self.version >= 3 {
            stream.serialize_uint64(&mut self.user_flags);
        }

        if self.has_session_details() {
            self.serialize_session_details(stream);
        }

        if self.summary {
            self.serialize_summary(stream);
        }

        if self.next {
            self.serialize_next(stream);
        }

        let mut error_state = self.in_error_state();
        stream.serialize_bool(&mut error_state);
        if error_state {
            stream.serialize_bool(&mut self.fallback_to_direct);
            stream.serialize_bool(&mut self.vetoed);
            stream.serialize_bool(&mut self.mispredicted);
            stream.serialize_bool(&mut self.latency_worse);
            stream.serialize_bool(&mut self.no_route);
        }
    }
}
