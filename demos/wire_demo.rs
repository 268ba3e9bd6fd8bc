//! Example: Encoding overlay control messages
//!
//! Shows the raw stream API and the packet codec side by side, and how
//! much a bit-packed slice update costs on the wire.
//!
//! Run with: `cargo run --example wire_demo`

#![allow(clippy::uninlined_format_args)]

use std::net::SocketAddr;

use overlay_wire::core::stream::{ReadStream, Stream, WriteStream};
use overlay_wire::protocol::{NearRelayStats, SessionUpdateMessage};
use overlay_wire::{MessageCodec, WireConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Bit-Packed Wire Format Demo ===\n");

    // 1. Raw stream fields
    println!("1. STREAM FIELDS");
    let mut buffer = [0u8; 64];
    let mut writer = WriteStream::new(&mut buffer);
    let mut rtt = 87;
    let mut on_next = true;
    let mut relay_address: Option<SocketAddr> = Some("198.51.100.7:40000".parse()?);
    let mut sequence = 3u16;
    writer.serialize_integer(&mut rtt, 0, 1023);
    writer.serialize_bool(&mut on_next);
    writer.serialize_address(&mut relay_address);
    writer.serialize_sequence_relative(65534, &mut sequence);
    let len = writer.finish()?;
    println!("   - rtt (10 bits), flag (1 bit), IPv4 address, sequence delta");
    println!("   - Encoded size: {} bytes", len);
    println!("   - Hex: {:02X?}", &buffer[..len]);

    let mut reader = ReadStream::new(&buffer[..len]);
    let (mut rtt_in, mut flag_in, mut addr_in, mut seq_in) = (0, false, None, 0u16);
    reader.serialize_integer(&mut rtt_in, 0, 1023);
    reader.serialize_bool(&mut flag_in);
    reader.serialize_address(&mut addr_in);
    reader.serialize_sequence_relative(65534, &mut seq_in);
    reader.result()?;
    println!(
        "   - Decoded: rtt={} on_next={} address={:?} sequence={}",
        rtt_in, flag_in, addr_in, seq_in
    );
    println!();

    // 2. Slice updates through the codec
    println!("2. SESSION UPDATES");
    let config = WireConfig::default_with_overrides(|c| c.codec.packet_prefix_bytes = 18);
    let codec = MessageCodec::new(&config)?;

    let mut first = SessionUpdateMessage {
        session_id: 0x5EED_0001,
        slice_number: 0,
        direct_min_rtt: 41,
        direct_max_rtt: 63,
        direct_prime_rtt: 45,
        isp: "Example Broadband".to_string(),
        client_address: Some("[2001:db8::42]:51000".parse()?),
        server_address: Some("192.0.2.20:40000".parse()?),
        ..SessionUpdateMessage::default()
    };
    let packet = codec.encode(&mut first)?;
    println!("   - First slice (session details): {} bytes", packet.len());

    let mut middle = SessionUpdateMessage {
        session_id: 0x5EED_0001,
        slice_number: 12,
        direct_min_rtt: 40,
        direct_max_rtt: 58,
        direct_prime_rtt: 44,
        next: true,
        next_rtt: 28,
        next_relays: vec![1001, 1002],
        ..SessionUpdateMessage::default()
    };
    let packet = codec.encode(&mut middle)?;
    println!("   - Middle slice on the overlay: {} bytes", packet.len());
    let decoded: SessionUpdateMessage = codec.decode(&packet)?;
    println!(
        "   - Roundtrip: {}",
        if decoded == middle {
            "✓ Success"
        } else {
            "✗ Failed"
        }
    );

    let mut summary = SessionUpdateMessage {
        session_id: 0x5EED_0001,
        slice_number: 90,
        summary: true,
        near_relays: (0..8)
            .map(|i| NearRelayStats {
                relay_id: 2000 + i,
                rtt: 30 + i as i32,
                jitter: 2,
                packet_loss: 0,
            })
            .collect(),
        ..SessionUpdateMessage::default()
    };
    let packet = codec.encode(&mut summary)?;
    println!("   - Summary slice: {} bytes", packet.len());
    println!();

    // 3. Metrics
    let snapshot = codec.metrics().snapshot();
    println!("3. METRICS");
    println!(
        "   - Encoded {} messages, {} bytes",
        snapshot.messages_encoded, snapshot.bytes_encoded
    );
    println!("   - Decoded {} messages", snapshot.messages_decoded);

    Ok(())
}
