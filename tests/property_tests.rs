//! Property-based tests using proptest
//!
//! These tests check stream invariants across randomly generated values,
//! ranges and buffer sizes.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use overlay_wire::core::bits::bits_required_signed;
use overlay_wire::core::stream::{ReadStream, Stream, WriteStream};
use overlay_wire::protocol::{Message, NearRelayStats, SessionUpdateMessage};
use proptest::prelude::*;

fn ranged() -> impl Strategy<Value = (i32, i32, i32)> {
    (any::<i32>(), any::<i32>())
        .prop_filter("range needs two values", |(a, b)| a != b)
        .prop_map(|(a, b)| if a <= b { (a, b) } else { (b, a) })
        .prop_flat_map(|(min, max)| (Just(min), Just(max), min..=max))
}

// Property: Any value within its range survives a round trip in minimal width
proptest! {
    #[test]
    fn prop_integer_roundtrip((min, max, value) in ranged()) {
        let mut buffer = [0u8; 8];
        let mut writer = WriteStream::new(&mut buffer);
        let mut v = value;
        writer.serialize_integer(&mut v, min, max);
        prop_assert!(writer.is_ok());
        prop_assert_eq!(writer.bits_processed(), bits_required_signed(min, max) as usize);
        let len = writer.finish().unwrap();

        let mut reader = ReadStream::new(&buffer[..len]);
        let mut out = 0;
        reader.serialize_integer(&mut out, min, max);
        prop_assert!(reader.is_ok());
        prop_assert_eq!(out, value);
    }
}

// Property: A sequence of arbitrary-width fields reads back in order
proptest! {
    #[test]
    fn prop_bit_fields_roundtrip(fields in prop::collection::vec((any::<u32>(), 1u32..=32), 0..64)) {
        let fields: Vec<(u32, u32)> = fields
            .into_iter()
            .map(|(value, bits)| (if bits == 32 { value } else { value & ((1 << bits) - 1) }, bits))
            .collect();

        let mut buffer = vec![0u8; fields.len() * 4];
        let mut writer = WriteStream::new(&mut buffer);
        for &(value, bits) in &fields {
            let mut v = value;
            writer.serialize_bits(&mut v, bits);
        }
        let len = writer.finish().unwrap();
        let total: u32 = fields.iter().map(|&(_, bits)| bits).sum();
        prop_assert_eq!(len, total.div_ceil(8) as usize);

        let mut reader = ReadStream::new(&buffer[..len]);
        for &(value, bits) in &fields {
            let mut v = 0;
            reader.serialize_bits(&mut v, bits);
            prop_assert_eq!(v, value);
        }
        prop_assert!(reader.is_ok());
    }
}

// Property: Strings up to the limit round trip, including non-ASCII text
proptest! {
    #[test]
    fn prop_string_roundtrip(text in "\\PC{0,40}", lead in 0u32..8) {
        let max_len = text.len().max(1);
        let mut buffer = [0u8; 256];
        let mut writer = WriteStream::new(&mut buffer);
        let mut pad = 0;
        writer.serialize_bits(&mut pad, lead);
        let mut s = text.clone();
        writer.serialize_string(&mut s, max_len);
        let len = writer.finish().unwrap();

        let mut reader = ReadStream::new(&buffer[..len]);
        let mut pad = 0;
        reader.serialize_bits(&mut pad, lead);
        let mut out = String::new();
        reader.serialize_string(&mut out, max_len);
        prop_assert!(reader.is_ok());
        prop_assert_eq!(out, text);
    }
}

// Property: Increasing integer pairs round trip through the relative encoding
proptest! {
    #[test]
    fn prop_int_relative_roundtrip(previous in any::<i32>(), step in 1i64..=i64::from(u32::MAX)) {
        let current = i64::from(previous) + step;
        prop_assume!(current <= i64::from(i32::MAX));
        let current = current as i32;

        let mut buffer = [0u8; 8];
        let mut writer = WriteStream::new(&mut buffer);
        let mut c = current;
        writer.serialize_int_relative(previous, &mut c);
        let len = writer.finish().unwrap();

        let mut reader = ReadStream::new(&buffer[..len]);
        let mut out = 0;
        reader.serialize_int_relative(previous, &mut out);
        prop_assert!(reader.is_ok());
        prop_assert_eq!(out, current);
    }
}

// Property: Any distinct pair of sequence numbers round trips across wrap-around
proptest! {
    #[test]
    fn prop_sequence_relative_roundtrip(s1 in any::<u16>(), s2 in any::<u16>()) {
        prop_assume!(s1 != s2);
        let mut buffer = [0u8; 8];
        let mut writer = WriteStream::new(&mut buffer);
        let mut s = s2;
        writer.serialize_sequence_relative(s1, &mut s);
        let len = writer.finish().unwrap();

        let mut reader = ReadStream::new(&buffer[..len]);
        let mut out = 0;
        reader.serialize_sequence_relative(s1, &mut out);
        prop_assert!(reader.is_ok());
        prop_assert_eq!(out, s2);
    }
}

// Property: Every ack value round trips and close acks cost 7 bits
proptest! {
    #[test]
    fn prop_ack_relative_roundtrip(sequence in any::<u16>(), ack in any::<u16>()) {
        let mut buffer = [0u8; 4];
        let mut writer = WriteStream::new(&mut buffer);
        let mut a = ack;
        writer.serialize_ack_relative(sequence, &mut a);
        let distance = sequence.wrapping_sub(ack);
        let expected_bits = if (1..=64).contains(&distance) { 7 } else { 17 };
        prop_assert_eq!(writer.bits_processed(), expected_bits);
        let len = writer.finish().unwrap();

        let mut reader = ReadStream::new(&buffer[..len]);
        let mut out = 0;
        reader.serialize_ack_relative(sequence, &mut out);
        prop_assert!(reader.is_ok());
        prop_assert_eq!(out, ack);
    }
}

// Property: Reading arbitrary bytes never panics and errors stay sticky
proptest! {
    #[test]
    fn prop_read_arbitrary_never_panics(data in prop::collection::vec(any::<u8>(), 0..64)) {
        let mut reader = ReadStream::new(&data);
        let mut value = 0;
        let mut text = String::new();
        let mut addr = None;
        let mut seq = 0u16;
        reader.serialize_integer(&mut value, -1000, 1000);
        reader.serialize_string(&mut text, 32);
        reader.serialize_address(&mut addr);
        reader.serialize_sequence_relative(100, &mut seq);
        let first = reader.error().cloned();
        let mut extra = 0u64;
        reader.serialize_uint64(&mut extra);
        if let Some(first) = first {
            prop_assert_eq!(reader.error(), Some(&first));
        }
        prop_assert!(reader.bits_processed() <= data.len() * 8);
    }
}

// Property: Writes that overflow fail cleanly and never pass the buffer end
proptest! {
    #[test]
    fn prop_overflow_never_panics(capacity in 0usize..16, fields in prop::collection::vec(1u32..=32, 0..32)) {
        let mut buffer = vec![0u8; capacity];
        let mut writer = WriteStream::new(&mut buffer);
        let mut needed = 0usize;
        for bits in fields {
            let mut v = 0;
            writer.serialize_bits(&mut v, bits);
            needed += bits as usize;
        }
        writer.flush();
        prop_assert!(writer.bits_processed() <= capacity * 8);
        prop_assert_eq!(writer.is_ok(), needed <= capacity * 8);
    }
}

// Property: Aligning twice is the same as aligning once
proptest! {
    #[test]
    fn prop_align_idempotent(lead in 0u32..=32) {
        let mut buffer = [0u8; 8];
        let mut writer = WriteStream::new(&mut buffer);
        let mut v = 0;
        writer.serialize_bits(&mut v, lead);
        writer.serialize_align();
        let once = writer.bits_processed();
        writer.serialize_align();
        prop_assert_eq!(writer.bits_processed(), once);
        prop_assert_eq!(once % 8, 0);
        prop_assert_eq!(writer.align_bits(), 0);
    }
}

// Property: Summary slices with arbitrary near relay stats round trip
proptest! {
    #[test]
    fn prop_session_update_summary_roundtrip(
        session_id in any::<u64>(),
        slice_number in any::<u32>(),
        stats in prop::collection::vec((any::<u64>(), 0i32..=255, 0i32..=255, 0i32..=100), 0..=32),
    ) {
        let mut message = SessionUpdateMessage {
            session_id,
            slice_number,
            summary: true,
            near_relays: stats
                .into_iter()
                .map(|(relay_id, rtt, jitter, packet_loss)| NearRelayStats { relay_id, rtt, jitter, packet_loss })
                .collect(),
            ..SessionUpdateMessage::default()
        };
        let mut buffer = vec![0u8; SessionUpdateMessage::MAX_BYTES];
        let len = message.write(&mut buffer).unwrap();
        let decoded = SessionUpdateMessage::read(&buffer[..len]).unwrap();
        prop_assert_eq!(decoded, message);
    }
}
