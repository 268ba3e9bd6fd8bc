//! Integration tests for the bit packer and stream layer working together

#![allow(clippy::expect_used, clippy::unwrap_used)]

use overlay_wire::core::bit_reader::BitReader;
use overlay_wire::core::bit_writer::BitWriter;
use overlay_wire::core::stream::{ReadStream, Stream, WriteStream};

const FIELDS: [(u32, u32); 7] = [
    (0, 1),
    (1, 1),
    (10, 8),
    (255, 8),
    (1000, 10),
    (50000, 16),
    (9_999_999, 32),
];

fn block() -> [u8; 32] {
    let mut data = [0u8; 32];
    for (i, byte) in data.iter_mut().enumerate() {
        *byte = (i as u8).wrapping_mul(7).wrapping_add(3);
    }
    data
}

#[test]
fn test_mixed_fields_and_block() {
    let mut buffer = [0u8; 256];
    let mut writer = BitWriter::new(&mut buffer);
    for (value, bits) in FIELDS {
        writer.write_bits(value, bits).unwrap();
    }
    writer.write_align().unwrap();
    writer.write_bytes(&block()).unwrap();
    writer.flush().unwrap();

    let written = writer.bytes_written();
    assert_eq!(written, 42);
    assert_eq!(writer.bits_written(), 42 * 8);

    let mut reader = BitReader::new(&buffer[..written]);
    for (value, bits) in FIELDS {
        assert_eq!(reader.read_bits(bits).unwrap(), value, "{bits}-bit field");
    }
    reader.read_align().unwrap();
    let mut out = [0u8; 32];
    reader.read_bytes(&mut out).unwrap();
    assert_eq!(out, block());
    assert_eq!(reader.bits_remaining(), 0);
}

#[test]
fn test_mixed_fields_and_block_through_streams() {
    let mut buffer = [0u8; 256];
    let mut writer = WriteStream::new(&mut buffer);
    for (value, bits) in FIELDS {
        let mut value = value;
        writer.serialize_bits(&mut value, bits);
    }
    writer.serialize_align();
    let mut data = block();
    writer.serialize_bytes(&mut data);
    let written = writer.finish().unwrap();
    assert_eq!(written, 42);

    let mut reader = ReadStream::new(&buffer[..written]);
    for (expected, bits) in FIELDS {
        let mut value = 0;
        reader.serialize_bits(&mut value, bits);
        assert_eq!(value, expected);
    }
    reader.serialize_align();
    let mut out = [0u8; 32];
    reader.serialize_bytes(&mut out);
    reader.result().unwrap();
    assert_eq!(out, block());
    assert_eq!(reader.bytes_processed(), 42);
}

#[test]
fn test_words_are_little_endian() {
    let mut buffer = [0u8; 8];
    let mut writer = BitWriter::new(&mut buffer);
    writer.write_bits(0x04030201, 32).unwrap();
    writer.write_bits(0x0605, 16).unwrap();
    writer.flush().unwrap();
    assert_eq!(writer.data(), &[1, 2, 3, 4, 5, 6]);
}

#[test]
fn test_block_at_every_alignment() {
    for lead_bytes in 0..8usize {
        for len in [1usize, 2, 3, 4, 5, 7, 8, 13] {
            let payload: Vec<u8> = (0..len as u8).map(|b| b ^ 0x5A).collect();
            let mut buffer = [0u8; 32];
            let mut writer = BitWriter::new(&mut buffer);
            for i in 0..lead_bytes {
                writer.write_bits(i as u32, 8).unwrap();
            }
            writer.write_bytes(&payload).unwrap();
            writer.write_bits(0x3, 2).unwrap();
            writer.flush().unwrap();
            let written = writer.bytes_written();

            let mut reader = BitReader::new(&buffer[..written]);
            for i in 0..lead_bytes {
                assert_eq!(reader.read_bits(8).unwrap(), i as u32);
            }
            let mut out = vec![0u8; len];
            reader.read_bytes(&mut out).unwrap();
            assert_eq!(out, payload, "lead {lead_bytes} len {len}");
            assert_eq!(reader.read_bits(2).unwrap(), 0x3);
        }
    }
}
