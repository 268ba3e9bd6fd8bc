#![no_main]

use libfuzzer_sys::fuzz_target;
use overlay_wire::core::stream::{ReadStream, Stream};

fuzz_target!(|data: &[u8]| {
    // Every field kind against arbitrary input; errors are expected, panics are not
    let mut stream = ReadStream::new(data);
    let mut int = 0;
    let mut bits = 0;
    let mut flag = false;
    let mut text = String::new();
    let mut addr = None;
    let mut relative = 0;
    let mut sequence = 0u16;
    let mut ack = 0u16;
    let mut block = [0u8; 7];
    let mut wide = 0u64;

    stream.serialize_integer(&mut int, -5000, 5000);
    stream.serialize_bits(&mut bits, 11);
    stream.serialize_bool(&mut flag);
    stream.serialize_string(&mut text, 300);
    stream.serialize_address(&mut addr);
    stream.serialize_int_relative(-1, &mut relative);
    stream.serialize_sequence_relative(65000, &mut sequence);
    stream.serialize_ack_relative(10, &mut ack);
    stream.serialize_bytes(&mut block);
    stream.serialize_uint64(&mut wide);
    stream.serialize_align();

    assert!(stream.bits_processed() <= data.len() * 8);
});
