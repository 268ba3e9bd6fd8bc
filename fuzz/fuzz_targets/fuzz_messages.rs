#![no_main]

use libfuzzer_sys::fuzz_target;
use overlay_wire::protocol::{Message, RelayUpdateMessage, SessionData, SessionUpdateMessage};

fn encode<M: Message>(message: &mut M) -> Vec<u8> {
    let mut buffer = vec![0u8; M::MAX_BYTES];
    let len = message.write(&mut buffer).expect("decoded message re-encodes");
    buffer.truncate(len);
    buffer
}

// Anything that decodes must re-encode to a stable byte sequence
fn roundtrip<M: Message>(data: &[u8]) {
    if let Ok(mut message) = M::read(data) {
        let first = encode(&mut message);
        let mut again = M::read(&first).expect("re-encoded message decodes");
        assert_eq!(encode(&mut again), first);
    }
}

fuzz_target!(|data: &[u8]| {
    roundtrip::<SessionData>(data);
    roundtrip::<SessionUpdateMessage>(data);
    roundtrip::<RelayUpdateMessage>(data);
});
