#![no_main]

use libfuzzer_sys::fuzz_target;
use specrun::remote::protocol::{ClientMessage, ServerMessage, decode_frame};

fuzz_target!(|data: &[u8]| {
    let _ = decode_frame::<ClientMessage>(data);
    let _ = decode_frame::<ServerMessage>(data);
});
