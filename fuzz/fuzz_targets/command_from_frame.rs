//! Fuzz target for `DecodedCommand::from_frame`.
//!
//! Drives arbitrary byte sequences through the frame decoder and, for
//! anything that decodes into a general frame, through catalog dispatch and
//! command deserialization. Should never panic: unknown headers resolve to
//! `None`, and malformed payloads return a `CommandError`.

#![no_main]

use libfuzzer_sys::fuzz_target;
use znp_proto::{DecodedCommand, FrameCodec};

fuzz_target!(|data: &[u8]| {
    let mut codec = FrameCodec::new();
    for frame in codec.feed(data) {
        let _ = DecodedCommand::from_frame(&frame, true);
        let _ = DecodedCommand::from_frame(&frame, false);
    }
});
