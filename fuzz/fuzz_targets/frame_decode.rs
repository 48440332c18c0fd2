//! Fuzz target for `FrameCodec::feed`.
//!
//! Feeds arbitrary byte sequences through the MT frame decoder to find:
//! - panics in the framing state machine
//! - buffer over-reads while reassembling a frame
//! - length/FCS handling that diverges from silent-discard-and-resync
//!
//! The decoder should never panic. Malformed frames are dropped, not
//! surfaced as errors.

#![no_main]

use libfuzzer_sys::fuzz_target;
use znp_proto::FrameCodec;

fuzz_target!(|data: &[u8]| {
    let mut codec = FrameCodec::new();
    let _ = codec.feed(data);
});
