//! Property-based tests for MT frame/header encoding and decoding.
//!
//! These verify round-trip identity for arbitrary headers and payloads, not
//! just the worked examples covered by unit tests.

use bytes::Bytes;
use proptest::prelude::*;
use znp_proto::{CommandHeader, CommandType, FrameCodec, GeneralFrame, MAX_PAYLOAD_LEN, Subsystem};

fn arbitrary_command_type() -> impl Strategy<Value = CommandType> {
    prop_oneof![
        Just(CommandType::Sreq),
        Just(CommandType::Areq),
        Just(CommandType::Srsp),
        (0u8..8).prop_filter_map("reserved type bits", |bits| {
            (bits != 1 && bits != 2 && bits != 3).then(|| CommandType::Unknown(bits))
        }),
    ]
}

fn arbitrary_subsystem() -> impl Strategy<Value = Subsystem> {
    prop_oneof![
        Just(Subsystem::RpcError),
        Just(Subsystem::Sys),
        Just(Subsystem::Mac),
        Just(Subsystem::Nwk),
        Just(Subsystem::Af),
        Just(Subsystem::Zdo),
        Just(Subsystem::Sapi),
        Just(Subsystem::Util),
        Just(Subsystem::App),
        Just(Subsystem::AppConfig),
        Just(Subsystem::Zgp),
        any::<u8>().prop_map(|bits| Subsystem::Unknown(bits & 0x1f)),
    ]
}

fn arbitrary_header() -> impl Strategy<Value = CommandHeader> {
    (arbitrary_command_type(), arbitrary_subsystem(), any::<u8>())
        .prop_map(|(command_type, subsystem, id)| CommandHeader::new(command_type, subsystem, id))
}

fn arbitrary_frame() -> impl Strategy<Value = GeneralFrame> {
    (arbitrary_header(), prop::collection::vec(any::<u8>(), 0..=MAX_PAYLOAD_LEN))
        .prop_map(|(header, payload)| GeneralFrame::new(header, Bytes::from(payload)).expect("payload within bound"))
}

proptest! {
    #[test]
    fn header_round_trips_through_wire_bytes(header in arbitrary_header()) {
        prop_assert_eq!(CommandHeader::from_le_bytes(header.to_le_bytes()), header);
    }

    #[test]
    fn frame_round_trips_through_codec(frame in arbitrary_frame()) {
        let mut buf = Vec::new();
        frame.encode(&mut buf);

        let mut codec = FrameCodec::new();
        let decoded = codec.feed(&buf);

        prop_assert_eq!(decoded, vec![frame]);
    }

    #[test]
    fn encoded_size_matches_payload_length(frame in arbitrary_frame()) {
        let mut buf = Vec::new();
        frame.encode(&mut buf);

        // SOF + length + 2-byte header + payload + FCS.
        prop_assert_eq!(buf.len(), 5 + frame.payload().len());
    }

    #[test]
    fn garbage_prefix_does_not_affect_decoded_frame(
        frame in arbitrary_frame(),
        garbage in prop::collection::vec(any::<u8>().prop_filter("not SOF", |b| *b != 0xFE), 0..16),
    ) {
        let mut buf = garbage;
        frame.encode(&mut buf);

        let mut codec = FrameCodec::new();
        prop_assert_eq!(codec.feed(&buf), vec![frame]);
    }

    #[test]
    fn fed_byte_by_byte_matches_fed_in_one_shot(frame in arbitrary_frame()) {
        let mut buf = Vec::new();
        frame.encode(&mut buf);

        let mut codec = FrameCodec::new();
        let mut decoded = Vec::new();
        for &byte in &buf {
            decoded.extend(codec.feed(&[byte]));
        }

        prop_assert_eq!(decoded, vec![frame]);
    }
}
