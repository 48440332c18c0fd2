//! MT framing: `GeneralFrame` (header + payload) and the `FrameCodec` that
//! turns a raw byte stream into a sequence of general frames.
//!
//! ```text
//! offset  size  field
//!  0       1    SOF = 0xFE
//!  1       1    length (0..250)          -- payload length only
//!  2       2    header (little-endian u16)
//!  4     len    payload
//!  4+len   1    FCS = XOR of bytes [1 .. 3+len]
//! ```

use bytes::Bytes;

use crate::{errors::ProtocolError, header::CommandHeader};

/// Maximum payload length carried by a single MT frame.
pub const MAX_PAYLOAD_LEN: usize = 250;

const SOF: u8 = 0xFE;

/// A decoded `(header, payload)` pair, independent of wire framing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneralFrame {
    header: CommandHeader,
    payload: Bytes,
}

impl GeneralFrame {
    /// Build a general frame, rejecting payloads over [`MAX_PAYLOAD_LEN`].
    pub fn new(header: CommandHeader, payload: Bytes) -> Result<Self, ProtocolError> {
        if payload.len() > MAX_PAYLOAD_LEN {
            return Err(ProtocolError::PayloadTooLarge {
                size: payload.len(),
                max: MAX_PAYLOAD_LEN,
            });
        }

        Ok(Self { header, payload })
    }

    /// The command header.
    #[must_use]
    pub fn header(&self) -> CommandHeader {
        self.header
    }

    /// The frame payload.
    #[must_use]
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Encode this frame onto the wire, including SOF and FCS.
    pub fn encode(&self, buf: &mut Vec<u8>) {
        buf.reserve(5 + self.payload.len());
        buf.push(SOF);

        #[expect(clippy::cast_possible_truncation, reason = "payload bounded by MAX_PAYLOAD_LEN")]
        let len = self.payload.len() as u8;
        buf.push(len);

        let checksum_start = buf.len();
        buf.extend_from_slice(&self.header.to_le_bytes());
        buf.extend_from_slice(&self.payload);

        let fcs = xor_checksum(len, &buf[checksum_start..]);
        buf.push(fcs);
    }
}

fn xor_checksum(length: u8, header_and_payload: &[u8]) -> u8 {
    header_and_payload.iter().fold(length, |acc, byte| acc ^ byte)
}

/// Decoder states for the byte-stream framing state machine, per
/// `SPEC_FULL.md` section 4.1.
enum DecodeState {
    WaitSof,
    Len,
    Data { expected_len: u8, buf: Vec<u8> },
    Fcs { expected_len: u8, buf: Vec<u8> },
}

/// Incremental MT frame decoder fed bytes as they arrive from the UART.
///
/// Malformed frames (bad length, FCS mismatch) are silently discarded: byte
/// ingestion itself never fails.
pub struct FrameCodec {
    state: DecodeState,
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameCodec {
    /// A fresh decoder, waiting for the next SOF byte.
    #[must_use]
    pub fn new() -> Self {
        Self { state: DecodeState::WaitSof }
    }

    /// Feed newly received bytes, returning every frame completed so far.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<GeneralFrame> {
        let mut frames = Vec::new();

        for &byte in bytes {
            self.feed_one(byte, &mut frames);
        }

        frames
    }

    fn feed_one(&mut self, byte: u8, frames: &mut Vec<GeneralFrame>) {
        match &mut self.state {
            DecodeState::WaitSof => {
                if byte == SOF {
                    self.state = DecodeState::Len;
                }
            },
            DecodeState::Len => {
                if byte > MAX_PAYLOAD_LEN as u8 {
                    tracing::debug!(length = byte, "oversize frame length, resynchronizing");
                    self.state = DecodeState::WaitSof;
                } else {
                    self.state =
                        DecodeState::Data { expected_len: byte, buf: Vec::with_capacity(2 + byte as usize) };
                }
            },
            DecodeState::Data { expected_len, buf } => {
                buf.push(byte);

                if buf.len() == 2 + *expected_len as usize {
                    let expected_len = *expected_len;
                    let buf = std::mem::take(buf);
                    self.state = DecodeState::Fcs { expected_len, buf };
                }
            },
            DecodeState::Fcs { expected_len, buf } => {
                let fcs = xor_checksum(*expected_len, buf);

                if fcs == byte {
                    let header = CommandHeader::from_le_bytes([buf[0], buf[1]]);
                    let payload = Bytes::copy_from_slice(&buf[2..]);

                    match GeneralFrame::new(header, payload) {
                        Ok(frame) => {
                            tracing::trace!(%header, "decoded frame");
                            frames.push(frame);
                        },
                        Err(error) => {
                            tracing::debug!(%error, "decoded frame rejected");
                        },
                    }
                } else {
                    tracing::debug!(expected = fcs, actual = byte, "FCS mismatch, dropping frame");
                }

                self.state = DecodeState::WaitSof;
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::{CommandType, Subsystem};

    fn ping_req_header() -> CommandHeader {
        CommandHeader::new(CommandType::Sreq, Subsystem::Sys, 0x01)
    }

    #[test]
    fn reject_oversized_payload() {
        let payload = Bytes::from(vec![0u8; MAX_PAYLOAD_LEN + 1]);
        let err = GeneralFrame::new(ping_req_header(), payload).unwrap_err();
        assert_eq!(err, ProtocolError::PayloadTooLarge { size: 251, max: 250 });
    }

    #[test]
    fn command_not_recognized_wire_bytes() {
        // scenario 1: CommandNotRecognized.Rsp(ErrorCode=0x01, RequestHeader=0xABCD)
        // -> `FE 03 60 00 01 CD AB` before FCS.
        let header = CommandHeader::new(CommandType::Srsp, Subsystem::RpcError, 0x00);
        let payload = Bytes::from(vec![0x01, 0xCD, 0xAB]);
        let frame = GeneralFrame::new(header, payload).unwrap();

        let mut buf = Vec::new();
        frame.encode(&mut buf);

        assert_eq!(&buf[..7], &[0xFE, 0x03, 0x60, 0x00, 0x01, 0xCD, 0xAB]);
    }

    #[test]
    fn encode_decode_round_trip() {
        let header = CommandHeader::new(CommandType::Areq, Subsystem::Zdo, 0x42);
        let payload = Bytes::from(vec![1, 2, 3, 4, 5]);
        let frame = GeneralFrame::new(header, payload).unwrap();

        let mut buf = Vec::new();
        frame.encode(&mut buf);

        let mut codec = FrameCodec::new();
        let decoded = codec.feed(&buf);

        assert_eq!(decoded, vec![frame]);
    }

    #[test]
    fn empty_payload_round_trip() {
        let frame = GeneralFrame::new(ping_req_header(), Bytes::new()).unwrap();

        let mut buf = Vec::new();
        frame.encode(&mut buf);
        assert_eq!(buf.len(), 5);

        let mut codec = FrameCodec::new();
        assert_eq!(codec.feed(&buf), vec![frame]);
    }

    #[test]
    fn fcs_mismatch_is_dropped_and_resyncs() {
        let frame = GeneralFrame::new(ping_req_header(), Bytes::from(vec![9, 9])).unwrap();
        let mut buf = Vec::new();
        frame.encode(&mut buf);

        let last = buf.len() - 1;
        buf[last] ^= 0xFF; // corrupt the FCS

        let mut codec = FrameCodec::new();
        assert!(codec.feed(&buf).is_empty());
    }

    #[test]
    fn garbage_before_sof_is_skipped() {
        let frame = GeneralFrame::new(ping_req_header(), Bytes::new()).unwrap();
        let mut buf = vec![0x00, 0x11, 0x22];
        frame.encode(&mut buf);

        let mut codec = FrameCodec::new();
        assert_eq!(codec.feed(&buf), vec![frame]);
    }

    #[test]
    fn two_frames_in_one_feed() {
        let frame_a = GeneralFrame::new(ping_req_header(), Bytes::new()).unwrap();
        let frame_b =
            GeneralFrame::new(CommandHeader::new(CommandType::Srsp, Subsystem::Sys, 0x01), Bytes::from(vec![1]))
                .unwrap();

        let mut buf = Vec::new();
        frame_a.encode(&mut buf);
        frame_b.encode(&mut buf);

        let mut codec = FrameCodec::new();
        assert_eq!(codec.feed(&buf), vec![frame_a, frame_b]);
    }

    #[test]
    fn oversize_length_byte_resyncs_to_next_sof() {
        let mut buf = vec![SOF, 251]; // invalid length byte
        let frame = GeneralFrame::new(ping_req_header(), Bytes::new()).unwrap();
        frame.encode(&mut buf);

        let mut codec = FrameCodec::new();
        assert_eq!(codec.feed(&buf), vec![frame]);
    }
}
