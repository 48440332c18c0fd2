//! MT frame codec, command header and command catalog for the Texas
//! Instruments ZNP serial protocol.
//!
//! This crate is the wire layer: turning bytes off a UART into typed
//! command instances and back. It has no opinion about transport,
//! request/response correlation or reconnection — that lives in
//! `znp-core`.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod commands;
pub mod errors;
pub mod frame;
pub mod header;
pub mod primitives;
pub mod schema;

pub use commands::{AsDecoded, DecodedCommand, matching_set};
pub use errors::{CommandError, CommandResult, ProtocolError, Result};
pub use frame::{FrameCodec, GeneralFrame, MAX_PAYLOAD_LEN};
pub use header::{CommandHeader, CommandType, Subsystem};
pub use schema::{CommandInstance, SreqRequest};
