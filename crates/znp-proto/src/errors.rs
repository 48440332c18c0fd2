//! Error types for frame, primitive and command (de)serialization.

use thiserror::Error;

/// Errors from the frame codec and primitive type codecs.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// A [`crate::frame::GeneralFrame`] payload exceeded the 250-byte MT limit.
    #[error("payload too large: {size} bytes exceeds max {max}")]
    PayloadTooLarge {
        /// Size of the rejected payload.
        size: usize,
        /// Maximum allowed payload size.
        max: usize,
    },

    /// A primitive codec ran out of bytes while deserializing.
    #[error("buffer too short: expected at least {expected} bytes, got {actual}")]
    BufferTooShort {
        /// Bytes required to complete the read.
        expected: usize,
        /// Bytes actually available.
        actual: usize,
    },

    /// A fixed-width integer value did not fit in the declared width.
    #[error("value {value} does not fit in {width}-bit field")]
    IntegerOverflow {
        /// Offending value.
        value: u64,
        /// Declared bit width.
        width: u8,
    },
}

/// Result alias for the protocol-level (frame/primitive) error type.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors from command construction, serialization and deserialization.
///
/// There is no `UnknownField`/`MissingField` pair here, unlike a
/// dynamic-attribute-bag command API: every command class is its own Rust
/// struct whose constructor demands every field by name and type (see
/// `crate::schema`'s module doc), so supplying an unknown field name or
/// omitting a required one is rejected at compile time, not at runtime.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    /// A supplied field value failed type validation or coercion.
    #[error("invalid value for field {field:?} of {command}: {reason}")]
    InvalidValue {
        /// Offending field name.
        field: &'static str,
        /// Command class name, for diagnostics.
        command: &'static str,
        /// Human-readable reason.
        reason: String,
    },

    /// Attempted to serialize a partial (incompletely bound) command.
    #[error("cannot serialize partial command {command}")]
    Partial {
        /// Command class name, for diagnostics.
        command: &'static str,
    },

    /// Bytes remained after deserializing every schema field.
    #[error("{count} trailing byte(s) after deserializing {command}")]
    TrailingBytes {
        /// Command class name, for diagnostics.
        command: &'static str,
        /// Number of bytes left over.
        count: usize,
    },

    /// A frame's header did not match the command class being deserialized.
    #[error("frame header {actual:?} does not belong to {command} (expected {expected:?})")]
    HeaderMismatch {
        /// Command class name, for diagnostics.
        command: &'static str,
        /// Header the frame actually carried.
        actual: crate::header::CommandHeader,
        /// Header the command class expects.
        expected: crate::header::CommandHeader,
    },

    /// Underlying primitive (de)serialization failure while binding a field.
    #[error("field {field:?} of {command}: {source}")]
    Primitive {
        /// Offending field name.
        field: &'static str,
        /// Command class name, for diagnostics.
        command: &'static str,
        /// Underlying cause.
        #[source]
        source: ProtocolError,
    },
}

/// Result alias for command-level errors.
pub type CommandResult<T> = std::result::Result<T, CommandError>;
