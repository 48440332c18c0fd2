//! Error types for the transport, correlation and configuration layers.

use std::time::Duration;

use thiserror::Error;

/// Failures opening or reading/writing the serial transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Opening the configured serial device failed.
    #[error("failed to open serial device {path}: {source}")]
    Open {
        /// Device path that failed to open.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// No serial device responded to a liveness probe during autodetection.
    #[error("no device responded to autodetection probe")]
    NoDeviceFound,

    /// A read or write on an already-open serial port failed.
    #[error("serial i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures raised to a caller awaiting a request's response.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestError {
    /// Failed to serialize the outbound request or deserialize an inbound
    /// command.
    #[error("command error: {0}")]
    Command(#[from] znp_proto::CommandError),

    /// The device replied with `RPC_ERROR.CommandNotRecognized` instead of
    /// the expected response.
    #[error("device returned CommandNotRecognized for this request")]
    CommandNotRecognized,

    /// A response arrived but did not satisfy the caller's constraints.
    #[error("response did not satisfy the caller's constraints")]
    InvalidResponse,

    /// No matching response arrived within the configured timeout.
    #[error("no response within {0:?}")]
    Timeout(Duration),

    /// The transport was closed or lost while the request was outstanding.
    #[error("request cancelled: transport closed")]
    Cancelled,
}

/// Failures raised from [`crate::Znp::connect`].
#[derive(Debug, Error)]
pub enum ConnectError {
    /// The transport could not be opened.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The post-connect liveness probe failed.
    #[error("liveness probe failed: {0}")]
    Probe(#[from] RequestError),
}

/// Failures constructing a [`crate::config::ZnpRuntimeConfig`].
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// `tx_power` fell outside the documented `[-22, 19]` range.
    #[error("tx_power {0} is outside the valid range [-22, 19]")]
    TxPowerOutOfRange(i8),
}
