//! Request/response correlation core and serial transport for the Texas
//! Instruments ZNP host driver.
//!
//! `znp-proto` turns bytes into typed commands and back; this crate turns
//! that codec into a live connection: opening the serial device, running a
//! single task that owns the wire and a [`listener::ListenerRegistry`],
//! serializing SREQs through a mutex, and reconnecting automatically if the
//! transport is lost.
//!
//! # Components
//!
//! - [`Znp`]: the public handle — `connect`, `request`,
//!   `request_callback_rsp`, `notify`, `wait_for_response[s]`,
//!   `callback_for_response[s]`, `close`.
//! - [`Application`]: the caller-supplied startup sequence, re-run on every
//!   connect and reconnect.
//! - [`config`]: `ZnpConfig` and friends — device path, baud rate, SREQ
//!   timeout, reconnection policy.
//! - [`probe`]: standalone liveness check used by autodetection and
//!   available as an external health check.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod application;
mod config;
mod correlation;
mod errors;
mod listener;
mod probe;
mod transport;

pub use application::{Application, BoxFuture};
pub use config::{DeviceConfig, DevicePath, FlowControl, ZnpConfig, ZnpRuntimeConfig};
pub use correlation::Znp;
pub use errors::{ConfigError, ConnectError, RequestError, TransportError};
pub use listener::ListenerId;
pub use probe::{find_device, probe};
