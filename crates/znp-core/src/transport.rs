//! Opening the serial link to a ZNP device.
//!
//! The correlation core (`correlation.rs`) is generic over
//! `AsyncRead + AsyncWrite + Unpin + Send`, so production code runs it over
//! a [`tokio_serial::SerialStream`] while tests run it over a
//! [`tokio::io::DuplexStream`] fake device. This module is only responsible
//! for turning a [`DeviceConfig`] into the former.

use tokio_serial::{DataBits, Parity, SerialPortBuilderExt, SerialStream, StopBits};

use crate::{
    config::{DeviceConfig, FlowControl},
    errors::TransportError,
};

impl From<FlowControl> for tokio_serial::FlowControl {
    fn from(value: FlowControl) -> Self {
        match value {
            FlowControl::None => Self::None,
            FlowControl::Hardware => Self::Hardware,
            FlowControl::Software => Self::Software,
        }
    }
}

/// Open `path` at `device`'s baud rate and flow control settings. Used both
/// for an exact [`crate::config::DevicePath::Exact`] and, candidate by
/// candidate, for autodetection.
pub fn open(path: &str, device: &DeviceConfig) -> Result<SerialStream, TransportError> {
    tokio_serial::new(path, device.baudrate)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(device.flow_control.into())
        .open_native_async()
        .map_err(|source| TransportError::Open { path: path.to_owned(), source: source.into() })
}

/// Every serial port the OS currently reports, used by autodetection.
pub fn list_candidate_ports() -> Result<Vec<String>, TransportError> {
    Ok(tokio_serial::available_ports()
        .map_err(std::io::Error::from)?
        .into_iter()
        .map(|info| info.port_name)
        .collect())
}
