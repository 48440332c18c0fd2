//! Configuration data types for opening and tuning a ZNP connection.
//!
//! These are plain, serde-free data — loading them from a file or CLI flags
//! is an application concern (see `SPEC_FULL.md` section 2a / non-goals);
//! this crate only defines the shape and the documented defaults.

use std::time::Duration;

use crate::errors::ConfigError;

/// How to locate the serial device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DevicePath {
    /// Open exactly this path, e.g. `/dev/ttyUSB0` or `COM5`.
    Exact(String),
    /// Enumerate available serial ports and [`crate::probe::probe`] each one
    /// in turn, using the first that answers.
    Auto,
}

/// Hardware flow control on the serial link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlowControl {
    /// No flow control (the common case for ZNP dev boards).
    #[default]
    None,
    /// RTS/CTS hardware flow control.
    Hardware,
    /// XON/XOFF software flow control.
    Software,
}

/// How to reach the ZNP device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    /// The device path or autodetection request.
    pub path: DevicePath,
    /// Serial baud rate. Defaults to 115200, the standard ZNP rate.
    pub baudrate: u32,
    /// Hardware/software flow control. Defaults to none.
    pub flow_control: FlowControl,
}

impl DeviceConfig {
    /// A device config at the documented defaults, opening `path` exactly.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: DevicePath::Exact(path.into()), baudrate: 115_200, flow_control: FlowControl::None }
    }

    /// A device config that autodetects the port via [`crate::probe::probe`].
    #[must_use]
    pub fn autodetect() -> Self {
        Self { path: DevicePath::Auto, baudrate: 115_200, flow_control: FlowControl::None }
    }
}

/// Tunables for the correlation core and reconnection behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZnpRuntimeConfig {
    /// Radio transmit power in dBm, applied via `SYS.SetTxPower` right
    /// after the liveness probe on every connect and reconnect, before
    /// `Application::startup` runs. Must fall within `[-22, 19]`.
    pub tx_power: Option<i8>,
    /// How long a `request()` call waits for its SRSP before failing with
    /// [`crate::errors::RequestError::Timeout`]. Defaults to 5 seconds.
    pub sreq_timeout: Duration,
    /// Whether an unexpected transport loss triggers automatic reconnection.
    /// Defaults to `true`.
    pub auto_reconnect: bool,
    /// Delay between reconnection attempts. Defaults to 5 seconds.
    pub auto_reconnect_retry_delay: Duration,
}

impl Default for ZnpRuntimeConfig {
    fn default() -> Self {
        Self {
            tx_power: None,
            sreq_timeout: Duration::from_secs(5),
            auto_reconnect: true,
            auto_reconnect_retry_delay: Duration::from_secs(5),
        }
    }
}

impl ZnpRuntimeConfig {
    /// Set `tx_power`, rejecting values outside the documented range.
    pub fn with_tx_power(mut self, tx_power: i8) -> Result<Self, ConfigError> {
        if !(-22..=19).contains(&tx_power) {
            return Err(ConfigError::TxPowerOutOfRange(tx_power));
        }
        self.tx_power = Some(tx_power);
        Ok(self)
    }
}

/// Everything needed to open and run a ZNP connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZnpConfig {
    /// Serial device settings.
    pub device: DeviceConfig,
    /// Correlation core and reconnection tunables.
    pub znp: ZnpRuntimeConfig,
}

impl ZnpConfig {
    /// A config for `device` at the runtime defaults.
    #[must_use]
    pub fn new(device: DeviceConfig) -> Self {
        Self { device, znp: ZnpRuntimeConfig::default() }
    }
}
