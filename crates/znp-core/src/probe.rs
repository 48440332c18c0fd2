//! Standalone serial liveness probe.
//!
//! Opens a candidate device, sends a single `SYS.Ping` SREQ, and checks for
//! a valid response within a short timeout, without spinning up the full
//! correlation core. Used by device autodetection (try every available port
//! until one answers) and available as a lightweight external health check.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use znp_proto::{CommandInstance, FrameCodec, commands::sys};

use crate::{config::DeviceConfig, errors::TransportError, transport};

const PROBE_TIMEOUT: Duration = Duration::from_millis(500);

/// Open `path` at `device`'s baud/flow settings, send one `SYS.Ping` and
/// report whether a valid `SYS.Ping` response arrived within
/// [`PROBE_TIMEOUT`].
pub async fn probe(path: &str, device: &DeviceConfig) -> Result<bool, TransportError> {
    let mut port = transport::open(path, device)?;

    let Ok(frame) = sys::PingReq.to_frame() else {
        return Ok(false);
    };
    let mut buf = Vec::new();
    frame.encode(&mut buf);
    port.write_all(&buf).await.map_err(TransportError::Io)?;

    let mut codec = FrameCodec::new();
    let mut read_buf = [0u8; 64];

    let outcome = tokio::time::timeout(PROBE_TIMEOUT, async {
        loop {
            let n = port.read(&mut read_buf).await.map_err(TransportError::Io)?;
            if n == 0 {
                return Ok(false);
            }
            for frame in codec.feed(&read_buf[..n]) {
                if frame.header() == sys::PingRsp::HEADER {
                    return Ok(true);
                }
            }
        }
    })
    .await;

    match outcome {
        Ok(result) => result,
        Err(_elapsed) => Ok(false),
    }
}

/// Try every currently available serial port at `device`'s baud/flow
/// settings, returning the first whose device answers a [`probe`] call.
pub async fn find_device(device: &DeviceConfig) -> Result<String, TransportError> {
    for path in transport::list_candidate_ports()? {
        if let Ok(true) = probe(&path, device).await {
            return Ok(path);
        }
    }
    Err(TransportError::NoDeviceFound)
}
