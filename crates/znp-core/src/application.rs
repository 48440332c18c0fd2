//! The `Application` trait: the caller-supplied hook invoked after every
//! successful (re)connection to bring the device into the caller's desired
//! state (commissioning, endpoint registration, and so on).

use std::{future::Future, pin::Pin};

use crate::{correlation::Znp, errors::RequestError};

/// A future boxed so [`Application`] stays object-safe; callers hand
/// `connect()` an `Arc<dyn Application>` rather than a generic parameter,
/// matching how the rest of this crate's public surface is shaped around a
/// single concrete `Znp` handle.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Caller-supplied startup sequence, re-run on every connect and
/// reconnect.
///
/// `startup` issues whatever requests bring the device into the caller's
/// desired operating state — see `SPEC_FULL.md` section 8 scenario 6 for a
/// representative sequence (reset, endpoint registration, BDB
/// commissioning). It receives the live [`Znp`] handle rather than capturing
/// one, since reconnection builds a fresh handle each attempt.
pub trait Application: Send + Sync {
    /// Run the startup sequence against `znp`.
    fn startup<'a>(&'a self, znp: &'a Znp) -> BoxFuture<'a, Result<(), RequestError>>;
}
