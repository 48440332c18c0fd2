//! The command-instance contract shared by every materialized command class.
//!
//! Rather than a dynamic "bag of named fields" (as the Python reference
//! implementation uses), each command class is its own Rust struct with
//! `Option<T>`-per-field plus a `partial` flag (see `SPEC_FULL.md` section 9,
//! "Ordered attribute binding with type validation"). Required-field checks
//! for *complete* construction are enforced by the constructor's signature
//! rather than at runtime: there is no way to build a non-partial instance
//! missing a field, because `new()` demands every field as a parameter.
//! Partial construction and per-field constraint binding still go through
//! `Option`, matching the "don't care" semantics `matches` depends on.

use bytes::Bytes;

use crate::{
    errors::{CommandError, CommandResult},
    frame::GeneralFrame,
    header::CommandHeader,
};

/// Behavior shared by every materialized Req/Rsp/Callback command class.
pub trait CommandInstance: Sized + Clone + PartialEq {
    /// The header identifying this class in the catalog.
    const HEADER: CommandHeader;

    /// Fully qualified name, e.g. `"SysCommands.Ping.Req"`, used in
    /// diagnostics and error messages.
    const NAME: &'static str;

    /// Whether this instance waives the must-provide-all-fields rule.
    fn is_partial(&self) -> bool;

    /// `self` matches `other` iff every field `self` has bound ("don't
    /// care" fields are always absent in partial instances) equals the
    /// corresponding field of `other`.
    fn matches(&self, other: &Self) -> bool;

    /// Serialize field values in schema order into a general frame. Fails
    /// if `self` is partial.
    fn to_frame(&self) -> CommandResult<GeneralFrame>;

    /// Parse `frame`'s payload into a complete instance of this class.
    ///
    /// Fails if the frame's header does not belong to this class, or if
    /// bytes remain after parsing every field and `ignore_unparsed` is
    /// false (in which case a warning is logged and parsing proceeds).
    fn from_frame(frame: &GeneralFrame, ignore_unparsed: bool) -> CommandResult<Self>;
}

/// A request (SREQ or AREQ-with-request) together with the synchronous
/// response class it expects. Only implemented by SREQ `Req` types: an
/// AREQ-with-request has no response and only implements
/// [`CommandInstance`].
pub trait SreqRequest: CommandInstance {
    /// The Rsp class this request's SRSP deserializes into.
    type Rsp: CommandInstance;
}

pub(crate) fn finish_frame(
    command: &'static str,
    header: CommandHeader,
    buf: Vec<u8>,
) -> CommandResult<GeneralFrame> {
    GeneralFrame::new(header, Bytes::from(buf))
        .map_err(|source| CommandError::Primitive { field: "<frame>", command, source })
}

pub(crate) fn check_header(
    command: &'static str,
    expected: CommandHeader,
    frame: &GeneralFrame,
) -> CommandResult<()> {
    if frame.header() != expected {
        return Err(CommandError::HeaderMismatch { command, actual: frame.header(), expected });
    }
    Ok(())
}

pub(crate) fn check_trailing(
    command: &'static str,
    rest: &[u8],
    ignore_unparsed: bool,
) -> CommandResult<()> {
    if rest.is_empty() {
        return Ok(());
    }

    if ignore_unparsed {
        tracing::warn!(command, trailing = rest.len(), "ignoring trailing bytes after parsing");
        return Ok(());
    }

    Err(CommandError::TrailingBytes { command, count: rest.len() })
}

/// Field-wise "don't care" comparison: `Some(x)` only matches `Some(x)`;
/// `None` matches anything.
pub(crate) fn field_matches<T: PartialEq>(constraint: Option<&T>, value: &T) -> bool {
    constraint.is_none_or(|expected| expected == value)
}
