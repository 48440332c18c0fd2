//! `APP_CONFIG` subsystem: Base Device Behavior commissioning control.

use crate::{
    errors::{CommandError, CommandResult},
    frame::GeneralFrame,
    header::{CommandHeader, CommandType, Subsystem},
    primitives::{BdbCommissioningStatus, Primitive, Status},
    schema::{CommandInstance, SreqRequest, check_header, check_trailing, field_matches, finish_frame},
};

const fn header(command_type: CommandType, id: u8) -> CommandHeader {
    CommandHeader::new(command_type, Subsystem::AppConfig, id)
}

/// Bitmap of BDB commissioning modes requested by [`BdbStartCommissioning`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BdbCommissioningMode(pub u8);

impl Primitive for BdbCommissioningMode {
    fn serialize(&self, buf: &mut Vec<u8>) {
        self.0.serialize(buf);
    }

    fn deserialize(bytes: &[u8]) -> Result<(Self, &[u8]), crate::errors::ProtocolError> {
        let (raw, rest) = u8::deserialize(bytes)?;
        Ok((Self(raw), rest))
    }
}

/// `APP_CONFIG.BDBStartCommissioningRequest`: kick off a BDB commissioning
/// procedure (network steering, formation, finding & binding, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BdbStartCommissioning {
    /// Requested commissioning mode bitmap.
    pub commissioning_mode: BdbCommissioningMode,
}

impl CommandInstance for BdbStartCommissioning {
    const HEADER: CommandHeader = header(CommandType::Sreq, 0x05);
    const NAME: &'static str = "AppConfigCommands.BDBStartCommissioning.Req";

    fn is_partial(&self) -> bool {
        false
    }

    fn matches(&self, other: &Self) -> bool {
        self == other
    }

    fn to_frame(&self) -> CommandResult<GeneralFrame> {
        let mut buf = Vec::new();
        self.commissioning_mode.serialize(&mut buf);
        finish_frame(Self::NAME, Self::HEADER, buf)
    }

    fn from_frame(frame: &GeneralFrame, ignore_unparsed: bool) -> CommandResult<Self> {
        check_header(Self::NAME, Self::HEADER, frame)?;
        let (commissioning_mode, rest) = BdbCommissioningMode::deserialize(frame.payload()).map_err(|source| {
            CommandError::Primitive { field: "BdbCommissioningMode", command: Self::NAME, source }
        })?;
        check_trailing(Self::NAME, rest, ignore_unparsed)?;
        Ok(Self { commissioning_mode })
    }
}

impl SreqRequest for BdbStartCommissioning {
    type Rsp = BdbStartCommissioningRsp;
}

/// Immediate SRSP acknowledging [`BdbStartCommissioning`] was accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BdbStartCommissioningRsp {
    partial: bool,
    /// Whether the request was accepted.
    pub status: Option<Status>,
}

impl BdbStartCommissioningRsp {
    /// A complete instance.
    #[must_use]
    pub fn new(status: Status) -> Self {
        Self { partial: false, status: Some(status) }
    }

    /// A partial instance accepting any status.
    #[must_use]
    pub fn partial() -> Self {
        Self { partial: true, status: None }
    }
}

impl CommandInstance for BdbStartCommissioningRsp {
    const HEADER: CommandHeader = header(CommandType::Srsp, 0x05);
    const NAME: &'static str = "AppConfigCommands.BDBStartCommissioning.Rsp";

    fn is_partial(&self) -> bool {
        self.partial
    }

    fn matches(&self, other: &Self) -> bool {
        field_matches(self.status.as_ref(), &other.status.unwrap_or(Status::Success))
    }

    #[expect(clippy::expect_used, reason = "partial check above guarantees status is Some")]
    fn to_frame(&self) -> CommandResult<GeneralFrame> {
        if self.partial {
            return Err(CommandError::Partial { command: Self::NAME });
        }
        let mut buf = Vec::new();
        self.status.expect("complete instance").serialize(&mut buf);
        finish_frame(Self::NAME, Self::HEADER, buf)
    }

    fn from_frame(frame: &GeneralFrame, ignore_unparsed: bool) -> CommandResult<Self> {
        check_header(Self::NAME, Self::HEADER, frame)?;
        let (status, rest) = Status::deserialize(frame.payload())
            .map_err(|source| CommandError::Primitive { field: "Status", command: Self::NAME, source })?;
        check_trailing(Self::NAME, rest, ignore_unparsed)?;
        Ok(Self::new(status))
    }
}

/// `APP_CONFIG.BDBCommissioningNotification`: asynchronous notification of a
/// BDB commissioning procedure's outcome. `NoNetwork` is an expected, not
/// exceptional, outcome when no compatible network is reachable yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BdbCommissioningNotification {
    partial: bool,
    /// Commissioning outcome.
    pub status: Option<BdbCommissioningStatus>,
    /// Commissioning mode that completed or failed.
    pub commissioning_mode: Option<BdbCommissioningMode>,
}

impl BdbCommissioningNotification {
    /// A complete instance.
    #[must_use]
    pub fn new(status: BdbCommissioningStatus, commissioning_mode: BdbCommissioningMode) -> Self {
        Self { partial: false, status: Some(status), commissioning_mode: Some(commissioning_mode) }
    }

    /// A partial instance accepting any notification.
    #[must_use]
    pub fn partial() -> Self {
        Self { partial: true, status: None, commissioning_mode: None }
    }

    /// A partial instance constrained to a specific status.
    #[must_use]
    pub fn with_status(mut self, status: BdbCommissioningStatus) -> Self {
        self.status = Some(status);
        self
    }
}

impl CommandInstance for BdbCommissioningNotification {
    const HEADER: CommandHeader = header(CommandType::Areq, 0x80);
    const NAME: &'static str = "AppConfigCommands.BDBCommissioningNotification.Callback";

    fn is_partial(&self) -> bool {
        self.partial
    }

    fn matches(&self, other: &Self) -> bool {
        field_matches(
            self.status.as_ref(),
            &other.status.unwrap_or(BdbCommissioningStatus::Success),
        ) && field_matches(
            self.commissioning_mode.as_ref(),
            &other.commissioning_mode.unwrap_or(BdbCommissioningMode(0)),
        )
    }

    #[expect(clippy::expect_used, reason = "partial check above guarantees both fields are Some")]
    fn to_frame(&self) -> CommandResult<GeneralFrame> {
        if self.partial {
            return Err(CommandError::Partial { command: Self::NAME });
        }
        let mut buf = Vec::new();
        self.status.expect("complete instance").serialize(&mut buf);
        self.commissioning_mode.expect("complete instance").serialize(&mut buf);
        finish_frame(Self::NAME, Self::HEADER, buf)
    }

    fn from_frame(frame: &GeneralFrame, ignore_unparsed: bool) -> CommandResult<Self> {
        check_header(Self::NAME, Self::HEADER, frame)?;
        let bytes = frame.payload();
        let (status, rest) = BdbCommissioningStatus::deserialize(bytes)
            .map_err(|source| CommandError::Primitive { field: "Status", command: Self::NAME, source })?;
        let (commissioning_mode, rest) = BdbCommissioningMode::deserialize(rest).map_err(|source| {
            CommandError::Primitive { field: "BdbCommissioningMode", command: Self::NAME, source }
        })?;
        check_trailing(Self::NAME, rest, ignore_unparsed)?;
        Ok(Self::new(status, commissioning_mode))
    }
}
