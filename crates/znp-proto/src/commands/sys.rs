//! `SYS` subsystem: device reset, liveness ping, non-volatile storage.

use crate::{
    errors::{CommandError, CommandResult},
    frame::GeneralFrame,
    header::{CommandHeader, CommandType, Subsystem},
    primitives::{Capabilities, Primitive, ShortBytes, Status},
    schema::{CommandInstance, SreqRequest, check_header, check_trailing, field_matches, finish_frame},
};

const fn header(command_type: CommandType, id: u8) -> CommandHeader {
    CommandHeader::new(command_type, Subsystem::Sys, id)
}

/// `SYS.ResetReq`: request a hard or soft reset of the ZNP. Fire-and-forget;
/// the device responds asynchronously with [`ResetInd`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResetReq {
    /// `0` for a hardware reset, `1` for a soft reset.
    pub reset_type: u8,
}

impl CommandInstance for ResetReq {
    const HEADER: CommandHeader = header(CommandType::Areq, 0x00);
    const NAME: &'static str = "SysCommands.ResetReq";

    fn is_partial(&self) -> bool {
        false
    }

    fn matches(&self, other: &Self) -> bool {
        self == other
    }

    fn to_frame(&self) -> CommandResult<GeneralFrame> {
        let mut buf = Vec::new();
        self.reset_type.serialize(&mut buf);
        finish_frame(Self::NAME, Self::HEADER, buf)
    }

    fn from_frame(frame: &GeneralFrame, ignore_unparsed: bool) -> CommandResult<Self> {
        check_header(Self::NAME, Self::HEADER, frame)?;
        let (reset_type, rest) = u8::deserialize(frame.payload())
            .map_err(|source| CommandError::Primitive { field: "Type", command: Self::NAME, source })?;
        check_trailing(Self::NAME, rest, ignore_unparsed)?;
        Ok(Self { reset_type })
    }
}

/// `SYS.ResetInd`: asynchronous notification sent after the ZNP finishes
/// resetting, carrying basic firmware identification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ResetInd {
    partial: bool,
    /// Reset cause.
    pub reason: Option<u8>,
    /// Transport protocol revision.
    pub transport_rev: Option<u8>,
    /// Product identifier.
    pub product_id: Option<u8>,
    /// Major firmware release.
    pub major_rel: Option<u8>,
    /// Minor firmware release.
    pub minor_rel: Option<u8>,
    /// Hardware revision.
    pub hw_rev: Option<u8>,
}

impl ResetInd {
    /// A complete instance.
    #[must_use]
    pub fn new(
        reason: u8,
        transport_rev: u8,
        product_id: u8,
        major_rel: u8,
        minor_rel: u8,
        hw_rev: u8,
    ) -> Self {
        Self {
            partial: false,
            reason: Some(reason),
            transport_rev: Some(transport_rev),
            product_id: Some(product_id),
            major_rel: Some(major_rel),
            minor_rel: Some(minor_rel),
            hw_rev: Some(hw_rev),
        }
    }

    /// A partial instance accepting any reset notification.
    #[must_use]
    pub fn partial() -> Self {
        Self { partial: true, ..Self::default() }
    }
}

impl CommandInstance for ResetInd {
    const HEADER: CommandHeader = header(CommandType::Areq, 0x80);
    const NAME: &'static str = "SysCommands.ResetInd";

    fn is_partial(&self) -> bool {
        self.partial
    }

    fn matches(&self, other: &Self) -> bool {
        field_matches(self.reason.as_ref(), &other.reason.unwrap_or_default())
            && field_matches(self.transport_rev.as_ref(), &other.transport_rev.unwrap_or_default())
            && field_matches(self.product_id.as_ref(), &other.product_id.unwrap_or_default())
            && field_matches(self.major_rel.as_ref(), &other.major_rel.unwrap_or_default())
            && field_matches(self.minor_rel.as_ref(), &other.minor_rel.unwrap_or_default())
            && field_matches(self.hw_rev.as_ref(), &other.hw_rev.unwrap_or_default())
    }

    #[expect(clippy::expect_used, reason = "partial check above guarantees every field is Some")]
    fn to_frame(&self) -> CommandResult<GeneralFrame> {
        if self.partial {
            return Err(CommandError::Partial { command: Self::NAME });
        }
        let mut buf = Vec::new();
        for field in [self.reason, self.transport_rev, self.product_id, self.major_rel, self.minor_rel, self.hw_rev]
        {
            field.expect("complete instance").serialize(&mut buf);
        }
        finish_frame(Self::NAME, Self::HEADER, buf)
    }

    fn from_frame(frame: &GeneralFrame, ignore_unparsed: bool) -> CommandResult<Self> {
        check_header(Self::NAME, Self::HEADER, frame)?;
        let bytes = frame.payload();
        let (reason, rest) = u8::deserialize(bytes)
            .map_err(|source| CommandError::Primitive { field: "Reason", command: Self::NAME, source })?;
        let (transport_rev, rest) = u8::deserialize(rest)
            .map_err(|source| CommandError::Primitive { field: "TransportRev", command: Self::NAME, source })?;
        let (product_id, rest) = u8::deserialize(rest)
            .map_err(|source| CommandError::Primitive { field: "ProductId", command: Self::NAME, source })?;
        let (major_rel, rest) = u8::deserialize(rest)
            .map_err(|source| CommandError::Primitive { field: "MajorRel", command: Self::NAME, source })?;
        let (minor_rel, rest) = u8::deserialize(rest)
            .map_err(|source| CommandError::Primitive { field: "MinorRel", command: Self::NAME, source })?;
        let (hw_rev, rest) = u8::deserialize(rest)
            .map_err(|source| CommandError::Primitive { field: "HwRev", command: Self::NAME, source })?;
        check_trailing(Self::NAME, rest, ignore_unparsed)?;
        Ok(Self::new(reason, transport_rev, product_id, major_rel, minor_rel, hw_rev))
    }
}

/// `SYS.Ping`: liveness probe used by `connect()` and device autodetection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PingReq;

impl CommandInstance for PingReq {
    const HEADER: CommandHeader = header(CommandType::Sreq, 0x01);
    const NAME: &'static str = "SysCommands.Ping.Req";

    fn is_partial(&self) -> bool {
        false
    }

    fn matches(&self, _other: &Self) -> bool {
        true
    }

    fn to_frame(&self) -> CommandResult<GeneralFrame> {
        finish_frame(Self::NAME, Self::HEADER, Vec::new())
    }

    fn from_frame(frame: &GeneralFrame, ignore_unparsed: bool) -> CommandResult<Self> {
        check_header(Self::NAME, Self::HEADER, frame)?;
        check_trailing(Self::NAME, frame.payload(), ignore_unparsed)?;
        Ok(Self)
    }
}

impl SreqRequest for PingReq {
    type Rsp = PingRsp;
}

/// `SYS.Ping` response, carrying the device's capability bitmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PingRsp {
    partial: bool,
    /// Opaque capabilities bitmap; see `Capabilities` for why unknown bits
    /// are never validated.
    pub capabilities: Option<Capabilities>,
}

impl PingRsp {
    /// A complete instance.
    #[must_use]
    pub fn new(capabilities: Capabilities) -> Self {
        Self { partial: false, capabilities: Some(capabilities) }
    }

    /// A partial instance accepting any capabilities value.
    #[must_use]
    pub fn partial() -> Self {
        Self { partial: true, capabilities: None }
    }

    /// A partial instance constrained to a specific capabilities value.
    #[must_use]
    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = Some(capabilities);
        self
    }
}

impl CommandInstance for PingRsp {
    const HEADER: CommandHeader = header(CommandType::Srsp, 0x01);
    const NAME: &'static str = "SysCommands.Ping.Rsp";

    fn is_partial(&self) -> bool {
        self.partial
    }

    fn matches(&self, other: &Self) -> bool {
        field_matches(self.capabilities.as_ref(), &other.capabilities.unwrap_or(Capabilities(0)))
    }

    #[expect(clippy::expect_used, reason = "partial check above guarantees capabilities is Some")]
    fn to_frame(&self) -> CommandResult<GeneralFrame> {
        if self.partial {
            return Err(CommandError::Partial { command: Self::NAME });
        }
        let mut buf = Vec::new();
        self.capabilities.expect("complete instance").serialize(&mut buf);
        finish_frame(Self::NAME, Self::HEADER, buf)
    }

    fn from_frame(frame: &GeneralFrame, ignore_unparsed: bool) -> CommandResult<Self> {
        check_header(Self::NAME, Self::HEADER, frame)?;
        let (capabilities, rest) = Capabilities::deserialize(frame.payload())
            .map_err(|source| CommandError::Primitive { field: "Capabilities", command: Self::NAME, source })?;
        check_trailing(Self::NAME, rest, ignore_unparsed)?;
        Ok(Self::new(capabilities))
    }
}

/// `SYS.NVWrite`: write a value into ZNP non-volatile storage at a given
/// system/item/sub id and byte offset. The NVRAM convenience helper that
/// wraps this (overflow-checking against the NVID table) is out of scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NvWriteReq {
    /// NV system identifier.
    pub sys_id: u8,
    /// NV item identifier.
    pub item_id: u16,
    /// NV sub-item identifier.
    pub sub_id: u16,
    /// Byte offset within the item.
    pub offset: u16,
    /// Value to write.
    pub value: ShortBytes,
}

impl CommandInstance for NvWriteReq {
    const HEADER: CommandHeader = header(CommandType::Sreq, 0x02);
    const NAME: &'static str = "SysCommands.NVWrite.Req";

    fn is_partial(&self) -> bool {
        false
    }

    fn matches(&self, other: &Self) -> bool {
        self == other
    }

    fn to_frame(&self) -> CommandResult<GeneralFrame> {
        let mut buf = Vec::new();
        self.sys_id.serialize(&mut buf);
        self.item_id.serialize(&mut buf);
        self.sub_id.serialize(&mut buf);
        self.offset.serialize(&mut buf);
        self.value.serialize(&mut buf);
        finish_frame(Self::NAME, Self::HEADER, buf)
    }

    fn from_frame(frame: &GeneralFrame, ignore_unparsed: bool) -> CommandResult<Self> {
        check_header(Self::NAME, Self::HEADER, frame)?;
        let bytes = frame.payload();
        let (sys_id, rest) = u8::deserialize(bytes)
            .map_err(|source| CommandError::Primitive { field: "SysId", command: Self::NAME, source })?;
        let (item_id, rest) = u16::deserialize(rest)
            .map_err(|source| CommandError::Primitive { field: "ItemId", command: Self::NAME, source })?;
        let (sub_id, rest) = u16::deserialize(rest)
            .map_err(|source| CommandError::Primitive { field: "SubId", command: Self::NAME, source })?;
        let (offset, rest) = u16::deserialize(rest)
            .map_err(|source| CommandError::Primitive { field: "Offset", command: Self::NAME, source })?;
        let (value, rest) = ShortBytes::deserialize(rest)
            .map_err(|source| CommandError::Primitive { field: "Value", command: Self::NAME, source })?;
        check_trailing(Self::NAME, rest, ignore_unparsed)?;
        Ok(Self { sys_id, item_id, sub_id, offset, value })
    }
}

impl SreqRequest for NvWriteReq {
    type Rsp = NvWriteRsp;
}

/// `SYS.NVWrite` response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct NvWriteRsp {
    partial: bool,
    /// Write outcome.
    pub status: Option<Status>,
}

impl NvWriteRsp {
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

    /// A partial instance constrained to a specific status.
    #[must_use]
    pub fn with_status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }
}

impl CommandInstance for NvWriteRsp {
    const HEADER: CommandHeader = header(CommandType::Srsp, 0x02);
    const NAME: &'static str = "SysCommands.NVWrite.Rsp";

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

/// `SYS.SetTxPower`: set the radio's transmit power. The device clamps the
/// requested value to the nearest value it actually supports and echoes
/// that value back in the response, so the response is never assumed equal
/// to the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SetTxPowerReq {
    /// Requested transmit power in dBm.
    pub tx_power: i8,
}

impl CommandInstance for SetTxPowerReq {
    const HEADER: CommandHeader = header(CommandType::Sreq, 0x14);
    const NAME: &'static str = "SysCommands.SetTxPower.Req";

    fn is_partial(&self) -> bool {
        false
    }

    fn matches(&self, other: &Self) -> bool {
        self == other
    }

    fn to_frame(&self) -> CommandResult<GeneralFrame> {
        let mut buf = Vec::new();
        self.tx_power.serialize(&mut buf);
        finish_frame(Self::NAME, Self::HEADER, buf)
    }

    fn from_frame(frame: &GeneralFrame, ignore_unparsed: bool) -> CommandResult<Self> {
        check_header(Self::NAME, Self::HEADER, frame)?;
        let (tx_power, rest) = i8::deserialize(frame.payload())
            .map_err(|source| CommandError::Primitive { field: "TXPower", command: Self::NAME, source })?;
        check_trailing(Self::NAME, rest, ignore_unparsed)?;
        Ok(Self { tx_power })
    }
}

impl SreqRequest for SetTxPowerReq {
    type Rsp = SetTxPowerRsp;
}

/// `SYS.SetTxPower` response, carrying the transmit power the device
/// actually applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SetTxPowerRsp {
    partial: bool,
    /// Transmit power actually applied, in dBm.
    pub tx_power: Option<i8>,
}

impl SetTxPowerRsp {
    /// A complete instance.
    #[must_use]
    pub fn new(tx_power: i8) -> Self {
        Self { partial: false, tx_power: Some(tx_power) }
    }

    /// A partial instance accepting any applied power.
    #[must_use]
    pub fn partial() -> Self {
        Self { partial: true, tx_power: None }
    }
}

impl CommandInstance for SetTxPowerRsp {
    const HEADER: CommandHeader = header(CommandType::Srsp, 0x14);
    const NAME: &'static str = "SysCommands.SetTxPower.Rsp";

    fn is_partial(&self) -> bool {
        self.partial
    }

    fn matches(&self, other: &Self) -> bool {
        field_matches(self.tx_power.as_ref(), &other.tx_power.unwrap_or_default())
    }

    #[expect(clippy::expect_used, reason = "partial check above guarantees tx_power is Some")]
    fn to_frame(&self) -> CommandResult<GeneralFrame> {
        if self.partial {
            return Err(CommandError::Partial { command: Self::NAME });
        }
        let mut buf = Vec::new();
        self.tx_power.expect("complete instance").serialize(&mut buf);
        finish_frame(Self::NAME, Self::HEADER, buf)
    }

    fn from_frame(frame: &GeneralFrame, ignore_unparsed: bool) -> CommandResult<Self> {
        check_header(Self::NAME, Self::HEADER, frame)?;
        let (tx_power, rest) = i8::deserialize(frame.payload())
            .map_err(|source| CommandError::Primitive { field: "TXPower", command: Self::NAME, source })?;
        check_trailing(Self::NAME, rest, ignore_unparsed)?;
        Ok(Self::new(tx_power))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nv_write_payload_matches_worked_example() {
        // scenario 2: exact payload bytes for a specific NVWrite request.
        let req = NvWriteReq {
            sys_id: 0x12,
            item_id: 0x3456,
            sub_id: 0x7890,
            offset: 0x0000,
            value: ShortBytes(b"asdfoo".to_vec()),
        };

        let frame = req.to_frame().unwrap();
        assert_eq!(
            frame.payload().as_ref(),
            &[0x12, 0x56, 0x34, 0x90, 0x78, 0x00, 0x00, 0x06, 0x61, 0x73, 0x64, 0x66, 0x6F, 0x6F]
        );
    }

    #[test]
    fn ping_round_trip_through_listener_style_matching() {
        // scenario 3: a partial Rsp(Capabilities=1625) accepts an incoming
        // complete Rsp with the same value and rejects others.
        let constraint = PingRsp::partial().with_capabilities(Capabilities(1625));
        let incoming = PingRsp::new(Capabilities(1625));
        assert!(constraint.matches(&incoming));

        let other = PingRsp::new(Capabilities(0));
        assert!(!constraint.matches(&other));
    }

    #[test]
    fn partial_ping_rsp_cannot_be_serialized() {
        let err = PingRsp::partial().to_frame().unwrap_err();
        assert_eq!(err, CommandError::Partial { command: PingRsp::NAME });
    }

    #[test]
    fn ping_req_round_trip() {
        let frame = PingReq.to_frame().unwrap();
        assert_eq!(PingReq::from_frame(&frame, false).unwrap(), PingReq);
    }

    #[test]
    fn set_tx_power_round_trip_with_negative_dbm() {
        let req = SetTxPowerReq { tx_power: -22 };
        let frame = req.to_frame().unwrap();
        assert_eq!(SetTxPowerReq::from_frame(&frame, false).unwrap(), req);
    }

    #[test]
    fn set_tx_power_rsp_echoes_clamped_value() {
        // the device may clamp the requested power; the response is not
        // assumed to equal the request.
        let rsp = SetTxPowerRsp::new(19);
        let frame = rsp.to_frame().unwrap();
        assert_eq!(SetTxPowerRsp::from_frame(&frame, false).unwrap(), rsp);
    }
}
