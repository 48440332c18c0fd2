//! `ZDO` subsystem: Zigbee Device Objects queries.

use crate::{
    errors::{CommandError, CommandResult},
    frame::GeneralFrame,
    header::{CommandHeader, CommandType, Subsystem},
    primitives::{LvList, NwkAddress, Primitive, Status},
    schema::{CommandInstance, SreqRequest, check_header, check_trailing, field_matches, finish_frame},
};

const fn header(command_type: CommandType, id: u8) -> CommandHeader {
    CommandHeader::new(command_type, Subsystem::Zdo, id)
}

/// `ZDO.ActiveEpReq`: query a device's active endpoint list.
///
/// The SRSP ([`ActiveEpReqRsp`]) only acknowledges that the request was
/// accepted; the endpoint list itself arrives later as the
/// [`ActiveEpRspInd`] callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActiveEpReq {
    /// Destination address the request is sent to.
    pub dst_addr: NwkAddress,
    /// Network address of the device being queried.
    pub nwk_addr_of_interest: NwkAddress,
}

impl CommandInstance for ActiveEpReq {
    const HEADER: CommandHeader = header(CommandType::Sreq, 0x05);
    const NAME: &'static str = "ZdoCommands.ActiveEpReq.Req";

    fn is_partial(&self) -> bool {
        false
    }

    fn matches(&self, other: &Self) -> bool {
        self == other
    }

    fn to_frame(&self) -> CommandResult<GeneralFrame> {
        let mut buf = Vec::new();
        self.dst_addr.serialize(&mut buf);
        self.nwk_addr_of_interest.serialize(&mut buf);
        finish_frame(Self::NAME, Self::HEADER, buf)
    }

    fn from_frame(frame: &GeneralFrame, ignore_unparsed: bool) -> CommandResult<Self> {
        check_header(Self::NAME, Self::HEADER, frame)?;
        let bytes = frame.payload();
        let (dst_addr, rest) = NwkAddress::deserialize(bytes)
            .map_err(|source| CommandError::Primitive { field: "DstAddr", command: Self::NAME, source })?;
        let (nwk_addr_of_interest, rest) = NwkAddress::deserialize(rest)
            .map_err(|source| CommandError::Primitive { field: "NWKAddrOfInterest", command: Self::NAME, source })?;
        check_trailing(Self::NAME, rest, ignore_unparsed)?;
        Ok(Self { dst_addr, nwk_addr_of_interest })
    }
}

impl SreqRequest for ActiveEpReq {
    type Rsp = ActiveEpReqRsp;
}

/// Immediate SRSP acknowledging [`ActiveEpReq`] was accepted for processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ActiveEpReqRsp {
    partial: bool,
    /// Whether the request was accepted.
    pub status: Option<Status>,
}

impl ActiveEpReqRsp {
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

impl CommandInstance for ActiveEpReqRsp {
    const HEADER: CommandHeader = header(CommandType::Srsp, 0x05);
    const NAME: &'static str = "ZdoCommands.ActiveEpReq.Rsp";

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

/// `ZDO.ActiveEpRsp`: asynchronous callback delivering the endpoint list
/// requested by a prior [`ActiveEpReq`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ActiveEpRspInd {
    partial: bool,
    /// Source address the indication came from.
    pub src_addr: Option<NwkAddress>,
    /// Query outcome.
    pub status: Option<Status>,
    /// Network address of the queried device.
    pub nwk_addr: Option<NwkAddress>,
    /// The device's active endpoint numbers.
    pub active_ep_list: Option<LvList<u8>>,
}

impl ActiveEpRspInd {
    /// A complete instance.
    #[must_use]
    pub fn new(src_addr: NwkAddress, status: Status, nwk_addr: NwkAddress, active_ep_list: LvList<u8>) -> Self {
        Self {
            partial: false,
            src_addr: Some(src_addr),
            status: Some(status),
            nwk_addr: Some(nwk_addr),
            active_ep_list: Some(active_ep_list),
        }
    }

    /// A partial instance accepting any indication.
    #[must_use]
    pub fn partial() -> Self {
        Self { partial: true, ..Self::default() }
    }

    /// A partial instance constrained to a specific source network address.
    #[must_use]
    pub fn with_nwk_addr(mut self, nwk_addr: NwkAddress) -> Self {
        self.nwk_addr = Some(nwk_addr);
        self
    }
}

impl CommandInstance for ActiveEpRspInd {
    const HEADER: CommandHeader = header(CommandType::Areq, 0x85);
    const NAME: &'static str = "ZdoCommands.ActiveEpRsp.Callback";

    fn is_partial(&self) -> bool {
        self.partial
    }

    fn matches(&self, other: &Self) -> bool {
        field_matches(self.src_addr.as_ref(), &other.src_addr.unwrap_or_default())
            && field_matches(self.status.as_ref(), &other.status.unwrap_or(Status::Success))
            && field_matches(self.nwk_addr.as_ref(), &other.nwk_addr.unwrap_or_default())
            && field_matches(self.active_ep_list.as_ref(), &other.active_ep_list.clone().unwrap_or(LvList(Vec::new())))
    }

    #[expect(clippy::expect_used, reason = "partial check above guarantees every field is Some")]
    fn to_frame(&self) -> CommandResult<GeneralFrame> {
        if self.partial {
            return Err(CommandError::Partial { command: Self::NAME });
        }
        let mut buf = Vec::new();
        self.src_addr.expect("complete instance").serialize(&mut buf);
        self.status.expect("complete instance").serialize(&mut buf);
        self.nwk_addr.expect("complete instance").serialize(&mut buf);
        self.active_ep_list.clone().expect("complete instance").serialize(&mut buf);
        finish_frame(Self::NAME, Self::HEADER, buf)
    }

    fn from_frame(frame: &GeneralFrame, ignore_unparsed: bool) -> CommandResult<Self> {
        check_header(Self::NAME, Self::HEADER, frame)?;
        let bytes = frame.payload();
        let (src_addr, rest) = NwkAddress::deserialize(bytes)
            .map_err(|source| CommandError::Primitive { field: "SrcAddr", command: Self::NAME, source })?;
        let (status, rest) = Status::deserialize(rest)
            .map_err(|source| CommandError::Primitive { field: "Status", command: Self::NAME, source })?;
        let (nwk_addr, rest) = NwkAddress::deserialize(rest)
            .map_err(|source| CommandError::Primitive { field: "NwkAddr", command: Self::NAME, source })?;
        let (active_ep_list, rest) = LvList::<u8>::deserialize(rest)
            .map_err(|source| CommandError::Primitive { field: "ActiveEPList", command: Self::NAME, source })?;
        check_trailing(Self::NAME, rest, ignore_unparsed)?;
        Ok(Self::new(src_addr, status, nwk_addr, active_ep_list))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_ep_req_round_trip() {
        let req = ActiveEpReq { dst_addr: 0x1234, nwk_addr_of_interest: 0x5678 };
        let frame = req.to_frame().unwrap();
        assert_eq!(ActiveEpReq::from_frame(&frame, false).unwrap(), req);
    }

    #[test]
    fn active_ep_rsp_ind_matches_on_nwk_addr_only() {
        let constraint = ActiveEpRspInd::partial().with_nwk_addr(0x5678);
        let incoming = ActiveEpRspInd::new(0x0000, Status::Success, 0x5678, LvList(vec![1, 2, 3]));
        assert!(constraint.matches(&incoming));

        let other = ActiveEpRspInd::new(0x0000, Status::Success, 0x0001, LvList(vec![1]));
        assert!(!constraint.matches(&other));
    }

    #[test]
    fn active_ep_rsp_ind_round_trip() {
        let ind = ActiveEpRspInd::new(0x1234, Status::Success, 0x1234, LvList(vec![1, 2, 10]));
        let frame = ind.to_frame().unwrap();
        assert_eq!(ActiveEpRspInd::from_frame(&frame, false).unwrap(), ind);
    }
}
