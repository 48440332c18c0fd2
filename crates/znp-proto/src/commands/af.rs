//! `AF` subsystem: Application Framework endpoint registration.

use crate::{
    errors::{CommandError, CommandResult},
    frame::GeneralFrame,
    header::{CommandHeader, CommandType, Subsystem},
    primitives::{LvList, Primitive, Status},
    schema::{CommandInstance, SreqRequest, check_header, check_trailing, field_matches, finish_frame},
};

const fn header(command_type: CommandType, id: u8) -> CommandHeader {
    CommandHeader::new(command_type, Subsystem::Af, id)
}

/// `AF.Register`: register a simple-application-descriptor endpoint with
/// the ZNP so incoming frames addressed to it are delivered to the host.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Register {
    /// Endpoint number being registered.
    pub endpoint: u8,
    /// Application profile id.
    pub app_profile_id: u16,
    /// Application device id.
    pub app_device_id: u16,
    /// Application device version.
    pub app_device_version: u8,
    /// Latency requirement class.
    pub latency_req: u8,
    /// Cluster ids this endpoint accepts input on.
    pub app_in_cluster_list: LvList<u16>,
    /// Cluster ids this endpoint produces output on.
    pub app_out_cluster_list: LvList<u16>,
}

impl CommandInstance for Register {
    const HEADER: CommandHeader = header(CommandType::Sreq, 0x00);
    const NAME: &'static str = "AfCommands.Register.Req";

    fn is_partial(&self) -> bool {
        false
    }

    fn matches(&self, other: &Self) -> bool {
        self == other
    }

    fn to_frame(&self) -> CommandResult<GeneralFrame> {
        let mut buf = Vec::new();
        self.endpoint.serialize(&mut buf);
        self.app_profile_id.serialize(&mut buf);
        self.app_device_id.serialize(&mut buf);
        self.app_device_version.serialize(&mut buf);
        self.latency_req.serialize(&mut buf);
        self.app_in_cluster_list.serialize(&mut buf);
        self.app_out_cluster_list.serialize(&mut buf);
        finish_frame(Self::NAME, Self::HEADER, buf)
    }

    fn from_frame(frame: &GeneralFrame, ignore_unparsed: bool) -> CommandResult<Self> {
        check_header(Self::NAME, Self::HEADER, frame)?;
        let bytes = frame.payload();
        let (endpoint, rest) = u8::deserialize(bytes)
            .map_err(|source| CommandError::Primitive { field: "EndPoint", command: Self::NAME, source })?;
        let (app_profile_id, rest) = u16::deserialize(rest)
            .map_err(|source| CommandError::Primitive { field: "AppProfId", command: Self::NAME, source })?;
        let (app_device_id, rest) = u16::deserialize(rest)
            .map_err(|source| CommandError::Primitive { field: "AppDeviceId", command: Self::NAME, source })?;
        let (app_device_version, rest) = u8::deserialize(rest)
            .map_err(|source| CommandError::Primitive { field: "AppDevVer", command: Self::NAME, source })?;
        let (latency_req, rest) = u8::deserialize(rest)
            .map_err(|source| CommandError::Primitive { field: "LatencyReq", command: Self::NAME, source })?;
        let (app_in_cluster_list, rest) = LvList::<u16>::deserialize(rest)
            .map_err(|source| CommandError::Primitive { field: "AppInClusterList", command: Self::NAME, source })?;
        let (app_out_cluster_list, rest) = LvList::<u16>::deserialize(rest)
            .map_err(|source| CommandError::Primitive { field: "AppOutClusterList", command: Self::NAME, source })?;
        check_trailing(Self::NAME, rest, ignore_unparsed)?;
        Ok(Self {
            endpoint,
            app_profile_id,
            app_device_id,
            app_device_version,
            latency_req,
            app_in_cluster_list,
            app_out_cluster_list,
        })
    }
}

impl SreqRequest for Register {
    type Rsp = RegisterRsp;
}

/// `AF.Register` response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RegisterRsp {
    partial: bool,
    /// Registration outcome.
    pub status: Option<Status>,
}

impl RegisterRsp {
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

impl CommandInstance for RegisterRsp {
    const HEADER: CommandHeader = header(CommandType::Srsp, 0x00);
    const NAME: &'static str = "AfCommands.Register.Rsp";

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

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Register {
        Register {
            endpoint: 1,
            app_profile_id: 0x0104,
            app_device_id: 0x0005,
            app_device_version: 0,
            latency_req: 0,
            app_in_cluster_list: LvList(vec![0x0000, 0x0001]),
            app_out_cluster_list: LvList(vec![]),
        }
    }

    #[test]
    fn register_round_trip() {
        let req = sample();
        let frame = req.to_frame().unwrap();
        assert_eq!(Register::from_frame(&frame, false).unwrap(), req);
    }

    #[test]
    fn register_rsp_matches_success() {
        let constraint = RegisterRsp::partial().with_status(Status::Success);
        assert!(constraint.matches(&RegisterRsp::new(Status::Success)));
        assert!(!constraint.matches(&RegisterRsp::new(Status::Failure)));
    }
}
