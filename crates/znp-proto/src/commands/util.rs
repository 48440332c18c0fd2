//! `UTIL` subsystem: miscellaneous addressing and binding helpers.

use crate::{
    errors::{CommandError, CommandResult},
    frame::GeneralFrame,
    header::{CommandHeader, CommandType, Subsystem},
    primitives::{Eui64, LvList, NwkAddress, Primitive, Status},
    schema::{CommandInstance, SreqRequest, check_header, check_trailing, field_matches, finish_frame},
};

const fn header(command_type: CommandType, id: u8) -> CommandHeader {
    CommandHeader::new(command_type, Subsystem::Util, id)
}

/// `UTIL.BindAddEntry`: add a local binding table entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BindAddEntry {
    /// Binding direction/creation mode, device-specific.
    pub create_bind_mode: u8,
    /// Source endpoint of the binding.
    pub src_endpoint: u8,
    /// Destination network address of the bound device.
    pub dst_addr: NwkAddress,
    /// Destination endpoint of the binding.
    pub dst_endpoint: u8,
    /// Long address of the destination device.
    pub dst_address: Eui64,
    /// Cluster ids covered by the binding. Each element must fit a `u16`;
    /// see `BindAddEntry::new` for the overflow check performed at
    /// construction rather than at serialization time.
    pub cluster_id_list: LvList<u16>,
}

impl BindAddEntry {
    /// Build a `BindAddEntry`, rejecting cluster ids that don't fit a `u16`.
    ///
    /// Grounded in the worked example where a caller passes
    /// `ClusterIdList=[0x12, 0x457890]`: the second element overflows a
    /// 16-bit field and must be rejected before a frame is ever built,
    /// rather than silently truncated on the wire. This is a command-layer
    /// validation failure, not a wire decode failure, so it raises
    /// [`CommandError::InvalidValue`] rather than
    /// [`crate::errors::ProtocolError`].
    pub fn new(
        create_bind_mode: u8,
        src_endpoint: u8,
        dst_addr: NwkAddress,
        dst_endpoint: u8,
        dst_address: Eui64,
        cluster_ids: &[u32],
    ) -> CommandResult<Self> {
        let mut cluster_id_list = Vec::with_capacity(cluster_ids.len());
        for &cluster_id in cluster_ids {
            let narrowed = u16::try_from(cluster_id).map_err(|_err| CommandError::InvalidValue {
                field: "ClusterIdList",
                command: Self::NAME,
                reason: format!("cluster id {cluster_id:#x} does not fit in a 16-bit field"),
            })?;
            cluster_id_list.push(narrowed);
        }

        Ok(Self {
            create_bind_mode,
            src_endpoint,
            dst_addr,
            dst_endpoint,
            dst_address,
            cluster_id_list: LvList(cluster_id_list),
        })
    }
}

impl CommandInstance for BindAddEntry {
    const HEADER: CommandHeader = header(CommandType::Sreq, 0x14);
    const NAME: &'static str = "UtilCommands.BindAddEntry.Req";

    fn is_partial(&self) -> bool {
        false
    }

    fn matches(&self, other: &Self) -> bool {
        self == other
    }

    fn to_frame(&self) -> CommandResult<GeneralFrame> {
        let mut buf = Vec::new();
        self.create_bind_mode.serialize(&mut buf);
        self.src_endpoint.serialize(&mut buf);
        self.dst_addr.serialize(&mut buf);
        self.dst_endpoint.serialize(&mut buf);
        self.dst_address.serialize(&mut buf);
        self.cluster_id_list.serialize(&mut buf);
        finish_frame(Self::NAME, Self::HEADER, buf)
    }

    fn from_frame(frame: &GeneralFrame, ignore_unparsed: bool) -> CommandResult<Self> {
        check_header(Self::NAME, Self::HEADER, frame)?;
        let bytes = frame.payload();
        let (create_bind_mode, rest) = u8::deserialize(bytes)
            .map_err(|source| CommandError::Primitive { field: "CreateBindMode", command: Self::NAME, source })?;
        let (src_endpoint, rest) = u8::deserialize(rest)
            .map_err(|source| CommandError::Primitive { field: "SrcEndpoint", command: Self::NAME, source })?;
        let (dst_addr, rest) = NwkAddress::deserialize(rest)
            .map_err(|source| CommandError::Primitive { field: "DstAddr", command: Self::NAME, source })?;
        let (dst_endpoint, rest) = u8::deserialize(rest)
            .map_err(|source| CommandError::Primitive { field: "DstEndpoint", command: Self::NAME, source })?;
        let (dst_address, rest) = Eui64::deserialize(rest)
            .map_err(|source| CommandError::Primitive { field: "DstAddress", command: Self::NAME, source })?;
        let (cluster_id_list, rest) = LvList::<u16>::deserialize(rest)
            .map_err(|source| CommandError::Primitive { field: "ClusterIdList", command: Self::NAME, source })?;
        check_trailing(Self::NAME, rest, ignore_unparsed)?;
        Ok(Self { create_bind_mode, src_endpoint, dst_addr, dst_endpoint, dst_address, cluster_id_list })
    }
}

impl SreqRequest for BindAddEntry {
    type Rsp = BindAddEntryRsp;
}

/// `UTIL.BindAddEntry` response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BindAddEntryRsp {
    partial: bool,
    /// Outcome of the binding request.
    pub status: Option<Status>,
}

impl BindAddEntryRsp {
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

impl CommandInstance for BindAddEntryRsp {
    const HEADER: CommandHeader = header(CommandType::Srsp, 0x14);
    const NAME: &'static str = "UtilCommands.BindAddEntry.Rsp";

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

    #[test]
    fn cluster_id_overflow_is_rejected_at_construction() {
        // scenario 5: ClusterIdList=[0x12, 0x457890] -- the second element
        // doesn't fit a u16 and must fail before a frame is built.
        let err = BindAddEntry::new(0, 1, 0x1234, 1, Eui64([0; 8]), &[0x12, 0x457890]).unwrap_err();
        assert_eq!(
            err,
            CommandError::InvalidValue {
                field: "ClusterIdList",
                command: BindAddEntry::NAME,
                reason: "cluster id 0x457890 does not fit in a 16-bit field".to_string(),
            }
        );
    }

    #[test]
    fn bind_add_entry_round_trip() {
        let entry = BindAddEntry::new(0, 1, 0x1234, 2, Eui64([1, 2, 3, 4, 5, 6, 7, 8]), &[0x0001, 0x0006]).unwrap();
        let frame = entry.to_frame().unwrap();
        assert_eq!(BindAddEntry::from_frame(&frame, false).unwrap(), entry);
    }
}
