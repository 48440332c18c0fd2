//! The representative command catalog and runtime frame-to-command dispatch.
//!
//! The reference implementation dispatches an incoming frame to its command
//! class through a dynamic `COMMANDS_BY_ID` table keyed on the header. Rust
//! has no equivalent of looking up a class object at runtime and calling a
//! shared constructor on it, so [`DecodedCommand`] plays that role as a
//! closed enum: one variant per command class in the catalog, produced by
//! [`DecodedCommand::from_frame`] matching on the frame's header. This is
//! also what lets a listener registry hold heterogeneous match constraints
//! (e.g. `Rsp(partial)` alongside `CommandNotRecognizedRsp(partial)`) in one
//! collection.

pub mod af;
pub mod app_config;
pub mod rpc_error;
pub mod sys;
pub mod util;
pub mod zdo;

use crate::{
    errors::CommandResult,
    frame::GeneralFrame,
    header::CommandHeader,
    schema::CommandInstance,
};

/// Every command class in the representative catalog, decoded from a frame
/// whose header matched a known entry.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedCommand {
    /// `SYS.ResetReq`
    SysResetReq(sys::ResetReq),
    /// `SYS.ResetInd`
    SysResetInd(sys::ResetInd),
    /// `SYS.Ping.Req`
    SysPingReq(sys::PingReq),
    /// `SYS.Ping.Rsp`
    SysPingRsp(sys::PingRsp),
    /// `SYS.NVWrite.Req`
    SysNvWriteReq(sys::NvWriteReq),
    /// `SYS.NVWrite.Rsp`
    SysNvWriteRsp(sys::NvWriteRsp),
    /// `SYS.SetTxPower.Req`
    SysSetTxPowerReq(sys::SetTxPowerReq),
    /// `SYS.SetTxPower.Rsp`
    SysSetTxPowerRsp(sys::SetTxPowerRsp),
    /// `ZDO.ActiveEpReq.Req`
    ZdoActiveEpReq(zdo::ActiveEpReq),
    /// `ZDO.ActiveEpReq.Rsp`
    ZdoActiveEpReqRsp(zdo::ActiveEpReqRsp),
    /// `ZDO.ActiveEpRsp.Callback`
    ZdoActiveEpRspInd(zdo::ActiveEpRspInd),
    /// `AF.Register.Req`
    AfRegister(af::Register),
    /// `AF.Register.Rsp`
    AfRegisterRsp(af::RegisterRsp),
    /// `APP_CONFIG.BDBStartCommissioning.Req`
    AppConfigBdbStartCommissioning(app_config::BdbStartCommissioning),
    /// `APP_CONFIG.BDBStartCommissioning.Rsp`
    AppConfigBdbStartCommissioningRsp(app_config::BdbStartCommissioningRsp),
    /// `APP_CONFIG.BDBCommissioningNotification.Callback`
    AppConfigBdbCommissioningNotification(app_config::BdbCommissioningNotification),
    /// `UTIL.BindAddEntry.Req`
    UtilBindAddEntry(util::BindAddEntry),
    /// `UTIL.BindAddEntry.Rsp`
    UtilBindAddEntryRsp(util::BindAddEntryRsp),
    /// `RPC_ERROR.CommandNotRecognized.Rsp`
    RpcErrorCommandNotRecognizedRsp(rpc_error::CommandNotRecognizedRsp),
}

impl DecodedCommand {
    /// The header of the underlying command instance.
    #[must_use]
    pub fn header(&self) -> CommandHeader {
        match self {
            Self::SysResetReq(_) => sys::ResetReq::HEADER,
            Self::SysResetInd(_) => sys::ResetInd::HEADER,
            Self::SysPingReq(_) => sys::PingReq::HEADER,
            Self::SysPingRsp(_) => sys::PingRsp::HEADER,
            Self::SysNvWriteReq(_) => sys::NvWriteReq::HEADER,
            Self::SysNvWriteRsp(_) => sys::NvWriteRsp::HEADER,
            Self::SysSetTxPowerReq(_) => sys::SetTxPowerReq::HEADER,
            Self::SysSetTxPowerRsp(_) => sys::SetTxPowerRsp::HEADER,
            Self::ZdoActiveEpReq(_) => zdo::ActiveEpReq::HEADER,
            Self::ZdoActiveEpReqRsp(_) => zdo::ActiveEpReqRsp::HEADER,
            Self::ZdoActiveEpRspInd(_) => zdo::ActiveEpRspInd::HEADER,
            Self::AfRegister(_) => af::Register::HEADER,
            Self::AfRegisterRsp(_) => af::RegisterRsp::HEADER,
            Self::AppConfigBdbStartCommissioning(_) => app_config::BdbStartCommissioning::HEADER,
            Self::AppConfigBdbStartCommissioningRsp(_) => app_config::BdbStartCommissioningRsp::HEADER,
            Self::AppConfigBdbCommissioningNotification(_) => app_config::BdbCommissioningNotification::HEADER,
            Self::UtilBindAddEntry(_) => util::BindAddEntry::HEADER,
            Self::UtilBindAddEntryRsp(_) => util::BindAddEntryRsp::HEADER,
            Self::RpcErrorCommandNotRecognizedRsp(_) => rpc_error::CommandNotRecognizedRsp::HEADER,
        }
    }

    /// Look up `frame`'s header in the catalog and parse its payload into
    /// the matching command class.
    ///
    /// Returns `Ok(None)` for headers outside the representative catalog
    /// implemented here, rather than failing: an out-of-catalog frame is an
    /// expected occurrence (the real ZNP firmware exposes far more commands
    /// than this driver materializes), not a protocol error.
    pub fn from_frame(frame: &GeneralFrame, ignore_unparsed: bool) -> CommandResult<Option<Self>> {
        let header = frame.header();

        macro_rules! try_decode {
            ($ty:ty, $variant:path) => {
                if header == <$ty as CommandInstance>::HEADER {
                    return <$ty>::from_frame(frame, ignore_unparsed).map(|cmd| Some($variant(cmd)));
                }
            };
        }

        try_decode!(sys::ResetReq, Self::SysResetReq);
        try_decode!(sys::ResetInd, Self::SysResetInd);
        try_decode!(sys::PingReq, Self::SysPingReq);
        try_decode!(sys::PingRsp, Self::SysPingRsp);
        try_decode!(sys::NvWriteReq, Self::SysNvWriteReq);
        try_decode!(sys::NvWriteRsp, Self::SysNvWriteRsp);
        try_decode!(sys::SetTxPowerReq, Self::SysSetTxPowerReq);
        try_decode!(sys::SetTxPowerRsp, Self::SysSetTxPowerRsp);
        try_decode!(zdo::ActiveEpReq, Self::ZdoActiveEpReq);
        try_decode!(zdo::ActiveEpReqRsp, Self::ZdoActiveEpReqRsp);
        try_decode!(zdo::ActiveEpRspInd, Self::ZdoActiveEpRspInd);
        try_decode!(af::Register, Self::AfRegister);
        try_decode!(af::RegisterRsp, Self::AfRegisterRsp);
        try_decode!(app_config::BdbStartCommissioning, Self::AppConfigBdbStartCommissioning);
        try_decode!(app_config::BdbStartCommissioningRsp, Self::AppConfigBdbStartCommissioningRsp);
        try_decode!(app_config::BdbCommissioningNotification, Self::AppConfigBdbCommissioningNotification);
        try_decode!(util::BindAddEntry, Self::UtilBindAddEntry);
        try_decode!(util::BindAddEntryRsp, Self::UtilBindAddEntryRsp);
        try_decode!(rpc_error::CommandNotRecognizedRsp, Self::RpcErrorCommandNotRecognizedRsp);

        tracing::debug!(%header, "frame header outside the materialized catalog");
        Ok(None)
    }

    /// `self` matches `other` iff they're the same command class and that
    /// class's own [`CommandInstance::matches`] accepts. Different classes
    /// never match one another, which is what lets a listener's matching
    /// set mix classes (e.g. an `Rsp` alongside `CommandNotRecognizedRsp`)
    /// without any of them spuriously subsuming another during
    /// [`matching_set::reduce_to_maximal`](crate::commands::matching_set::reduce_to_maximal).
    #[must_use]
    pub fn matches(&self, other: &Self) -> bool {
        macro_rules! arm {
            ($variant:path) => {
                if let ($variant(this), $variant(other)) = (self, other) {
                    return this.matches(other);
                }
            };
        }

        arm!(Self::SysResetReq);
        arm!(Self::SysResetInd);
        arm!(Self::SysPingReq);
        arm!(Self::SysPingRsp);
        arm!(Self::SysNvWriteReq);
        arm!(Self::SysNvWriteRsp);
        arm!(Self::SysSetTxPowerReq);
        arm!(Self::SysSetTxPowerRsp);
        arm!(Self::ZdoActiveEpReq);
        arm!(Self::ZdoActiveEpReqRsp);
        arm!(Self::ZdoActiveEpRspInd);
        arm!(Self::AfRegister);
        arm!(Self::AfRegisterRsp);
        arm!(Self::AppConfigBdbStartCommissioning);
        arm!(Self::AppConfigBdbStartCommissioningRsp);
        arm!(Self::AppConfigBdbCommissioningNotification);
        arm!(Self::UtilBindAddEntry);
        arm!(Self::UtilBindAddEntryRsp);
        arm!(Self::RpcErrorCommandNotRecognizedRsp);

        false
    }
}

/// Converts a concrete command instance into the catalog-wide
/// [`DecodedCommand`] enum and back, so the correlation core can build
/// heterogeneous listener matching sets (see `znp-core`).
pub trait AsDecoded: CommandInstance {
    /// Wrap `self` in the matching [`DecodedCommand`] variant.
    fn into_decoded(self) -> DecodedCommand;
}

macro_rules! decoded_command_variant {
    ($ty:ty, $variant:path) => {
        impl AsDecoded for $ty {
            fn into_decoded(self) -> DecodedCommand {
                $variant(self)
            }
        }

        impl TryFrom<DecodedCommand> for $ty {
            type Error = DecodedCommand;

            fn try_from(value: DecodedCommand) -> Result<Self, Self::Error> {
                match value {
                    $variant(inner) => Ok(inner),
                    other => Err(other),
                }
            }
        }
    };
}

decoded_command_variant!(sys::ResetReq, DecodedCommand::SysResetReq);
decoded_command_variant!(sys::ResetInd, DecodedCommand::SysResetInd);
decoded_command_variant!(sys::PingReq, DecodedCommand::SysPingReq);
decoded_command_variant!(sys::PingRsp, DecodedCommand::SysPingRsp);
decoded_command_variant!(sys::NvWriteReq, DecodedCommand::SysNvWriteReq);
decoded_command_variant!(sys::NvWriteRsp, DecodedCommand::SysNvWriteRsp);
decoded_command_variant!(sys::SetTxPowerReq, DecodedCommand::SysSetTxPowerReq);
decoded_command_variant!(sys::SetTxPowerRsp, DecodedCommand::SysSetTxPowerRsp);
decoded_command_variant!(zdo::ActiveEpReq, DecodedCommand::ZdoActiveEpReq);
decoded_command_variant!(zdo::ActiveEpReqRsp, DecodedCommand::ZdoActiveEpReqRsp);
decoded_command_variant!(zdo::ActiveEpRspInd, DecodedCommand::ZdoActiveEpRspInd);
decoded_command_variant!(af::Register, DecodedCommand::AfRegister);
decoded_command_variant!(af::RegisterRsp, DecodedCommand::AfRegisterRsp);
decoded_command_variant!(app_config::BdbStartCommissioning, DecodedCommand::AppConfigBdbStartCommissioning);
decoded_command_variant!(app_config::BdbStartCommissioningRsp, DecodedCommand::AppConfigBdbStartCommissioningRsp);
decoded_command_variant!(
    app_config::BdbCommissioningNotification,
    DecodedCommand::AppConfigBdbCommissioningNotification
);
decoded_command_variant!(util::BindAddEntry, DecodedCommand::UtilBindAddEntry);
decoded_command_variant!(util::BindAddEntryRsp, DecodedCommand::UtilBindAddEntryRsp);
decoded_command_variant!(rpc_error::CommandNotRecognizedRsp, DecodedCommand::RpcErrorCommandNotRecognizedRsp);

/// Reduces a listener's matching set to its maximal elements under
/// [`DecodedCommand::matches`]: if `a` matches `b`, `b` is redundant.
pub mod matching_set {
    use super::DecodedCommand;

    /// Drop every element that is matched by some other element in `set`.
    #[must_use]
    pub fn reduce_to_maximal(set: Vec<DecodedCommand>) -> Vec<DecodedCommand> {
        let mut kept: Vec<DecodedCommand> = Vec::with_capacity(set.len());

        for candidate in set {
            if kept.iter().any(|existing| existing.matches(&candidate)) {
                continue;
            }
            kept.retain(|existing| !candidate.matches(existing));
            kept.push(candidate);
        }

        kept
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::Capabilities;

    #[test]
    fn decodes_known_header() {
        let frame = sys::PingReq.to_frame().unwrap();
        let decoded = DecodedCommand::from_frame(&frame, false).unwrap().unwrap();
        assert_eq!(decoded, DecodedCommand::SysPingReq(sys::PingReq));
        assert_eq!(decoded.header(), sys::PingReq::HEADER);
    }

    #[test]
    fn out_of_catalog_header_decodes_to_none() {
        use crate::header::{CommandType, Subsystem};
        use bytes::Bytes;

        let frame = GeneralFrame::new(CommandHeader::new(CommandType::Sreq, Subsystem::Mac, 0x7f), Bytes::new())
            .unwrap();
        assert_eq!(DecodedCommand::from_frame(&frame, false).unwrap(), None);
    }

    #[test]
    fn catalog_headers_are_unique() {
        let headers = [
            sys::ResetReq::HEADER,
            sys::ResetInd::HEADER,
            sys::PingReq::HEADER,
            sys::PingRsp::HEADER,
            sys::NvWriteReq::HEADER,
            sys::NvWriteRsp::HEADER,
            sys::SetTxPowerReq::HEADER,
            sys::SetTxPowerRsp::HEADER,
            zdo::ActiveEpReq::HEADER,
            zdo::ActiveEpReqRsp::HEADER,
            zdo::ActiveEpRspInd::HEADER,
            af::Register::HEADER,
            af::RegisterRsp::HEADER,
            app_config::BdbStartCommissioning::HEADER,
            app_config::BdbStartCommissioningRsp::HEADER,
            app_config::BdbCommissioningNotification::HEADER,
            util::BindAddEntry::HEADER,
            util::BindAddEntryRsp::HEADER,
            rpc_error::CommandNotRecognizedRsp::HEADER,
        ];

        for (i, a) in headers.iter().enumerate() {
            for (j, b) in headers.iter().enumerate() {
                assert!(i == j || a != b, "duplicate header {a} at indices {i} and {j}");
            }
        }
    }

    #[test]
    fn sreq_rsp_pairs_share_id_and_subsystem_across_type() {
        use crate::{header::CommandType, schema::SreqRequest};

        let req = sys::PingReq::HEADER;
        let rsp = <sys::PingReq as SreqRequest>::Rsp::HEADER;
        assert_eq!(req.with_type(CommandType::Srsp), rsp);
    }

    #[test]
    fn capabilities_survive_decoded_command_round_trip() {
        let frame = sys::PingRsp::new(Capabilities(1625)).to_frame().unwrap();
        let decoded = DecodedCommand::from_frame(&frame, false).unwrap().unwrap();
        assert_eq!(decoded, DecodedCommand::SysPingRsp(sys::PingRsp::new(Capabilities(1625))));
    }

    #[test]
    fn as_decoded_round_trips_through_try_from() {
        let req = sys::PingReq;
        let decoded = req.into_decoded();
        assert_eq!(sys::PingReq::try_from(decoded), Ok(req));
    }

    #[test]
    fn matching_set_drops_subsumed_constraint() {
        let broad = sys::PingRsp::partial().into_decoded();
        let narrow = sys::PingRsp::new(Capabilities(1625)).into_decoded();

        let reduced = matching_set::reduce_to_maximal(vec![broad.clone(), narrow]);
        assert_eq!(reduced, vec![broad]);
    }

    #[test]
    fn matching_set_keeps_incomparable_constraints_from_different_classes() {
        let rsp = sys::PingRsp::partial().into_decoded();
        let not_recognized = rpc_error::CommandNotRecognizedRsp::partial()
            .with_request_header(sys::PingReq::HEADER)
            .into_decoded();

        let reduced = matching_set::reduce_to_maximal(vec![rsp.clone(), not_recognized.clone()]);
        assert_eq!(reduced.len(), 2);
        assert!(reduced.contains(&rsp));
        assert!(reduced.contains(&not_recognized));
    }
}
