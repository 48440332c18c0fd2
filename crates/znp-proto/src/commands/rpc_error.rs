//! `RPC_ERROR` subsystem: the single distinguished error response the ZNP
//! sends when it receives a frame it cannot dispatch.

use crate::{
    errors::{CommandError, CommandResult},
    frame::GeneralFrame,
    header::{CommandHeader, CommandType, Subsystem},
    primitives::{ErrorCode, Primitive},
    schema::{CommandInstance, check_header, check_trailing, field_matches, finish_frame},
};

/// `RPC_ERROR.CommandNotRecognized`: sent by the ZNP instead of the normal
/// SRSP when it cannot recognize a request's subsystem, command id,
/// parameters or length. There is no corresponding Req class: this is an
/// SRSP-only catalog entry that replaces the expected response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CommandNotRecognizedRsp {
    partial: bool,
    /// Why the request was rejected.
    pub error_code: Option<ErrorCode>,
    /// The header of the request that was rejected.
    pub request_header: Option<CommandHeader>,
}

impl CommandNotRecognizedRsp {
    /// A complete instance.
    #[must_use]
    pub fn new(error_code: ErrorCode, request_header: CommandHeader) -> Self {
        Self { partial: false, error_code: Some(error_code), request_header: Some(request_header) }
    }

    /// A partial instance accepting any rejection.
    #[must_use]
    pub fn partial() -> Self {
        Self { partial: true, error_code: None, request_header: None }
    }

    /// A partial instance constrained to a specific rejected request header.
    #[must_use]
    pub fn with_request_header(mut self, request_header: CommandHeader) -> Self {
        self.request_header = Some(request_header);
        self
    }
}

impl CommandInstance for CommandNotRecognizedRsp {
    const HEADER: CommandHeader = CommandHeader::new(CommandType::Srsp, Subsystem::RpcError, 0x00);
    const NAME: &'static str = "RpcErrorCommands.CommandNotRecognized.Rsp";

    fn is_partial(&self) -> bool {
        self.partial
    }

    fn matches(&self, other: &Self) -> bool {
        field_matches(self.error_code.as_ref(), &other.error_code.unwrap_or(ErrorCode::Unknown(0)))
            && field_matches(
                self.request_header.as_ref(),
                &other.request_header.unwrap_or(CommandHeader::new(CommandType::Unknown(0), Subsystem::Unknown(0), 0)),
            )
    }

    #[expect(clippy::expect_used, reason = "partial check above guarantees both fields are Some")]
    fn to_frame(&self) -> CommandResult<GeneralFrame> {
        if self.partial {
            return Err(CommandError::Partial { command: Self::NAME });
        }
        let mut buf = Vec::new();
        self.error_code.expect("complete instance").serialize(&mut buf);
        self.request_header.expect("complete instance").serialize(&mut buf);
        finish_frame(Self::NAME, Self::HEADER, buf)
    }

    fn from_frame(frame: &GeneralFrame, ignore_unparsed: bool) -> CommandResult<Self> {
        check_header(Self::NAME, Self::HEADER, frame)?;
        let bytes = frame.payload();
        let (error_code, rest) = ErrorCode::deserialize(bytes)
            .map_err(|source| CommandError::Primitive { field: "ErrorCode", command: Self::NAME, source })?;
        let (request_header, rest) = CommandHeader::deserialize(rest)
            .map_err(|source| CommandError::Primitive { field: "RequestHeader", command: Self::NAME, source })?;
        check_trailing(Self::NAME, rest, ignore_unparsed)?;
        Ok(Self::new(error_code, request_header))
    }
}
